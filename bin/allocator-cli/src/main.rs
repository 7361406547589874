// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-plan
//!
//! Command-line interface for the accelerator allocation planner.
//!
//! ## Usage
//! ```bash
//! # Solve an allocation problem from a data directory
//! accel-plan solve --data ./sample-data/small
//!
//! # Show the catalog and every server's feasible candidates
//! accel-plan inspect --data ./sample-data/small
//!
//! # Re-size one server after a load change
//! accel-plan scale --data ./sample-data/small --server premium-granite --rate-factor 2.5
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "accel-plan",
    about = "SLO-driven accelerator allocation for LLM inference fleets",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the allocation problem and print the solution.
    Solve {
        /// Directory holding the JSON data documents.
        #[arg(short, long)]
        data: std::path::PathBuf,

        /// Optional TOML file overriding the planner tunables.
        #[arg(short, long)]
        tunables: Option<std::path::PathBuf>,

        /// Promote desired allocations to current after solving.
        #[arg(long)]
        apply: bool,
    },

    /// Display the catalog, capacities, and per-server candidates.
    Inspect {
        /// Directory holding the JSON data documents.
        #[arg(short, long)]
        data: std::path::PathBuf,
    },

    /// Re-size one server under a scaled load and compare accelerators.
    Scale {
        /// Directory holding the JSON data documents.
        #[arg(short, long)]
        data: std::path::PathBuf,

        /// Server to re-size.
        #[arg(short, long)]
        server: String,

        /// Multiplier on the arrival rate.
        #[arg(long, default_value_t = 2.5)]
        rate_factor: f64,

        /// Multiplier on the mean input/output token counts.
        #[arg(long, default_value_t = 1.5)]
        token_factor: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Solve {
            data,
            tunables,
            apply,
        } => commands::solve::execute(data, tunables, apply),
        Commands::Inspect { data } => commands::inspect::execute(data),
        Commands::Scale {
            data,
            server,
            rate_factor,
            token_factor,
        } => commands::scale::execute(data, server, rate_factor, token_factor),
    }
}

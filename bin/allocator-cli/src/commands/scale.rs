// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-plan scale` command: solve, grow one server's load, then show
//! how re-sizing on the same accelerator compares with reallocating.

use allocation_planner::{Evaluator, Optimizer, Tunables};
use fleet_model::AllocationDiff;
use std::path::PathBuf;

pub fn execute(
    data: PathBuf,
    server_name: String,
    rate_factor: f64,
    token_factor: f64,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            accel-plan · Scale Explorer              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let (mut system, spec) = super::load_system(&data)?;
    let tunables = Tunables::default();

    let optimizer = Optimizer::with_tunables(&spec, tunables.clone());
    optimizer.optimize(&mut system)?;

    let before = system
        .server(&server_name)
        .ok_or_else(|| anyhow::anyhow!("no server '{server_name}'"))?
        .desired_allocation()
        .ok_or_else(|| anyhow::anyhow!("no allocation for server '{server_name}'"))?
        .clone();
    println!("  Before: {before}");

    // Grow the load.
    let mut load = *system
        .server(&server_name)
        .and_then(|s| s.load())
        .ok_or_else(|| anyhow::anyhow!("no load data for server '{server_name}'"))?;
    load.arrival_rate *= rate_factor;
    load.avg_in_tokens = (load.avg_in_tokens as f64 * token_factor) as u32;
    load.avg_out_tokens = (load.avg_out_tokens as f64 * token_factor) as u32;
    system
        .server_mut(&server_name)
        .expect("server just looked up")
        .set_load(load);
    println!(
        "  Load:   x{rate_factor} arrival rate, x{token_factor} tokens -> {:.1} req/min, {} tokens",
        load.arrival_rate,
        load.avg_length(),
    );
    println!();

    let evaluator = Evaluator::new(&system, &tunables);

    // Same accelerator, new size.
    match evaluator.scale(&before, &server_name)? {
        (Some(scaled), delta) => {
            println!("  Scaled: {scaled}");
            println!("  Replica delta: {delta:+}");
            if let Some(diff) = AllocationDiff::between(Some(&before), Some(&scaled)) {
                println!("  Diff:   {diff}");
            }
        }
        (None, _) => {
            println!(
                "  Accelerator {} can no longer meet the SLOs at this load.",
                before.accelerator(),
            );
        }
    }
    println!();

    // Best accelerator for the new load.
    match evaluator.reallocate(&server_name)? {
        Some((best, acc_name)) => {
            println!("  Reallocate: {best}");
            println!("  Accelerator: {acc_name}");
            let penalty = before.transition_penalty(&best, tunables.accel_penalty_factor);
            println!("  Transition penalty: {penalty:.2}");
        }
        None => println!("  No accelerator can satisfy the new load."),
    }

    println!();
    Ok(())
}

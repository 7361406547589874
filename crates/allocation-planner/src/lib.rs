// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # allocation-planner
//!
//! Assigns GPU-class accelerators to LLM inference servers so that
//! per-service-class latency and throughput SLOs are met at minimum cost,
//! subject to per-type capacity limits.
//!
//! The solve runs in two stages:
//!
//! 1. **Feasibility** — for every (server, accelerator) pair, the
//!    [`Evaluator`] sizes the smallest replica count whose queueing
//!    behaviour meets the server's SLO targets, producing a per-server
//!    candidate list sorted by value.
//! 2. **Assignment** — the greedy pass walks servers in priority order and
//!    grants capacity candidate by candidate; leftovers go to the
//!    configured [`SaturationPolicy`].
//!
//! [`Optimizer::optimize`] drives both stages and writes each server's
//! desired allocation into the [`fleet_model::System`].
//!
//! # Example
//! ```no_run
//! use allocation_planner::Optimizer;
//! use fleet_model::spec::{document_from_file, SystemData};
//! use fleet_model::System;
//! use std::path::Path;
//!
//! let data: SystemData = document_from_file(Path::new("system.json")).unwrap();
//! let (mut system, spec) = System::from_snapshot(&data).unwrap();
//! Optimizer::from_spec(&spec).optimize(&mut system).unwrap();
//! for (server, alloc) in system.solution() {
//!     println!("{server}: {} x{}", alloc.accelerator, alloc.num_replicas);
//! }
//! ```

mod candidates;
mod config;
mod error;
mod evaluator;
mod greedy;
mod operators;
mod optimizer;
mod saturation;

pub use candidates::enumerate_candidates;
pub use config::Tunables;
pub use error::PlanError;
pub use evaluator::Evaluator;
pub use greedy::{solve as solve_greedy, ServerEntry};
pub use optimizer::Optimizer;
pub use saturation::{
    from_name as saturation_policy_from_name, KeepUnallocated, PriorityExhaustive,
    PriorityRoundRobin, RoundRobin, SaturationPolicy,
};

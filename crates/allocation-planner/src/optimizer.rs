// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The solve entry point tying enumeration, the greedy pass, and
//! saturation together.

use crate::{candidates, greedy, saturation, PlanError, Tunables};
use fleet_model::spec::OptimizerSpec;
use fleet_model::System;
use tracing::info;

/// One configured solver instance.
///
/// Construction is cheap; a fresh one per solve is fine. The same
/// optimizer can be reused across solves — it holds no per-solve state.
pub struct Optimizer {
    spec: OptimizerSpec,
    tunables: Tunables,
}

impl Optimizer {
    /// Creates an optimizer with default tunables.
    pub fn from_spec(spec: &OptimizerSpec) -> Self {
        Self::with_tunables(spec, Tunables::default())
    }

    /// Creates an optimizer with explicit tunables.
    pub fn with_tunables(spec: &OptimizerSpec, tunables: Tunables) -> Self {
        Self {
            spec: spec.clone(),
            tunables,
        }
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Solves the allocation problem, writing each server's desired
    /// allocation.
    ///
    /// Enumerates candidates for every server, then either assigns each
    /// server its cheapest candidate (`unlimited`) or runs the
    /// capacity-constrained greedy pass followed by the configured
    /// saturation policy.
    pub fn optimize(&self, system: &mut System) -> Result<(), PlanError> {
        candidates::enumerate_candidates(system, &self.tunables)?;

        if self.spec.unlimited {
            solve_unlimited(system);
        } else {
            let policy = saturation::from_name(&self.spec.saturation_policy)?;
            greedy::solve(system, policy.as_ref());
        }

        let total = system.servers().len();
        let assigned = system
            .servers()
            .values()
            .filter(|s| s.desired_allocation().is_some())
            .count();
        info!(assigned, total, "solve complete");
        Ok(())
    }
}

/// Capacity-blind assignment: every server takes its minimum-value
/// candidate.
fn solve_unlimited(system: &mut System) {
    for server in system.servers_mut().values_mut() {
        server.clear_desired_allocation();
        if let Some(best) = server.all_allocations().first().cloned() {
            server.set_desired_allocation(best);
        }
    }
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation operators: re-sizing on the same accelerator and moving to
//! the cheapest feasible one.
//!
//! Used after a load change, outside the main solve: `scale` answers "how
//! many replicas does the current accelerator need now?", `reallocate`
//! answers "is there a better accelerator for this load?".

use crate::{Evaluator, PlanError};
use fleet_model::Allocation;

impl Evaluator<'_> {
    /// Re-sizes `alloc` on its own accelerator under the server's current
    /// load. Returns the fresh allocation and the replica delta
    /// (new - old), or `(None, 0)` when the accelerator is no longer
    /// feasible.
    pub fn scale(
        &self,
        alloc: &Allocation,
        server_name: &str,
    ) -> Result<(Option<Allocation>, i64), PlanError> {
        let Some(fresh) = self.evaluate(server_name, alloc.accelerator())? else {
            return Ok((None, 0));
        };
        let delta = fresh.num_replicas() as i64 - alloc.num_replicas() as i64;
        Ok((Some(fresh), delta))
    }

    /// Finds the minimum-value feasible allocation across the whole
    /// catalog. Ties keep the first accelerator in name order.
    pub fn reallocate(
        &self,
        server_name: &str,
    ) -> Result<Option<(Allocation, String)>, PlanError> {
        let mut best: Option<Allocation> = None;
        for acc_name in self.system.accelerators().keys() {
            if let Some(candidate) = self.evaluate(server_name, acc_name)? {
                let better = match &best {
                    None => true,
                    Some(current) => candidate.value() < current.value(),
                };
                if better {
                    best = Some(candidate);
                }
            }
        }
        Ok(best.map(|alloc| {
            let acc = alloc.accelerator().to_string();
            (alloc, acc)
        }))
    }
}

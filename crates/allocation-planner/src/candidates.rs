// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Candidate enumeration: every feasible allocation per server, sorted.

use crate::{Evaluator, PlanError, Tunables};
use fleet_model::{Allocation, System};

impl Evaluator<'_> {
    /// All feasible allocations for one server across the accelerator
    /// catalog, sorted by (value, accelerator name) ascending.
    ///
    /// A server pinned by `keep_accelerator` is only evaluated against its
    /// currently allocated accelerator.
    pub fn candidates(&self, server_name: &str) -> Result<Vec<Allocation>, PlanError> {
        let Some(server) = self.system.server(server_name) else {
            return Ok(Vec::new());
        };

        let acc_names: Vec<String> = match server.allocation() {
            Some(current) if server.keep_accelerator() => {
                vec![current.accelerator().to_string()]
            }
            _ => self.system.accelerators().keys().cloned().collect(),
        };

        let mut candidates = Vec::new();
        for acc_name in &acc_names {
            if let Some(alloc) = self.evaluate(server_name, acc_name)? {
                candidates.push(alloc);
            }
        }
        candidates.sort_by(|a, b| {
            a.value()
                .total_cmp(&b.value())
                .then_with(|| a.accelerator().cmp(b.accelerator()))
        });
        Ok(candidates)
    }
}

/// Computes and stores the sorted candidate list of every server.
pub fn enumerate_candidates(system: &mut System, tunables: &Tunables) -> Result<(), PlanError> {
    let server_names: Vec<String> = system.servers().keys().cloned().collect();

    let mut lists = Vec::with_capacity(server_names.len());
    {
        let evaluator = Evaluator::new(system, tunables);
        for name in &server_names {
            lists.push(evaluator.candidates(name)?);
        }
    }

    for (name, list) in server_names.into_iter().zip(lists) {
        if let Some(server) = system.server_mut(&name) {
            server.set_candidates(list);
        }
    }
    Ok(())
}

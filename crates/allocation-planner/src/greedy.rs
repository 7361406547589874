// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Capacity-constrained greedy allocation across servers.
//!
//! Each server brings its sorted candidate list. Servers are ordered by
//! service-class priority, then by how much they stand to lose if their
//! current candidate is denied (the `delta` to their next option), and the
//! allocator walks that order handing out capacity. A denied server slides
//! to its next candidate and re-enters the order; a server that runs out
//! of candidates joins the unallocated list for the saturation policy to
//! consider.

use crate::saturation::SaturationPolicy;
use fleet_model::{Allocation, System};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// A server's position in the greedy pass.
#[derive(Debug, Clone)]
pub struct ServerEntry {
    pub server_name: String,
    /// Service-class priority (1 highest).
    pub priority: u8,
    /// Cursor into `allocations`.
    pub cur_index: usize,
    /// Candidates sorted by (value, accelerator name).
    pub allocations: Vec<Allocation>,
    /// Penalty of denying the current candidate: value of the next one
    /// minus the current, or `f64::MAX` when no alternative remains.
    pub delta: f64,
}

impl ServerEntry {
    fn current_value(&self) -> f64 {
        self.allocations[self.cur_index].value()
    }
}

/// Strict total order of the greedy pass: priority first, then the most
/// constrained (largest delta), then the most expensive current candidate,
/// with the server name breaking any remaining tie.
fn order(a: &ServerEntry, b: &ServerEntry) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.delta.total_cmp(&a.delta))
        .then_with(|| b.current_value().total_cmp(&a.current_value()))
        .then_with(|| a.server_name.cmp(&b.server_name))
}

/// Runs the greedy pass over every server with candidates, then hands the
/// leftovers to `policy`.
///
/// Capacity is drawn from a private copy of the system's capacity table;
/// the table itself is never mutated. Every server's desired-allocation
/// slot is cleared first and filled only on success.
pub fn solve(system: &mut System, policy: &dyn SaturationPolicy) {
    let mut available: BTreeMap<String, usize> = system.capacities().clone();

    let mut entries: Vec<ServerEntry> = Vec::new();
    for (name, server) in system.servers() {
        let allocations = server.all_allocations().to_vec();
        if allocations.is_empty() {
            continue;
        }
        let delta = if allocations.len() > 1 {
            allocations[1].value() - allocations[0].value()
        } else {
            f64::MAX
        };
        entries.push(ServerEntry {
            server_name: name.clone(),
            priority: system.server_priority(server),
            cur_index: 0,
            allocations,
            delta,
        });
    }
    for server in system.servers_mut().values_mut() {
        server.clear_desired_allocation();
    }
    entries.sort_by(order);

    let mut unallocated: Vec<ServerEntry> = Vec::new();

    while !entries.is_empty() {
        let mut top = entries.remove(0);
        if top.allocations.is_empty() {
            continue;
        }

        let alloc = top.allocations[top.cur_index].clone();
        let required = required_units(system, &top.server_name, &alloc);

        if let Some((kind, needed)) = required {
            let have = available.get(&kind).copied().unwrap_or(0);
            if have >= needed {
                available.insert(kind, have - needed);
                if let Some(server) = system.server_mut(&top.server_name) {
                    server.set_desired_allocation(alloc);
                }
                continue;
            }
        } else {
            // Catalog changed under the candidate list; skip the server.
            debug!(server = %top.server_name, "candidate references unknown entities");
            continue;
        }

        // Denied: slide to the next candidate and re-enter the order.
        top.cur_index += 1;
        if top.cur_index + 1 < top.allocations.len() {
            top.delta =
                top.allocations[top.cur_index + 1].value() - top.allocations[top.cur_index].value();
        } else if top.cur_index == top.allocations.len() {
            unallocated.push(top);
            continue;
        } else {
            // On the last candidate: protect it strongly.
            top.delta = f64::MAX;
        }
        let pos = entries
            .binary_search_by(|e| order(e, &top))
            .unwrap_or_else(|p| p);
        entries.insert(pos, top);
    }

    if !unallocated.is_empty() {
        debug!(
            count = unallocated.len(),
            policy = policy.name(),
            "distributing surplus to unallocated servers"
        );
    }
    policy.distribute(&unallocated, &mut available, system);
}

/// Capacity demand of one candidate: its accelerator's type and the total
/// units `units_per_replica * num_replicas`.
fn required_units(
    system: &System,
    server_name: &str,
    alloc: &Allocation,
) -> Option<(String, usize)> {
    let server = system.server(server_name)?;
    let acc = system.accelerator(alloc.accelerator())?;
    let units = system.units_per_replica(server.model_name(), alloc.accelerator())?;
    Some((acc.kind().to_string(), units * alloc.num_replicas()))
}

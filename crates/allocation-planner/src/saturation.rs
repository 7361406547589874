// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Saturation policies: distributing leftover capacity to servers the
//! greedy pass could not satisfy.
//!
//! An unsatisfied server may still be worth partial capacity — fewer
//! replicas than its SLOs call for, at proportionally reduced cost. The
//! four policies differ in who gets the surplus:
//!
//! | Policy | Behaviour |
//! |---|---|
//! | [`KeepUnallocated`] | nothing; unsatisfied servers stay empty |
//! | [`PriorityExhaustive`] | one server at a time, as much as fits |
//! | [`PriorityRoundRobin`] | round-robin within each priority band |
//! | [`RoundRobin`] | round-robin across all unsatisfied servers |
//!
//! Policies are purely arithmetic — no queueing analysis — so a partially
//! allocated server keeps its candidate's batch and latency statistics
//! with cost and value scaled to the granted replica count.

use crate::greedy::ServerEntry;
use crate::PlanError;
use fleet_model::{Allocation, System};
use std::collections::BTreeMap;

/// Strategy distributing remaining capacity after the greedy pass.
pub trait SaturationPolicy {
    /// Policy name as it appears in optimizer specs.
    fn name(&self) -> &'static str;

    /// Grants surplus capacity from `available` to `unallocated` servers,
    /// writing any partial allocations into `system`.
    fn distribute(
        &self,
        unallocated: &[ServerEntry],
        available: &mut BTreeMap<String, usize>,
        system: &mut System,
    );
}

/// Creates the policy named in an optimizer spec.
pub fn from_name(name: &str) -> Result<Box<dyn SaturationPolicy>, PlanError> {
    match name.to_lowercase().as_str() {
        "" | "none" => Ok(Box::new(KeepUnallocated)),
        "priority-exhaustive" | "priorityexhaustive" => Ok(Box::new(PriorityExhaustive)),
        "priority-round-robin" | "priorityroundrobin" => Ok(Box::new(PriorityRoundRobin)),
        "round-robin" | "roundrobin" => Ok(Box::new(RoundRobin)),
        other => Err(PlanError::UnknownPolicy(other.to_string())),
    }
}

/// Leave the surplus where it is.
#[derive(Debug, Clone, Default)]
pub struct KeepUnallocated;

impl SaturationPolicy for KeepUnallocated {
    fn name(&self) -> &'static str {
        "none"
    }

    fn distribute(
        &self,
        _unallocated: &[ServerEntry],
        _available: &mut BTreeMap<String, usize>,
        _system: &mut System,
    ) {
    }
}

/// Serve unsatisfied servers one at a time, in the order the greedy pass
/// exhausted them (priority first), granting each as many replicas of its
/// cheapest workable candidate as the surplus allows.
#[derive(Debug, Clone, Default)]
pub struct PriorityExhaustive;

impl SaturationPolicy for PriorityExhaustive {
    fn name(&self) -> &'static str {
        "priority-exhaustive"
    }

    fn distribute(
        &self,
        unallocated: &[ServerEntry],
        available: &mut BTreeMap<String, usize>,
        system: &mut System,
    ) {
        for entry in unallocated {
            let Some(server) = system.server(&entry.server_name) else {
                continue;
            };
            let model_name = server.model_name().to_string();

            for alloc in &entry.allocations {
                let Some(kind) = accelerator_kind(system, alloc) else {
                    continue;
                };
                let Some(units) = system.units_per_replica(&model_name, alloc.accelerator())
                else {
                    continue;
                };
                if units == 0 {
                    continue;
                }
                let have = available.get(&kind).copied().unwrap_or(0);
                let granted = (have / units).min(alloc.num_replicas());
                if granted == 0 {
                    continue;
                }

                let mut partial = alloc.clone();
                partial.rescale_replicas(granted);
                available.insert(kind, have - granted * units);
                if let Some(server) = system.server_mut(&entry.server_name) {
                    server.set_desired_allocation(partial);
                }
                break;
            }
        }
    }
}

/// Round-robin within each band of equal priority, bands served in
/// priority order.
#[derive(Debug, Clone, Default)]
pub struct PriorityRoundRobin;

impl SaturationPolicy for PriorityRoundRobin {
    fn name(&self) -> &'static str {
        "priority-round-robin"
    }

    fn distribute(
        &self,
        unallocated: &[ServerEntry],
        available: &mut BTreeMap<String, usize>,
        system: &mut System,
    ) {
        let mut start = 0;
        while start < unallocated.len() {
            let priority = unallocated[start].priority;
            let mut end = start + 1;
            while end < unallocated.len() && unallocated[end].priority == priority {
                end += 1;
            }
            round_robin(&unallocated[start..end], available, system);
            start = end;
        }
    }
}

/// One round-robin pass across every unsatisfied server.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin;

impl SaturationPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn distribute(
        &self,
        unallocated: &[ServerEntry],
        available: &mut BTreeMap<String, usize>,
        system: &mut System,
    ) {
        round_robin(unallocated, available, system);
    }
}

/// A server's claim during the round-robin procedure.
struct Ticket {
    active: bool,
    model_name: String,
    acc_kind: String,
    units_per_replica: usize,
    num_replicas: usize,
    final_alloc: Option<Allocation>,
}

/// Grants replicas one at a time, visiting the group in input order, until
/// no ticket can progress. A ticket activates on the first candidate whose
/// type still has room for one replica, accumulates replicas up to that
/// candidate's ask, and retires when its type runs dry or the ask is met.
fn round_robin(
    group: &[ServerEntry],
    available: &mut BTreeMap<String, usize>,
    system: &mut System,
) {
    let mut tickets: BTreeMap<String, Ticket> = BTreeMap::new();
    for entry in group {
        let Some(server) = system.server(&entry.server_name) else {
            continue;
        };
        if system.model(server.model_name()).is_none() {
            continue;
        }
        tickets.insert(
            entry.server_name.clone(),
            Ticket {
                active: false,
                model_name: server.model_name().to_string(),
                acc_kind: String::new(),
                units_per_replica: 0,
                num_replicas: 0,
                final_alloc: None,
            },
        );
    }

    // Completed claims, in retirement order.
    let mut granted: Vec<(String, usize, Allocation)> = Vec::new();

    while !tickets.is_empty() {
        for entry in group {
            let mut retire = false;
            {
                let Some(ticket) = tickets.get_mut(&entry.server_name) else {
                    continue;
                };

                if !ticket.active {
                    for alloc in &entry.allocations {
                        let Some(kind) = accelerator_kind(system, alloc) else {
                            continue;
                        };
                        let Some(units) =
                            system.units_per_replica(&ticket.model_name, alloc.accelerator())
                        else {
                            continue;
                        };
                        if units > 0 && available.get(&kind).copied().unwrap_or(0) >= units {
                            ticket.active = true;
                            ticket.acc_kind = kind;
                            ticket.units_per_replica = units;
                            ticket.final_alloc = Some(alloc.clone());
                            break;
                        }
                    }
                    if !ticket.active {
                        tickets.remove(&entry.server_name);
                        continue;
                    }
                }

                let have = available.get(&ticket.acc_kind).copied().unwrap_or(0);
                let asked = ticket
                    .final_alloc
                    .as_ref()
                    .map(|a| a.num_replicas())
                    .unwrap_or(0);
                if have >= ticket.units_per_replica && ticket.num_replicas < asked {
                    available.insert(ticket.acc_kind.clone(), have - ticket.units_per_replica);
                    ticket.num_replicas += 1;
                } else {
                    retire = true;
                }
            }
            if retire {
                if let Some(ticket) = tickets.remove(&entry.server_name) {
                    if ticket.num_replicas > 0 {
                        granted.push((
                            entry.server_name.clone(),
                            ticket.num_replicas,
                            ticket.final_alloc.expect("active ticket has an allocation"),
                        ));
                    }
                }
            }
        }
    }

    for (server_name, num_replicas, alloc) in granted {
        let mut partial = alloc;
        partial.rescale_replicas(num_replicas);
        if let Some(server) = system.server_mut(&server_name) {
            server.set_desired_allocation(partial);
        }
    }
}

fn accelerator_kind(system: &System, alloc: &Allocation) -> Option<String> {
    system
        .accelerator(alloc.accelerator())
        .map(|acc| acc.kind().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::spec::document_from_json;

    /// Three servers of one model on accelerator G2 (2 units/replica),
    /// none allocated, each asking for `asked` replicas.
    fn fixture(asked: usize, capacity: usize) -> (Vec<ServerEntry>, System) {
        let mut system = System::new();
        system
            .set_accelerators_from_spec(
                &document_from_json(
                    r#"{ "spec": [ { "name": "G2", "type": "G2", "multiplicity": 1, "cost": 10.0 } ] }"#,
                )
                .unwrap(),
            )
            .unwrap();
        system.set_capacities_from_spec(
            &document_from_json(&format!(
                r#"{{ "count": [ {{ "type": "G2", "count": {capacity} }} ] }}"#
            ))
            .unwrap(),
        );
        system
            .set_models_from_spec(
                &document_from_json(
                    r#"{ "spec": [ { "name": "m", "data": [
                        { "acc": "G2", "accCount": 2, "maxBatchSize": 8, "atTokens": 512,
                          "alpha": 30.0, "beta": 0.5 } ] } ] }"#,
                )
                .unwrap(),
            )
            .unwrap();
        system
            .set_service_classes_from_spec(
                &document_from_json(
                    r#"{ "spec": [ { "name": "Std", "priority": 10, "modelTargets": [
                        { "model": "m", "sloITL": 50.0 } ] } ] }"#,
                )
                .unwrap(),
            )
            .unwrap();
        system
            .set_servers_from_spec(
                &document_from_json(
                    r#"{ "spec": [
                        { "name": "s1", "class": "Std", "model": "m" },
                        { "name": "s2", "class": "Std", "model": "m" },
                        { "name": "s3", "class": "Std", "model": "m" }
                    ] }"#,
                )
                .unwrap(),
            )
            .unwrap();

        let entries = ["s1", "s2", "s3"]
            .iter()
            .map(|name| {
                let cost = asked as f64 * 2.0 * 10.0;
                ServerEntry {
                    server_name: name.to_string(),
                    priority: 10,
                    cur_index: 0,
                    allocations: vec![Allocation::new("G2", asked, 8, cost)],
                    delta: f64::MAX,
                }
            })
            .collect();
        (entries, system)
    }

    #[test]
    fn test_from_name() {
        assert_eq!(from_name("none").unwrap().name(), "none");
        assert_eq!(from_name("").unwrap().name(), "none");
        assert_eq!(
            from_name("Priority-Exhaustive").unwrap().name(),
            "priority-exhaustive"
        );
        assert_eq!(
            from_name("priorityRoundRobin").unwrap().name(),
            "priority-round-robin"
        );
        assert_eq!(from_name("round-robin").unwrap().name(), "round-robin");
        assert!(matches!(
            from_name("fair-share"),
            Err(PlanError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_none_leaves_everything() {
        let (entries, mut system) = fixture(4, 12);
        let mut available = system.capacities().clone();
        KeepUnallocated.distribute(&entries, &mut available, &mut system);
        assert_eq!(available.get("G2"), Some(&12));
        assert!(system.servers().values().all(|s| s.desired_allocation().is_none()));
    }

    #[test]
    fn test_priority_exhaustive_first_come_first_served() {
        // Each server wants 4 replicas x 2 units; 12 units available:
        // s1 gets 4, s2 gets 2, s3 gets nothing.
        let (entries, mut system) = fixture(4, 12);
        let mut available = system.capacities().clone();
        PriorityExhaustive.distribute(&entries, &mut available, &mut system);

        let replicas = |name: &str| {
            system
                .server(name)
                .unwrap()
                .desired_allocation()
                .map(|a| a.num_replicas())
        };
        assert_eq!(replicas("s1"), Some(4));
        assert_eq!(replicas("s2"), Some(2));
        assert_eq!(replicas("s3"), None);
        assert_eq!(available.get("G2"), Some(&0));

        // Cost scaled by granted/asked.
        let s2 = system.server("s2").unwrap().desired_allocation().unwrap();
        assert!((s2.cost() - 40.0).abs() < 1e-9);
        assert!((s2.value() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_robin_splits_evenly() {
        // 12 units / 2 per replica = 6 replicas for 3 servers: 2 each.
        let (entries, mut system) = fixture(4, 12);
        let mut available = system.capacities().clone();
        RoundRobin.distribute(&entries, &mut available, &mut system);

        for name in ["s1", "s2", "s3"] {
            let alloc = system.server(name).unwrap().desired_allocation().unwrap();
            assert_eq!(alloc.num_replicas(), 2, "server {name}");
            assert!((alloc.cost() - 40.0).abs() < 1e-9);
        }
        assert_eq!(available.get("G2"), Some(&0));
    }

    #[test]
    fn test_round_robin_respects_ask() {
        // Plenty of capacity: nobody receives more than they asked for.
        let (entries, mut system) = fixture(2, 100);
        let mut available = system.capacities().clone();
        RoundRobin.distribute(&entries, &mut available, &mut system);

        for name in ["s1", "s2", "s3"] {
            let alloc = system.server(name).unwrap().desired_allocation().unwrap();
            assert_eq!(alloc.num_replicas(), 2, "server {name}");
        }
        // 3 servers x 2 replicas x 2 units = 12 of 100 used.
        assert_eq!(available.get("G2"), Some(&88));
    }

    #[test]
    fn test_round_robin_uneven_tail() {
        // 7 units fund 3 replicas; round-robin hands one to each server
        // and the odd unit stays unused.
        let (entries, mut system) = fixture(4, 7);
        let mut available = system.capacities().clone();
        RoundRobin.distribute(&entries, &mut available, &mut system);

        let replicas = |name: &str| {
            system
                .server(name)
                .unwrap()
                .desired_allocation()
                .map(|a| a.num_replicas())
        };
        assert_eq!(replicas("s1"), Some(1));
        assert_eq!(replicas("s2"), Some(1));
        assert_eq!(replicas("s3"), Some(1));
        assert_eq!(available.get("G2"), Some(&1));
    }

    #[test]
    fn test_priority_round_robin_bands() {
        // Two bands: {s1} at priority 1 and {s2, s3} at 10. The first
        // band drains what it needs before the second splits the rest.
        let (mut entries, mut system) = fixture(4, 12);
        entries[0].priority = 1;
        let mut available = system.capacities().clone();
        PriorityRoundRobin.distribute(&entries, &mut available, &mut system);

        let replicas = |name: &str| {
            system
                .server(name)
                .unwrap()
                .desired_allocation()
                .map(|a| a.num_replicas())
        };
        // s1 takes its full ask of 4 (8 units), leaving 4 units = 2
        // replicas for the lower band.
        assert_eq!(replicas("s1"), Some(4));
        assert_eq!(replicas("s2"), Some(1));
        assert_eq!(replicas("s3"), Some(1));
    }
}

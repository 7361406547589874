// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end solves over small fleets.
//!
//! These exercise the complete flow from JSON documents → system registry
//! → candidate enumeration → greedy assignment → saturation policy →
//! solution output, checking the capacity, priority, and sizing
//! behaviours the planner promises.

use allocation_planner::{Evaluator, Optimizer, Tunables};
use fleet_model::spec::{
    document_from_json, AcceleratorData, CapacityData, ModelData, OptimizerSpec, ServerData,
    ServiceClassData,
};
use fleet_model::System;

// ── Helpers ────────────────────────────────────────────────────

struct FleetBuilder {
    accelerators: String,
    capacities: String,
    models: String,
    service_classes: String,
    servers: String,
}

impl FleetBuilder {
    fn new() -> Self {
        Self {
            accelerators: r#"{ "spec": [
                { "name": "A100", "type": "A100", "multiplicity": 1, "cost": 40.0 },
                { "name": "G2", "type": "G2", "multiplicity": 1, "cost": 15.0 }
            ] }"#
                .into(),
            capacities: r#"{ "count": [
                { "type": "A100", "count": 8 }, { "type": "G2", "count": 16 }
            ] }"#
                .into(),
            models: r#"{ "spec": [ { "name": "granite_13b", "data": [
                { "acc": "A100", "accCount": 1, "maxBatchSize": 32, "atTokens": 512,
                  "alpha": 20.58, "beta": 0.41, "gamma": 150.0, "delta": 0.3 },
                { "acc": "G2", "accCount": 1, "maxBatchSize": 16, "atTokens": 512,
                  "alpha": 30.0, "beta": 0.6, "gamma": 200.0, "delta": 0.4 }
            ] } ] }"#
                .into(),
            service_classes: r#"{ "spec": [ { "name": "Premium", "priority": 1,
                "modelTargets": [
                    { "model": "granite_13b", "sloITL": 40.0, "sloTTFT": 1000.0 }
                ] } ] }"#
                .into(),
            servers: r#"{ "spec": [ { "name": "Premium-g13b", "class": "Premium",
                "model": "granite_13b",
                "load": { "arrivalRate": 60.0, "avgInTokens": 128, "avgOutTokens": 384 }
            } ] }"#
                .into(),
        }
    }

    fn capacities(mut self, json: &str) -> Self {
        self.capacities = json.into();
        self
    }

    fn service_classes(mut self, json: &str) -> Self {
        self.service_classes = json.into();
        self
    }

    fn servers(mut self, json: &str) -> Self {
        self.servers = json.into();
        self
    }

    fn build(self) -> System {
        let mut system = System::new();
        system
            .set_accelerators_from_spec(
                &document_from_json::<AcceleratorData>(&self.accelerators).unwrap(),
            )
            .unwrap();
        system.set_capacities_from_spec(
            &document_from_json::<CapacityData>(&self.capacities).unwrap(),
        );
        system
            .set_models_from_spec(&document_from_json::<ModelData>(&self.models).unwrap())
            .unwrap();
        system
            .set_service_classes_from_spec(
                &document_from_json::<ServiceClassData>(&self.service_classes).unwrap(),
            )
            .unwrap();
        system
            .set_servers_from_spec(&document_from_json::<ServerData>(&self.servers).unwrap())
            .unwrap();
        system
    }
}

fn optimize(system: &mut System, saturation_policy: &str) {
    let spec = OptimizerSpec {
        saturation_policy: saturation_policy.into(),
        ..OptimizerSpec::default()
    };
    Optimizer::from_spec(&spec).optimize(system).unwrap();
}

/// Units consumed by every desired allocation, per accelerator type.
fn units_used(system: &System) -> std::collections::BTreeMap<String, usize> {
    let mut used = std::collections::BTreeMap::new();
    for server in system.servers().values() {
        if let Some(alloc) = server.desired_allocation() {
            let units = system
                .units_per_replica(server.model_name(), alloc.accelerator())
                .unwrap();
            let kind = system
                .accelerator(alloc.accelerator())
                .unwrap()
                .kind()
                .to_string();
            *used.entry(kind).or_insert(0) += units * alloc.num_replicas();
        }
    }
    used
}

fn assert_capacity_respected(system: &System) {
    for (kind, used) in units_used(system) {
        let capacity = system.capacity(&kind).unwrap_or(0);
        assert!(used <= capacity, "type {kind}: {used} used > {capacity}");
    }
}

// ── Single-server sizing ───────────────────────────────────────

#[test]
fn test_small_fleet_picks_value_minimum() {
    // One premium server, both accelerators feasible: the solve assigns
    // the cheapest candidate and the solution reports its statistics.
    let mut system = FleetBuilder::new().build();
    optimize(&mut system, "none");

    let server = system.server("Premium-g13b").unwrap();
    let alloc = server.desired_allocation().unwrap();
    assert!(alloc.serv_time() <= 40.0, "ITL target must hold");
    assert!(alloc.num_replicas() >= 1);

    // The assignment is the head of the sorted candidate list.
    let best = &server.all_allocations()[0];
    assert_eq!(alloc.accelerator(), best.accelerator());
    assert_eq!(alloc.num_replicas(), best.num_replicas());
    for other in server.all_allocations() {
        assert!(alloc.value() <= other.value());
    }

    let solution = system.solution();
    let data = &solution["Premium-g13b"];
    assert_eq!(data.num_replicas, alloc.num_replicas());
    // TTFT adds prefill on top of queueing; it dwarfs the token time.
    assert!(data.ttft_average > data.itl_average);
    assert_capacity_respected(&system);
}

#[test]
fn test_trivial_fleet_forced_onto_a100() {
    // An ITL of 32 ms caps G2 at a batch of ~3 (30 + 0.6n <= 32), so its
    // nominal cost advantage drowns in replica count; A100 still fits the
    // whole load in one replica at its full batch of 32.
    let mut system = FleetBuilder::new()
        .service_classes(
            r#"{ "spec": [ { "name": "Premium", "priority": 1, "modelTargets": [
                { "model": "granite_13b", "sloITL": 32.0, "sloTTFT": 1000.0 } ] } ] }"#,
        )
        .build();
    optimize(&mut system, "none");

    let alloc = system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .unwrap();
    assert_eq!(alloc.accelerator(), "A100");
    assert_eq!(alloc.num_replicas(), 1);
    assert_eq!(alloc.batch_size(), 32);
    assert!((alloc.cost() - 40.0).abs() < 1e-9);
}

#[test]
fn test_unattainable_itl_leaves_server_empty() {
    // ITL below every accelerator's single-request token time.
    let mut system = FleetBuilder::new()
        .service_classes(
            r#"{ "spec": [ { "name": "Premium", "priority": 1, "modelTargets": [
                { "model": "granite_13b", "sloITL": 10.0, "sloTTFT": 1000.0 } ] } ] }"#,
        )
        .build();
    optimize(&mut system, "none");

    assert!(system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .is_none());
    assert!(system.solution().is_empty());
}

#[test]
fn test_throughput_driven_sizing() {
    // TPS-only target: replica count follows the throughput ceiling, and
    // latency statistics are still reported for observability.
    let mut system = FleetBuilder::new()
        .service_classes(
            r#"{ "spec": [ { "name": "Premium", "priority": 1, "modelTargets": [
                { "model": "granite_13b", "sloTPS": 4000.0 } ] } ] }"#,
        )
        .servers(
            r#"{ "spec": [ { "name": "Premium-g13b", "class": "Premium",
                "model": "granite_13b",
                "load": { "arrivalRate": 60.0, "avgInTokens": 100, "avgOutTokens": 400 }
            } ] }"#,
        )
        .capacities(r#"{ "count": [ { "type": "A100", "count": 64 }, { "type": "G2", "count": 64 } ] }"#)
        .build();
    optimize(&mut system, "none");

    let alloc = system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .unwrap();
    assert!(alloc.num_replicas() > 1, "4000 tok/s needs several replicas");
    assert!(alloc.serv_time() > 0.0);
    assert!(alloc.wait_time() >= 0.0);
    assert!(alloc.rho() > 0.0 && alloc.rho() < 1.0);
    assert_capacity_respected(&system);
}

// ── Capacity contention ────────────────────────────────────────

/// Two servers, one pool: the high-priority server drains it.
fn contended_fleet(capacity: usize) -> System {
    FleetBuilder::new()
        .capacities(&format!(
            r#"{{ "count": [ {{ "type": "A100", "count": {capacity} }} ] }}"#
        ))
        .service_classes(
            r#"{ "spec": [
                { "name": "P1", "priority": 1, "modelTargets": [
                    { "model": "granite_13b", "sloITL": 40.0, "sloTTFT": 120.0 } ] },
                { "name": "P2", "priority": 2, "modelTargets": [
                    { "model": "granite_13b", "sloITL": 40.0, "sloTTFT": 120.0 } ] }
            ] }"#,
        )
        .servers(
            r#"{ "spec": [
                { "name": "p1-g13b", "class": "P1", "model": "granite_13b",
                  "load": { "arrivalRate": 3000.0, "avgInTokens": 128, "avgOutTokens": 384 } },
                { "name": "p2-g13b", "class": "P2", "model": "granite_13b",
                  "load": { "arrivalRate": 3000.0, "avgInTokens": 128, "avgOutTokens": 384 } }
            ] }"#,
        )
        .build()
}

/// Replicas each contended server needs on its own.
fn solo_need(system: &System) -> usize {
    let tunables = Tunables::default();
    Evaluator::new(system, &tunables)
        .evaluate("p1-g13b", "A100")
        .unwrap()
        .unwrap()
        .num_replicas()
}

#[test]
fn test_contention_priority_takes_all() {
    let probe = contended_fleet(64);
    let need = solo_need(&probe);
    assert!(need >= 2, "fixture should need multiple replicas, got {need}");

    // Capacity fits one-and-a-half servers: P1 whole, P2 nothing.
    let mut system = contended_fleet(need + need / 2);
    optimize(&mut system, "none");

    let p1 = system.server("p1-g13b").unwrap().desired_allocation().unwrap();
    assert_eq!(p1.num_replicas(), need);
    assert!(system.server("p2-g13b").unwrap().desired_allocation().is_none());
    assert_capacity_respected(&system);
}

#[test]
fn test_contention_priority_exhaustive_grants_leftovers() {
    let probe = contended_fleet(64);
    let need = solo_need(&probe);
    let leftover = need / 2;

    let mut system = contended_fleet(need + leftover);
    optimize(&mut system, "priority-exhaustive");

    let p1 = system.server("p1-g13b").unwrap().desired_allocation().unwrap();
    let p2 = system.server("p2-g13b").unwrap().desired_allocation().unwrap();
    assert_eq!(p1.num_replicas(), need);
    assert_eq!(p2.num_replicas(), leftover);

    // Cost scaled to the granted fraction.
    let expected = 40.0 * leftover as f64;
    assert!((p2.cost() - expected).abs() < 1e-9);
    assert_capacity_respected(&system);
}

#[test]
fn test_round_robin_splits_surplus() {
    // Three equal-priority servers, capacity for six of the nine replicas
    // they want in total: each ends up with two.
    let mut system = FleetBuilder::new()
        .capacities(r#"{ "count": [ { "type": "A100", "count": 6 } ] }"#)
        .service_classes(
            r#"{ "spec": [ { "name": "Std", "priority": 10, "modelTargets": [
                { "model": "granite_13b", "sloITL": 40.0, "sloTTFT": 120.0 } ] } ] }"#,
        )
        .servers(
            r#"{ "spec": [
                { "name": "s1", "class": "Std", "model": "granite_13b",
                  "load": { "arrivalRate": 4000.0, "avgInTokens": 128, "avgOutTokens": 384 } },
                { "name": "s2", "class": "Std", "model": "granite_13b",
                  "load": { "arrivalRate": 4000.0, "avgInTokens": 128, "avgOutTokens": 384 } },
                { "name": "s3", "class": "Std", "model": "granite_13b",
                  "load": { "arrivalRate": 4000.0, "avgInTokens": 128, "avgOutTokens": 384 } }
            ] }"#,
        )
        .build();

    {
        // The fixture only makes sense if each server alone wants more
        // than a third of the pool.
        let tunables = Tunables::default();
        let need = Evaluator::new(&system, &tunables)
            .evaluate("s1", "A100")
            .unwrap()
            .unwrap()
            .num_replicas();
        assert!(need > 2, "fixture needs per-server demand above 2, got {need}");
    }

    optimize(&mut system, "round-robin");

    for name in ["s1", "s2", "s3"] {
        let alloc = system.server(name).unwrap().desired_allocation().unwrap();
        assert_eq!(alloc.num_replicas(), 2, "server {name}");
    }
    assert_capacity_respected(&system);
}

// ── Invariants across solves ───────────────────────────────────

#[test]
fn test_replica_floor_is_respected() {
    let mut system = FleetBuilder::new()
        .servers(
            r#"{ "spec": [ { "name": "Premium-g13b", "class": "Premium",
                "model": "granite_13b", "minNumReplicas": 3,
                "load": { "arrivalRate": 60.0, "avgInTokens": 128, "avgOutTokens": 384 }
            } ] }"#,
        )
        .build();
    optimize(&mut system, "none");

    let alloc = system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .unwrap();
    assert!(alloc.num_replicas() >= 3);
}

#[test]
fn test_zero_load_gets_replica_floor() {
    let mut system = FleetBuilder::new()
        .servers(
            r#"{ "spec": [ { "name": "Premium-g13b", "class": "Premium",
                "model": "granite_13b", "minNumReplicas": 2,
                "load": { "arrivalRate": 0.0, "avgInTokens": 128, "avgOutTokens": 384 }
            } ] }"#,
        )
        .build();
    optimize(&mut system, "none");

    let alloc = system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .unwrap();
    assert_eq!(alloc.num_replicas(), 2);
    assert_eq!(alloc.rho(), 0.0);
    assert_eq!(alloc.wait_time(), 0.0);
}

#[test]
fn test_assigned_accelerators_exist_in_catalog() {
    let mut system = contended_fleet(12);
    optimize(&mut system, "priority-round-robin");

    for server in system.servers().values() {
        if let Some(alloc) = server.desired_allocation() {
            assert!(system.accelerator(alloc.accelerator()).is_some());
            assert!(system
                .model(server.model_name())
                .unwrap()
                .perf_data(alloc.accelerator())
                .is_some());
        }
    }
    assert_capacity_respected(&system);
}

#[test]
fn test_candidate_lists_sorted_and_nonempty() {
    let mut system = FleetBuilder::new().build();
    let tunables = Tunables::default();
    allocation_planner::enumerate_candidates(&mut system, &tunables).unwrap();

    let candidates = system.server("Premium-g13b").unwrap().all_allocations();
    assert!(!candidates.is_empty());
    for pair in candidates.windows(2) {
        assert!(pair[0].value() <= pair[1].value());
    }
}

// ── Scale after a load change ──────────────────────────────────

#[test]
fn test_scale_after_load_growth() {
    let mut system = FleetBuilder::new().build();
    optimize(&mut system, "none");

    let before = system
        .server("Premium-g13b")
        .unwrap()
        .desired_allocation()
        .unwrap()
        .clone();

    // 2.5x the arrival rate, 1.5x both token counts.
    let mut load = *system.server("Premium-g13b").unwrap().load().unwrap();
    load.arrival_rate *= 2.5;
    load.avg_in_tokens = (load.avg_in_tokens as f64 * 1.5) as u32;
    load.avg_out_tokens = (load.avg_out_tokens as f64 * 1.5) as u32;
    system.server_mut("Premium-g13b").unwrap().set_load(load);

    let tunables = Tunables::default();
    let evaluator = Evaluator::new(&system, &tunables);
    let (after, delta) = evaluator.scale(&before, "Premium-g13b").unwrap();
    let after = after.unwrap();

    assert_eq!(after.accelerator(), before.accelerator());
    assert!(after.num_replicas() >= before.num_replicas());
    assert_eq!(
        delta,
        after.num_replicas() as i64 - before.num_replicas() as i64,
    );

    // Reallocation may pick a different accelerator, but never a worse
    // value than staying put.
    let (best, _) = evaluator.reallocate("Premium-g13b").unwrap().unwrap();
    assert!(best.value() <= after.value());
}

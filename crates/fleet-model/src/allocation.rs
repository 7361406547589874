// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation records: the planner's unit of decision.
//!
//! An [`Allocation`] binds a server to an accelerator with a replica count
//! and batch cap, together with the queueing statistics that justified it.
//! Allocations are produced by the feasibility evaluator, ordered by
//! `value` during the greedy pass, and replaced — never patched in place —
//! on each solve.

use crate::spec::AllocationData;
use std::fmt;

/// A sized assignment of an accelerator to a server.
#[derive(Debug, Clone)]
pub struct Allocation {
    accelerator: String,
    num_replicas: usize,
    batch_size: usize,
    cost: f64,
    /// Sort key for candidate ordering; defaults to cost, lower is better.
    value: f64,
    /// Expected mean inter-token latency (ms/token).
    serv_time: f64,
    /// Expected mean queueing time (ms).
    wait_time: f64,
    /// Expected busy probability.
    rho: f64,
    /// Largest per-replica arrival rate meeting all SLOs (req/ms).
    max_arrv_rate_per_replica: f64,
}

impl Allocation {
    /// Creates an allocation with `value` initialized to `cost` and all
    /// queueing statistics zeroed.
    pub fn new(
        accelerator: impl Into<String>,
        num_replicas: usize,
        batch_size: usize,
        cost: f64,
    ) -> Self {
        Self {
            accelerator: accelerator.into(),
            num_replicas,
            batch_size,
            cost,
            value: cost,
            serv_time: 0.0,
            wait_time: 0.0,
            rho: 0.0,
            max_arrv_rate_per_replica: 0.0,
        }
    }

    /// Attaches queue statistics (per-token service time, wait, busy
    /// probability).
    pub fn with_queue_stats(mut self, serv_time: f64, wait_time: f64, rho: f64) -> Self {
        self.serv_time = serv_time;
        self.wait_time = wait_time;
        self.rho = rho;
        self
    }

    /// Attaches the per-replica rate ceiling.
    pub fn with_max_arrv_rate(mut self, rate: f64) -> Self {
        self.max_arrv_rate_per_replica = rate;
        self
    }

    pub fn accelerator(&self) -> &str {
        &self.accelerator
    }

    pub fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Overrides the ordering value (defaults to cost).
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn serv_time(&self) -> f64 {
        self.serv_time
    }

    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Largest per-replica arrival rate meeting all SLOs (req/ms).
    pub fn max_arrv_rate_per_replica(&self) -> f64 {
        self.max_arrv_rate_per_replica
    }

    /// The per-replica rate ceiling in requests/min.
    pub fn max_rpm(&self) -> f64 {
        self.max_arrv_rate_per_replica * 1000.0 * 60.0
    }

    /// Whether a total offered rate (requests/min) exceeds what the
    /// allocated replicas can absorb within their SLOs.
    pub fn saturated(&self, total_rate_rpm: f64) -> bool {
        total_rate_rpm > self.num_replicas as f64 * self.max_rpm()
    }

    /// Updates internal queue statistics after a re-solve.
    pub fn set_queue_stats(&mut self, serv_time: f64, wait_time: f64, rho: f64) {
        self.serv_time = serv_time;
        self.wait_time = wait_time;
        self.rho = rho;
    }

    /// Updates the per-replica rate ceiling after a re-solve.
    pub fn set_max_arrv_rate(&mut self, rate: f64) {
        self.max_arrv_rate_per_replica = rate;
    }

    /// Changes the replica count, scaling cost and value proportionally.
    /// Queue statistics are left untouched; callers that need them accurate
    /// re-solve via the evaluator.
    pub fn rescale_replicas(&mut self, num_replicas: usize) {
        if self.num_replicas == 0 {
            return;
        }
        let factor = num_replicas as f64 / self.num_replicas as f64;
        self.cost *= factor;
        self.value *= factor;
        self.num_replicas = num_replicas;
    }

    /// Penalty of transitioning from this allocation to `b`.
    ///
    /// On the same accelerator only the cost delta matters; switching
    /// accelerators adds a disruption term proportional to both costs.
    pub fn transition_penalty(&self, b: &Allocation, accel_penalty_factor: f64) -> f64 {
        if self.accelerator == b.accelerator {
            (b.cost - self.cost).abs()
        } else {
            accel_penalty_factor * (self.cost + b.cost) + (b.cost - self.cost)
        }
    }

    /// Converts to the wire form. The caller supplies the reported
    /// time-to-first-token (queueing wait plus prefill) and the load the
    /// allocation was sized for.
    pub fn to_data(
        &self,
        ttft_average: f64,
        load: Option<crate::spec::ServerLoadSpec>,
    ) -> AllocationData {
        AllocationData {
            accelerator: self.accelerator.clone(),
            num_replicas: self.num_replicas,
            max_batch: self.batch_size,
            cost: self.cost,
            itl_average: self.serv_time,
            ttft_average,
            load,
        }
    }

    /// Restores an allocation from its wire form. Only the sizing fields
    /// are meaningful afterwards; queueing statistics are reporting-only
    /// on the wire and come back zeroed except for the inter-token
    /// latency.
    pub fn from_data(data: &AllocationData) -> Self {
        let mut alloc = Self::new(
            &data.accelerator,
            data.num_replicas,
            data.max_batch,
            data.cost,
        );
        alloc.serv_time = data.itl_average;
        alloc
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{acc={}; num={}; maxBatch={}; cost={}; val={}; servTime={}; waitTime={}; rho={}; maxRPM={}}}",
            self.accelerator,
            self.num_replicas,
            self.batch_size,
            self.cost,
            self.value,
            self.serv_time,
            self.wait_time,
            self.rho,
            self.max_rpm(),
        )
    }
}

/// Orchestration difference between two allocations of one server.
#[derive(Debug, Clone)]
pub struct AllocationDiff {
    pub old_accelerator: String,
    pub new_accelerator: String,
    pub old_num_replicas: usize,
    pub new_num_replicas: usize,
    pub cost_diff: f64,
}

impl AllocationDiff {
    /// Diff between an old and a new allocation; `None` when both are
    /// absent. A missing side reads as "none" with zero replicas and cost.
    pub fn between(a: Option<&Allocation>, b: Option<&Allocation>) -> Option<Self> {
        if a.is_none() && b.is_none() {
            return None;
        }
        let (old_accelerator, old_num_replicas, old_cost) = match a {
            Some(a) => (a.accelerator.clone(), a.num_replicas, a.cost),
            None => ("none".to_string(), 0, 0.0),
        };
        let (new_accelerator, new_num_replicas, new_cost) = match b {
            Some(b) => (b.accelerator.clone(), b.num_replicas, b.cost),
            None => ("none".to_string(), 0, 0.0),
        };
        Some(Self {
            old_accelerator,
            new_accelerator,
            old_num_replicas,
            new_num_replicas,
            cost_diff: new_cost - old_cost,
        })
    }
}

impl fmt::Display for AllocationDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ {} -> {}, {} -> {}, {} }}",
            self.old_accelerator,
            self.new_accelerator,
            self.old_num_replicas,
            self.new_num_replicas,
            self.cost_diff,
        )
    }
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! State-dependent M/M/1 queue with finite system capacity.
//!
//! # Model
//!
//! A birth-death chain on states `0..=L`, where state `n` means `n`
//! requests are in the system. Arrivals occur at a constant rate `lambda`.
//! With `n` requests present, `min(n, N)` of them are in service (N = batch
//! capacity) and the aggregate completion rate is `serv_rate[min(n, N) - 1]`.
//! Requests arriving at state `L` are lost; the chain is truncated there.
//!
//! Steady-state probabilities follow the standard product form
//!
//! ```text
//! p(n) = p(0) * prod_{k=1..n} lambda / mu(k)
//! ```
//!
//! and the reported averages come from Little's law applied to the
//! accepted throughput `X = lambda * (1 - p(L))`:
//! mean service time = E[#in service] / X, mean wait = E[#queued] / X.

use crate::QueueError;

/// An M/M/1 queue whose service rate depends on the batch occupancy.
///
/// Construct once per (batch size, request length) combination, then call
/// [`solve`](Self::solve) repeatedly with different arrival rates; the
/// struct is a reusable scratchpad and each solve overwrites the previous
/// solution.
#[derive(Debug, Clone)]
pub struct StateDependentQueue {
    /// Maximum number of requests in the system (L).
    max_in_system: usize,
    /// Aggregate completion rate with `n` requests in service, at `n - 1`.
    serv_rate: Vec<f64>,

    // Solution state, overwritten by each call to `solve`.
    lambda: f64,
    rho: f64,
    avg_serv_time: f64,
    avg_wait_time: f64,
    valid: bool,
}

impl StateDependentQueue {
    /// Creates a queue with system capacity `max_in_system` and the given
    /// state-dependent service rates (`serv_rate[n - 1]` is the completion
    /// rate with `n` requests in service).
    ///
    /// Requires a non-empty, strictly positive and finite rate vector, and
    /// `max_in_system >= serv_rate.len()` so the batch can actually fill.
    pub fn new(max_in_system: usize, serv_rate: Vec<f64>) -> Result<Self, QueueError> {
        if serv_rate.is_empty() {
            return Err(QueueError::InvalidParameters(
                "service rate vector is empty".into(),
            ));
        }
        if serv_rate.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(QueueError::InvalidParameters(
                "service rates must be finite and positive".into(),
            ));
        }
        if max_in_system < serv_rate.len() {
            return Err(QueueError::InvalidParameters(format!(
                "system capacity {} is smaller than batch capacity {}",
                max_in_system,
                serv_rate.len(),
            )));
        }
        Ok(Self {
            max_in_system,
            serv_rate,
            lambda: 0.0,
            rho: 0.0,
            avg_serv_time: 0.0,
            avg_wait_time: 0.0,
            valid: false,
        })
    }

    /// Batch capacity N (number of service-rate states).
    pub fn max_batch(&self) -> usize {
        self.serv_rate.len()
    }

    /// System capacity L (requests in service plus queued).
    pub fn max_in_system(&self) -> usize {
        self.max_in_system
    }

    /// Arrival rate of the most recent solve (req/ms).
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Solves the steady state at arrival rate `lambda` (req/ms).
    ///
    /// Fails with [`QueueError::Diverged`] when the arrival rate saturates
    /// the fully-batched service rate or the normalization is not finite;
    /// [`is_valid`](Self::is_valid) reports `false` afterwards and the
    /// previous averages are cleared.
    pub fn solve(&mut self, lambda: f64) -> Result<(), QueueError> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(QueueError::InvalidParameters(format!(
                "arrival rate must be finite and positive, got {lambda}"
            )));
        }

        self.lambda = lambda;
        self.valid = false;
        self.rho = 0.0;
        self.avg_serv_time = 0.0;
        self.avg_wait_time = 0.0;

        // Past the truncation the chain drains at the fully-batched rate;
        // an arrival rate at or above it has no open steady state.
        let n_batch = self.serv_rate.len();
        if lambda >= self.serv_rate[n_batch - 1] {
            return Err(QueueError::Diverged { lambda });
        }

        // Unnormalized state weights via the product form.
        let len = self.max_in_system + 1;
        let mut weight = Vec::with_capacity(len);
        weight.push(1.0_f64);
        let mut norm = 1.0_f64;
        for n in 1..len {
            let in_service = n.min(n_batch);
            let mu = self.serv_rate[in_service - 1];
            let w = weight[n - 1] * lambda / mu;
            if !w.is_finite() {
                return Err(QueueError::Diverged { lambda });
            }
            norm += w;
            weight.push(w);
        }
        if !norm.is_finite() || norm <= 0.0 {
            return Err(QueueError::Diverged { lambda });
        }

        let p0 = 1.0 / norm;
        let p_full = weight[len - 1] / norm;

        // Accepted throughput; arrivals at state L are lost.
        let throughput = lambda * (1.0 - p_full);
        if throughput <= 0.0 {
            return Err(QueueError::Diverged { lambda });
        }

        let mut in_service_mean = 0.0;
        let mut queued_mean = 0.0;
        for (n, w) in weight.iter().enumerate() {
            let p = w / norm;
            let in_service = n.min(n_batch);
            in_service_mean += p * in_service as f64;
            queued_mean += p * (n - in_service) as f64;
        }

        self.rho = 1.0 - p0;
        self.avg_serv_time = in_service_mean / throughput;
        self.avg_wait_time = queued_mean / throughput;
        self.valid = true;
        Ok(())
    }

    /// Whether the most recent solve produced a usable steady state.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Busy probability, `1 - P(empty system)`.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Mean time a request spends in service (same unit as 1/rates).
    pub fn avg_serv_time(&self) -> f64 {
        self.avg_serv_time
    }

    /// Mean time a request spends queued before entering service.
    pub fn avg_wait_time(&self) -> f64 {
        self.avg_wait_time
    }
}

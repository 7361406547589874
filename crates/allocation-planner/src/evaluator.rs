// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-allocation feasibility evaluation.
//!
//! Given a (server, accelerator) pair, [`Evaluator::evaluate`] derives the
//! smallest replica count that satisfies the server's SLO targets and
//! returns it as an [`Allocation`], or `None` when the accelerator cannot
//! meet the targets at any admissible arrival rate.
//!
//! # Sizing procedure
//!
//! With mean request length `K` tokens and effective batch `N`, a replica
//! is a state-dependent M/M/1 queue whose completion rate at batch
//! occupancy `n` is `n / ((alpha + beta*n) * K)`. Three per-replica rate
//! ceilings are derived on `[lambda_min, lambda_max]`:
//!
//! - service ceiling: largest rate keeping mean service time within
//!   `K * ITL`,
//! - wait ceiling: largest rate keeping mean queueing wait within
//!   `TTFT / slo_margin`,
//! - throughput ceiling: `lambda_max` shaved by the stability safety
//!   fraction.
//!
//! The replica count is the total demand divided by the binding ceiling,
//! rounded up and floored at the server's replica minimum.

use crate::{PlanError, Tunables};
use fleet_model::spec::ServerLoadSpec;
use fleet_model::{Accelerator, Allocation, PerfData, Server, System, Target};
use queue_model::{max_rate_within, StateDependentQueue};
use tracing::debug;

/// Requests per minute to requests per millisecond.
const PER_MINUTE_TO_PER_MS: f64 = 1.0 / 60.0 / 1000.0;

/// Feasibility evaluator over one system snapshot.
pub struct Evaluator<'a> {
    pub(crate) system: &'a System,
    pub(crate) tunables: &'a Tunables,
}

impl<'a> Evaluator<'a> {
    pub fn new(system: &'a System, tunables: &'a Tunables) -> Self {
        Self { system, tunables }
    }

    /// Sizes an allocation of `acc_name` for `server_name`.
    ///
    /// Returns `Ok(None)` when a referenced entity is missing or the SLOs
    /// are unattainable on this accelerator; queueing failures surface as
    /// errors.
    pub fn evaluate(
        &self,
        server_name: &str,
        acc_name: &str,
    ) -> Result<Option<Allocation>, PlanError> {
        let Some((server, load, acc, perf, target)) = self.gather(server_name, acc_name) else {
            return Ok(None);
        };
        if load.arrival_rate < 0.0 {
            return Ok(None);
        }

        let units_per_replica = perf.acc_count * acc.multiplicity();

        if load.arrival_rate == 0.0 || load.avg_length() == 0 {
            return Ok(Some(zero_load_allocation(
                server,
                acc,
                perf,
                units_per_replica,
            )));
        }

        let k = load.avg_length() as f64;
        let batch = effective_batch(server, perf, load.avg_length());

        let serv_rate: Vec<f64> = (1..=batch)
            .map(|n| n as f64 / (perf.itl_at_batch(n) * k))
            .collect();
        let max_queue = batch * self.tunables.max_queue_to_batch_ratio;
        let mut queue = StateDependentQueue::new(max_queue, serv_rate.clone())?;

        let lambda_min = serv_rate[0] * self.tunables.delta_lower;
        let lambda_max = serv_rate[batch - 1] * (1.0 - self.tunables.delta_upper);

        let Some(lambda_star) =
            self.rate_ceiling(&mut queue, lambda_min, lambda_max, target, k)?
        else {
            debug!(
                server = server_name,
                accelerator = acc_name,
                "SLO targets unattainable, dropping candidate"
            );
            return Ok(None);
        };

        // Total demand in req/ms: throughput target when one is set,
        // otherwise the observed arrival rate.
        let total_lambda = if target.tps > 0.0 {
            target.tps / (1000.0 * k)
        } else {
            load.arrival_rate * PER_MINUTE_TO_PER_MS
        };

        let num_replicas = ((total_lambda / lambda_star).ceil() as usize)
            .max(server.min_num_replicas());

        let lambda = total_lambda / num_replicas as f64;
        queue.solve(lambda)?;

        let cost = acc.cost() * units_per_replica as f64 * num_replicas as f64;
        Ok(Some(
            Allocation::new(acc_name, num_replicas, batch, cost)
                .with_queue_stats(queue.avg_serv_time() / k, queue.avg_wait_time(), queue.rho())
                .with_max_arrv_rate(lambda_star),
        ))
    }

    /// Sizes an allocation using the closed-form G/G/m approximation
    /// instead of the state-dependent queue. Uses the load's arrival and
    /// service coefficients of variation.
    pub fn evaluate_ggm(
        &self,
        server_name: &str,
        acc_name: &str,
    ) -> Result<Option<Allocation>, PlanError> {
        let Some((server, load, acc, perf, target)) = self.gather(server_name, acc_name) else {
            return Ok(None);
        };

        let units_per_replica = perf.acc_count * acc.multiplicity();

        if load.arrival_rate == 0.0 || load.avg_length() == 0 {
            return Ok(Some(zero_load_allocation(
                server,
                acc,
                perf,
                units_per_replica,
            )));
        }

        let k = load.avg_length() as f64;
        let batch = effective_batch(server, perf, load.avg_length());
        let serv_time = perf.itl_at_batch(batch);
        if target.itl > 0.0 && serv_time > target.itl {
            return Ok(None);
        }

        // Squared-COV average of the Allen-Cunneen style correction.
        let variability = (load.arrival_cov * load.arrival_cov
            + load.service_cov * load.service_cov)
            / 2.0;

        let mut num_replicas = 0usize;
        if target.itl > 0.0 && target.ttft > 0.0 {
            let wait_limit = target.ttft / self.tunables.slo_margin;
            let x_star = batch as f64 * wait_limit / (k * serv_time * variability);
            let rho_star = if x_star.is_finite() {
                x_star / (1.0 + x_star)
            } else {
                1.0
            };
            let lambda_star = rho_star / (k * serv_time);
            num_replicas = (load.arrival_rate / (lambda_star / PER_MINUTE_TO_PER_MS)).ceil() as usize;
        }
        if target.tps > 0.0 {
            let lambda_max = batch as f64 / (serv_time * k);
            let lambda_star = lambda_max * (1.0 - self.tunables.stability_safety_fraction);
            let throughput_demand = target.tps / (1000.0 * k);
            num_replicas = num_replicas.max((throughput_demand / lambda_star).ceil() as usize);
        }
        if num_replicas == 0 {
            return Ok(None);
        }
        num_replicas = num_replicas.max(server.min_num_replicas());

        let cost = acc.cost() * units_per_replica as f64 * num_replicas as f64;
        let rho =
            load.arrival_rate * k * serv_time * PER_MINUTE_TO_PER_MS / num_replicas as f64;
        let x = rho / (1.0 - rho);
        let wait = k * serv_time * variability * x / batch as f64;

        Ok(Some(
            Allocation::new(acc_name, num_replicas, batch, cost)
                .with_queue_stats(serv_time, wait, rho),
        ))
    }

    /// Re-sizes an existing allocation to `num_replicas` under the
    /// server's current load, refreshing queue statistics, scaling cost
    /// and value, and recomputing the per-replica rate ceiling.
    pub fn adjust_num_replicas(
        &self,
        alloc: &mut Allocation,
        num_replicas: usize,
        server_name: &str,
    ) -> Result<(), PlanError> {
        if alloc.num_replicas() < 1 || alloc.batch_size() < 1 || num_replicas < 1 {
            return Err(PlanError::InvalidAllocation {
                num_replicas: alloc.num_replicas().min(num_replicas),
                batch_size: alloc.batch_size(),
            });
        }

        let server = self
            .system
            .server(server_name)
            .ok_or_else(|| PlanError::missing("server", server_name))?;
        let load = server
            .load()
            .ok_or_else(|| PlanError::missing("load spec", server_name))?;
        let k = load.avg_length();
        if k == 0 {
            return Err(PlanError::missing("request length", server_name));
        }
        let perf = self
            .system
            .model(server.model_name())
            .and_then(|m| m.perf_data(alloc.accelerator()))
            .ok_or_else(|| PlanError::missing("performance data", server_name))?;
        let target = self
            .system
            .service_class(server.service_class_name())
            .and_then(|svc| svc.model_target(server.model_name()))
            .ok_or_else(|| PlanError::missing("SLO target", server_name))?;

        let kf = k as f64;
        let mut total_lambda = load.arrival_rate * PER_MINUTE_TO_PER_MS;
        if target.tps > 0.0 {
            total_lambda = target.tps / (1000.0 * kf);
        }

        let batch = alloc.batch_size();
        let serv_rate: Vec<f64> = (1..=batch)
            .map(|n| n as f64 / (perf.itl_at_batch(n) * kf))
            .collect();
        let max_queue = batch * self.tunables.max_queue_to_batch_ratio;
        let mut queue = StateDependentQueue::new(max_queue, serv_rate.clone())?;

        queue.solve(total_lambda / num_replicas as f64)?;
        alloc.set_queue_stats(queue.avg_serv_time() / kf, queue.avg_wait_time(), queue.rho());
        alloc.rescale_replicas(num_replicas);

        let lambda_min = serv_rate[0] * self.tunables.delta_lower;
        let lambda_max = serv_rate[batch - 1] * (1.0 - self.tunables.delta_upper);
        let lambda_star = self
            .rate_ceiling(&mut queue, lambda_min, lambda_max, target, kf)?
            // A now-unattainable bound leaves the most conservative rate.
            .unwrap_or(lambda_min);
        alloc.set_max_arrv_rate(lambda_star);
        Ok(())
    }

    /// The per-replica arrival-rate ceiling satisfying all set targets, or
    /// `None` when some target is unattainable anywhere in
    /// `[lambda_min, lambda_max]`.
    fn rate_ceiling(
        &self,
        queue: &mut StateDependentQueue,
        lambda_min: f64,
        lambda_max: f64,
        target: &Target,
        k: f64,
    ) -> Result<Option<f64>, PlanError> {
        let mut lambda_star = lambda_max;

        if target.itl > 0.0 {
            // Token time is bounded per token; a request holds the server
            // for K of them.
            let serv_time_limit = k * target.itl;
            match max_rate_within(lambda_min, lambda_max, serv_time_limit, |x| {
                queue.solve(x)?;
                Ok(queue.avg_serv_time())
            })? {
                Some(rate) => lambda_star = lambda_star.min(rate),
                None => return Ok(None),
            }
        }

        if target.ttft > 0.0 {
            let wait_time_limit = target.ttft / self.tunables.slo_margin;
            match max_rate_within(lambda_min, lambda_max, wait_time_limit, |x| {
                queue.solve(x)?;
                Ok(queue.avg_wait_time())
            })? {
                Some(rate) => lambda_star = lambda_star.min(rate),
                None => return Ok(None),
            }
        }

        if target.tps > 0.0 {
            lambda_star =
                lambda_star.min(lambda_max * (1.0 - self.tunables.stability_safety_fraction));
        }

        Ok(Some(lambda_star))
    }

    /// Resolves every entity the evaluation needs; `None` if any is
    /// missing.
    fn gather(
        &self,
        server_name: &str,
        acc_name: &str,
    ) -> Option<(&'a Server, &'a ServerLoadSpec, &'a Accelerator, &'a PerfData, &'a Target)> {
        let acc = self.system.accelerator(acc_name)?;
        let server = self.system.server(server_name)?;
        let load = server.load()?;
        let perf = self.system.model(server.model_name())?.perf_data(acc_name)?;
        let target = self
            .system
            .service_class(server.service_class_name())?
            .model_target(server.model_name())?;
        Some((server, load, acc, perf, target))
    }
}

/// Effective batch size for a request length of `avg_length` tokens.
///
/// The configured maximum was measured at `at_tokens`; KV-cache footprint
/// scales with tokens, so the admissible batch shrinks proportionally.
fn effective_batch(server: &Server, perf: &PerfData, avg_length: u32) -> usize {
    if server.max_batch_size() > 0 {
        server.max_batch_size()
    } else {
        let scaled =
            perf.max_batch_size as u64 * perf.at_tokens as u64 / avg_length as u64;
        (scaled as usize).max(1)
    }
}

/// Allocation for a server with no offered load: the replica floor on an
/// idle queue.
fn zero_load_allocation(
    server: &Server,
    acc: &Accelerator,
    perf: &PerfData,
    units_per_replica: usize,
) -> Allocation {
    let batch = if server.max_batch_size() > 0 {
        server.max_batch_size()
    } else {
        perf.max_batch_size
    };
    let num_replicas = server.min_num_replicas();
    let cost = acc.cost() * units_per_replica as f64 * num_replicas as f64;
    let serv_time = perf.itl_at_batch(1);
    let max_arrv_rate = batch as f64 / perf.itl_at_batch(batch);
    Allocation::new(acc.name(), num_replicas, batch, cost)
        .with_queue_stats(serv_time, 0.0, 0.0)
        .with_max_arrv_rate(max_arrv_rate)
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON wire documents consumed and produced by the planner.
//!
//! Five input documents describe the fleet (accelerators, capacities,
//! models, service classes, servers), a sixth selects optimizer behaviour,
//! and `SystemData` bundles all of them into one snapshot. Field names on
//! the wire are camelCase; see README.md for full examples.
//!
//! # Format
//! ```json
//! {
//!   "spec": [
//!     { "name": "A100", "type": "A100", "multiplicity": 1, "cost": 40.0 }
//!   ]
//! }
//! ```

use crate::FleetError;
use std::path::Path;

/// Reads any spec document from a JSON file.
pub fn document_from_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, FleetError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parses any spec document from a JSON string.
pub fn document_from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, FleetError> {
    Ok(serde_json::from_str(json)?)
}

// ── Accelerators ───────────────────────────────────────────────

/// Catalog of accelerator definitions.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AcceleratorData {
    #[serde(default)]
    pub spec: Vec<AcceleratorSpec>,
}

/// A single accelerator definition.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorSpec {
    /// Accelerator name (e.g., `"A100"`, `"MI300X"`).
    pub name: String,
    /// Capacity group: accelerators of the same type draw from one pool.
    #[serde(rename = "type")]
    pub kind: String,
    /// Units of the type consumed per accelerator (>= 1).
    #[serde(default = "default_one")]
    pub multiplicity: usize,
    /// Cost per unit and unit time.
    #[serde(default)]
    pub cost: f64,
    /// Optional power curve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerSpec>,
}

/// Piecewise-linear power curve of an accelerator.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSpec {
    /// Draw at zero utilization (watts).
    pub idle: f64,
    /// Draw at the mid-curve knee (watts), between idle and full.
    pub mid_power: f64,
    /// Draw at full utilization (watts).
    pub full: f64,
    /// Utilization of the knee, in (0, 1).
    pub mid_util: f64,
}

fn default_one() -> usize {
    1
}

impl AcceleratorData {
    /// Checks the accelerator invariants: multiplicity >= 1, cost >= 0,
    /// and a consistent power curve when present.
    pub fn validate(&self) -> Result<(), FleetError> {
        for spec in &self.spec {
            if spec.multiplicity < 1 {
                return Err(FleetError::InvalidSpec(format!(
                    "accelerator '{}': multiplicity must be >= 1",
                    spec.name,
                )));
            }
            if spec.cost < 0.0 {
                return Err(FleetError::InvalidSpec(format!(
                    "accelerator '{}': cost must be >= 0",
                    spec.name,
                )));
            }
            if let Some(p) = &spec.power {
                let ordered = p.idle <= p.mid_power && p.mid_power <= p.full;
                let knee = p.mid_util > 0.0 && p.mid_util < 1.0;
                if !ordered || !knee {
                    return Err(FleetError::InvalidSpec(format!(
                        "accelerator '{}': malformed power curve",
                        spec.name,
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── Capacities ─────────────────────────────────────────────────

/// Available unit counts per accelerator type.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CapacityData {
    #[serde(default)]
    pub count: Vec<AcceleratorCount>,
}

/// Unit count for one accelerator type.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

// ── Models ─────────────────────────────────────────────────────

/// Model catalog with per-accelerator performance data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub spec: Vec<ModelSpec>,
}

/// One model and its benchmarked accelerator profiles.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub name: String,
    #[serde(default)]
    pub data: Vec<ModelAcceleratorPerfData>,
}

/// Benchmarked performance of a (model, accelerator) pair.
///
/// Decode coefficients give the inter-token latency `alpha + beta * n` (ms)
/// at batch size `n`; prefill coefficients give the prompt-processing time
/// `gamma + delta * in_tokens` (ms). `max_batch_size` was measured at a
/// mean request length of `at_tokens` tokens.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAcceleratorPerfData {
    /// Model name (redundant on the wire, used by incremental updates).
    #[serde(default)]
    pub name: String,
    /// Accelerator name.
    pub acc: String,
    /// Accelerators per replica (>= 1).
    #[serde(default = "default_one")]
    pub acc_count: usize,
    /// Largest admissible batch size at `at_tokens` (>= 1).
    pub max_batch_size: usize,
    /// Token count at which `max_batch_size` was measured (>= 1).
    pub at_tokens: u32,
    /// Decode intercept (ms).
    pub alpha: f64,
    /// Decode slope (ms per batched request).
    pub beta: f64,
    /// Prefill intercept (ms).
    #[serde(default)]
    pub gamma: f64,
    /// Prefill slope (ms per input token).
    #[serde(default)]
    pub delta: f64,
}

impl ModelData {
    /// Checks the perf-data invariants: positive decode/prefill
    /// coefficients and sane batch parameters.
    pub fn validate(&self) -> Result<(), FleetError> {
        for model in &self.spec {
            for perf in &model.data {
                let bad = |what: &str| {
                    FleetError::InvalidSpec(format!(
                        "model '{}' on '{}': {what}",
                        model.name, perf.acc,
                    ))
                };
                if perf.acc_count < 1 {
                    return Err(bad("accCount must be >= 1"));
                }
                if perf.max_batch_size < 1 {
                    return Err(bad("maxBatchSize must be >= 1"));
                }
                if perf.at_tokens < 1 {
                    return Err(bad("atTokens must be >= 1"));
                }
                if perf.alpha <= 0.0 || perf.beta <= 0.0 {
                    return Err(bad("decode coefficients must be > 0"));
                }
                if perf.gamma < 0.0 || perf.delta < 0.0 {
                    return Err(bad("prefill coefficients must be >= 0"));
                }
            }
        }
        Ok(())
    }
}

// ── Service classes ────────────────────────────────────────────

/// Service classes and their per-model SLO targets.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServiceClassData {
    #[serde(default)]
    pub spec: Vec<ServiceClassSpec>,
}

/// A service class: a priority plus SLO targets per model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClassSpec {
    pub name: String,
    /// Priority 1..=100, 1 highest. Defaults to 100 when omitted.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub model_targets: Vec<ModelTarget>,
}

/// SLO targets of a service class for one model. Zero = unconstrained.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTarget {
    pub model: String,
    /// Inter-token latency SLO (ms).
    #[serde(rename = "sloITL", default)]
    pub slo_itl: f64,
    /// Time-to-first-token SLO (ms), including queueing.
    #[serde(rename = "sloTTFT", default)]
    pub slo_ttft: f64,
    /// Throughput SLO (tokens/sec).
    #[serde(rename = "sloTPS", default)]
    pub slo_tps: f64,
}

fn default_priority() -> u8 {
    crate::DEFAULT_SERVICE_CLASS_PRIORITY
}

impl ServiceClassData {
    /// Checks priority bounds and non-negative targets.
    pub fn validate(&self) -> Result<(), FleetError> {
        for spec in &self.spec {
            if spec.priority < 1 || spec.priority > 100 {
                return Err(FleetError::InvalidSpec(format!(
                    "service class '{}': priority must be in 1..=100",
                    spec.name,
                )));
            }
            for t in &spec.model_targets {
                if t.slo_itl < 0.0 || t.slo_ttft < 0.0 || t.slo_tps < 0.0 {
                    return Err(FleetError::InvalidSpec(format!(
                        "service class '{}', model '{}': negative SLO target",
                        spec.name, t.model,
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── Servers ────────────────────────────────────────────────────

/// Inference server declarations.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServerData {
    #[serde(default)]
    pub spec: Vec<ServerSpec>,
}

/// One inference server: a model served for a service class under load.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub name: String,
    /// Service class name.
    pub class: String,
    /// Model name.
    pub model: String,
    /// Restrict candidates to the currently allocated accelerator.
    #[serde(default)]
    pub keep_accelerator: bool,
    /// Lower bound on replicas (>= 1).
    #[serde(default = "default_one")]
    pub min_num_replicas: usize,
    /// Batch-size override; 0 derives it from perf data.
    #[serde(default)]
    pub max_batch_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_alloc: Option<AllocationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_alloc: Option<AllocationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<ServerLoadSpec>,
}

/// Offered load on a server.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLoadSpec {
    /// Request arrival rate (requests/min).
    pub arrival_rate: f64,
    /// Mean prompt length (tokens).
    pub avg_in_tokens: u32,
    /// Mean generated length (tokens).
    pub avg_out_tokens: u32,
    /// Coefficient of variation of inter-arrival times (G/G/m model).
    #[serde(rename = "arrivalCOV", default)]
    pub arrival_cov: f64,
    /// Coefficient of variation of service times (G/G/m model).
    #[serde(rename = "serviceCOV", default)]
    pub service_cov: f64,
}

impl ServerLoadSpec {
    /// Mean total request length in tokens (prompt + generation).
    pub fn avg_length(&self) -> u32 {
        self.avg_in_tokens + self.avg_out_tokens
    }
}

impl ServerData {
    /// Checks server invariants: positive replica floor, non-negative load.
    pub fn validate(&self) -> Result<(), FleetError> {
        for spec in &self.spec {
            if spec.min_num_replicas < 1 {
                return Err(FleetError::InvalidSpec(format!(
                    "server '{}': minNumReplicas must be >= 1",
                    spec.name,
                )));
            }
            if let Some(load) = &spec.load {
                if load.arrival_rate < 0.0 {
                    return Err(FleetError::InvalidSpec(format!(
                        "server '{}': negative arrival rate",
                        spec.name,
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── Optimizer ──────────────────────────────────────────────────

/// Wrapper document for [`OptimizerSpec`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OptimizerData {
    #[serde(default)]
    pub spec: OptimizerSpec,
}

/// Optimizer behaviour flags.
///
/// Only `unlimited` and `saturation_policy` steer this solver; the
/// remaining flags select external back-ends and are parsed for schema
/// compatibility.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerSpec {
    /// Ignore capacities; give every server its best candidate.
    #[serde(default)]
    pub unlimited: bool,
    #[serde(default)]
    pub heterogeneous: bool,
    #[serde(default)]
    pub milp_solver: bool,
    #[serde(default)]
    pub use_cplex: bool,
    #[serde(default)]
    pub delayed_best_effort: bool,
    /// Surplus distribution after the greedy pass: `"none"`,
    /// `"priority-exhaustive"`, `"priority-round-robin"`, `"round-robin"`.
    #[serde(default = "default_saturation_policy")]
    pub saturation_policy: String,
}

fn default_saturation_policy() -> String {
    "none".to_string()
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self {
            unlimited: false,
            heterogeneous: false,
            milp_solver: false,
            use_cplex: false,
            delayed_best_effort: false,
            saturation_policy: default_saturation_policy(),
        }
    }
}

// ── System snapshot and solution ───────────────────────────────

/// A combined snapshot of all input documents.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    pub spec: SystemSpec,
}

/// Payload of [`SystemData`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSpec {
    #[serde(default)]
    pub accelerators: AcceleratorData,
    #[serde(default)]
    pub capacity: CapacityData,
    #[serde(default)]
    pub models: ModelData,
    #[serde(default)]
    pub service_classes: ServiceClassData,
    #[serde(default)]
    pub servers: ServerData,
    #[serde(default)]
    pub optimizer: OptimizerData,
}

/// Solved allocation for one server, as reported to callers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationData {
    pub accelerator: String,
    pub num_replicas: usize,
    pub max_batch: usize,
    pub cost: f64,
    /// Expected mean inter-token latency (ms/token).
    #[serde(rename = "itlAverage")]
    pub itl_average: f64,
    /// Expected mean time to first token (prefill + queueing, ms).
    #[serde(rename = "ttftAverage")]
    pub ttft_average: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<ServerLoadSpec>,
}

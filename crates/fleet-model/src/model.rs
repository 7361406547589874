// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Models and their benchmarked per-accelerator performance.

use crate::spec::{ModelAcceleratorPerfData, ModelSpec};
use std::collections::BTreeMap;

/// Performance profile of a model on one accelerator.
#[derive(Debug, Clone)]
pub struct PerfData {
    /// Accelerators per replica.
    pub acc_count: usize,
    /// Largest admissible batch at `at_tokens`.
    pub max_batch_size: usize,
    /// Mean request length at which `max_batch_size` was measured.
    pub at_tokens: u32,
    /// Decode intercept (ms).
    pub alpha: f64,
    /// Decode slope (ms per batched request).
    pub beta: f64,
    /// Prefill intercept (ms).
    pub gamma: f64,
    /// Prefill slope (ms per input token).
    pub delta: f64,
}

impl PerfData {
    pub fn from_spec(spec: &ModelAcceleratorPerfData) -> Self {
        Self {
            acc_count: spec.acc_count.max(1),
            max_batch_size: spec.max_batch_size.max(1),
            at_tokens: spec.at_tokens.max(1),
            alpha: spec.alpha,
            beta: spec.beta,
            gamma: spec.gamma,
            delta: spec.delta,
        }
    }

    /// Inter-token latency at batch size `n` (ms).
    pub fn itl_at_batch(&self, n: usize) -> f64 {
        self.alpha + self.beta * n as f64
    }

    /// Prompt-processing time for `in_tokens` input tokens (ms).
    pub fn prefill_time(&self, in_tokens: u32) -> f64 {
        self.gamma + self.delta * in_tokens as f64
    }
}

/// A model and the accelerators it has been benchmarked on.
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    perf: BTreeMap<String, PerfData>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            perf: BTreeMap::new(),
        }
    }

    pub fn from_spec(spec: &ModelSpec) -> Self {
        let mut model = Self::new(&spec.name);
        for perf in &spec.data {
            model.add_perf_data(&perf.acc, PerfData::from_spec(perf));
        }
        model
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performance data on the named accelerator, if benchmarked.
    pub fn perf_data(&self, acc_name: &str) -> Option<&PerfData> {
        self.perf.get(acc_name)
    }

    pub fn add_perf_data(&mut self, acc_name: impl Into<String>, perf: PerfData) {
        self.perf.insert(acc_name.into(), perf);
    }

    pub fn remove_perf_data(&mut self, acc_name: &str) -> Option<PerfData> {
        self.perf.remove(acc_name)
    }

    /// Accelerator names this model has profiles for, in name order.
    pub fn accelerator_names(&self) -> impl Iterator<Item = &str> {
        self.perf.keys().map(String::as_str)
    }
}

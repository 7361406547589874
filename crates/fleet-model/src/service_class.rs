// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Service classes: request priorities and per-model SLO targets.

use crate::spec::{ModelTarget, ServiceClassSpec};
use std::collections::BTreeMap;

/// SLO targets for one (service class, model) pair. Zero = unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    /// Inter-token latency bound (ms).
    pub itl: f64,
    /// Time-to-first-token bound (ms), including queueing.
    pub ttft: f64,
    /// Throughput floor (tokens/sec).
    pub tps: f64,
}

impl Target {
    /// True when no target constrains sizing.
    pub fn is_unconstrained(&self) -> bool {
        self.itl <= 0.0 && self.ttft <= 0.0 && self.tps <= 0.0
    }
}

/// A service class groups servers under one priority and one SLO table.
#[derive(Debug, Clone)]
pub struct ServiceClass {
    name: String,
    /// 1..=100, 1 highest.
    priority: u8,
    targets: BTreeMap<String, Target>,
}

impl ServiceClass {
    pub fn new(name: impl Into<String>, priority: u8) -> Self {
        Self {
            name: name.into(),
            priority,
            targets: BTreeMap::new(),
        }
    }

    pub fn from_spec(spec: &ServiceClassSpec) -> Self {
        let mut svc = Self::new(&spec.name, spec.priority);
        for t in &spec.model_targets {
            svc.set_model_target(
                &t.model,
                Target {
                    itl: t.slo_itl,
                    ttft: t.slo_ttft,
                    tps: t.slo_tps,
                },
            );
        }
        svc
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Target for the named model, if declared.
    pub fn model_target(&self, model_name: &str) -> Option<&Target> {
        self.targets.get(model_name)
    }

    pub fn set_model_target(&mut self, model_name: impl Into<String>, target: Target) {
        self.targets.insert(model_name.into(), target);
    }

    pub fn remove_model_target(&mut self, model_name: &str) -> Option<Target> {
        self.targets.remove(model_name)
    }

    pub fn spec(&self) -> ServiceClassSpec {
        ServiceClassSpec {
            name: self.name.clone(),
            priority: self.priority,
            model_targets: self
                .targets
                .iter()
                .map(|(model, t)| ModelTarget {
                    model: model.clone(),
                    slo_itl: t.itl,
                    slo_ttft: t.ttft,
                    slo_tps: t.tps,
                })
                .collect(),
        }
    }
}

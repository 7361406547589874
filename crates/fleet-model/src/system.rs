// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The `System` registry: every entity the planner reasons about, keyed by
//! name.
//!
//! Entities reference each other by name (a server names its model and
//! service class, perf data names accelerators); the registry resolves
//! those references on demand instead of holding a pointer graph. All maps
//! are `BTreeMap` so every iteration — candidate enumeration, greedy
//! ordering, solution output — is deterministic.

use crate::accelerator::Accelerator;
use crate::allocation::Allocation;
use crate::model::Model;
use crate::server::Server;
use crate::service_class::ServiceClass;
use crate::spec::{
    AcceleratorCount, AcceleratorData, AllocationData, CapacityData, ModelAcceleratorPerfData,
    ModelData, OptimizerSpec, ServerData, ServiceClassData, SystemData,
};
use crate::{FleetError, DEFAULT_SERVICE_CLASS_PRIORITY};
use std::collections::BTreeMap;

/// Registry of accelerators, capacities, models, service classes, and
/// servers.
#[derive(Debug, Clone, Default)]
pub struct System {
    accelerators: BTreeMap<String, Accelerator>,
    capacities: BTreeMap<String, usize>,
    models: BTreeMap<String, Model>,
    service_classes: BTreeMap<String, ServiceClass>,
    servers: BTreeMap<String, Server>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates every registry from a combined snapshot and returns the
    /// embedded optimizer spec.
    pub fn from_snapshot(data: &SystemData) -> Result<(Self, OptimizerSpec), FleetError> {
        let mut system = Self::new();
        system.set_accelerators_from_spec(&data.spec.accelerators)?;
        system.set_capacities_from_spec(&data.spec.capacity);
        system.set_models_from_spec(&data.spec.models)?;
        system.set_service_classes_from_spec(&data.spec.service_classes)?;
        system.set_servers_from_spec(&data.spec.servers)?;
        Ok((system, data.spec.optimizer.spec.clone()))
    }

    // ── Accelerators ───────────────────────────────────────────

    /// Replaces the accelerator catalog.
    pub fn set_accelerators_from_spec(&mut self, data: &AcceleratorData) -> Result<(), FleetError> {
        data.validate()?;
        self.accelerators = data
            .spec
            .iter()
            .map(|s| (s.name.clone(), Accelerator::from_spec(s)))
            .collect();
        Ok(())
    }

    pub fn accelerator(&self, name: &str) -> Option<&Accelerator> {
        self.accelerators.get(name)
    }

    pub fn accelerators(&self) -> &BTreeMap<String, Accelerator> {
        &self.accelerators
    }

    pub fn add_accelerator(&mut self, acc: Accelerator) {
        self.accelerators.insert(acc.name().to_string(), acc);
    }

    pub fn remove_accelerator(&mut self, name: &str) -> Result<Accelerator, FleetError> {
        self.accelerators
            .remove(name)
            .ok_or_else(|| FleetError::not_found("accelerator", name))
    }

    // ── Capacities ─────────────────────────────────────────────

    /// Replaces the per-type capacity table.
    pub fn set_capacities_from_spec(&mut self, data: &CapacityData) {
        self.capacities = data
            .count
            .iter()
            .map(|c| (c.kind.clone(), c.count))
            .collect();
    }

    pub fn capacity(&self, kind: &str) -> Option<usize> {
        self.capacities.get(kind).copied()
    }

    pub fn capacities(&self) -> &BTreeMap<String, usize> {
        &self.capacities
    }

    pub fn set_capacity(&mut self, kind: impl Into<String>, count: usize) {
        self.capacities.insert(kind.into(), count);
    }

    pub fn remove_capacity(&mut self, kind: &str) -> Result<usize, FleetError> {
        self.capacities
            .remove(kind)
            .ok_or_else(|| FleetError::not_found("accelerator type", kind))
    }

    pub fn capacity_spec(&self) -> CapacityData {
        CapacityData {
            count: self
                .capacities
                .iter()
                .map(|(kind, count)| AcceleratorCount {
                    kind: kind.clone(),
                    count: *count,
                })
                .collect(),
        }
    }

    // ── Models ─────────────────────────────────────────────────

    /// Replaces the model catalog.
    pub fn set_models_from_spec(&mut self, data: &ModelData) -> Result<(), FleetError> {
        data.validate()?;
        self.models = data
            .spec
            .iter()
            .map(|s| (s.name.clone(), Model::from_spec(s)))
            .collect();
        Ok(())
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    pub fn models(&self) -> &BTreeMap<String, Model> {
        &self.models
    }

    pub fn add_model(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.models.insert(name.clone(), Model::new(name));
    }

    pub fn remove_model(&mut self, name: &str) -> Result<Model, FleetError> {
        self.models
            .remove(name)
            .ok_or_else(|| FleetError::not_found("model", name))
    }

    /// Adds or replaces one (model, accelerator) perf entry.
    pub fn add_model_perf(&mut self, perf: &ModelAcceleratorPerfData) -> Result<(), FleetError> {
        let model = self
            .models
            .get_mut(&perf.name)
            .ok_or_else(|| FleetError::not_found("model", &perf.name))?;
        model.add_perf_data(&perf.acc, crate::model::PerfData::from_spec(perf));
        Ok(())
    }

    /// Total accelerator units one replica consumes:
    /// `perf.acc_count * accelerator.multiplicity`.
    pub fn units_per_replica(&self, model_name: &str, acc_name: &str) -> Option<usize> {
        let perf = self.models.get(model_name)?.perf_data(acc_name)?;
        let acc = self.accelerators.get(acc_name)?;
        Some(perf.acc_count * acc.multiplicity())
    }

    // ── Service classes ────────────────────────────────────────

    /// Replaces the service-class table.
    pub fn set_service_classes_from_spec(
        &mut self,
        data: &ServiceClassData,
    ) -> Result<(), FleetError> {
        data.validate()?;
        self.service_classes = data
            .spec
            .iter()
            .map(|s| (s.name.clone(), ServiceClass::from_spec(s)))
            .collect();
        Ok(())
    }

    pub fn service_class(&self, name: &str) -> Option<&ServiceClass> {
        self.service_classes.get(name)
    }

    pub fn service_classes(&self) -> &BTreeMap<String, ServiceClass> {
        &self.service_classes
    }

    pub fn add_service_class(&mut self, name: impl Into<String>, priority: u8) {
        let name = name.into();
        self.service_classes
            .insert(name.clone(), ServiceClass::new(name, priority));
    }

    pub fn remove_service_class(&mut self, name: &str) -> Result<ServiceClass, FleetError> {
        self.service_classes
            .remove(name)
            .ok_or_else(|| FleetError::not_found("service class", name))
    }

    /// Priority of a server's service class; servers whose class is
    /// unknown get the default.
    pub fn server_priority(&self, server: &Server) -> u8 {
        self.service_classes
            .get(server.service_class_name())
            .map(|svc| svc.priority())
            .unwrap_or(DEFAULT_SERVICE_CLASS_PRIORITY)
    }

    // ── Servers ────────────────────────────────────────────────

    /// Replaces the server table.
    pub fn set_servers_from_spec(&mut self, data: &ServerData) -> Result<(), FleetError> {
        data.validate()?;
        self.servers = data
            .spec
            .iter()
            .map(|s| (s.name.clone(), Server::from_spec(s)))
            .collect();
        Ok(())
    }

    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.get(name)
    }

    pub fn server_mut(&mut self, name: &str) -> Option<&mut Server> {
        self.servers.get_mut(name)
    }

    pub fn servers(&self) -> &BTreeMap<String, Server> {
        &self.servers
    }

    pub fn servers_mut(&mut self) -> &mut BTreeMap<String, Server> {
        &mut self.servers
    }

    pub fn add_server(&mut self, server: Server) {
        self.servers.insert(server.name().to_string(), server);
    }

    pub fn remove_server(&mut self, name: &str) -> Result<Server, FleetError> {
        self.servers
            .remove(name)
            .ok_or_else(|| FleetError::not_found("server", name))
    }

    // ── Solution ───────────────────────────────────────────────

    /// Collects every server's desired allocation into the wire form.
    ///
    /// The reported time to first token is the expected queueing wait plus
    /// the model's prefill time at the server's mean prompt length.
    pub fn solution(&self) -> BTreeMap<String, AllocationData> {
        let mut out = BTreeMap::new();
        for (name, server) in &self.servers {
            let Some(alloc) = server.desired_allocation() else {
                continue;
            };
            let ttft_average = alloc.wait_time() + self.prefill_time_for(server, alloc);
            out.insert(
                name.clone(),
                alloc.to_data(ttft_average, server.load().copied()),
            );
        }
        out
    }

    fn prefill_time_for(&self, server: &Server, alloc: &Allocation) -> f64 {
        let Some(load) = server.load() else {
            return 0.0;
        };
        self.models
            .get(server.model_name())
            .and_then(|m| m.perf_data(alloc.accelerator()))
            .map(|perf| perf.prefill_time(load.avg_in_tokens))
            .unwrap_or(0.0)
    }

    /// Promotes every server's desired allocation to current.
    pub fn apply_allocations(&mut self) {
        for server in self.servers.values_mut() {
            server.apply_desired_allocation();
        }
    }
}

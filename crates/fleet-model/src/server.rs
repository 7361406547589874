// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference server declarations and their allocation slots.

use crate::allocation::Allocation;
use crate::spec::{ServerLoadSpec, ServerSpec};

/// An inference server: one model served for one service class.
///
/// Carries two allocation slots — `current` (what runs today) and
/// `desired` (what the last solve chose) — plus the sorted candidate list
/// the enumerator computed for it.
#[derive(Debug, Clone)]
pub struct Server {
    name: String,
    model_name: String,
    service_class_name: String,
    /// Restrict candidates to the currently allocated accelerator.
    keep_accelerator: bool,
    min_num_replicas: usize,
    /// Batch-size override; 0 derives the batch from perf data.
    max_batch_size: usize,
    load: Option<ServerLoadSpec>,
    current: Option<Allocation>,
    desired: Option<Allocation>,
    /// Feasible allocations sorted by (value, accelerator name).
    candidates: Vec<Allocation>,
}

impl Server {
    pub fn from_spec(spec: &ServerSpec) -> Self {
        Self {
            name: spec.name.clone(),
            model_name: spec.model.clone(),
            service_class_name: spec.class.clone(),
            keep_accelerator: spec.keep_accelerator,
            min_num_replicas: spec.min_num_replicas.max(1),
            max_batch_size: spec.max_batch_size,
            load: spec.load,
            current: spec.current_alloc.as_ref().map(Allocation::from_data),
            desired: spec.desired_alloc.as_ref().map(Allocation::from_data),
            candidates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn service_class_name(&self) -> &str {
        &self.service_class_name
    }

    pub fn keep_accelerator(&self) -> bool {
        self.keep_accelerator
    }

    pub fn min_num_replicas(&self) -> usize {
        self.min_num_replicas
    }

    /// Batch-size override; 0 means "derive from perf data".
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn load(&self) -> Option<&ServerLoadSpec> {
        self.load.as_ref()
    }

    pub fn set_load(&mut self, load: ServerLoadSpec) {
        self.load = Some(load);
    }

    /// The allocation currently in effect.
    pub fn allocation(&self) -> Option<&Allocation> {
        self.current.as_ref()
    }

    /// The allocation chosen by the most recent solve.
    pub fn desired_allocation(&self) -> Option<&Allocation> {
        self.desired.as_ref()
    }

    pub fn set_desired_allocation(&mut self, alloc: Allocation) {
        self.desired = Some(alloc);
    }

    pub fn clear_desired_allocation(&mut self) {
        self.desired = None;
    }

    /// Promotes the desired allocation to current.
    pub fn apply_desired_allocation(&mut self) {
        if let Some(desired) = &self.desired {
            self.current = Some(desired.clone());
        }
    }

    /// Sorted feasible candidates from the last enumeration.
    pub fn all_allocations(&self) -> &[Allocation] {
        &self.candidates
    }

    pub fn set_candidates(&mut self, candidates: Vec<Allocation>) {
        self.candidates = candidates;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server::from_spec(&ServerSpec {
            name: "Premium-g13b".into(),
            class: "Premium".into(),
            model: "granite_13b".into(),
            keep_accelerator: false,
            min_num_replicas: 0,
            max_batch_size: 0,
            current_alloc: None,
            desired_alloc: None,
            load: Some(ServerLoadSpec {
                arrival_rate: 60.0,
                avg_in_tokens: 128,
                avg_out_tokens: 384,
                arrival_cov: 0.0,
                service_cov: 0.0,
            }),
        })
    }

    #[test]
    fn test_min_replicas_floored_to_one() {
        assert_eq!(server().min_num_replicas(), 1);
    }

    #[test]
    fn test_allocation_slots() {
        let mut s = server();
        assert!(s.allocation().is_none());
        assert!(s.desired_allocation().is_none());

        s.set_desired_allocation(Allocation::new("A100", 1, 32, 40.0));
        assert!(s.allocation().is_none());

        s.apply_desired_allocation();
        assert_eq!(s.allocation().unwrap().accelerator(), "A100");

        s.clear_desired_allocation();
        assert!(s.desired_allocation().is_none());
        // Applying with no desired slot keeps the current allocation.
        s.apply_desired_allocation();
        assert!(s.allocation().is_some());
    }

    #[test]
    fn test_candidates() {
        let mut s = server();
        assert!(s.all_allocations().is_empty());
        s.set_candidates(vec![
            Allocation::new("G2", 2, 16, 30.0),
            Allocation::new("A100", 1, 32, 40.0),
        ]);
        assert_eq!(s.all_allocations().len(), 2);
    }
}

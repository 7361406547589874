// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # fleet-model
//!
//! Data model for the accelerator allocation planner: what exists (the
//! accelerator catalog and per-type capacities), what can run where (models
//! with benchmarked perf data), what the business wants (service classes
//! with SLO targets), and who asks for capacity (servers with offered
//! load).
//!
//! Everything lives in a [`System`] registry keyed by name; cross-entity
//! references are names resolved on demand, not pointers, and every map is
//! ordered so iteration is deterministic.
//!
//! The [`spec`] module holds the JSON wire documents this model is loaded
//! from and the [`AllocationData`](spec::AllocationData) solution records
//! it reports back.

pub mod spec;

mod accelerator;
mod allocation;
mod error;
mod model;
mod server;
mod service_class;
mod system;

pub use accelerator::{Accelerator, PowerProfile};
pub use allocation::{Allocation, AllocationDiff};
pub use error::FleetError;
pub use model::{Model, PerfData};
pub use server::Server;
pub use service_class::{ServiceClass, Target};
pub use system::System;

/// Priority assigned to service classes that do not declare one.
pub const DEFAULT_SERVICE_CLASS_PRIORITY: u8 = 100;

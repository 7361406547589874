// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CLI subcommand implementations and shared helpers.

pub mod inspect;
pub mod scale;
pub mod solve;

use fleet_model::spec::{
    document_from_file, AcceleratorData, CapacityData, ModelData, OptimizerData, OptimizerSpec,
    ServerData, ServiceClassData,
};
use fleet_model::System;
use std::path::Path;

/// Initializes tracing based on `-v` count. `RUST_LOG` wins when set.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the six data documents from a directory and builds the system.
///
/// Expected file names match the sample-data layout:
/// `accelerator-data.json`, `capacity-data.json`, `model-data.json`,
/// `serviceclass-data.json`, `server-data.json`, `optimizer-data.json`.
pub fn load_system(dir: &Path) -> anyhow::Result<(System, OptimizerSpec)> {
    let read = |name: &str| dir.join(name);

    let accelerators: AcceleratorData = document_from_file(&read("accelerator-data.json"))
        .map_err(|e| anyhow::anyhow!("accelerator-data.json: {e}"))?;
    let capacities: CapacityData = document_from_file(&read("capacity-data.json"))
        .map_err(|e| anyhow::anyhow!("capacity-data.json: {e}"))?;
    let models: ModelData = document_from_file(&read("model-data.json"))
        .map_err(|e| anyhow::anyhow!("model-data.json: {e}"))?;
    let service_classes: ServiceClassData = document_from_file(&read("serviceclass-data.json"))
        .map_err(|e| anyhow::anyhow!("serviceclass-data.json: {e}"))?;
    let servers: ServerData = document_from_file(&read("server-data.json"))
        .map_err(|e| anyhow::anyhow!("server-data.json: {e}"))?;
    let optimizer: OptimizerData = document_from_file(&read("optimizer-data.json"))
        .map_err(|e| anyhow::anyhow!("optimizer-data.json: {e}"))?;

    let mut system = System::new();
    system.set_accelerators_from_spec(&accelerators)?;
    system.set_capacities_from_spec(&capacities);
    system.set_models_from_spec(&models)?;
    system.set_service_classes_from_spec(&service_classes)?;
    system.set_servers_from_spec(&servers)?;
    Ok((system, optimizer.spec))
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

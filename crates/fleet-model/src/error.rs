// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the fleet data model.

/// Errors that can occur while loading or mutating the fleet model.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// A referenced entity does not exist in its registry.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A spec document violates a data-model invariant.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a document file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// Shorthand for a [`FleetError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the allocation planner.
//!
//! Most feasibility failures are not errors: a missing entity or an
//! unattainable SLO just removes the candidate (the evaluator returns
//! `Ok(None)`). Errors are reserved for conditions that should reach the
//! caller — corrupt allocation state, broken numerics, bad configuration.

use queue_model::QueueError;

/// Errors that can occur during allocation planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// An allocation with non-positive replicas or batch was re-sized.
    #[error("invalid allocation: numReplicas={num_replicas}, batchSize={batch_size}")]
    InvalidAllocation {
        num_replicas: usize,
        batch_size: usize,
    },

    /// Data required by an explicit re-size is absent.
    #[error("missing {what} for server '{server}'")]
    MissingData {
        what: &'static str,
        server: String,
    },

    /// The queueing analysis diverged or its search failed to converge.
    #[error("queueing analysis failed: {0}")]
    Queue(#[from] QueueError),

    /// The optimizer spec names a saturation policy this solver lacks.
    #[error(
        "unknown saturation policy '{0}'; expected 'none', 'priority-exhaustive', \
         'priority-round-robin', or 'round-robin'"
    )]
    UnknownPolicy(String),

    /// Tunables file or document could not be parsed or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlanError {
    pub(crate) fn missing(what: &'static str, server: impl Into<String>) -> Self {
        Self::MissingData {
            what,
            server: server.into(),
        }
    }
}

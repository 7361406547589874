// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for queueing analysis.

/// Errors that can occur while building or solving a queueing model.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Model construction or search was given inconsistent parameters.
    #[error("invalid queueing parameters: {0}")]
    InvalidParameters(String),

    /// The steady-state solution does not exist at the given arrival rate.
    #[error("queue solution diverged at arrival rate {lambda} req/ms")]
    Diverged { lambda: f64 },

    /// The rate search hit its iteration cap before reaching tolerance.
    #[error("rate search did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # queue-model
//!
//! Steady-state analysis of a batched inference replica, modelled as an
//! M/M/1 queue with state-dependent service rates and a finite system
//! capacity.
//!
//! A replica serving continuous-batched LLM requests completes work faster
//! when its batch is fuller: with `n` requests in the batch, each decode
//! step takes `alpha + beta * n` milliseconds and advances all `n` requests
//! by one token. This crate captures that behaviour as a birth-death chain
//! whose death rate depends on the number of requests in service, and
//! exposes the three quantities sizing decisions hinge on:
//!
//! - [`StateDependentQueue::rho`] — probability the replica is busy,
//! - [`StateDependentQueue::avg_serv_time`] — mean time a request spends in
//!   service,
//! - [`StateDependentQueue::avg_wait_time`] — mean time a request spends
//!   queued before service.
//!
//! [`max_rate_within`] inverts those curves: given a latency bound, it
//! binary-searches the largest arrival rate that still meets it.
//!
//! # Example
//! ```
//! use queue_model::{max_rate_within, StateDependentQueue};
//!
//! // Four batch slots, service rate grows with occupancy.
//! let rates = vec![0.10, 0.18, 0.24, 0.28];
//! let mut queue = StateDependentQueue::new(16, rates).unwrap();
//!
//! queue.solve(0.05).unwrap();
//! assert!(queue.is_valid());
//! assert!(queue.rho() > 0.0 && queue.rho() < 1.0);
//!
//! // Largest arrival rate keeping the mean wait under 20 ms.
//! let lambda = max_rate_within(0.001, 0.27, 20.0, |x| {
//!     queue.solve(x)?;
//!     Ok(queue.avg_wait_time())
//! })
//! .unwrap();
//! assert!(lambda.is_some());
//! ```

mod error;
mod mm1;
mod search;

pub use error::QueueError;
pub use mm1::StateDependentQueue;
pub use search::{max_rate_within, MAX_SEARCH_ITERATIONS, SEARCH_TOLERANCE_FRACTION};

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary search over a monotone rate-to-metric curve.
//!
//! The feasibility questions this workspace asks all have the same shape:
//! "what is the largest arrival rate at which some latency metric stays
//! under a bound?" Queue metrics grow monotonically with the arrival rate,
//! so plain bisection answers it.

use crate::QueueError;

/// Fraction of the search interval used as convergence tolerance.
pub const SEARCH_TOLERANCE_FRACTION: f64 = 1e-4;

/// Iteration cap for the bisection loop.
pub const MAX_SEARCH_ITERATIONS: usize = 40;

/// Finds the largest `x` in `[lo, hi]` with `eval(x) <= target`, assuming
/// `eval` is monotone non-decreasing.
///
/// Returns `Ok(None)` when even `eval(lo)` exceeds the target — the bound
/// is unattainable on this interval. Evaluator errors propagate.
///
/// The evaluator typically closes over a mutable
/// [`StateDependentQueue`](crate::StateDependentQueue); passing the model
/// through the closure keeps the search reentrant.
pub fn max_rate_within<F>(
    lo: f64,
    hi: f64,
    target: f64,
    mut eval: F,
) -> Result<Option<f64>, QueueError>
where
    F: FnMut(f64) -> Result<f64, QueueError>,
{
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(QueueError::InvalidParameters(format!(
            "bad search interval [{lo}, {hi}]"
        )));
    }

    if eval(lo)? > target {
        return Ok(None);
    }
    if eval(hi)? <= target {
        return Ok(Some(hi));
    }

    let tolerance = SEARCH_TOLERANCE_FRACTION * (hi - lo);
    let (mut lo, mut hi) = (lo, hi);
    for _ in 0..MAX_SEARCH_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if eval(mid)? <= target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= tolerance {
            return Ok(Some(lo));
        }
    }

    // 40 halvings shrink the interval far below the tolerance; reaching
    // here means the evaluator returned non-monotone or NaN values.
    Err(QueueError::DidNotConverge {
        iterations: MAX_SEARCH_ITERATIONS,
    })
}

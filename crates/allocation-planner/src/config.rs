// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Planner tunables, loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! max_queue_to_batch_ratio = 4
//! delta_lower = 0.001
//! delta_upper = 0.01
//! stability_safety_fraction = 0.1
//! slo_margin = 1.2
//! accel_penalty_factor = 0.1
//! ```

use crate::PlanError;
use std::path::Path;

/// Numerical knobs of the feasibility evaluator.
///
/// Read-only during a solve; the defaults are sized for
/// millisecond-latency LLM serving and rarely need changing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Queue capacity per replica, as a multiple of the batch size.
    pub max_queue_to_batch_ratio: usize,
    /// Fraction of the single-request service rate used as the search
    /// floor.
    pub delta_lower: f64,
    /// Fraction shaved off the full-batch service rate for the search
    /// ceiling.
    pub delta_upper: f64,
    /// Extra headroom below the ceiling when sizing purely for
    /// throughput.
    pub stability_safety_fraction: f64,
    /// Divisor applied to the TTFT budget before bounding queueing wait
    /// (>= 1).
    pub slo_margin: f64,
    /// Weight of the disruption term when an allocation changes
    /// accelerator.
    pub accel_penalty_factor: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_queue_to_batch_ratio: 4,
            delta_lower: 1e-3,
            delta_upper: 1e-2,
            stability_safety_fraction: 0.1,
            slo_margin: 1.2,
            accel_penalty_factor: 0.1,
        }
    }
}

impl Tunables {
    /// Loads tunables from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlanError::Config(format!("cannot read tunables '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses tunables from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PlanError> {
        let tunables: Self = toml::from_str(toml_str)
            .map_err(|e| PlanError::Config(format!("TOML parse error: {e}")))?;
        tunables.validate()?;
        Ok(tunables)
    }

    /// Serialises tunables to TOML.
    pub fn to_toml(&self) -> Result<String, PlanError> {
        toml::to_string_pretty(self)
            .map_err(|e| PlanError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks that every knob is in its meaningful range.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.max_queue_to_batch_ratio < 1 {
            return Err(PlanError::Config(
                "max_queue_to_batch_ratio must be >= 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.delta_lower) || self.delta_lower == 0.0 {
            return Err(PlanError::Config("delta_lower must be in (0, 1)".into()));
        }
        if !(0.0..1.0).contains(&self.delta_upper) || self.delta_upper == 0.0 {
            return Err(PlanError::Config("delta_upper must be in (0, 1)".into()));
        }
        if !(0.0..1.0).contains(&self.stability_safety_fraction) {
            return Err(PlanError::Config(
                "stability_safety_fraction must be in [0, 1)".into(),
            ));
        }
        if self.slo_margin < 1.0 {
            return Err(PlanError::Config("slo_margin must be >= 1".into()));
        }
        if self.accel_penalty_factor < 0.0 {
            return Err(PlanError::Config(
                "accel_penalty_factor must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Tunables::default();
        assert_eq!(t.max_queue_to_batch_ratio, 4);
        assert_eq!(t.delta_lower, 1e-3);
        assert_eq!(t.delta_upper, 1e-2);
        assert_eq!(t.slo_margin, 1.2);
        t.validate().unwrap();
    }

    #[test]
    fn test_from_toml_partial() {
        let t = Tunables::from_toml("slo_margin = 1.5").unwrap();
        assert_eq!(t.slo_margin, 1.5);
        // Unspecified knobs keep their defaults.
        assert_eq!(t.max_queue_to_batch_ratio, 4);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let t = Tunables::default();
        let toml = t.to_toml().unwrap();
        let back = Tunables::from_toml(&toml).unwrap();
        assert_eq!(back.slo_margin, t.slo_margin);
        assert_eq!(back.delta_upper, t.delta_upper);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        assert!(Tunables::from_toml("max_queue_to_batch_ratio = 0").is_err());
        assert!(Tunables::from_toml("delta_lower = 0.0").is_err());
        assert!(Tunables::from_toml("delta_upper = 1.5").is_err());
        assert!(Tunables::from_toml("stability_safety_fraction = 1.0").is_err());
        assert!(Tunables::from_toml("slo_margin = 0.9").is_err());
        assert!(Tunables::from_toml("accel_penalty_factor = -0.1").is_err());
    }

    #[test]
    fn test_from_toml_bad_syntax() {
        assert!(Tunables::from_toml("slo_margin = ").is_err());
    }
}

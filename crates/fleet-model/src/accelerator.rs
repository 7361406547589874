// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator catalog entries.

use crate::spec::{AcceleratorSpec, PowerSpec};

/// A GPU-class accelerator available to the planner.
#[derive(Debug, Clone)]
pub struct Accelerator {
    name: String,
    /// Capacity group; units are counted per type, not per accelerator.
    kind: String,
    multiplicity: usize,
    cost: f64,
    power: Option<PowerProfile>,
}

impl Accelerator {
    pub fn from_spec(spec: &AcceleratorSpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            multiplicity: spec.multiplicity.max(1),
            cost: spec.cost,
            power: spec.power.map(PowerProfile::from_spec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity group this accelerator draws units from.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Units of the type consumed per accelerator.
    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    /// Cost per unit per unit time.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn power(&self) -> Option<&PowerProfile> {
        self.power.as_ref()
    }

    pub fn spec(&self) -> AcceleratorSpec {
        AcceleratorSpec {
            name: self.name.clone(),
            kind: self.kind.clone(),
            multiplicity: self.multiplicity,
            cost: self.cost,
            power: self.power.as_ref().map(PowerProfile::spec),
        }
    }
}

/// Power curve through (0, idle), (mid_util, mid_power), (1, full).
#[derive(Debug, Clone, Copy)]
pub struct PowerProfile {
    idle: f64,
    mid_power: f64,
    full: f64,
    mid_util: f64,
}

impl PowerProfile {
    pub fn from_spec(spec: PowerSpec) -> Self {
        Self {
            idle: spec.idle,
            mid_power: spec.mid_power,
            full: spec.full,
            mid_util: spec.mid_util,
        }
    }

    pub fn spec(&self) -> PowerSpec {
        PowerSpec {
            idle: self.idle,
            mid_power: self.mid_power,
            full: self.full,
            mid_util: self.mid_util,
        }
    }

    /// Expected draw (watts) at utilization `util`, piecewise-linear
    /// between the three measured points. `util` is clamped to [0, 1].
    pub fn power_at(&self, util: f64) -> f64 {
        let util = util.clamp(0.0, 1.0);
        if util <= self.mid_util {
            self.idle + (self.mid_power - self.idle) * util / self.mid_util
        } else {
            self.mid_power
                + (self.full - self.mid_power) * (util - self.mid_util) / (1.0 - self.mid_util)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PowerProfile {
        PowerProfile::from_spec(PowerSpec {
            idle: 100.0,
            mid_power: 400.0,
            full: 700.0,
            mid_util: 0.5,
        })
    }

    #[test]
    fn test_power_at_endpoints() {
        let p = profile();
        assert_eq!(p.power_at(0.0), 100.0);
        assert_eq!(p.power_at(0.5), 400.0);
        assert_eq!(p.power_at(1.0), 700.0);
    }

    #[test]
    fn test_power_at_interpolates() {
        let p = profile();
        assert!((p.power_at(0.25) - 250.0).abs() < 1e-9);
        assert!((p.power_at(0.75) - 550.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_at_clamps() {
        let p = profile();
        assert_eq!(p.power_at(-0.3), 100.0);
        assert_eq!(p.power_at(1.7), 700.0);
    }

    #[test]
    fn test_from_spec_floors_multiplicity() {
        let acc = Accelerator::from_spec(&AcceleratorSpec {
            name: "X".into(),
            kind: "X".into(),
            multiplicity: 0,
            cost: 1.0,
            power: None,
        });
        assert_eq!(acc.multiplicity(), 1);
    }
}

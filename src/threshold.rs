// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Threshold evaluation
//!
//! A [`ThresholdSet`] holds one bound per watched channel. Evaluation is a
//! pure function of the reading and the set; a channel missing from the
//! reading is never a violation.

use crate::error::ConfigError;
use crate::protocol::{Channel, Reading, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of violated channels that raises an alert
pub const DEFAULT_MIN_VIOLATIONS: u32 = 3;

/// Acceptable region for a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// Violated when value > limit
    Above(f64),
    /// Violated when value < limit
    Below(f64),
    /// Violated outside `[low, high]` (inclusive)
    Band { low: f64, high: f64 },
}

impl Bound {
    /// Check a value against the bound
    pub fn is_violated(&self, value: f64) -> bool {
        match *self {
            Bound::Above(limit) => value > limit,
            Bound::Below(limit) => value < limit,
            Bound::Band { low, high } => value < low || value > high,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Above(limit) => write!(f, "> {}", limit),
            Bound::Below(limit) => write!(f, "< {}", limit),
            Bound::Band { low, high } => write!(f, "outside [{}, {}]", low, high),
        }
    }
}

/// Bound attached to a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelThreshold {
    /// Watched channel
    pub channel: Channel,
    /// Region outside which the channel violates
    pub bound: Bound,
}

/// Per-unit threshold configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// One bound per watched channel
    pub bounds: Vec<ChannelThreshold>,
    /// Violations needed to raise an alert
    pub min_violations: u32,
}

impl ThresholdSet {
    /// Create an empty set
    pub fn new(min_violations: u32) -> Self {
        Self {
            bounds: Vec::new(),
            min_violations,
        }
    }

    /// Add or replace the bound of a channel
    pub fn with(mut self, channel: Channel, bound: Bound) -> Self {
        self.bounds.retain(|t| t.channel != channel);
        self.bounds.push(ChannelThreshold { channel, bound });
        self
    }

    /// Drone water-quality limits
    pub fn drone() -> Self {
        Self::new(DEFAULT_MIN_VIOLATIONS)
            .with(Channel::Turbidity, Bound::Above(41.0))
            .with(Channel::Temperature, Bound::Above(32.0))
            .with(Channel::Conductivity, Bound::Above(12.0))
            .with(Channel::Ph, Bound::Band { low: 6.5, high: 7.5 })
            .with(Channel::DissolvedOxygen, Bound::Below(5.0))
    }

    /// Buoy water-quality and sea-state limits
    pub fn buoy() -> Self {
        Self::new(DEFAULT_MIN_VIOLATIONS)
            .with(Channel::Turbidity, Bound::Above(10.0))
            .with(Channel::Temperature, Bound::Above(30.0))
            .with(Channel::Conductivity, Bound::Above(10.0))
            .with(Channel::Ph, Bound::Band { low: 6.0, high: 8.5 })
            .with(Channel::Pressure, Bound::Above(2.0))
            .with(Channel::DissolvedOxygen, Bound::Below(4.0))
            .with(Channel::WaveHeight, Bound::Above(3.0))
            .with(Channel::CurrentSpeed, Bound::Above(2.0))
    }

    /// Preset for a unit
    pub fn for_unit(unit: Unit) -> Self {
        match unit {
            Unit::Drone => Self::drone(),
            Unit::Buoy => Self::buoy(),
        }
    }

    /// Bound of a channel, if watched
    pub fn bound(&self, channel: Channel) -> Option<Bound> {
        self.bounds
            .iter()
            .find(|t| t.channel == channel)
            .map(|t| t.bound)
    }

    /// Check the set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_violations == 0 {
            return Err(ConfigError::invalid("min_violations", "must be > 0"));
        }
        for (i, t) in self.bounds.iter().enumerate() {
            if self.bounds[..i].iter().any(|o| o.channel == t.channel) {
                return Err(ConfigError::invalid(
                    format!("thresholds.{}", t.channel),
                    "duplicate channel",
                ));
            }
            let finite = match t.bound {
                Bound::Above(x) | Bound::Below(x) => x.is_finite(),
                Bound::Band { low, high } => {
                    if low > high {
                        return Err(ConfigError::invalid(
                            format!("thresholds.{}", t.channel),
                            "band low > high",
                        ));
                    }
                    low.is_finite() && high.is_finite()
                }
            };
            if !finite {
                return Err(ConfigError::invalid(
                    format!("thresholds.{}", t.channel),
                    "limit must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Evaluate a reading
    pub fn evaluate(&self, reading: &Reading) -> Evaluation {
        evaluate(reading, self)
    }
}

/// Outcome for one watched channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    /// Value present and inside the bound
    Within,
    /// Value present and outside the bound
    Violated,
    /// No value in the reading
    Missing,
}

/// Per-channel verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelVerdict {
    /// Watched channel
    pub channel: Channel,
    /// Value seen, if any
    pub value: Option<f64>,
    /// Verdict
    pub status: VerdictStatus,
}

/// Result of evaluating one reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// Number of violated channels
    pub violations: u32,
    /// One verdict per watched channel, in set order
    pub verdicts: Vec<ChannelVerdict>,
}

impl Evaluation {
    /// Violated channels, in set order
    pub fn violated_channels(&self) -> Vec<Channel> {
        self.verdicts
            .iter()
            .filter(|v| v.status == VerdictStatus::Violated)
            .map(|v| v.channel)
            .collect()
    }
}

/// Evaluate a reading against a threshold set
pub fn evaluate(reading: &Reading, thresholds: &ThresholdSet) -> Evaluation {
    let mut evaluation = Evaluation::default();
    for t in &thresholds.bounds {
        let value = reading.get(t.channel);
        let status = match value {
            None => VerdictStatus::Missing,
            Some(v) if t.bound.is_violated(v) => VerdictStatus::Violated,
            Some(_) => VerdictStatus::Within,
        };
        if status == VerdictStatus::Violated {
            evaluation.violations += 1;
        }
        evaluation.verdicts.push(ChannelVerdict {
            channel: t.channel,
            value,
            status,
        });
    }
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChannelValues, Provenance};
    use chrono::Utc;

    fn drone_reading(values: ChannelValues) -> Reading {
        Reading::from_values(Unit::Drone, Utc::now(), Provenance::Real, &values)
    }

    #[test]
    fn test_bound_edges() {
        assert!(!Bound::Above(41.0).is_violated(41.0));
        assert!(Bound::Above(41.0).is_violated(41.01));
        assert!(!Bound::Below(5.0).is_violated(5.0));
        assert!(Bound::Below(5.0).is_violated(4.99));
        let band = Bound::Band { low: 6.5, high: 7.5 };
        assert!(!band.is_violated(6.5));
        assert!(!band.is_violated(7.5));
        assert!(band.is_violated(6.4));
        assert!(band.is_violated(7.6));
    }

    #[test]
    fn test_missing_values_never_violate() {
        let eval = evaluate(&drone_reading(ChannelValues::new()), &ThresholdSet::drone());
        assert_eq!(eval.violations, 0);
        assert_eq!(eval.verdicts.len(), 5);
        assert!(eval
            .verdicts
            .iter()
            .all(|v| v.status == VerdictStatus::Missing));
    }

    #[test]
    fn test_drone_violations() {
        let values = ChannelValues::new()
            .with(Channel::Temperature, 33.5)
            .with(Channel::Turbidity, 20.0)
            .with(Channel::Ph, 7.9);
        let eval = ThresholdSet::drone().evaluate(&drone_reading(values));
        assert_eq!(eval.violations, 2);
        assert_eq!(
            eval.violated_channels(),
            vec![Channel::Temperature, Channel::Ph]
        );
    }

    #[test]
    fn test_with_replaces_bound() {
        let set = ThresholdSet::drone().with(Channel::Temperature, Bound::Above(40.0));
        assert_eq!(set.bounds.len(), 5);
        assert_eq!(set.bound(Channel::Temperature), Some(Bound::Above(40.0)));
    }

    #[test]
    fn test_validate() {
        assert!(ThresholdSet::drone().validate().is_ok());
        assert!(ThresholdSet::buoy().validate().is_ok());
        let bad = ThresholdSet::new(3).with(Channel::Ph, Bound::Band { low: 8.0, high: 6.0 });
        assert!(bad.validate().is_err());
        assert!(ThresholdSet::new(0).validate().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let set = ThresholdSet::new(2).with(Channel::Ph, Bound::Band { low: 6.0, high: 8.5 });
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"PH\""));
        let back: ThresholdSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}

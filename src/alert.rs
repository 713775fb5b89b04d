// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Alert aggregation
//!
//! One alert is raised per reading whose violation count reaches the unit's
//! minimum. There is no deduplication across readings, and real and
//! simulated readings are treated alike.

use crate::protocol::{Channel, Reading, Unit};
use crate::threshold::{Evaluation, ThresholdSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An aggregate threshold alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unit that produced the reading
    pub unit: Unit,
    /// Timestamp of the reading
    pub timestamp: DateTime<Utc>,
    /// Number of violated channels
    pub violated_channels: u32,
    /// The violated channels
    pub channels: Vec<Channel>,
    /// Human readable summary
    pub summary: String,
}

/// Turns evaluations into alerts for one unit
#[derive(Debug, Clone)]
pub struct AlertAggregator {
    thresholds: ThresholdSet,
}

impl AlertAggregator {
    /// Create an aggregator
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// Threshold set in use
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Evaluate a reading and build an alert if enough channels violate
    pub fn process(&self, reading: &Reading) -> (Evaluation, Option<Alert>) {
        let evaluation = self.thresholds.evaluate(reading);
        let alert = self.aggregate(reading, &evaluation);
        (evaluation, alert)
    }

    /// Build an alert from an existing evaluation
    pub fn aggregate(&self, reading: &Reading, evaluation: &Evaluation) -> Option<Alert> {
        if evaluation.violations < self.thresholds.min_violations {
            return None;
        }
        let channels = evaluation.violated_channels();
        let names: Vec<&str> = channels.iter().map(|c| c.key()).collect();
        Some(Alert {
            unit: reading.unit,
            timestamp: reading.timestamp,
            violated_channels: evaluation.violations,
            summary: format!(
                "{}: {} sensors exceeded thresholds ({})",
                reading.unit,
                evaluation.violations,
                names.join(", ")
            ),
            channels,
        })
    }
}

// Seawatch Sim - Signal models
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Cyclic signal model with bounded noise.
//!
//! `value(t) = base + amplitude * sin(2*PI*hour(t)/cycle_hours + phase) + U(-noise, noise)`
//!
//! The result is clamped to `[base - amplitude, base + amplitude]`, optionally
//! to hard limits, and always to the channel's physical range. A non-finite
//! intermediate falls back to `base`.

use chrono::{DateTime, Timelike, Utc};
use rand::prelude::*;
use seawatch::Channel;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Solar day
pub const DIURNAL_CYCLE_HOURS: f64 = 24.0;

/// Principal lunar semi-diurnal tide
pub const TIDAL_CYCLE_HOURS: f64 = 12.4;

/// Signal model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalModel {
    /// Centre value.
    pub base: f64,
    /// Half-width of the cycle; also the clamp band.
    pub amplitude: f64,
    /// Half-width of the uniform noise.
    pub noise: f64,
    /// Cycle length in hours.
    #[serde(default = "default_cycle_hours")]
    pub cycle_hours: f64,
    /// Fixed phase in radians; drawn at random when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_offset: Option<f64>,
    /// Hard limits applied after the band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<(f64, f64)>,
}

fn default_cycle_hours() -> f64 {
    DIURNAL_CYCLE_HOURS
}

impl SignalModel {
    /// Create a diurnal model.
    pub fn new(base: f64, amplitude: f64, noise: f64) -> Self {
        Self {
            base,
            amplitude,
            noise,
            cycle_hours: DIURNAL_CYCLE_HOURS,
            phase_offset: None,
            limits: None,
        }
    }

    /// Create a tidal (12.4 h) model.
    pub fn tidal(base: f64, amplitude: f64, noise: f64) -> Self {
        Self::new(base, amplitude, noise).with_cycle_hours(TIDAL_CYCLE_HOURS)
    }

    /// Set the cycle length.
    pub fn with_cycle_hours(mut self, hours: f64) -> Self {
        self.cycle_hours = hours;
        self
    }

    /// Fix the phase offset.
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase_offset = Some(phase);
        self
    }

    /// Add hard limits.
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some((min, max));
        self
    }

    /// Band the model stays in without an anomaly.
    pub fn band(&self) -> (f64, f64) {
        let half = self.amplitude.abs();
        (self.base - half, self.base + half)
    }

    /// Check parameters; returns a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let finite = [self.base, self.amplitude, self.noise, self.cycle_hours]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err("parameters must be finite".to_string());
        }
        if self.noise < 0.0 {
            return Err("noise must be >= 0".to_string());
        }
        if self.cycle_hours <= 0.0 {
            return Err("cycle_hours must be > 0".to_string());
        }
        if let Some((min, max)) = self.limits {
            if !(min <= max) {
                return Err("limits min > max".to_string());
            }
        }
        Ok(())
    }
}

/// Fractional hour of day, including minutes and seconds.
pub fn hour_of_day(t: DateTime<Utc>) -> f64 {
    t.hour() as f64 + t.minute() as f64 / 60.0 + t.second() as f64 / 3600.0
}

/// A model bound to a channel, with its phase resolved.
#[derive(Debug, Clone)]
pub struct SignalState {
    channel: Channel,
    model: SignalModel,
    phase: f64,
}

impl SignalState {
    /// Resolve the phase (random in `[0, 2*PI)` unless fixed).
    pub fn new(channel: Channel, model: SignalModel, rng: &mut (impl Rng + ?Sized)) -> Self {
        let phase = model
            .phase_offset
            .unwrap_or_else(|| rng.gen_range(0.0..2.0 * PI));
        Self {
            channel,
            model,
            phase,
        }
    }

    /// Bind with an explicit phase, ignoring the model's own.
    pub fn with_phase(channel: Channel, model: SignalModel, phase: f64) -> Self {
        Self {
            channel,
            model,
            phase,
        }
    }

    /// Channel this signal feeds.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Resolved phase in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Underlying model.
    pub fn model(&self) -> &SignalModel {
        &self.model
    }

    /// Sample without anomaly.
    pub fn sample(&self, t: DateTime<Utc>, rng: &mut (impl Rng + ?Sized)) -> f64 {
        self.sample_shifted(t, rng, 0.0, 0.0)
    }

    /// Sample with an additive offset and a band widened by `widen`.
    pub fn sample_shifted(
        &self,
        t: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
        offset: f64,
        widen: f64,
    ) -> f64 {
        let m = &self.model;
        let angle = 2.0 * PI * hour_of_day(t) / m.cycle_hours + self.phase;
        let noise = if m.noise > 0.0 {
            rng.gen_range(-m.noise..=m.noise)
        } else {
            0.0
        };

        let mut value = m.base + m.amplitude * angle.sin() + noise + offset;
        if !value.is_finite() {
            value = m.base;
        }

        let (low, high) = self.model.band();
        let widen = widen.abs();
        value = value.clamp(low - widen, high + widen);

        if let Some((min, max)) = m.limits {
            value = value.clamp(min, max);
        }
        let value = self.channel.clamp(value);
        if value.is_finite() {
            value
        } else {
            self.channel.clamp(m.base)
        }
    }
}

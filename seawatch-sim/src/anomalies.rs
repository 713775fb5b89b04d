// Seawatch Sim - Anomaly injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Discrete anomaly events layered over the base signals.
//!
//! An injector is either idle or running one event. While idle, every tick
//! draws against the trigger probability; a hit starts an event with a
//! uniformly drawn duration and a profile picked from the configured list.
//! An event ends on the first tick where its elapsed time reaches its
//! duration.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use seawatch::clock::seconds_between;
use seawatch::Channel;
use serde::{Deserialize, Serialize};

/// Shape of an event's intensity over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    /// `4 * p * (1 - p)`: zero at both ends, 1.0 at mid-event.
    Parabolic,
    /// 1.0 for the whole event.
    Step,
}

impl Envelope {
    /// Intensity at progress `p` in `[0, 1]`.
    pub fn intensity(&self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Envelope::Parabolic => 4.0 * p * (1.0 - p),
            Envelope::Step => 1.0,
        }
    }
}

/// What an event does to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyEffect {
    /// Adds `amplitude * intensity`; the sign is drawn once per event when
    /// `random_sign` is set.
    Offset {
        channel: Channel,
        amplitude: f64,
        #[serde(default)]
        random_sign: bool,
    },
    /// Replaces the value with a fresh draw from `[low, high]` every tick.
    Override { channel: Channel, low: f64, high: f64 },
}

impl AnomalyEffect {
    /// Channel affected.
    pub fn channel(&self) -> Channel {
        match self {
            AnomalyEffect::Offset { channel, .. } | AnomalyEffect::Override { channel, .. } => {
                *channel
            }
        }
    }
}

/// A named set of effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyProfile {
    /// Name used in logs.
    pub name: String,
    /// Intensity shape.
    pub envelope: Envelope,
    /// Effects, at most one per channel.
    pub effects: Vec<AnomalyEffect>,
}

impl AnomalyProfile {
    /// Ballast water discharge near the drone.
    ///
    /// Warmer, more turbid and conductive water with depleted oxygen; pH is
    /// pushed one way or the other.
    pub fn ballast() -> Self {
        Self {
            name: "ballast".to_string(),
            envelope: Envelope::Parabolic,
            effects: vec![
                offset(Channel::Temperature, 4.0, false),
                offset(Channel::Turbidity, 20.0, false),
                offset(Channel::Conductivity, 6.0, false),
                offset(Channel::Ph, 0.8, true),
                offset(Channel::DissolvedOxygen, -2.0, false),
            ],
        }
    }

    /// Storm over the buoy: heavy sea, strong wind, low pressure, stirred sediment.
    pub fn storm() -> Self {
        Self {
            name: "storm".to_string(),
            envelope: Envelope::Step,
            effects: vec![
                over(Channel::WaveHeight, 2.0, 3.5),
                over(Channel::WindSpeed, 8.0, 15.0),
                over(Channel::CurrentSpeed, 1.0, 2.0),
                over(Channel::Pressure, 0.8, 1.2),
                over(Channel::Turbidity, 20.0, 40.0),
            ],
        }
    }

    /// Effect on a channel, if any.
    pub fn effect(&self, channel: Channel) -> Option<(usize, &AnomalyEffect)> {
        self.effects
            .iter()
            .enumerate()
            .find(|(_, e)| e.channel() == channel)
    }

    fn check(&self) -> Result<(), String> {
        for (i, e) in self.effects.iter().enumerate() {
            if self.effects[..i].iter().any(|o| o.channel() == e.channel()) {
                return Err(format!("{}: duplicate effect on {}", self.name, e.channel()));
            }
            match *e {
                AnomalyEffect::Offset { amplitude, .. } if !amplitude.is_finite() => {
                    return Err(format!("{}: amplitude must be finite", self.name));
                }
                AnomalyEffect::Override { low, high, .. }
                    if !(low.is_finite() && high.is_finite() && low <= high) =>
                {
                    return Err(format!("{}: override range is invalid", self.name));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn offset(channel: Channel, amplitude: f64, random_sign: bool) -> AnomalyEffect {
    AnomalyEffect::Offset {
        channel,
        amplitude,
        random_sign,
    }
}

fn over(channel: Channel, low: f64, high: f64) -> AnomalyEffect {
    AnomalyEffect::Override { channel, low, high }
}

/// Anomaly injection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Chance per idle tick of starting an event.
    pub trigger_probability: f64,
    /// Shortest event, seconds.
    pub min_duration_secs: f64,
    /// Longest event, seconds.
    pub max_duration_secs: f64,
    /// Profiles to pick from.
    pub profiles: Vec<AnomalyProfile>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl AnomalyConfig {
    /// No events.
    pub fn disabled() -> Self {
        Self {
            trigger_probability: 0.0,
            min_duration_secs: 30.0,
            max_duration_secs: 180.0,
            profiles: Vec::new(),
        }
    }

    /// Drone ballast events, 10% per tick, 30-180 s.
    pub fn ballast() -> Self {
        Self {
            trigger_probability: 0.1,
            profiles: vec![AnomalyProfile::ballast()],
            ..Self::disabled()
        }
    }

    /// Buoy storms, 0.5% per tick, 30-180 s.
    pub fn storm() -> Self {
        Self {
            trigger_probability: 0.005,
            profiles: vec![AnomalyProfile::storm()],
            ..Self::disabled()
        }
    }

    /// Set the trigger probability.
    pub fn with_probability(mut self, p: f64) -> Self {
        self.trigger_probability = p;
        self
    }

    /// Set the duration range in seconds.
    pub fn with_duration_range(mut self, min_secs: f64, max_secs: f64) -> Self {
        self.min_duration_secs = min_secs;
        self.max_duration_secs = max_secs;
        self
    }

    /// Check parameters; returns a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.trigger_probability) {
            return Err("trigger_probability must be within [0, 1]".to_string());
        }
        if !(self.min_duration_secs > 0.0 && self.min_duration_secs <= self.max_duration_secs) {
            return Err("duration range must satisfy 0 < min <= max".to_string());
        }
        if !self.max_duration_secs.is_finite() {
            return Err("max_duration_secs must be finite".to_string());
        }
        self.profiles.iter().try_for_each(AnomalyProfile::check)
    }
}

/// A running event.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAnomaly {
    profile: AnomalyProfile,
    started_at: DateTime<Utc>,
    duration_secs: f64,
    signs: Vec<f64>,
}

impl ActiveAnomaly {
    fn start(
        profile: AnomalyProfile,
        started_at: DateTime<Utc>,
        duration_secs: f64,
        rng: &mut (impl Rng + ?Sized),
    ) -> Self {
        let signs = profile
            .effects
            .iter()
            .map(|e| match e {
                AnomalyEffect::Offset {
                    random_sign: true, ..
                } => {
                    if rng.gen_bool(0.5) {
                        1.0
                    } else {
                        -1.0
                    }
                }
                _ => 1.0,
            })
            .collect();
        Self {
            profile,
            started_at,
            duration_secs,
            signs,
        }
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Profile.
    pub fn profile(&self) -> &AnomalyProfile {
        &self.profile
    }

    /// Start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Seconds since start.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.started_at, now).max(0.0)
    }

    /// Fraction of the event elapsed, in `[0, 1]`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        (self.elapsed_secs(now) / self.duration_secs).clamp(0.0, 1.0)
    }

    fn is_over(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_secs(now) >= self.duration_secs
    }
}

/// Injector state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnomalyState {
    /// No event.
    #[default]
    Idle,
    /// One event running.
    Active(ActiveAnomaly),
}

/// State change reported by [`AnomalyInjector::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyTransition {
    /// An event began.
    Started { name: String, duration_secs: f64 },
    /// An event finished.
    Ended { name: String },
}

/// How a channel is altered this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelEffect {
    /// Add `value`; the clamp band widens by `widen`.
    Offset { value: f64, widen: f64 },
    /// Use `value` as is.
    Override(f64),
}

/// Per-unit anomaly injector.
#[derive(Debug, Clone)]
pub struct AnomalyInjector {
    config: AnomalyConfig,
    state: AnomalyState,
}

impl AnomalyInjector {
    /// Create an idle injector.
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            state: AnomalyState::Idle,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> &AnomalyState {
        &self.state
    }

    /// Running event, if any.
    pub fn active(&self) -> Option<&ActiveAnomaly> {
        match &self.state {
            AnomalyState::Active(a) => Some(a),
            AnomalyState::Idle => None,
        }
    }

    /// True while an event runs.
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Advance one tick.
    pub fn advance(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
    ) -> Option<AnomalyTransition> {
        match &self.state {
            AnomalyState::Active(event) if event.is_over(now) => {
                let name = event.name().to_string();
                self.state = AnomalyState::Idle;
                Some(AnomalyTransition::Ended { name })
            }
            AnomalyState::Active(_) => None,
            AnomalyState::Idle => {
                if self.config.profiles.is_empty() || self.config.trigger_probability <= 0.0 {
                    return None;
                }
                if rng.gen::<f64>() >= self.config.trigger_probability {
                    return None;
                }
                let profile = self.config.profiles[rng.gen_range(0..self.config.profiles.len())].clone();
                let (min, max) = (self.config.min_duration_secs, self.config.max_duration_secs);
                let duration = if max > min { rng.gen_range(min..=max) } else { min };
                Some(self.begin(profile, duration, now, rng))
            }
        }
    }

    /// Start an event now, replacing any running one.
    pub fn force(
        &mut self,
        profile: AnomalyProfile,
        duration_secs: f64,
        now: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
    ) -> AnomalyTransition {
        self.begin(profile, duration_secs.max(0.0), now, rng)
    }

    /// End any running event.
    pub fn clear(&mut self) {
        self.state = AnomalyState::Idle;
    }

    fn begin(
        &mut self,
        profile: AnomalyProfile,
        duration_secs: f64,
        now: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
    ) -> AnomalyTransition {
        let event = ActiveAnomaly::start(profile, now, duration_secs, rng);
        let transition = AnomalyTransition::Started {
            name: event.name().to_string(),
            duration_secs,
        };
        self.state = AnomalyState::Active(event);
        transition
    }

    /// Effect on a channel at `now`, if an event touches it.
    pub fn effect(
        &self,
        channel: Channel,
        now: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
    ) -> Option<ChannelEffect> {
        let event = self.active()?;
        let (index, effect) = event.profile.effect(channel)?;
        match *effect {
            AnomalyEffect::Offset { amplitude, .. } => {
                let intensity = event.profile.envelope.intensity(event.progress(now));
                Some(ChannelEffect::Offset {
                    value: event.signs[index] * amplitude * intensity,
                    widen: amplitude.abs(),
                })
            }
            AnomalyEffect::Override { low, high, .. } => {
                let value = if high > low { rng.gen_range(low..=high) } else { low };
                Some(ChannelEffect::Override(value))
            }
        }
    }
}

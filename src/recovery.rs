// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reconnect scheduling
//!
//! A unit that keeps failing to connect is retried at a normal cadence until
//! the attempt counter reaches the cap, then at a slower fixed cadence. The
//! cap is a throttle, not a terminal state.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Throttle level derived from the attempt counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCadence {
    /// Below the cap
    Normal,
    /// At or above the cap
    Throttled,
}

/// Reconnect policy for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts before switching to the backoff interval
    pub max_attempts: u32,
    /// Delay after a failed attempt while below the cap
    pub retry_interval_ms: u64,
    /// Delay after a failed attempt once the cap is reached
    pub backoff_interval_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            retry_interval_ms: 5_000,
            backoff_interval_ms: 10_000,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, retry_interval: Duration, backoff_interval: Duration) -> Self {
        Self {
            max_attempts,
            retry_interval_ms: retry_interval.as_millis() as u64,
            backoff_interval_ms: backoff_interval.as_millis() as u64,
        }
    }

    /// Normal retry delay
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Throttled retry delay
    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval_ms)
    }

    /// Cadence for a given number of consecutive failed attempts
    pub fn cadence(&self, attempts: u32) -> RetryCadence {
        if attempts < self.max_attempts {
            RetryCadence::Normal
        } else {
            RetryCadence::Throttled
        }
    }

    /// Delay before the next attempt, given the failures so far
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        match self.cadence(attempts) {
            RetryCadence::Normal => self.retry_interval(),
            RetryCadence::Throttled => self.backoff_interval(),
        }
    }

    /// Check the policy values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be > 0"));
        }
        if self.retry_interval_ms == 0 || self.backoff_interval_ms == 0 {
            return Err(ConfigError::invalid("retry interval", "must be > 0"));
        }
        if self.backoff_interval_ms < self.retry_interval_ms {
            return Err(ConfigError::invalid(
                "backoff_interval_ms",
                "must not be shorter than retry_interval_ms",
            ));
        }
        Ok(())
    }
}

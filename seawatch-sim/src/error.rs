// Seawatch Sim - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for simulation configuration.

use seawatch::{Channel, ConfigError, Unit};
use thiserror::Error;

/// Invalid simulation configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A channel model has bad parameters.
    #[error("Invalid model for {channel}: {reason}")]
    InvalidChannel { channel: Channel, reason: String },

    /// A channel is not reported by the unit.
    #[error("{unit} does not report {channel}")]
    ForeignChannel { unit: Unit, channel: Channel },

    /// Two models for the same channel.
    #[error("Duplicate model for {0}")]
    DuplicateChannel(Channel),

    /// Anti-phase source has no model.
    #[error("{channel} is anti-phased to {source_channel}, which has no model")]
    MissingPhaseSource {
        channel: Channel,
        source_channel: Channel,
    },

    /// Anomaly settings are invalid.
    #[error("Invalid anomaly configuration: {0}")]
    InvalidAnomaly(String),

    /// Motion settings are invalid.
    #[error("Invalid motion configuration: {0}")]
    InvalidMotion(String),

    /// Power settings are invalid.
    #[error("Invalid power configuration: {0}")]
    InvalidPower(String),
}

/// Result type alias for simulation setup.
pub type Result<T> = std::result::Result<T, SimError>;

impl From<SimError> for ConfigError {
    fn from(e: SimError) -> Self {
        ConfigError::invalid("simulation", e.to_string())
    }
}

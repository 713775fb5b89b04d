// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the acquisition engine

use seawatch::ConfigError;
use seawatch_sim::SimError;
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Simulation could not be built
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    /// An acquisition task ended abnormally
    #[error("Acquisition task for {unit} failed: {reason}")]
    Task { unit: String, reason: String },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, GatewayError>;

// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Seawatch Gateway - Acquisition engine
//!
//! Runs one acquisition loop per unit on a tokio runtime. Each loop polls
//! its serial link, falls back to simulation whenever the link has nothing
//! to offer, publishes the reading, and raises threshold alerts.
//!
//! ## Features
//!
//! - **Never a gap**: every tick publishes a reading, real or simulated
//! - **Independent units**: blocking serial I/O runs off the async threads
//! - **Partial configuration**: JSON files override only what they name
//! - **Operator controls**: force-reconnect, counters, clean shutdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seawatch::Unit;
//! use seawatch_gateway::{Engine, EngineConfig};
//!
//! # async fn run() -> seawatch_gateway::Result<()> {
//! let config = EngineConfig::from_json_file("seawatch.json")?;
//! let handle = Engine::new(config).start()?;
//!
//! if let Some(snapshot) = handle.latest(Unit::Buoy) {
//!     println!("{} via {}", snapshot.reading.timestamp, snapshot.reading.provenance);
//! }
//! handle.force_reconnect(Unit::Drone);
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────── drone task ────────────┐  ┌──────────── buoy task ─────────────┐
//! │ interval 2 s                       │  │ interval 3 s                       │
//! │ LinkMachine ─poll─▶ Data? ──┐      │  │ LinkMachine ─poll─▶ Data? ──┐      │
//! │ UnitSimulation ─────────────┤      │  │ UnitSimulation ─────────────┤      │
//! │                             ▼      │  │                             ▼      │
//! │                    publish ─▶ sinks│  │                    publish ─▶ sinks│
//! └──────────────────────┬─────────────┘  └──────────────────────┬─────────────┘
//!                        └──────────▶ SnapshotStore ◀────────────┘
//! ```

pub mod acquisition;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;

pub use acquisition::{AcquisitionLoop, LoopContext};
pub use clock::TokioClock;
pub use config::{EngineConfig, UnitConfig};
pub use engine::{system_ports, Engine, EngineHandle, UnavailablePorts};
pub use error::{GatewayError, Result};
pub use stats::{StatsSnapshot, UnitStats};

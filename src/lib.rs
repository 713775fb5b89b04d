//! # Seawatch - Telemetry acquisition core
//!
//! Building blocks for acquiring water-quality telemetry from a mobile
//! drone and a moored buoy over unreliable serial links.
//!
//! ## Key Features
//!
//! - **Link state machine**: port discovery, connect, throttled reconnect
//! - **Tolerant codec**: `KEY:VALUE|...` lines, malformed fields dropped one by one
//! - **Thresholds and alerts**: per-unit bounds, aggregate alert on N violations
//! - **Snapshot store**: lock-light latest-value slots per unit
//!
//! ## Quick Start
//!
//! ```rust
//! use seawatch::{codec, AlertAggregator, Provenance, Reading, ThresholdSet, Unit};
//! use chrono::Utc;
//!
//! let partial = codec::decode("TEMP:33.5|TURB:45.0|EC:13.0|PH:6.2|DO:4.0");
//! let reading = Reading::from_values(Unit::Drone, Utc::now(), Provenance::Real, &partial);
//!
//! let aggregator = AlertAggregator::new(ThresholdSet::drone());
//! let (evaluation, alert) = aggregator.process(&reading);
//! assert_eq!(evaluation.violations, 5);
//! assert!(alert.is_some());
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Units, channels, readings
//! - [`codec`]: Wire line encoding and decoding
//! - [`channel`]: Serial link and port provider traits
//! - [`link`]: Per-unit link state machine
//! - [`recovery`]: Reconnect policy
//! - [`threshold`]: Threshold sets and evaluation
//! - [`alert`]: Alert aggregation
//! - [`snapshot`]: Latest snapshot store
//! - [`sink`]: Reading and alert sinks
//! - [`clock`]: Time sources

// Modules
pub mod alert;
pub mod channel;
pub mod clock;
pub mod codec;
pub mod error;
pub mod link;
pub mod protocol;
pub mod recovery;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sink;
pub mod snapshot;
pub mod threshold;

// Re-exports for convenient access
pub use alert::{Alert, AlertAggregator};
pub use channel::{LineBuffer, MemoryPorts, PortInfo, PortProvider, PortSettings, SerialLink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, LinkError, Result, SeawatchError};
pub use link::{LinkConfig, LinkMachine, LinkPoll, LinkState, LinkStatus, StatusBoard};
pub use protocol::{Channel, ChannelValues, PartialReading, Provenance, Reading, Unit};
pub use recovery::ReconnectPolicy;
#[cfg(feature = "serial")]
pub use serial::SystemPorts;
pub use sink::{AlertSink, MemorySink, NullSink, ReadingSink};
pub use snapshot::{Snapshot, SnapshotStore};
pub use threshold::{evaluate, Bound, Evaluation, ThresholdSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

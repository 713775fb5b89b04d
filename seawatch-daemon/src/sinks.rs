// Seawatch Daemon - Log sinks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sinks that write readings and alerts to the log.

use seawatch::{codec, Alert, AlertSink, Reading, ReadingSink};
use tracing::{debug, warn};

/// Logs every reading as a wire line and every alert as a warning
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReadingSink for LogSink {
    fn on_reading(&self, reading: &Reading) {
        debug!(
            target: "seawatch::readings",
            unit = %reading.unit,
            provenance = %reading.provenance,
            timestamp = %reading.timestamp.to_rfc3339(),
            line = %codec::encode(reading),
            "Reading"
        );
    }
}

impl AlertSink for LogSink {
    fn on_alert(&self, alert: &Alert) {
        let channels: Vec<&str> = alert.channels.iter().map(|c| c.key()).collect();
        warn!(
            target: "seawatch::alerts",
            unit = %alert.unit,
            violated = alert.violated_channels,
            channels = %channels.join(","),
            "{}",
            alert.summary
        );
    }
}

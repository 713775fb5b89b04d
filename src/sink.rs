//! Output seams for readings and alerts
//!
//! Sinks are called synchronously from the acquisition tick and must not
//! block for long.

use crate::alert::Alert;
use crate::protocol::Reading;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives every published reading
pub trait ReadingSink: Send + Sync {
    /// Called once per tick
    fn on_reading(&self, reading: &Reading);
}

/// Receives every raised alert
pub trait AlertSink: Send + Sync {
    /// Called once per alert
    fn on_alert(&self, alert: &Alert);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReadingSink for NullSink {
    fn on_reading(&self, _reading: &Reading) {}
}

impl AlertSink for NullSink {
    fn on_alert(&self, _alert: &Alert) {}
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    readings: Arc<Mutex<Vec<Reading>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Readings received so far
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().clone()
    }

    /// Alerts received so far
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

impl ReadingSink for MemorySink {
    fn on_reading(&self, reading: &Reading) {
        self.readings.lock().push(reading.clone());
    }
}

impl AlertSink for MemorySink {
    fn on_alert(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

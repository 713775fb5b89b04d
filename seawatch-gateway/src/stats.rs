// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-unit acquisition counters
//!
//! Written by the unit's loop, read from anywhere through the engine handle.

use seawatch::link::LinkCounters;
use seawatch::Provenance;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of one acquisition loop
#[derive(Debug, Default)]
pub struct UnitStats {
    ticks: AtomicU64,
    real_readings: AtomicU64,
    simulated_readings: AtomicU64,
    alerts: AtomicU64,
    link_failures: AtomicU64,
    dropped_fields: AtomicU64,
    discarded_partials: AtomicU64,
}

impl UnitStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a published reading
    pub fn record_reading(&self, provenance: Provenance) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        match provenance {
            Provenance::Real => self.real_readings.fetch_add(1, Ordering::Relaxed),
            Provenance::Simulated => self.simulated_readings.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Count a dispatched alert
    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    /// Mirror the link machine's counters
    pub fn record_link(&self, counters: &LinkCounters) {
        self.link_failures.store(
            counters.connect_failures + counters.io_errors,
            Ordering::Relaxed,
        );
        self.dropped_fields
            .store(counters.dropped_fields, Ordering::Relaxed);
        self.discarded_partials
            .store(counters.discarded_partials, Ordering::Relaxed);
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            real_readings: self.real_readings.load(Ordering::Relaxed),
            simulated_readings: self.simulated_readings.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            link_failures: self.link_failures.load(Ordering::Relaxed),
            dropped_fields: self.dropped_fields.load(Ordering::Relaxed),
            discarded_partials: self.discarded_partials.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`UnitStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Readings published
    pub ticks: u64,
    /// Readings from the serial link
    pub real_readings: u64,
    /// Readings from the simulation
    pub simulated_readings: u64,
    /// Alerts dispatched
    pub alerts: u64,
    /// Failed connects plus I/O errors
    pub link_failures: u64,
    /// Wire fields dropped while decoding
    pub dropped_fields: u64,
    /// Oversized partial lines discarded by the link
    pub discarded_partials: u64,
}

impl StatsSnapshot {
    /// Share of readings that came from the link, in [0, 1]
    pub fn real_ratio(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.real_readings as f64 / self.ticks as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let stats = UnitStats::new();
        stats.record_reading(Provenance::Real);
        stats.record_reading(Provenance::Simulated);
        stats.record_reading(Provenance::Simulated);
        stats.record_alert();
        stats.record_link(&LinkCounters {
            connect_failures: 2,
            io_errors: 1,
            dropped_fields: 4,
            discarded_partials: 1,
            ..Default::default()
        });

        let s = stats.snapshot();
        assert_eq!(s.ticks, 3);
        assert_eq!(s.real_readings, 1);
        assert_eq!(s.simulated_readings, 2);
        assert_eq!(s.alerts, 1);
        assert_eq!(s.link_failures, 3);
        assert_eq!(s.dropped_fields, 4);
        assert_eq!(s.discarded_partials, 1);
        assert!((s.real_ratio() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ratio() {
        assert_eq!(UnitStats::new().snapshot().real_ratio(), 0.0);
    }
}

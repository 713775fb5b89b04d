// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-unit acquisition loop
//!
//! Every tick the loop polls the unit's link. Decoded data is merged into
//! the last known values and published as a real reading; anything else
//! (no link, link idle, link failure) produces a simulated reading. The
//! reading is published to the snapshot store, handed to the reading sink
//! and evaluated for alerts, in that order.

use crate::stats::UnitStats;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use seawatch::link::LinkCounters;
use seawatch::{
    AlertAggregator, AlertSink, ChannelValues, Clock, LinkMachine, LinkPoll, LinkStatus,
    Provenance, Reading, ReadingSink, Snapshot, SnapshotStore, Unit,
};
use seawatch_sim::UnitSimulation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shared collaborators of the acquisition loops
#[derive(Clone)]
pub struct LoopContext {
    /// Latest snapshots
    pub store: Arc<SnapshotStore>,
    /// Receives every reading
    pub readings: Arc<dyn ReadingSink>,
    /// Receives every alert
    pub alerts: Arc<dyn AlertSink>,
    /// Timestamp source
    pub clock: Arc<dyn Clock>,
}

/// Acquisition loop of one unit
pub struct AcquisitionLoop {
    unit: Unit,
    tick_interval: Duration,
    simulate_only: bool,
    link: Arc<Mutex<LinkMachine>>,
    simulation: UnitSimulation,
    aggregator: AlertAggregator,
    context: LoopContext,
    stats: Arc<UnitStats>,
    last_values: ChannelValues,
    last_timestamp: Option<DateTime<Utc>>,
}

impl AcquisitionLoop {
    /// Assemble a loop
    pub fn new(
        link: Arc<Mutex<LinkMachine>>,
        simulation: UnitSimulation,
        aggregator: AlertAggregator,
        context: LoopContext,
        tick_interval: Duration,
    ) -> Self {
        let unit = simulation.unit();
        Self {
            unit,
            tick_interval,
            simulate_only: false,
            link,
            simulation,
            aggregator,
            context,
            stats: Arc::new(UnitStats::new()),
            last_values: ChannelValues::new(),
            last_timestamp: None,
        }
    }

    /// Skip the link entirely
    pub fn simulate_only(mut self, enabled: bool) -> Self {
        self.simulate_only = enabled;
        self
    }

    /// Use shared counters
    pub fn with_stats(mut self, stats: Arc<UnitStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Unit served
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Counters
    pub fn stats(&self) -> &Arc<UnitStats> {
        &self.stats
    }

    /// Simulation state
    pub fn simulation_mut(&mut self) -> &mut UnitSimulation {
        &mut self.simulation
    }

    /// Run one tick and return what was published
    pub async fn tick(&mut self) -> Arc<Snapshot> {
        let now = self.next_timestamp();
        let (poll, status, counters) = self.poll_link(now).await;
        self.stats.record_link(&counters);

        let reading = match poll {
            LinkPoll::Data(partial) => {
                let mut reading =
                    Reading::from_values(self.unit, now, Provenance::Real, &self.last_values);
                let applied = reading.merge(&partial);
                debug!(unit = %self.unit, channels = applied, "Merged link data");
                reading
            }
            LinkPoll::Idle | LinkPoll::Offline => {
                let values = self.simulation.tick(now);
                Reading::from_values(self.unit, now, Provenance::Simulated, &values)
            }
        };
        self.last_values = reading.values.clone();

        let snapshot = self.context.store.publish(reading, status);
        let reading = &snapshot.reading;
        self.stats.record_reading(reading.provenance);
        debug!(
            unit = %self.unit,
            provenance = %reading.provenance,
            link = %snapshot.link.state,
            "Published reading"
        );

        self.context.readings.on_reading(reading);

        let (evaluation, alert) = self.aggregator.process(reading);
        if let Some(alert) = alert {
            info!(
                unit = %self.unit,
                violations = evaluation.violations,
                summary = %alert.summary,
                "Threshold alert"
            );
            self.context.alerts.on_alert(&alert);
            self.stats.record_alert();
        }

        snapshot
    }

    /// Tick on the configured cadence until shutdown is signalled
    ///
    /// A tick that has started always completes before the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            unit = %self.unit,
            interval_ms = self.tick_interval.as_millis() as u64,
            simulate_only = self.simulate_only,
            "Acquisition loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(unit = %self.unit, "Acquisition loop stopped");
    }

    /// Wall time for this tick, bumped past the previous one if needed
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = self.context.clock.now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + ChronoDuration::milliseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    async fn poll_link(&self, now: DateTime<Utc>) -> (LinkPoll, LinkStatus, LinkCounters) {
        if self.simulate_only {
            let machine = self.link.lock();
            return (LinkPoll::Offline, machine.status().clone(), machine.counters());
        }

        let link = Arc::clone(&self.link);
        let polled = tokio::task::spawn_blocking(move || {
            let mut machine = link.lock();
            let poll = machine.poll(now);
            (poll, machine.status().clone(), machine.counters())
        })
        .await;

        match polled {
            Ok(result) => result,
            Err(e) => {
                warn!(unit = %self.unit, error = %e, "Link poll task failed");
                let machine = self.link.lock();
                (LinkPoll::Offline, machine.status().clone(), machine.counters())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use seawatch::{
        Channel, LinkConfig, LinkState, ManualClock, MemoryPorts, MemorySink, ThresholdSet,
    };
    use seawatch_sim::{AnomalyConfig, SimulationConfig};

    struct Harness {
        ports: MemoryPorts,
        clock: ManualClock,
        sink: MemorySink,
        store: Arc<SnapshotStore>,
        acquisition: AcquisitionLoop,
    }

    fn harness(unit: Unit, ports: MemoryPorts) -> Harness {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap());
        let sink = MemorySink::new();
        let store = Arc::new(SnapshotStore::new());
        let context = LoopContext {
            store: Arc::clone(&store),
            readings: Arc::new(sink.clone()),
            alerts: Arc::new(sink.clone()),
            clock: Arc::new(clock.clone()),
        };
        let machine = LinkMachine::new(unit, LinkConfig::for_unit(unit), Box::new(ports.clone()));
        let simulation = UnitSimulation::new(
            SimulationConfig::for_unit(unit)
                .with_seed(42)
                .with_anomaly(AnomalyConfig::disabled()),
        )
        .unwrap();
        let acquisition = AcquisitionLoop::new(
            Arc::new(Mutex::new(machine)),
            simulation,
            AlertAggregator::new(ThresholdSet::for_unit(unit)),
            context,
            Duration::from_secs(2),
        );
        Harness {
            ports,
            clock,
            sink,
            store,
            acquisition,
        }
    }

    #[tokio::test]
    async fn test_real_reading_from_link() {
        let ports = MemoryPorts::new().with_port("COM3", Some("Arduino Uno"));
        let mut h = harness(Unit::Drone, ports);

        // First tick connects and flushes stale input
        let first = h.acquisition.tick().await;
        assert_eq!(first.link.state, LinkState::Connected);
        assert_eq!(first.reading.provenance, Provenance::Simulated);

        h.ports.push_line("TEMP:25.0|TURB:12.0");
        h.clock.advance(Duration::from_secs(2));
        let second = h.acquisition.tick().await;
        assert_eq!(second.reading.provenance, Provenance::Real);
        assert_eq!(second.reading.get(Channel::Temperature), Some(25.0));
        // Channels not on the line keep their last known value
        assert_eq!(
            second.reading.get(Channel::Battery),
            first.reading.get(Channel::Battery)
        );
        assert_eq!(second.link.last_read, Some(second.reading.timestamp));
    }

    #[tokio::test]
    async fn test_alert_dispatched_after_publish() {
        let ports = MemoryPorts::new().with_port("COM3", Some("Arduino Uno"));
        let mut h = harness(Unit::Drone, ports);
        h.acquisition.tick().await;

        h.ports
            .push_line("TEMP:33.5|TURB:45.0|EC:13.0|PH:6.2|DO:4.0|LAT:4.21|LON:6.44|BAT:70.0");
        h.clock.advance(Duration::from_secs(2));
        let snapshot = h.acquisition.tick().await;

        let alerts = h.sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].violated_channels, 5);
        assert_eq!(alerts[0].timestamp, snapshot.reading.timestamp);
        assert_eq!(h.sink.readings().len(), 2);
        assert_eq!(h.acquisition.stats().snapshot().alerts, 1);
        assert_eq!(h.store.latest(Unit::Drone).unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let ports = MemoryPorts::new();
        ports.set_fail_open(true);
        let mut h = harness(Unit::Buoy, ports);

        // Clock never moves
        let mut last = None;
        for _ in 0..5 {
            let snapshot = h.acquisition.tick().await;
            if let Some(prev) = last {
                assert!(snapshot.reading.timestamp > prev);
            }
            last = Some(snapshot.reading.timestamp);
        }
    }

    #[tokio::test]
    async fn test_simulate_only_never_opens() {
        let ports = MemoryPorts::new().with_port("COM5", None);
        let mut h = harness(Unit::Buoy, ports);
        h.acquisition = h.acquisition.simulate_only(true);

        for _ in 0..3 {
            let snapshot = h.acquisition.tick().await;
            assert_eq!(snapshot.reading.provenance, Provenance::Simulated);
            assert_eq!(snapshot.link.state, LinkState::Disconnected);
            h.clock.advance(Duration::from_secs(3));
        }
        assert_eq!(h.ports.open_attempts(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_simulation() {
        let ports = MemoryPorts::new().with_port("COM5", None);
        let mut h = harness(Unit::Buoy, ports);
        h.acquisition.tick().await;

        h.ports.fail_next_read();
        h.clock.advance(Duration::from_secs(3));
        let snapshot = h.acquisition.tick().await;
        assert_eq!(snapshot.reading.provenance, Provenance::Simulated);
        assert_eq!(snapshot.link.state, LinkState::Error);
        assert_eq!(h.acquisition.stats().snapshot().link_failures, 1);
    }

    #[tokio::test]
    async fn test_oversized_partial_line_is_counted() {
        let ports = MemoryPorts::new().with_port("COM5", None);
        let mut h = harness(Unit::Buoy, ports);
        h.acquisition.tick().await;

        h.ports
            .push_bytes(&vec![b'9'; seawatch::channel::MAX_PENDING_BYTES + 1]);
        h.clock.advance(Duration::from_secs(3));
        let snapshot = h.acquisition.tick().await;
        assert_eq!(snapshot.reading.provenance, Provenance::Simulated);
        assert_eq!(h.acquisition.stats().snapshot().discarded_partials, 1);
    }
}

// Seawatch Gateway - Acquisition engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Engine: builds and supervises one acquisition loop per unit
//!
//! The loops share nothing but the snapshot store and the sinks. The
//! [`EngineHandle`] returned by [`Engine::start`] is the only way in once
//! they run: snapshot queries, manual reconnects, counters, and shutdown.

use crate::acquisition::{AcquisitionLoop, LoopContext};
use crate::clock::TokioClock;
use crate::config::EngineConfig;
use crate::error::{GatewayError, Result};
use crate::stats::{StatsSnapshot, UnitStats};
use parking_lot::Mutex;
use seawatch::channel::{PortInfo, PortSettings};
use seawatch::{
    AlertAggregator, AlertSink, Clock, LinkError, LinkMachine, LinkStatus, NullSink,
    PortProvider, ReadingSink, SerialLink, Snapshot, SnapshotStore, StatusBoard, Unit,
};
use seawatch_sim::UnitSimulation;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Port provider used when no serial backend is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePorts;

impl PortProvider for UnavailablePorts {
    fn available_ports(&self) -> std::result::Result<Vec<PortInfo>, LinkError> {
        Err(LinkError::Enumeration(
            "built without serial support".to_string(),
        ))
    }

    fn open(
        &self,
        port: &str,
        _settings: &PortSettings,
    ) -> std::result::Result<Box<dyn SerialLink>, LinkError> {
        Err(LinkError::Open {
            port: port.to_string(),
            reason: "built without serial support".to_string(),
        })
    }
}

/// Host serial ports, or [`UnavailablePorts`] without the `serial` feature
pub fn system_ports() -> Box<dyn PortProvider> {
    #[cfg(feature = "serial")]
    {
        Box::new(seawatch::SystemPorts::new())
    }
    #[cfg(not(feature = "serial"))]
    {
        Box::new(UnavailablePorts)
    }
}

/// Engine builder
pub struct Engine {
    config: EngineConfig,
    store: Arc<SnapshotStore>,
    readings: Arc<dyn ReadingSink>,
    alerts: Arc<dyn AlertSink>,
    clock: Option<Arc<dyn Clock>>,
    ports: [Option<Box<dyn PortProvider>>; 2],
}

impl Engine {
    /// Create an engine with null sinks and the host's serial ports
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: Arc::new(SnapshotStore::new()),
            readings: Arc::new(NullSink),
            alerts: Arc::new(NullSink),
            clock: None,
            ports: [None, None],
        }
    }

    /// Send every reading to `sink`
    pub fn with_reading_sink(mut self, sink: Arc<dyn ReadingSink>) -> Self {
        self.readings = sink;
        self
    }

    /// Send every alert to `sink`
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alerts = sink;
        self
    }

    /// Stamp readings from `clock` instead of the tokio clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publish into an existing store
    pub fn with_store(mut self, store: Arc<SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    /// Use a specific port provider for a unit
    pub fn with_ports(mut self, unit: Unit, ports: Box<dyn PortProvider>) -> Self {
        self.ports[unit.index()] = Some(ports);
        self
    }

    /// Validate the configuration and spawn the loops
    ///
    /// Must be called from within a tokio runtime. Configuration errors are
    /// the only errors returned; nothing after start is fatal.
    pub fn start(self) -> Result<EngineHandle> {
        let Engine {
            config,
            store,
            readings,
            alerts,
            clock,
            mut ports,
        } = self;
        config.validate()?;

        let clock = clock.unwrap_or_else(|| Arc::new(TokioClock::new()));
        let context = LoopContext {
            store: Arc::clone(&store),
            readings,
            alerts,
            clock,
        };
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut units: [Option<UnitHandle>; 2] = [None, None];
        let mut tasks = Vec::new();

        for unit in Unit::ALL {
            let unit_config = config.unit(unit);
            if !unit_config.enabled {
                info!(unit = %unit, "Unit disabled");
                continue;
            }

            let provider = ports[unit.index()].take().unwrap_or_else(system_ports);
            let machine = LinkMachine::new(unit, unit_config.link.clone(), provider);
            let status = machine.status_board();
            let link = Arc::new(Mutex::new(machine));
            let simulation = UnitSimulation::new(unit_config.simulation.clone())?;
            let stats = Arc::new(UnitStats::new());

            let acquisition = AcquisitionLoop::new(
                Arc::clone(&link),
                simulation,
                AlertAggregator::new(unit_config.thresholds.clone()),
                context.clone(),
                unit_config.tick_interval(),
            )
            .simulate_only(unit_config.simulate_only)
            .with_stats(Arc::clone(&stats));

            tasks.push((unit, tokio::spawn(acquisition.run(shutdown_rx.clone()))));
            units[unit.index()] = Some(UnitHandle {
                link,
                status,
                stats,
            });
        }

        info!(units = tasks.len(), "Engine started");
        Ok(EngineHandle {
            store,
            units,
            shutdown,
            tasks,
        })
    }
}

struct UnitHandle {
    link: Arc<Mutex<LinkMachine>>,
    status: StatusBoard,
    stats: Arc<UnitStats>,
}

/// Control surface of a running engine
pub struct EngineHandle {
    store: Arc<SnapshotStore>,
    units: [Option<UnitHandle>; 2],
    shutdown: watch::Sender<bool>,
    tasks: Vec<(Unit, JoinHandle<()>)>,
}

impl EngineHandle {
    /// Latest snapshot of a unit; `None` until its first tick
    pub fn latest(&self, unit: Unit) -> Option<Arc<Snapshot>> {
        self.store.latest(unit)
    }

    /// Shared snapshot store
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// Units with a running loop
    pub fn units(&self) -> Vec<Unit> {
        Unit::ALL
            .into_iter()
            .filter(|u| self.units[u.index()].is_some())
            .collect()
    }

    /// Drop a unit's link and retry on its next tick; false if the unit is not running
    pub fn force_reconnect(&self, unit: Unit) -> bool {
        match &self.units[unit.index()] {
            Some(handle) => {
                handle.link.lock().force_reconnect();
                true
            }
            None => false,
        }
    }

    /// Current link status of a unit, without waiting for an in-flight poll
    pub fn link_status(&self, unit: Unit) -> Option<LinkStatus> {
        self.units[unit.index()]
            .as_ref()
            .map(|h| h.status.read().clone())
    }

    /// Counters of a unit
    pub fn stats(&self, unit: Unit) -> Option<StatsSnapshot> {
        self.units[unit.index()]
            .as_ref()
            .map(|h| h.stats.snapshot())
    }

    /// Signal shutdown and wait for every loop to finish its current tick
    pub async fn shutdown(self) -> Result<()> {
        // Receivers live in the tasks; an error only means they are all gone
        let _ = self.shutdown.send(true);

        let mut failure = None;
        for (unit, task) in self.tasks {
            if let Err(e) = task.await {
                warn!(unit = %unit, error = %e, "Acquisition task failed");
                failure.get_or_insert(GatewayError::Task {
                    unit: unit.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        info!("Engine stopped");
        failure.map_or(Ok(()), Err)
    }
}

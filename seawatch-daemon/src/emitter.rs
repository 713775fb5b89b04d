// Seawatch Daemon - Unit emulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Firmware stand-in: runs a unit's simulation and writes wire lines to a
//! serial port at the unit's cadence.
//!
//! Pointing the emitter at one end of a null-modem pair and the daemon at
//! the other exercises the real-data path without hardware.

use seawatch::{codec, Clock, LinkConfig, LinkMachine, LinkPoll, PortProvider, Unit};
use seawatch_sim::{SimError, SimulationConfig, UnitSimulation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Emitter settings
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    /// Emulated unit
    pub unit: Unit,
    /// Port to write to
    pub port: String,
    /// Line speed
    pub baud_rate: u32,
    /// Line cadence
    pub interval: Duration,
    /// Simulation seed
    pub seed: Option<u64>,
    /// Stop after this many lines
    pub count: Option<u64>,
}

impl EmitterOptions {
    /// Defaults for a unit: its own cadence, 9600 baud
    pub fn new(unit: Unit, port: impl Into<String>) -> Self {
        let interval = match unit {
            Unit::Drone => Duration::from_secs(2),
            Unit::Buoy => Duration::from_secs(3),
        };
        Self {
            unit,
            port: port.into(),
            baud_rate: 9600,
            interval,
            seed: None,
            count: None,
        }
    }
}

/// Simulated unit writing to a serial link
pub struct Emitter {
    options: EmitterOptions,
    link: LinkMachine,
    simulation: UnitSimulation,
    clock: Arc<dyn Clock>,
    sent: u64,
}

impl Emitter {
    /// Build the simulation and the link
    pub fn new(
        options: EmitterOptions,
        provider: Box<dyn PortProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SimError> {
        let mut config = SimulationConfig::for_unit(options.unit);
        config.seed = options.seed;
        let simulation = UnitSimulation::new(config)?;

        let link_config = LinkConfig {
            port_hints: vec![options.port.clone()],
            fallback_port: Some(options.port.clone()),
            baud_rate: options.baud_rate,
            ..LinkConfig::for_unit(options.unit)
        };
        let link = LinkMachine::new(options.unit, link_config, provider);

        Ok(Self {
            options,
            link,
            simulation,
            clock,
            sent: 0,
        })
    }

    /// Lines written so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Simulate one tick and write it; returns the line if it went out
    pub fn step(&mut self) -> Option<String> {
        let now = self.clock.now();
        let values = self.simulation.tick(now);
        let line = codec::encode_values(self.options.unit, &values);

        if let LinkPoll::Offline = self.link.poll(now) {
            debug!(unit = %self.options.unit, "Port offline, line dropped");
            return None;
        }
        match self.link.write_line(&line) {
            Ok(()) => {
                self.sent += 1;
                debug!(unit = %self.options.unit, line = %line, "Emitted");
                Some(line)
            }
            Err(e) => {
                warn!(unit = %self.options.unit, error = %e, "Write failed");
                self.link.force_reconnect();
                None
            }
        }
    }

    /// Emit on the cadence until shutdown or the line budget is spent
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.options.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            unit = %self.options.unit,
            port = %self.options.port,
            interval_ms = self.options.interval.as_millis() as u64,
            "Emitter started"
        );

        loop {
            if *shutdown.borrow() || self.budget_spent() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.step();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(unit = %self.options.unit, sent = self.sent, "Emitter stopped");
        self.sent
    }

    fn budget_spent(&self) -> bool {
        self.options.count.is_some_and(|max| self.sent >= max)
    }
}

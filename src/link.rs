// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-unit serial link state machine
//!
//! ```text
//!  Disconnected/Error ──due──▶ Connecting ──open ok──▶ Connected
//!          ▲                      │                       │
//!          └──── open failed ─────┘          I/O error ───┘ (→ Error)
//! ```
//!
//! The machine is polled once per acquisition tick. It never returns an
//! error: failures are logged, counted in [`LinkStatus`] and reported as
//! [`LinkPoll::Offline`] so the caller falls back to simulation.
//!
//! Every status change is also written to a [`StatusBoard`], which readers
//! can inspect without waiting for a poll to finish. `Connecting` is visible
//! there for as long as an open attempt takes.

use crate::channel::{PortInfo, PortProvider, PortSettings, SerialLink};
use crate::clock::to_chrono;
use crate::codec::decode_line;
use crate::error::{ConfigError, LinkError};
use crate::protocol::{PartialReading, Unit};
use crate::recovery::ReconnectPolicy;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection state of a unit link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// No link open
    #[default]
    Disconnected,
    /// Open in progress (held only while the open attempt runs)
    Connecting,
    /// Link open
    Connected,
    /// Last link failed with an I/O error
    Error,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Error => write!(f, "error"),
        }
    }
}

/// Observable status of a unit link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    /// Current state
    pub state: LinkState,
    /// Consecutive failed connect attempts since the last success
    pub reconnect_attempts: u32,
    /// Time of the last line that yielded data
    pub last_read: Option<DateTime<Utc>>,
    /// Port currently (or last) bound
    pub port: Option<String>,
}

impl LinkStatus {
    /// True if a link is open
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }
}

/// Shared copy of a link's status, updated on every change
pub type StatusBoard = Arc<RwLock<LinkStatus>>;

/// Link parameters for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Substrings matched against port names and descriptions
    pub port_hints: Vec<String>,
    /// Port used when enumeration finds nothing
    pub fallback_port: Option<String>,
    /// Line speed
    pub baud_rate: u32,
    /// Upper bound on a single blocking read
    pub read_timeout_ms: u64,
    /// Reconnect schedule
    pub reconnect: ReconnectPolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_hints: Vec::new(),
            fallback_port: None,
            baud_rate: 9600,
            read_timeout_ms: 100,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl LinkConfig {
    /// Drone preset: Arduino/USB adapters, falls back to COM4
    pub fn drone() -> Self {
        Self {
            port_hints: vec!["Arduino".to_string(), "USB".to_string()],
            fallback_port: Some("COM4".to_string()),
            ..Default::default()
        }
    }

    /// Buoy preset: COM5 or a ttyUSB device, falls back to COM5
    pub fn buoy() -> Self {
        Self {
            port_hints: vec!["COM5".to_string(), "ttyUSB".to_string()],
            fallback_port: Some("COM5".to_string()),
            ..Default::default()
        }
    }

    /// Preset for a unit
    pub fn for_unit(unit: Unit) -> Self {
        match unit {
            Unit::Drone => Self::drone(),
            Unit::Buoy => Self::buoy(),
        }
    }

    /// Open settings derived from this configuration
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::invalid("baud_rate", "must be > 0"));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::invalid("read_timeout_ms", "must be > 0"));
        }
        self.reconnect.validate()
    }
}

/// Outcome of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum LinkPoll {
    /// Link is up and delivered data
    Data(PartialReading),
    /// Link is up but nothing usable arrived
    Idle,
    /// No link this tick
    Offline,
}

/// Counters kept by the machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    /// Successful connects
    pub connects: u64,
    /// Failed connect attempts
    pub connect_failures: u64,
    /// I/O errors on an open link
    pub io_errors: u64,
    /// Lines read
    pub lines: u64,
    /// Fields dropped while decoding
    pub dropped_fields: u64,
    /// Partial lines discarded for exceeding the pending limit
    pub discarded_partials: u64,
}

/// Link state machine for one unit
pub struct LinkMachine {
    unit: Unit,
    config: LinkConfig,
    provider: Box<dyn PortProvider>,
    link: Option<Box<dyn SerialLink>>,
    status: LinkStatus,
    next_attempt_at: Option<DateTime<Utc>>,
    counters: LinkCounters,
    link_discards: u64,
    board: StatusBoard,
}

impl fmt::Debug for LinkMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkMachine")
            .field("unit", &self.unit)
            .field("status", &self.status)
            .field("next_attempt_at", &self.next_attempt_at)
            .finish()
    }
}

impl LinkMachine {
    /// Create a machine in the Disconnected state
    pub fn new(unit: Unit, config: LinkConfig, provider: Box<dyn PortProvider>) -> Self {
        Self {
            unit,
            config,
            provider,
            link: None,
            status: LinkStatus::default(),
            next_attempt_at: None,
            counters: LinkCounters::default(),
            link_discards: 0,
            board: StatusBoard::default(),
        }
    }

    /// Publish status changes to a caller-provided board
    pub fn with_status_board(mut self, board: StatusBoard) -> Self {
        *board.write() = self.status.clone();
        self.board = board;
        self
    }

    /// Board receiving every status change
    pub fn status_board(&self) -> StatusBoard {
        Arc::clone(&self.board)
    }

    /// Unit this machine serves
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Current status
    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    /// Counters since creation
    pub fn counters(&self) -> LinkCounters {
        self.counters
    }

    /// When the next connect attempt is allowed, if one is scheduled
    pub fn next_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.next_attempt_at
    }

    /// Advance the machine by one tick
    ///
    /// Connects if no link is open and an attempt is due, then drains every
    /// complete line pending on the link. Lines are merged in arrival order.
    pub fn poll(&mut self, now: DateTime<Utc>) -> LinkPoll {
        let outcome = self.step(now);
        self.publish_status();
        outcome
    }

    fn step(&mut self, now: DateTime<Utc>) -> LinkPoll {
        if self.link.is_none() {
            if let Some(at) = self.next_attempt_at {
                if now < at {
                    return LinkPoll::Offline;
                }
            }
            self.connect(now);
        }

        let Some(link) = self.link.as_mut() else {
            return LinkPoll::Offline;
        };

        match link.read_lines() {
            Ok(lines) => {
                let discarded = link.discarded_partials();
                if discarded > self.link_discards {
                    warn!(unit = %self.unit, discarded, "Oversized partial line discarded");
                }
                self.counters.discarded_partials += discarded.saturating_sub(self.link_discards);
                self.link_discards = discarded;
                let mut partial = PartialReading::new();
                for line in &lines {
                    debug!(unit = %self.unit, line = %line, "Raw line");
                    let decoded = decode_line(line);
                    self.counters.lines += 1;
                    self.counters.dropped_fields += decoded.dropped as u64;
                    partial.overlay(&decoded.values);
                }
                if partial.is_empty() {
                    LinkPoll::Idle
                } else {
                    self.status.last_read = Some(now);
                    LinkPoll::Data(partial)
                }
            }
            Err(e) => {
                warn!(unit = %self.unit, error = %e, "Link read failed, tearing down");
                self.counters.io_errors += 1;
                self.link = None;
                self.status.state = LinkState::Error;
                self.next_attempt_at = None;
                LinkPoll::Offline
            }
        }
    }

    /// Drop any link and retry on the next poll with a fresh counter
    pub fn force_reconnect(&mut self) {
        info!(unit = %self.unit, "Manual reconnect requested");
        self.link = None;
        self.status.state = LinkState::Disconnected;
        self.status.reconnect_attempts = 0;
        self.next_attempt_at = None;
        self.publish_status();
    }

    /// Write a line to the open link
    pub fn write_line(&mut self, line: &str) -> crate::Result<()> {
        let link = self.link.as_mut().ok_or(LinkError::Closed)?;
        link.write_line(line)?;
        Ok(())
    }

    fn publish_status(&self) {
        *self.board.write() = self.status.clone();
    }

    fn connect(&mut self, now: DateTime<Utc>) {
        self.status.state = LinkState::Connecting;
        self.publish_status();
        info!(
            unit = %self.unit,
            attempt = self.status.reconnect_attempts + 1,
            max = self.config.reconnect.max_attempts,
            "Connecting"
        );

        match self.open_link() {
            Ok(link) => {
                info!(unit = %self.unit, port = link.port(), "Connected");
                self.status.port = Some(link.port().to_string());
                self.status.state = LinkState::Connected;
                self.status.reconnect_attempts = 0;
                self.next_attempt_at = None;
                self.counters.connects += 1;
                self.link_discards = 0;
                self.link = Some(link);
            }
            Err(e) => {
                self.status.reconnect_attempts = self.status.reconnect_attempts.saturating_add(1);
                self.status.state = LinkState::Disconnected;
                self.counters.connect_failures += 1;
                let delay = self
                    .config
                    .reconnect
                    .delay_for_attempt(self.status.reconnect_attempts);
                self.next_attempt_at = Some(now + to_chrono(delay));
                warn!(
                    unit = %self.unit,
                    error = %e,
                    attempts = self.status.reconnect_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    "Connect failed"
                );
            }
        }
    }

    fn open_link(&mut self) -> Result<Box<dyn SerialLink>, LinkError> {
        let port = self.select_port()?;
        let mut link = self.provider.open(&port, &self.config.port_settings())?;
        link.clear_input()?;
        Ok(link)
    }

    fn select_port(&self) -> Result<String, LinkError> {
        let ports = match self.provider.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                debug!(unit = %self.unit, error = %e, "Enumeration failed");
                Vec::new()
            }
        };
        select_port(&ports, &self.config.port_hints, self.config.fallback_port.as_deref())
    }
}

/// Port selection: first hint match, else first port, else fallback
pub fn select_port(
    ports: &[PortInfo],
    hints: &[String],
    fallback: Option<&str>,
) -> Result<String, LinkError> {
    if let Some(port) = ports
        .iter()
        .find(|p| hints.iter().any(|h| p.matches_hint(h)))
    {
        return Ok(port.name.clone());
    }
    if let Some(port) = ports.first() {
        return Ok(port.name.clone());
    }
    fallback
        .map(str::to_string)
        .ok_or(LinkError::NoPortAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryPorts;
    use crate::error::SeawatchError;
    use crate::protocol::Channel;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    /// Records the board's state at the moment each open is attempted
    struct WatchedPorts {
        board: StatusBoard,
        seen: Arc<Mutex<Vec<LinkState>>>,
    }

    impl PortProvider for WatchedPorts {
        fn available_ports(&self) -> Result<Vec<PortInfo>, LinkError> {
            Ok(vec![PortInfo::new("COM5", None)])
        }

        fn open(&self, port: &str, _settings: &PortSettings) -> Result<Box<dyn SerialLink>, LinkError> {
            self.seen.lock().push(self.board.read().state);
            Err(LinkError::Open {
                port: port.to_string(),
                reason: "busy".to_string(),
            })
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn machine(ports: &MemoryPorts, config: LinkConfig) -> LinkMachine {
        LinkMachine::new(Unit::Drone, config, Box::new(ports.clone()))
    }

    #[test]
    fn test_select_port_prefers_hint() {
        let ports = vec![
            PortInfo::new("COM1", Some("Communications Port")),
            PortInfo::new("COM7", Some("Arduino Mega")),
        ];
        let hints = vec!["arduino".to_string()];
        assert_eq!(select_port(&ports, &hints, Some("COM4")).unwrap(), "COM7");
    }

    #[test]
    fn test_select_port_first_then_fallback() {
        let ports = vec![PortInfo::new("COM1", None)];
        let hints = vec!["ttyUSB".to_string()];
        assert_eq!(select_port(&ports, &hints, Some("COM5")).unwrap(), "COM1");
        assert_eq!(select_port(&[], &hints, Some("COM5")).unwrap(), "COM5");
        assert_eq!(
            select_port(&[], &hints, None),
            Err(LinkError::NoPortAvailable)
        );
    }

    #[test]
    fn test_connect_flushes_and_reads() {
        let ports = MemoryPorts::new().with_port("COM4", Some("USB Serial"));
        ports.push_line("TEMP:99.0");
        let mut m = machine(&ports, LinkConfig::drone());

        // Stale input is flushed on connect
        assert_eq!(m.poll(t0()), LinkPoll::Idle);
        assert_eq!(m.status().state, LinkState::Connected);
        assert_eq!(m.status().port.as_deref(), Some("COM4"));
        assert_eq!(ports.clears(), 1);

        ports.push_line("TEMP:28.5|PH:7.1");
        ports.push_line("PH:7.2|BOGUS:1");
        match m.poll(t0() + secs(2)) {
            LinkPoll::Data(partial) => {
                assert_eq!(partial.get(Channel::Temperature), Some(28.5));
                assert_eq!(partial.get(Channel::Ph), Some(7.2));
            }
            other => panic!("expected data, got {:?}", other),
        }
        assert_eq!(m.status().last_read, Some(t0() + secs(2)));
        assert_eq!(m.counters().lines, 2);
        assert_eq!(m.counters().dropped_fields, 1);
    }

    #[test]
    fn test_failed_connect_schedules_retry() {
        let ports = MemoryPorts::new();
        ports.set_fail_open(true);
        let mut m = machine(&ports, LinkConfig::drone());

        assert_eq!(m.poll(t0()), LinkPoll::Offline);
        assert_eq!(m.status().reconnect_attempts, 1);
        assert_eq!(m.status().state, LinkState::Disconnected);
        assert_eq!(m.next_attempt_at(), Some(t0() + secs(5)));

        // Not due yet
        assert_eq!(m.poll(t0() + secs(3)), LinkPoll::Offline);
        assert_eq!(ports.open_attempts(), 1);

        assert_eq!(m.poll(t0() + secs(5)), LinkPoll::Offline);
        assert_eq!(ports.open_attempts(), 2);
        assert_eq!(m.status().reconnect_attempts, 2);
    }

    #[test]
    fn test_counter_resets_only_on_success() {
        let ports = MemoryPorts::new().with_port("COM4", None);
        ports.set_fail_open(true);
        let mut m = machine(&ports, LinkConfig::drone());

        let mut now = t0();
        for _ in 0..3 {
            m.poll(now);
            now += secs(5);
        }
        assert_eq!(m.status().reconnect_attempts, 3);

        ports.set_fail_open(false);
        m.poll(now);
        assert_eq!(m.status().state, LinkState::Connected);
        assert_eq!(m.status().reconnect_attempts, 0);
    }

    #[test]
    fn test_io_error_tears_down_and_retries_immediately() {
        let ports = MemoryPorts::new().with_port("COM4", None);
        ports.set_fail_open(true);
        let mut m = machine(&ports, LinkConfig::drone());
        m.poll(t0());
        assert_eq!(m.status().reconnect_attempts, 1);

        ports.set_fail_open(false);
        m.poll(t0() + secs(5));
        assert!(m.status().is_connected());

        ports.fail_next_read();
        ports.set_fail_open(true);
        assert_eq!(m.poll(t0() + secs(7)), LinkPoll::Offline);
        assert_eq!(m.status().state, LinkState::Error);
        assert_eq!(m.status().reconnect_attempts, 0);
        assert_eq!(m.counters().io_errors, 1);

        // Next tick reconnects without waiting
        m.poll(t0() + secs(9));
        assert_eq!(ports.open_attempts(), 3);
        assert_eq!(m.status().reconnect_attempts, 1);
    }

    #[test]
    fn test_force_reconnect_clears_backoff() {
        let ports = MemoryPorts::new();
        ports.set_fail_open(true);
        let mut config = LinkConfig::drone();
        config.reconnect = ReconnectPolicy::new(2, Duration::from_secs(5), Duration::from_secs(60));
        let mut m = machine(&ports, config);

        m.poll(t0());
        m.poll(t0() + secs(5));
        assert_eq!(m.status().reconnect_attempts, 2);
        assert_eq!(m.next_attempt_at(), Some(t0() + secs(65)));

        m.force_reconnect();
        assert_eq!(m.status().reconnect_attempts, 0);
        assert_eq!(m.status().state, LinkState::Disconnected);

        m.poll(t0() + secs(6));
        assert_eq!(ports.open_attempts(), 3);
    }

    #[test]
    fn test_board_shows_connecting_during_open() {
        let board = StatusBoard::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ports = WatchedPorts {
            board: Arc::clone(&board),
            seen: Arc::clone(&seen),
        };
        let mut m = LinkMachine::new(Unit::Buoy, LinkConfig::buoy(), Box::new(ports))
            .with_status_board(Arc::clone(&board));

        assert_eq!(m.poll(t0()), LinkPoll::Offline);
        assert_eq!(*seen.lock(), vec![LinkState::Connecting]);
        assert_eq!(board.read().state, LinkState::Disconnected);
        assert_eq!(board.read().reconnect_attempts, 1);

        m.force_reconnect();
        assert_eq!(board.read().reconnect_attempts, 0);
    }

    #[test]
    fn test_write_requires_open_link() {
        let ports = MemoryPorts::new().with_port("COM4", None);
        let mut m = machine(&ports, LinkConfig::drone());
        assert_eq!(
            m.write_line("PING"),
            Err(SeawatchError::Link(LinkError::Closed))
        );
        m.poll(t0());
        m.write_line("PING").unwrap();
        assert_eq!(ports.written(), vec!["PING".to_string()]);
    }
}

// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Serial link abstraction module
//!
//! This module provides the traits the link state machine talks to, a line
//! splitter shared by every backend, and an in-memory implementation for
//! tests and simulation.

use crate::error::LinkError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Maximum bytes kept while waiting for a line terminator
pub const MAX_PENDING_BYTES: usize = 4096;

/// A port as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device name or path (`COM4`, `/dev/ttyUSB0`)
    pub name: String,
    /// Human readable description, if the platform provides one
    pub description: Option<String>,
}

impl PortInfo {
    /// Create a port description
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }

    /// Case-insensitive match of a hint against name or description
    pub fn matches_hint(&self, hint: &str) -> bool {
        let hint = hint.to_lowercase();
        if hint.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&hint)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&hint))
                .unwrap_or(false)
    }
}

/// Settings used when opening a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    /// Line speed
    pub baud_rate: u32,
    /// Upper bound on a single blocking read
    pub read_timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// An open, line-oriented serial link
pub trait SerialLink: Send {
    /// Port identifier this link is bound to
    fn port(&self) -> &str;

    /// Discard any buffered input
    fn clear_input(&mut self) -> Result<(), LinkError>;

    /// Return every complete line pending right now, without waiting for more
    fn read_lines(&mut self) -> Result<Vec<String>, LinkError>;

    /// Write one line (terminator appended)
    fn write_line(&mut self, line: &str) -> Result<(), LinkError>;

    /// Partial lines discarded for length since the link was opened
    fn discarded_partials(&self) -> u64 {
        0
    }
}

/// Source of serial ports
pub trait PortProvider: Send {
    /// Enumerate ports currently present
    fn available_ports(&self) -> Result<Vec<PortInfo>, LinkError>;

    /// Open a port
    fn open(&self, port: &str, settings: &PortSettings) -> Result<Box<dyn SerialLink>, LinkError>;
}

/// Accumulates raw bytes and yields complete lines
///
/// A pending partial line longer than [`MAX_PENDING_BYTES`] is discarded.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    overflows: u64,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return the lines they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.pending)
                    .trim_end_matches('\r')
                    .to_string();
                self.pending.clear();
                if !line.trim().is_empty() {
                    lines.push(line);
                }
            } else if self.pending.len() >= MAX_PENDING_BYTES {
                self.pending.clear();
                self.overflows += 1;
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of partial lines discarded for length
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

#[derive(Debug, Default)]
struct MemoryBus {
    ports: Vec<PortInfo>,
    fail_enumeration: bool,
    fail_open: bool,
    fail_next_read: bool,
    open_attempts: u32,
    opened: Vec<String>,
    is_open: bool,
    incoming: VecDeque<u8>,
    outgoing: Vec<String>,
    clears: u32,
}

/// In-memory port provider for tests and local simulation
///
/// Clones share state, so a test keeps one handle to script the device
/// while the link state machine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryPorts {
    bus: Arc<Mutex<MemoryBus>>,
}

impl MemoryPorts {
    /// Create a provider with no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port to the enumeration list
    pub fn with_port(self, name: &str, description: Option<&str>) -> Self {
        self.bus.lock().ports.push(PortInfo::new(name, description));
        self
    }

    /// Make every open attempt fail
    pub fn set_fail_open(&self, fail: bool) {
        self.bus.lock().fail_open = fail;
    }

    /// Make enumeration fail
    pub fn set_fail_enumeration(&self, fail: bool) {
        self.bus.lock().fail_enumeration = fail;
    }

    /// Make the next read on the open link fail
    pub fn fail_next_read(&self) {
        self.bus.lock().fail_next_read = true;
    }

    /// Queue a line as if the unit had sent it
    pub fn push_line(&self, line: &str) {
        let mut bus = self.bus.lock();
        bus.incoming.extend(line.as_bytes());
        bus.incoming.push_back(b'\n');
    }

    /// Queue raw bytes
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.bus.lock().incoming.extend(bytes);
    }

    /// Number of open attempts seen
    pub fn open_attempts(&self) -> u32 {
        self.bus.lock().open_attempts
    }

    /// Ports successfully opened, in order
    pub fn opened(&self) -> Vec<String> {
        self.bus.lock().opened.clone()
    }

    /// Whether a link is currently open
    pub fn is_open(&self) -> bool {
        self.bus.lock().is_open
    }

    /// Number of input flushes
    pub fn clears(&self) -> u32 {
        self.bus.lock().clears
    }

    /// Lines written by the host
    pub fn written(&self) -> Vec<String> {
        self.bus.lock().outgoing.clone()
    }
}

impl PortProvider for MemoryPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>, LinkError> {
        let bus = self.bus.lock();
        if bus.fail_enumeration {
            return Err(LinkError::Enumeration("enumeration disabled".to_string()));
        }
        Ok(bus.ports.clone())
    }

    fn open(&self, port: &str, _settings: &PortSettings) -> Result<Box<dyn SerialLink>, LinkError> {
        let mut bus = self.bus.lock();
        bus.open_attempts += 1;
        if bus.fail_open {
            return Err(LinkError::Open {
                port: port.to_string(),
                reason: "device not present".to_string(),
            });
        }
        bus.opened.push(port.to_string());
        bus.is_open = true;
        Ok(Box::new(MemoryLink {
            port: port.to_string(),
            bus: Arc::clone(&self.bus),
            lines: LineBuffer::new(),
            closed: false,
        }))
    }
}

/// Link handed out by [`MemoryPorts`]
#[derive(Debug)]
pub struct MemoryLink {
    port: String,
    bus: Arc<Mutex<MemoryBus>>,
    lines: LineBuffer,
    closed: bool,
}

impl MemoryLink {
    fn io_error(&self, reason: &str) -> LinkError {
        LinkError::Io {
            port: self.port.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SerialLink for MemoryLink {
    fn port(&self) -> &str {
        &self.port
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        let mut bus = self.bus.lock();
        bus.incoming.clear();
        bus.clears += 1;
        self.lines.clear();
        Ok(())
    }

    fn read_lines(&mut self) -> Result<Vec<String>, LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        let bytes: Vec<u8> = {
            let mut bus = self.bus.lock();
            if bus.fail_next_read {
                bus.fail_next_read = false;
                bus.is_open = false;
                drop(bus);
                self.closed = true;
                return Err(self.io_error("device disconnected"));
            }
            bus.incoming.drain(..).collect()
        };
        Ok(self.lines.push(&bytes))
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.bus.lock().outgoing.push(line.to_string());
        Ok(())
    }

    fn discarded_partials(&self) -> u64 {
        self.lines.overflows()
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        if !self.closed {
            self.bus.lock().is_open = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_hint_matching() {
        let port = PortInfo::new("COM3", Some("Arduino Uno (COM3)"));
        assert!(port.matches_hint("arduino"));
        assert!(port.matches_hint("COM3"));
        assert!(!port.matches_hint("ttyUSB"));
        assert!(!port.matches_hint(""));

        let bare = PortInfo::new("/dev/ttyUSB0", None);
        assert!(bare.matches_hint("ttyUSB"));
    }

    #[test]
    fn test_line_buffer_splits_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"TEMP:2").is_empty());
        assert_eq!(buf.pending_len(), 6);
        let lines = buf.push(b"8.5\r\nPH:7.0\n\nDO:");
        assert_eq!(lines, vec!["TEMP:28.5".to_string(), "PH:7.0".to_string()]);
        assert_eq!(buf.pending_len(), 3);
        buf.clear();
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_line_buffer_caps_pending() {
        let mut buf = LineBuffer::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 10];
        assert!(buf.push(&junk).is_empty());
        assert_eq!(buf.overflows(), 1);
        assert!(buf.pending_len() < MAX_PENDING_BYTES);
        let lines = buf.push(b"\nPH:7.1\n");
        assert_eq!(lines.last().map(String::as_str), Some("PH:7.1"));
    }

    #[test]
    fn test_memory_ports_roundtrip() {
        let ports = MemoryPorts::new().with_port("COM4", Some("USB Serial"));
        let handle = ports.clone();
        let mut link = ports.open("COM4", &PortSettings::default()).unwrap();
        assert!(handle.is_open());

        handle.push_line("TEMP:28.0");
        handle.push_line("PH:7.0");
        assert_eq!(link.read_lines().unwrap().len(), 2);
        assert!(link.read_lines().unwrap().is_empty());

        link.write_line("BAT:80.0").unwrap();
        assert_eq!(handle.written(), vec!["BAT:80.0".to_string()]);

        drop(link);
        assert!(!handle.is_open());
    }

    #[test]
    fn test_memory_ports_failures() {
        let ports = MemoryPorts::new();
        ports.set_fail_open(true);
        assert!(matches!(
            ports.open("COM4", &PortSettings::default()),
            Err(LinkError::Open { .. })
        ));
        assert_eq!(ports.open_attempts(), 1);

        ports.set_fail_open(false);
        let mut link = ports.open("COM4", &PortSettings::default()).unwrap();
        ports.fail_next_read();
        assert!(matches!(link.read_lines(), Err(LinkError::Io { .. })));
        assert!(matches!(link.read_lines(), Err(LinkError::Closed)));
        assert!(!ports.is_open());
    }
}

// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Hardware serial backend (feature `serial`)
//!
//! Wraps the `serialport` crate behind [`PortProvider`]. Reads are bounded
//! by the configured timeout and only consume bytes already buffered by the
//! driver, so a poll never waits for a unit to finish a line.

use crate::channel::{LineBuffer, PortInfo, PortProvider, PortSettings, SerialLink};
use crate::error::LinkError;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{ErrorKind, Read, Write};

const READ_CHUNK: usize = 1024;

/// Ports of the host machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl SystemPorts {
    /// Create the provider
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SystemPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>, LinkError> {
        let ports =
            serialport::available_ports().map_err(|e| LinkError::Enumeration(e.to_string()))?;
        Ok(ports
            .into_iter()
            .map(|p| PortInfo {
                description: describe(&p.port_type),
                name: p.port_name,
            })
            .collect())
    }

    fn open(&self, port: &str, settings: &PortSettings) -> Result<Box<dyn SerialLink>, LinkError> {
        let inner = serialport::new(port, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| LinkError::Open {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SystemLink {
            port: port.to_string(),
            inner,
            lines: LineBuffer::new(),
        }))
    }
}

fn describe(port_type: &SerialPortType) -> Option<String> {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let mut parts = vec!["USB".to_string()];
            parts.extend(info.manufacturer.iter().cloned());
            parts.extend(info.product.iter().cloned());
            Some(parts.join(" "))
        }
        SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
        SerialPortType::PciPort => Some("PCI".to_string()),
        SerialPortType::Unknown => None,
    }
}

/// An open hardware port
pub struct SystemLink {
    port: String,
    inner: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl SystemLink {
    fn io_error(&self, e: impl std::fmt::Display) -> LinkError {
        LinkError::Io {
            port: self.port.clone(),
            reason: e.to_string(),
        }
    }
}

impl SerialLink for SystemLink {
    fn port(&self) -> &str {
        &self.port
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.lines.clear();
        self.inner
            .clear(ClearBuffer::Input)
            .map_err(|e| self.io_error(e))
    }

    fn read_lines(&mut self) -> Result<Vec<String>, LinkError> {
        let mut lines = Vec::new();
        let mut remaining = self.inner.bytes_to_read().map_err(|e| self.io_error(e))? as usize;
        let mut buf = [0u8; READ_CHUNK];

        while remaining > 0 {
            let want = remaining.min(READ_CHUNK);
            match self.inner.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => {
                    lines.extend(self.lines.push(&buf[..n]));
                    remaining = remaining.saturating_sub(n);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        }

        Ok(lines)
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.inner
            .write_all(&bytes)
            .and_then(|_| self.inner.flush())
            .map_err(|e| self.io_error(e))
    }

    fn discarded_partials(&self) -> u64 {
        self.lines.overflows()
    }
}

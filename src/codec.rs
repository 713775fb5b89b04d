// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Line codec for the unit wire format
//!
//! Units emit one line per sample:
//!
//! ```text
//! TEMP:28.4|TURB:36.1|EC:10.2|PH:7.0|DO:6.1|LAT:4.210500|LON:6.437500|BAT:84.9
//! ```
//!
//! Decoding is field-tolerant: a malformed field is dropped and the rest of
//! the line is kept. It never fails.

use crate::protocol::{Channel, PartialReading, Reading, Unit};

/// Field separator
pub const FIELD_SEPARATOR: char = '|';

/// Key/value separator
pub const KEY_SEPARATOR: char = ':';

/// Result of decoding one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedLine {
    /// Accepted values
    pub values: PartialReading,
    /// Fields that were accepted (duplicates counted each time)
    pub accepted: usize,
    /// Fields that were dropped
    pub dropped: usize,
}

/// Decode one line into a partial reading
///
/// ```rust
/// use seawatch::codec::decode;
/// use seawatch::Channel;
///
/// let values = decode("temp: 28.5 °C|TURB:x|PH:7.1");
/// assert_eq!(values.get(Channel::Temperature), Some(28.5));
/// assert_eq!(values.get(Channel::Turbidity), None);
/// assert_eq!(values.get(Channel::Ph), Some(7.1));
/// ```
pub fn decode(line: &str) -> PartialReading {
    decode_line(line).values
}

/// Decode raw bytes (invalid UTF-8 is replaced, never rejected)
pub fn decode_bytes(bytes: &[u8]) -> PartialReading {
    decode_line(&String::from_utf8_lossy(bytes)).values
}

/// Decode one line, reporting how many fields were kept and dropped
pub fn decode_line(line: &str) -> DecodedLine {
    let mut decoded = DecodedLine::default();

    for field in line.trim().split(FIELD_SEPARATOR) {
        if field.trim().is_empty() {
            continue;
        }
        match decode_field(field) {
            Some((channel, value)) => {
                decoded.values.set(channel, value);
                decoded.accepted += 1;
            }
            None => decoded.dropped += 1,
        }
    }

    decoded
}

fn decode_field(field: &str) -> Option<(Channel, f64)> {
    let (key, raw) = field.split_once(KEY_SEPARATOR)?;
    let channel = Channel::from_key(&key.trim().to_ascii_uppercase())?;

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some((channel, value))
}

/// Encode a reading in its unit's key order
///
/// Absent channels are skipped. LAT/LON carry six decimals, every other
/// channel one.
pub fn encode(reading: &Reading) -> String {
    encode_values(reading.unit, &reading.values)
}

/// Encode a value set in the key order of `unit`
pub fn encode_values(unit: Unit, values: &PartialReading) -> String {
    let mut out = String::with_capacity(unit.channels().len() * 12);
    for &channel in unit.channels() {
        if let Some(value) = values.get(channel) {
            if !out.is_empty() {
                out.push(FIELD_SEPARATOR);
            }
            out.push_str(channel.key());
            out.push(KEY_SEPARATOR);
            out.push_str(&format!("{:.*}", channel.decimals(), value));
        }
    }
    out
}

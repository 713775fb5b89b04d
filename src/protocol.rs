//! Protocol definitions for Seawatch
//!
//! This module defines the core telemetry types:
//! - Units and their channel sets
//! - The closed channel vocabulary with wire keys and physical ranges
//! - Typed partial updates and full readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote sensing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Mobile drone following waypoints
    Drone,
    /// Moored buoy
    Buoy,
}

impl Unit {
    /// Every unit, in a fixed order
    pub const ALL: [Unit; 2] = [Unit::Drone, Unit::Buoy];

    /// Channels reported by this unit, in wire order
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            Unit::Drone => &DRONE_CHANNELS,
            Unit::Buoy => &BUOY_CHANNELS,
        }
    }

    /// Check whether a channel belongs to this unit
    pub fn reports(&self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }

    /// Lowercase name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Drone => "drone",
            Unit::Buoy => "buoy",
        }
    }

    /// Index into per-unit arrays
    pub fn index(&self) -> usize {
        match self {
            Unit::Drone => 0,
            Unit::Buoy => 1,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Drone => write!(f, "Drone"),
            Unit::Buoy => write!(f, "Buoy"),
        }
    }
}

/// A scalar telemetry channel
///
/// The serde name of each variant is its wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Water temperature (°C)
    #[serde(rename = "TEMP")]
    Temperature = 0,
    /// Turbidity (NTU)
    #[serde(rename = "TURB")]
    Turbidity = 1,
    /// Conductivity (mS/cm)
    #[serde(rename = "EC")]
    Conductivity = 2,
    /// pH
    #[serde(rename = "PH")]
    Ph = 3,
    /// Dissolved oxygen (mg/L)
    #[serde(rename = "DO")]
    DissolvedOxygen = 4,
    /// Latitude (degrees)
    #[serde(rename = "LAT")]
    Latitude = 5,
    /// Longitude (degrees)
    #[serde(rename = "LON")]
    Longitude = 6,
    /// Battery level (%)
    #[serde(rename = "BAT")]
    Battery = 7,
    /// Water pressure (bar)
    #[serde(rename = "PRESS")]
    Pressure = 8,
    /// Wave height (m)
    #[serde(rename = "WAVE")]
    WaveHeight = 9,
    /// Current speed (m/s)
    #[serde(rename = "CURRENT")]
    CurrentSpeed = 10,
    /// Air temperature (°C)
    #[serde(rename = "AIR_TEMP")]
    AirTemperature = 11,
    /// Wind speed (m/s)
    #[serde(rename = "WIND")]
    WindSpeed = 12,
    /// Relative humidity (%)
    #[serde(rename = "HUM")]
    Humidity = 13,
    /// Solar charging rate (%)
    #[serde(rename = "SOLAR")]
    SolarCharge = 14,
}

const DRONE_CHANNELS: [Channel; 8] = [
    Channel::Temperature,
    Channel::Turbidity,
    Channel::Conductivity,
    Channel::Ph,
    Channel::DissolvedOxygen,
    Channel::Latitude,
    Channel::Longitude,
    Channel::Battery,
];

const BUOY_CHANNELS: [Channel; 15] = [
    Channel::Temperature,
    Channel::Turbidity,
    Channel::Conductivity,
    Channel::Ph,
    Channel::DissolvedOxygen,
    Channel::Pressure,
    Channel::WaveHeight,
    Channel::CurrentSpeed,
    Channel::AirTemperature,
    Channel::WindSpeed,
    Channel::Humidity,
    Channel::Battery,
    Channel::SolarCharge,
    Channel::Latitude,
    Channel::Longitude,
];

impl Channel {
    /// Number of channels in the vocabulary
    pub const COUNT: usize = 15;

    /// Every channel, ordered by index
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Temperature,
        Channel::Turbidity,
        Channel::Conductivity,
        Channel::Ph,
        Channel::DissolvedOxygen,
        Channel::Latitude,
        Channel::Longitude,
        Channel::Battery,
        Channel::Pressure,
        Channel::WaveHeight,
        Channel::CurrentSpeed,
        Channel::AirTemperature,
        Channel::WindSpeed,
        Channel::Humidity,
        Channel::SolarCharge,
    ];

    /// Index into [`ChannelValues`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire key
    pub fn key(self) -> &'static str {
        match self {
            Channel::Temperature => "TEMP",
            Channel::Turbidity => "TURB",
            Channel::Conductivity => "EC",
            Channel::Ph => "PH",
            Channel::DissolvedOxygen => "DO",
            Channel::Latitude => "LAT",
            Channel::Longitude => "LON",
            Channel::Battery => "BAT",
            Channel::Pressure => "PRESS",
            Channel::WaveHeight => "WAVE",
            Channel::CurrentSpeed => "CURRENT",
            Channel::AirTemperature => "AIR_TEMP",
            Channel::WindSpeed => "WIND",
            Channel::Humidity => "HUM",
            Channel::SolarCharge => "SOLAR",
        }
    }

    /// Look up a channel by its wire key (exact, uppercase)
    pub fn from_key(key: &str) -> Option<Channel> {
        Channel::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Documented physical range `(min, max)`
    pub fn physical_range(self) -> (f64, f64) {
        match self {
            Channel::Temperature => (-5.0, 50.0),
            Channel::Turbidity => (0.0, 1000.0),
            Channel::Conductivity => (0.0, 100.0),
            Channel::Ph => (0.0, 14.0),
            Channel::DissolvedOxygen => (0.0, 20.0),
            Channel::Latitude => (-90.0, 90.0),
            Channel::Longitude => (-180.0, 180.0),
            Channel::Battery => (0.0, 100.0),
            Channel::Pressure => (0.0, 20.0),
            Channel::WaveHeight => (0.0, 20.0),
            Channel::CurrentSpeed => (0.0, 10.0),
            Channel::AirTemperature => (-20.0, 60.0),
            Channel::WindSpeed => (0.0, 75.0),
            Channel::Humidity => (0.0, 100.0),
            Channel::SolarCharge => (0.0, 100.0),
        }
    }

    /// Clamp a value into the physical range
    pub fn clamp(self, value: f64) -> f64 {
        let (min, max) = self.physical_range();
        value.clamp(min, max)
    }

    /// Decimal places used on the wire
    pub fn decimals(self) -> usize {
        match self {
            Channel::Latitude | Channel::Longitude => 6,
            _ => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Optional value per channel, indexed by [`Channel`]
///
/// Used both for decoded partial updates and for the value set of a
/// [`Reading`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelValues([Option<f64>; Channel::COUNT]);

/// A decoded line: only the channels present on the wire are set
pub type PartialReading = ChannelValues;

impl ChannelValues {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a channel value
    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.0[channel.index()]
    }

    /// Set a channel value
    pub fn set(&mut self, channel: Channel, value: f64) {
        self.0[channel.index()] = Some(value);
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.set(channel, value);
        self
    }

    /// Clear a channel value
    pub fn clear(&mut self, channel: Channel) {
        self.0[channel.index()] = None;
    }

    /// Number of present values
    pub fn len(&self) -> usize {
        self.0.iter().filter(|v| v.is_some()).count()
    }

    /// True if no channel is set
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Iterate over present values in channel index order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL
            .iter()
            .filter_map(move |&c| self.get(c).map(|v| (c, v)))
    }

    /// Overlay every present value of `other` onto `self`
    pub fn overlay(&mut self, other: &ChannelValues) {
        for (channel, value) in other.iter() {
            self.set(channel, value);
        }
    }
}

/// Origin of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Decoded from the unit's serial link
    Real,
    /// Produced by the unit's simulation
    Simulated,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Real => write!(f, "real"),
            Provenance::Simulated => write!(f, "simulated"),
        }
    }
}

/// One timestamped sample for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Reporting unit
    pub unit: Unit,
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// Where the values came from
    pub provenance: Provenance,
    /// Channel values (only channels of `unit` are ever set)
    pub values: ChannelValues,
}

impl Reading {
    /// Create a reading with no values
    pub fn new(unit: Unit, timestamp: DateTime<Utc>, provenance: Provenance) -> Self {
        Self {
            unit,
            timestamp,
            provenance,
            values: ChannelValues::new(),
        }
    }

    /// Create a reading from a value set, applying [`merge`](Self::merge) rules
    pub fn from_values(
        unit: Unit,
        timestamp: DateTime<Utc>,
        provenance: Provenance,
        values: &ChannelValues,
    ) -> Self {
        let mut reading = Self::new(unit, timestamp, provenance);
        reading.merge(values);
        reading
    }

    /// Get a channel value
    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.values.get(channel)
    }

    /// Merge a partial update into this reading
    ///
    /// Channels outside the unit's set and non-finite values are ignored;
    /// accepted values are clamped to their physical range. Returns the
    /// number of channels applied.
    pub fn merge(&mut self, partial: &PartialReading) -> usize {
        let mut applied = 0;
        for &channel in self.unit.channels() {
            match partial.get(channel) {
                Some(value) if value.is_finite() => {
                    self.values.set(channel, channel.clamp(value));
                    applied += 1;
                }
                _ => {}
            }
        }
        applied
    }
}

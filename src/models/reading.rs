//! Canonical pollutant identifiers and the `Reading` snapshot.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tracked pollutant.
///
/// The serialized form is the canonical identifier used by thresholds, alerts
/// and the session surface (`co`, `vocs`, `ch4Lpg`, `pm1_0`, `pm2_5`,
/// `pm10_0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    /// Carbon monoxide.
    #[serde(rename = "co")]
    Co,
    /// Volatile organic compounds.
    #[serde(rename = "vocs")]
    Vocs,
    /// Methane / liquefied petroleum gas.
    #[serde(rename = "ch4Lpg")]
    Ch4Lpg,
    /// Particulate matter up to 1.0 µm.
    #[serde(rename = "pm1_0")]
    Pm1,
    /// Particulate matter up to 2.5 µm.
    #[serde(rename = "pm2_5")]
    Pm25,
    /// Particulate matter up to 10 µm.
    #[serde(rename = "pm10_0")]
    Pm10,
}

/// Error returned when parsing an unknown pollutant identifier.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown pollutant identifier: {0}")]
pub struct UnknownPollutant(pub String);

impl Pollutant {
    /// All tracked pollutants, in display order.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Co,
        Pollutant::Vocs,
        Pollutant::Ch4Lpg,
        Pollutant::Pm1,
        Pollutant::Pm25,
        Pollutant::Pm10,
    ];

    /// Canonical identifier.
    pub fn id(self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::Vocs => "vocs",
            Pollutant::Ch4Lpg => "ch4Lpg",
            Pollutant::Pm1 => "pm1_0",
            Pollutant::Pm25 => "pm2_5",
            Pollutant::Pm10 => "pm10_0",
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Pollutant::Co => "Carbon Monoxide",
            Pollutant::Vocs => "VOCs",
            Pollutant::Ch4Lpg => "Methane/LPG",
            Pollutant::Pm1 => "PM1.0",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
        }
    }

    /// Canonical unit of the concentration.
    pub fn unit(self) -> &'static str {
        match self {
            Pollutant::Co | Pollutant::Ch4Lpg => "ppm",
            Pollutant::Vocs => "ppb",
            Pollutant::Pm1 | Pollutant::Pm25 | Pollutant::Pm10 => "µg/m³",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Pollutant {
    type Err = UnknownPollutant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pollutant::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| UnknownPollutant(s.to_string()))
    }
}

/// One canonical snapshot of all tracked pollutant concentrations.
///
/// Values are non-negative and expressed in the unit returned by
/// [`Pollutant::unit`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "co")]
    co: f64,
    #[serde(rename = "vocs")]
    vocs: f64,
    #[serde(rename = "ch4Lpg")]
    ch4_lpg: f64,
    #[serde(rename = "pm1_0")]
    pm1_0: f64,
    #[serde(rename = "pm2_5")]
    pm2_5: f64,
    #[serde(rename = "pm10_0")]
    pm10_0: f64,
}

impl Reading {
    /// Builds a reading by asking `value` for each pollutant. Negative and
    /// non-finite values are stored as `0`.
    pub fn from_fn(mut value: impl FnMut(Pollutant) -> f64) -> Self {
        let mut clamp = |p| {
            let v = value(p);
            if v.is_finite() && v > 0.0 { v } else { 0.0 }
        };
        Self {
            co: clamp(Pollutant::Co),
            vocs: clamp(Pollutant::Vocs),
            ch4_lpg: clamp(Pollutant::Ch4Lpg),
            pm1_0: clamp(Pollutant::Pm1),
            pm2_5: clamp(Pollutant::Pm25),
            pm10_0: clamp(Pollutant::Pm10),
        }
    }

    /// Concentration of `pollutant`.
    pub fn get(&self, pollutant: Pollutant) -> f64 {
        match pollutant {
            Pollutant::Co => self.co,
            Pollutant::Vocs => self.vocs,
            Pollutant::Ch4Lpg => self.ch4_lpg,
            Pollutant::Pm1 => self.pm1_0,
            Pollutant::Pm25 => self.pm2_5,
            Pollutant::Pm10 => self.pm10_0,
        }
    }

    /// Iterates over `(pollutant, value)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, f64)> + '_ {
        Pollutant::ALL.into_iter().map(|p| (p, self.get(p)))
    }

    /// Returns a copy of this reading with one concentration replaced.
    pub fn with(self, pollutant: Pollutant, value: f64) -> Self {
        Reading::from_fn(|p| if p == pollutant { value } else { self.get(p) })
    }
}

impl From<Reading> for common_models::AnalysisRequest {
    fn from(reading: Reading) -> Self {
        Self {
            co: reading.co,
            vocs: reading.vocs,
            ch4_lpg: reading.ch4_lpg,
            pm1_0: reading.pm1_0,
            pm2_5: reading.pm2_5,
            pm10_0: reading.pm10_0,
        }
    }
}

/// A reading paired with its capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// The captured concentrations.
    #[serde(flatten)]
    pub reading: Reading,
}

impl HistoricalEntry {
    /// Creates a new entry.
    pub fn new(reading: Reading, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, reading }
    }
}

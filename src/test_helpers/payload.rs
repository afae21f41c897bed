//! Builders for readings and raw sensor payloads.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::models::{Pollutant, Reading};

/// A builder for creating `Reading` instances in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadingBuilder {
    reading: Reading,
}

impl ReadingBuilder {
    /// Creates a builder with every pollutant at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CO concentration (ppm).
    pub fn co(self, value: f64) -> Self {
        self.value(Pollutant::Co, value)
    }

    /// Sets the PM2.5 concentration (µg/m³).
    pub fn pm2_5(self, value: f64) -> Self {
        self.value(Pollutant::Pm25, value)
    }

    /// Sets any pollutant.
    pub fn value(mut self, pollutant: Pollutant, value: f64) -> Self {
        self.reading = self.reading.with(pollutant, value);
        self
    }

    /// Builds the reading.
    pub fn build(self) -> Reading {
        self.reading
    }
}

/// A builder for raw sensor payloads in the shape the device publishes
/// (`CO_ppm`, `PM2_5_ug_m3`, ...).
#[derive(Debug, Default, Clone)]
pub struct PayloadBuilder {
    fields: Map<String, Value>,
}

impl PayloadBuilder {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `CO_ppm`.
    pub fn co_ppm(self, value: f64) -> Self {
        self.field("CO_ppm", json!(value))
    }

    /// Sets `VOCs_ppm`.
    pub fn vocs_ppm(self, value: f64) -> Self {
        self.field("VOCs_ppm", json!(value))
    }

    /// Sets `PM2_5_ug_m3`.
    pub fn pm2_5(self, value: f64) -> Self {
        self.field("PM2_5_ug_m3", json!(value))
    }

    /// Sets the capture timestamp.
    pub fn timestamp(self, at: DateTime<Utc>) -> Self {
        self.field("timestamp", json!(at.timestamp_millis()))
    }

    /// Sets an arbitrary field.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Builds the payload.
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

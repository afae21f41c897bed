//! Maps raw sensor payloads into canonical [`Reading`]s.
//!
//! The normalizer is a pure function: the same payload always yields the same
//! result. A payload with no recognizable pollutant key means the sensor is
//! offline and yields `None` rather than a zeroed reading.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::models::{Pollutant, Reading};

/// Payload key carrying the capture time in epoch milliseconds.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Raw payload keys per pollutant with the factor that converts the raw value
/// into the canonical unit.
const SOURCE_KEYS: [(Pollutant, &str, f64); 6] = [
    (Pollutant::Co, "CO_ppm", 1.0),
    (Pollutant::Vocs, "VOCs_ppm", 1000.0),
    (Pollutant::Ch4Lpg, "CH4_LPG_ppm", 1.0),
    (Pollutant::Pm1, "PM1_0_ug_m3", 1.0),
    (Pollutant::Pm25, "PM2_5_ug_m3", 1.0),
    (Pollutant::Pm10, "PM10_ug_m3", 1.0),
];

/// Minimum number of recognizable pollutant keys for a payload to count as a
/// reading.
const MIN_RECOGNIZED_KEYS: usize = 1;

/// Normalizes a raw payload.
///
/// Returns `None` (sensor offline) for `null`, non-object payloads and objects
/// without any recognizable pollutant key. Recognized payloads default missing
/// or malformed fields to `0`.
pub fn normalize(payload: &Value) -> Option<Reading> {
    let root = payload.as_object()?;

    let mut recognized = 0;
    let reading = Reading::from_fn(|pollutant| match lookup(root, pollutant) {
        Some(value) => {
            recognized += 1;
            value
        }
        None => 0.0,
    });

    if recognized < MIN_RECOGNIZED_KEYS {
        tracing::debug!("Payload contains no recognizable pollutant keys, treating as absent.");
        return None;
    }
    Some(reading)
}

/// Extracts the capture timestamp carried by the payload, if any.
pub fn capture_timestamp(payload: &Value) -> Option<DateTime<Utc>> {
    let millis = payload.get(TIMESTAMP_KEY)?.as_i64()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Finds the value for `pollutant` at the top level or one level down inside a
/// sensor-specific object. Top-level keys win.
fn lookup(root: &Map<String, Value>, pollutant: Pollutant) -> Option<f64> {
    find_in(root, pollutant).or_else(|| {
        root.values().filter_map(Value::as_object).find_map(|nested| find_in(nested, pollutant))
    })
}

fn find_in(object: &Map<String, Value>, pollutant: Pollutant) -> Option<f64> {
    let (_, source_key, factor) = SOURCE_KEYS.iter().find(|(p, _, _)| *p == pollutant)?;

    if let Some(raw) = object.get(*source_key) {
        return Some(numeric(raw) * factor);
    }
    object.get(pollutant.id()).map(numeric)
}

/// Coerces a JSON value to a concentration; anything unusable becomes `0`.
fn numeric(value: &Value) -> f64 {
    let v = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_maps_raw_keys_and_converts_vocs_to_ppb() {
        let reading = normalize(&json!({
            "CO_ppm": 1.5,
            "VOCs_ppm": 0.25,
            "CH4_LPG_ppm": 3,
            "PM1_0_ug_m3": 4,
            "PM2_5_ug_m3": 10.5,
            "PM10_ug_m3": 20,
        }))
        .unwrap();

        assert_eq!(reading.get(Pollutant::Co), 1.5);
        assert_eq!(reading.get(Pollutant::Vocs), 250.0);
        assert_eq!(reading.get(Pollutant::Ch4Lpg), 3.0);
        assert_eq!(reading.get(Pollutant::Pm1), 4.0);
        assert_eq!(reading.get(Pollutant::Pm25), 10.5);
        assert_eq!(reading.get(Pollutant::Pm10), 20.0);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let reading = normalize(&json!({ "PM2_5_ug_m3": 12 })).unwrap();
        assert_eq!(reading.get(Pollutant::Pm25), 12.0);
        assert_eq!(reading.get(Pollutant::Co), 0.0);
    }

    #[test]
    fn test_null_and_unrecognized_payloads_are_absent() {
        assert_eq!(normalize(&Value::Null), None);
        assert_eq!(normalize(&json!({})), None);
        assert_eq!(normalize(&json!({ "temperature": 21.0 })), None);
        assert_eq!(normalize(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_reads_keys_nested_under_sensor_names() {
        let reading = normalize(&json!({
            "MQ7": { "CO_ppm": 2.0 },
            "PMS5003": { "PM2_5_ug_m3": 8, "PM10_ug_m3": "14.5" },
        }))
        .unwrap();
        assert_eq!(reading.get(Pollutant::Co), 2.0);
        assert_eq!(reading.get(Pollutant::Pm25), 8.0);
        assert_eq!(reading.get(Pollutant::Pm10), 14.5);
    }

    #[test]
    fn test_top_level_keys_win_over_nested() {
        let reading =
            normalize(&json!({ "CO_ppm": 1.0, "MQ7": { "CO_ppm": 9.0 } })).unwrap();
        assert_eq!(reading.get(Pollutant::Co), 1.0);
    }

    #[test]
    fn test_canonical_ids_are_accepted_without_conversion() {
        let reading = normalize(&json!({ "vocs": 120, "pm2_5": 7 })).unwrap();
        assert_eq!(reading.get(Pollutant::Vocs), 120.0);
        assert_eq!(reading.get(Pollutant::Pm25), 7.0);
    }

    #[test]
    fn test_malformed_values_default_to_zero() {
        let reading = normalize(&json!({
            "CO_ppm": "n/a",
            "PM2_5_ug_m3": -4,
            "PM10_ug_m3": null,
        }))
        .unwrap();
        assert_eq!(reading, Reading::default());
    }

    #[test]
    fn test_extracts_capture_timestamp() {
        let ts = capture_timestamp(&json!({ "timestamp": 1_700_000_000_000_i64 })).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(capture_timestamp(&json!({ "CO_ppm": 1 })), None);
    }
}

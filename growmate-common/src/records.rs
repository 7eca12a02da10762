//! Log record data model
//!
//! Log sources hand records over as raw JSON objects keyed by an opaque id.
//! The typed views here convert those objects field by field. Numeric fields
//! may arrive as JSON numbers or as numeric strings (the field hardware posts
//! both); anything else is a conversion failure naming the offending field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw collection as delivered by a log source: record id -> JSON object
pub type RawCollection = BTreeMap<String, Value>;

/// Why a single record could not be converted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("referenced sensor log '{0}' not found")]
    MissingSensorLog(String),
}

/// Convert a JSON value to a finite f64
///
/// Accepts numbers and strings holding a number (surrounding whitespace allowed).
pub fn coerce_f64(value: &Value, field: &'static str) -> Result<f64, RecordError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => return Err(RecordError::MissingField(field)),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(RecordError::NotNumeric {
            field,
            value: value.to_string(),
        }),
    }
}

fn object(record: &Value) -> Result<&serde_json::Map<String, Value>, RecordError> {
    record.as_object().ok_or(RecordError::NotAnObject)
}

fn required_f64(
    map: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<f64, RecordError> {
    let value = map.get(field).ok_or(RecordError::MissingField(field))?;
    coerce_f64(value, field)
}

/// Environmental conditions captured before watering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorLog {
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Light intensity (unitless)
    pub light: f64,
    /// Soil moisture before watering (%)
    pub moisture_before: f64,
}

impl SensorLog {
    pub fn from_raw(record: &Value) -> Result<Self, RecordError> {
        let map = object(record)?;
        Ok(Self {
            moisture_before: required_f64(map, "moisture_before")?,
            temperature: required_f64(map, "temperature")?,
            humidity: required_f64(map, "humidity")?,
            light: required_f64(map, "light")?,
        })
    }
}

/// Result of a watering run, referencing the sensor log it was based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLog {
    pub sensor_log_id: String,
    /// Watering time actually applied (seconds)
    pub predicted_time: f64,
    /// Soil moisture after watering (%)
    pub moisture_after: f64,
}

impl OutcomeLog {
    pub fn from_raw(record: &Value) -> Result<Self, RecordError> {
        let map = object(record)?;

        let sensor_log_id = match map.get("sensor_log_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(RecordError::MissingField("sensor_log_id")),
        };

        // Devices write `predicted_watering_time`; older records use `predicted_time`
        let predicted_time = match map.get("predicted_watering_time") {
            Some(value) => coerce_f64(value, "predicted_watering_time")?,
            None => required_f64(map, "predicted_time")?,
        };

        Ok(Self {
            sensor_log_id,
            predicted_time,
            moisture_after: required_f64(map, "moisture_after")?,
        })
    }
}

/// Self-contained record carrying both conditions and outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub sensor: SensorLog,
    /// Watering time applied; 0 when the record does not carry one
    pub predicted_time: f64,
    pub moisture_after: f64,
}

impl FlatRecord {
    pub fn from_raw(record: &Value) -> Result<Self, RecordError> {
        let map = object(record)?;
        let sensor = SensorLog::from_raw(record)?;

        let predicted_time = match map.get("predicted_time") {
            Some(value) => coerce_f64(value, "predicted_time")?,
            None => 0.0,
        };

        Ok(Self {
            sensor,
            predicted_time,
            moisture_after: required_f64(map, "moisture_after")?,
        })
    }
}

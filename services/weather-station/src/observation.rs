//! Observation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readings for one sampling window, before the store stamps it
///
/// Instantaneous readings are `None` when their sensor failed; wind speed
/// and rain always have a value because they come from tick counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_kph: f64,
    pub rain_mm: f64,
    pub wind_dir_voltage: Option<f64>,
    pub battery_volts: Option<f64>,
    pub battery_current_ma: Option<f64>,
}

/// A persisted observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_kph: f64,
    pub rain_mm: f64,
    pub wind_dir_voltage: Option<f64>,
    pub battery_volts: Option<f64>,
    pub battery_current_ma: Option<f64>,
}

impl Observation {
    pub fn from_draft(id: i64, timestamp: DateTime<Utc>, draft: NewObservation) -> Self {
        Self {
            id,
            timestamp,
            temperature_c: draft.temperature_c,
            humidity_pct: draft.humidity_pct,
            pressure_hpa: draft.pressure_hpa,
            wind_speed_kph: draft.wind_speed_kph,
            rain_mm: draft.rain_mm,
            wind_dir_voltage: draft.wind_dir_voltage,
            battery_volts: draft.battery_volts,
            battery_current_ma: draft.battery_current_ma,
        }
    }
}

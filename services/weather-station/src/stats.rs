//! Query-time aggregates: chart series and period statistics
//!
//! Nothing here is persisted; both are rebuilt on every query.

use serde::{Deserialize, Serialize};

/// One chart bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub rain: f64,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_avg: f64,
    pub wind_gust: f64,
}

/// Buckets in ascending time order
///
/// Serializes column-wise, the layout the dashboard charts consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(into = "ChartColumns")]
pub struct BucketedSeries {
    pub points: Vec<SeriesPoint>,
}

impl BucketedSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ChartColumns {
    labels: Vec<String>,
    rain: Vec<f64>,
    temp: Vec<Option<f64>>,
    hum: Vec<Option<f64>>,
    pres: Vec<Option<f64>>,
    wind: Vec<f64>,
    gust: Vec<f64>,
}

impl From<BucketedSeries> for ChartColumns {
    fn from(series: BucketedSeries) -> Self {
        let n = series.points.len();
        let mut columns = ChartColumns {
            labels: Vec::with_capacity(n),
            rain: Vec::with_capacity(n),
            temp: Vec::with_capacity(n),
            hum: Vec::with_capacity(n),
            pres: Vec::with_capacity(n),
            wind: Vec::with_capacity(n),
            gust: Vec::with_capacity(n),
        };
        for p in series.points {
            columns.labels.push(p.label);
            columns.rain.push(p.rain);
            columns.temp.push(p.temp);
            columns.hum.push(p.humidity);
            columns.pres.push(p.pressure);
            columns.wind.push(p.wind_avg);
            columns.gust.push(p.wind_gust);
        }
        columns
    }
}

/// Whole-window aggregates
///
/// Every aggregate over an empty window is 0 so insight arithmetic never has
/// to handle a missing value. Only the dew point can be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    #[serde(rename = "total_rain")]
    pub total_rain_mm: f64,
    #[serde(rename = "avg_temp")]
    pub avg_temp_c: f64,
    #[serde(rename = "max_temp")]
    pub max_temp_c: f64,
    #[serde(rename = "min_temp")]
    pub min_temp_c: f64,
    #[serde(rename = "max_wind")]
    pub max_wind_kph: f64,
    #[serde(rename = "avg_wind")]
    pub avg_wind_kph: f64,
    #[serde(rename = "avg_hum")]
    pub avg_humidity_pct: f64,
    #[serde(rename = "avg_pres")]
    pub avg_pressure_hpa: f64,
    #[serde(rename = "batt_volts")]
    pub avg_battery_volts: f64,
    pub dew_point: Option<f64>,
}

/// The comparison period; only pressure is tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousPeriod {
    pub avg_pressure_hpa: f64,
}

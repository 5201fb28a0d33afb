//! Configuration types for the weather station service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::units::{KPH_PER_TICK_HZ, MM_PER_TIP};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default = "default_wind")]
    pub wind: PulseSensorConfig,
    #[serde(default = "default_rain")]
    pub rain: PulseSensorConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sampling: SamplingConfig::default(),
            wind: default_wind(),
            rain: default_rain(),
            sensors: SensorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Observation database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Sampling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Pause after an unexpected cycle failure before sampling resumes
    #[serde(default = "default_error_backoff", with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            error_backoff: default_error_backoff(),
        }
    }
}

/// An interrupt-driven sensor (anemometer or rain bucket)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseSensorConfig {
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
    /// kph per tick/s for the anemometer, mm per tip for the rain bucket
    pub calibration: f64,
}

/// Source of instantaneous readings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorConfig {
    #[serde(rename = "simulated")]
    Simulated {
        #[serde(default = "default_sim_temperature")]
        temperature_c: f64,
        #[serde(default = "default_sim_humidity")]
        humidity_pct: f64,
        #[serde(default = "default_sim_pressure")]
        pressure_hpa: f64,
        #[serde(default = "default_sim_direction_voltage")]
        direction_voltage: f64,
        /// Anemometer edges per second, 0 disables the feed
        #[serde(default = "default_sim_wind_rate")]
        wind_ticks_per_second: f64,
        /// Rain bucket tips per hour, 0 disables the feed
        #[serde(default)]
        rain_tips_per_hour: f64,
        #[serde(default)]
        battery_volts: Option<f64>,
    },
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig::Simulated {
            temperature_c: default_sim_temperature(),
            humidity_pct: default_sim_humidity(),
            pressure_hpa: default_sim_pressure(),
            direction_voltage: default_sim_direction_voltage(),
            wind_ticks_per_second: default_sim_wind_rate(),
            rain_tips_per_hour: 0.0,
            battery_volts: None,
        }
    }
}

impl SensorConfig {
    pub fn type_name(&self) -> &str {
        match self {
            SensorConfig::Simulated { .. } => "simulated",
        }
    }
}

/// HTTP query server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_server_port(),
        }
    }
}

impl Config {
    /// Reject settings the sampler cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.sampling.interval.is_zero() {
            return Err(crate::StationError::Config(
                "sampling interval must be greater than zero".to_string(),
            ));
        }
        for (name, sensor) in [("wind", &self.wind), ("rain", &self.rain)] {
            if !(sensor.calibration.is_finite() && sensor.calibration >= 0.0) {
                return Err(crate::StationError::Config(format!(
                    "{} calibration must be a non-negative number, got {}",
                    name, sensor.calibration
                )));
            }
        }
        Ok(())
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("/home/weatherstation/weather_data/weather.db")
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_error_backoff() -> Duration {
    Duration::from_secs(5)
}

fn default_wind() -> PulseSensorConfig {
    PulseSensorConfig {
        debounce: Duration::from_millis(10),
        calibration: KPH_PER_TICK_HZ,
    }
}

fn default_rain() -> PulseSensorConfig {
    PulseSensorConfig {
        debounce: Duration::from_millis(100),
        calibration: MM_PER_TIP,
    }
}

fn default_sim_temperature() -> f64 {
    15.0
}

fn default_sim_humidity() -> f64 {
    65.0
}

fn default_sim_pressure() -> f64 {
    1013.25
}

fn default_sim_direction_voltage() -> f64 {
    1.2
}

fn default_sim_wind_rate() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_server_port() -> u16 {
    5000
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::StationError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

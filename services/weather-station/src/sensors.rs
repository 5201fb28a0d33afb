//! Instantaneous sensor readings
//!
//! The hardware drivers (BME280 over I2C, ADS1015 for the wind vane, INA219
//! for the battery, GPIO edge detection) live outside this crate. The sampler
//! only sees the [`SensorSource`] trait and the pulse accumulators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SensorConfig;
use crate::pulse::PulseAccumulator;

/// One temperature/humidity/pressure reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
}

/// Battery monitor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub volts: f64,
    pub current_ma: f64,
}

/// Point-in-time physical readings, each of which may fail independently
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource: Send + Sync {
    /// Temperature, humidity and pressure from the combined environmental sensor
    async fn read_atmosphere(&self) -> crate::Result<AtmosphericReading>;

    /// Raw voltage of the wind vane divider
    async fn read_wind_direction_voltage(&self) -> crate::Result<f64>;

    /// Battery voltage and current, when a battery monitor is fitted
    async fn read_battery(&self) -> crate::Result<BatteryReading>;
}

/// Config-driven stand-in for the station hardware
///
/// Readings drift slowly around the configured base values so charts and
/// insights have something to show.
#[derive(Debug)]
pub struct SimulatedSensors {
    temperature_c: f64,
    humidity_pct: f64,
    pressure_hpa: f64,
    direction_voltage: f64,
    battery_volts: Option<f64>,
    reads: AtomicU64,
}

impl SimulatedSensors {
    pub fn new(config: &SensorConfig) -> Self {
        match config {
            SensorConfig::Simulated {
                temperature_c,
                humidity_pct,
                pressure_hpa,
                direction_voltage,
                battery_volts,
                ..
            } => Self {
                temperature_c: *temperature_c,
                humidity_pct: *humidity_pct,
                pressure_hpa: *pressure_hpa,
                direction_voltage: *direction_voltage,
                battery_volts: *battery_volts,
                reads: AtomicU64::new(0),
            },
        }
    }

    fn phase(&self) -> f64 {
        // One full swing every 1440 reads, a day at the default cadence
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        (n % 1440) as f64 / 1440.0 * std::f64::consts::TAU
    }
}

#[async_trait]
impl SensorSource for SimulatedSensors {
    async fn read_atmosphere(&self) -> crate::Result<AtmosphericReading> {
        let phase = self.phase();
        Ok(AtmosphericReading {
            temperature_c: self.temperature_c + 4.0 * phase.sin(),
            humidity_pct: (self.humidity_pct - 10.0 * phase.sin()).clamp(0.0, 100.0),
            pressure_hpa: self.pressure_hpa + 1.5 * phase.cos(),
        })
    }

    async fn read_wind_direction_voltage(&self) -> crate::Result<f64> {
        Ok(self.direction_voltage)
    }

    async fn read_battery(&self) -> crate::Result<BatteryReading> {
        self.battery_volts
            .map(|volts| BatteryReading {
                volts,
                current_ma: 0.0,
            })
            .ok_or_else(|| {
                crate::StationError::SensorUnavailable("no battery monitor fitted".to_string())
            })
    }
}

/// Feed evenly spaced edges into an accumulator until cancelled
///
/// Stands in for the GPIO edge callback. A non-positive rate spawns nothing.
pub fn spawn_pulse_simulator(
    name: &'static str,
    accumulator: Arc<PulseAccumulator>,
    edges_per_second: f64,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !(edges_per_second.is_finite() && edges_per_second > 0.0) {
        return None;
    }
    let period = Duration::from_secs_f64(1.0 / edges_per_second);
    tracing::debug!("Simulating {} edges every {:?}", name, period);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    accumulator.accept(Instant::now());
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("{} edge simulator stopped", name);
                    break;
                }
            }
        }
    }))
}

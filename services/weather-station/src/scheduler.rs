//! Fixed-interval sampling cycle
//!
//! Each cycle moves `Idle -> Sampling -> Persisting -> Idle`. Sampling drains
//! the pulse accumulators and reads the instantaneous sensors; a failed
//! sensor only blanks its own fields. Persisting hands the observation to the
//! sink once; a failed write drops that observation and the next cycle runs
//! on schedule. Cycles never overlap: a slow cycle delays the next tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::StationError;
use crate::observation::{NewObservation, Observation};
use crate::pulse::PulseAccumulator;
use crate::sensors::SensorSource;
use crate::store::ObservationSink;
use crate::units::{rain_mm, round_to, wind_speed_kph};

/// Where the sampler is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Sampling,
    Persisting,
}

/// Result of a completed cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Persisted(Observation),
    /// The write failed; the observation is gone and will not be retried
    Dropped(StationError),
}

/// Produces one observation per interval
pub struct SamplingScheduler {
    sensors: Arc<dyn SensorSource>,
    sink: Arc<dyn ObservationSink>,
    wind: Arc<PulseAccumulator>,
    rain: Arc<PulseAccumulator>,
    interval: Duration,
    error_backoff: Duration,
    kph_per_hz: f64,
    mm_per_tip: f64,
    phase: CyclePhase,
    window_start: Instant,
}

impl SamplingScheduler {
    pub fn new(
        config: &Config,
        sensors: Arc<dyn SensorSource>,
        sink: Arc<dyn ObservationSink>,
        wind: Arc<PulseAccumulator>,
        rain: Arc<PulseAccumulator>,
    ) -> Self {
        Self {
            sensors,
            sink,
            wind,
            rain,
            interval: config.sampling.interval,
            error_backoff: config.sampling.error_backoff,
            kph_per_hz: config.wind.calibration,
            mm_per_tip: config.rain.calibration,
            phase: CyclePhase::Idle,
            window_start: Instant::now(),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Start a fresh window, discarding edges counted so far
    pub fn reset_window(&mut self) {
        self.wind.drain();
        self.rain.drain();
        self.window_start = Instant::now();
    }

    /// Sample until cancelled
    ///
    /// Cancellation is only observed between cycles, so an insert that has
    /// started always completes or fails on its own terms.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.reset_window();

        info!("Sampling every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => {
                    debug!("Sampling loop cancelled");
                    break;
                }
            }

            match self.run_cycle().await {
                Ok(CycleOutcome::Persisted(observation)) => {
                    debug!("Cycle complete: observation {}", observation.id);
                }
                Ok(CycleOutcome::Dropped(_)) => {}
                Err(e) => {
                    error!(
                        "Sampling cycle failed: {}. Resuming in {:?}",
                        e, self.error_backoff
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.error_backoff) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }

        info!("Sampling stopped");
    }

    /// Run one complete cycle ending now
    ///
    /// Persistence failures come back as [`CycleOutcome::Dropped`]; any other
    /// error is unexpected and returned to the caller.
    pub async fn run_cycle(&mut self) -> crate::Result<CycleOutcome> {
        let draft = self.sample().await;

        self.phase = CyclePhase::Persisting;
        let result = self.sink.persist(draft).await;
        self.phase = CyclePhase::Idle;

        match result {
            Ok(observation) => Ok(CycleOutcome::Persisted(observation)),
            Err(e @ StationError::Persistence(_)) => {
                warn!("Dropping observation, write failed: {}", e);
                Ok(CycleOutcome::Dropped(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Close the current window and collect its readings
    pub async fn sample(&mut self) -> NewObservation {
        self.phase = CyclePhase::Sampling;

        let drained_at = Instant::now();
        let wind_ticks = self.wind.drain();
        let rain_ticks = self.rain.drain();
        let window = drained_at.saturating_duration_since(self.window_start);
        self.window_start = drained_at;

        let mut draft = NewObservation {
            wind_speed_kph: wind_speed_kph(wind_ticks, window.as_secs_f64(), self.kph_per_hz),
            rain_mm: rain_mm(rain_ticks, self.mm_per_tip),
            ..NewObservation::default()
        };

        match self.sensors.read_atmosphere().await {
            Ok(reading) => {
                draft.temperature_c = Some(round_to(reading.temperature_c, 2));
                draft.humidity_pct = Some(round_to(reading.humidity_pct, 1));
                draft.pressure_hpa = Some(round_to(reading.pressure_hpa, 1));
            }
            Err(e) => warn!("Atmospheric reading unavailable: {}", e),
        }

        match self.sensors.read_wind_direction_voltage().await {
            Ok(volts) => draft.wind_dir_voltage = Some(round_to(volts, 3)),
            Err(e) => warn!("Wind direction reading unavailable: {}", e),
        }

        match self.sensors.read_battery().await {
            Ok(battery) => {
                draft.battery_volts = Some(round_to(battery.volts, 2));
                draft.battery_current_ma = Some(round_to(battery.current_ma, 1));
            }
            Err(e) => debug!("Battery reading unavailable: {}", e),
        }

        debug!(
            "Sampled {:?} window: wind {} ticks, rain {} tips",
            window, wind_ticks, rain_ticks
        );
        draft
    }
}

impl fmt::Debug for SamplingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingScheduler")
            .field("interval", &self.interval)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

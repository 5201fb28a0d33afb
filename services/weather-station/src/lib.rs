//! Weather Station - telemetry ingestion and derived metrics
//!
//! Samples the station sensors on a fixed interval, appends one observation
//! per interval to a SQLite store, and serves range summaries (chart series,
//! period statistics, wind direction and insights) over a small JSON API.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod derived;
pub mod error;
pub mod observation;
pub mod pulse;
pub mod range;
pub mod scheduler;
pub mod sensors;
pub mod stats;
pub mod store;
pub mod units;

pub use aggregate::{RangeAggregator, Summary};
pub use config::{load_config, Config};
pub use error::{Result, StationError};
pub use observation::{NewObservation, Observation};
pub use pulse::PulseAccumulator;
pub use range::RangeSelector;
pub use scheduler::SamplingScheduler;
pub use sensors::{SensorSource, SimulatedSensors};
pub use store::{ObservationSink, ObservationStore};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SensorConfig;

/// Assembles a [`Station`] from configuration
pub struct StationBuilder {
    config: Config,
    sensors: Option<Arc<dyn SensorSource>>,
}

impl StationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sensors: None,
        }
    }

    /// Replace the configured sensor backend
    pub fn with_sensors(mut self, sensors: Arc<dyn SensorSource>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Validate the configuration and open the store
    pub fn build(self) -> Result<Station> {
        self.config.validate()?;

        let store = ObservationStore::open(&self.config.database.path)?;
        let sensors = match self.sensors {
            Some(sensors) => sensors,
            None => {
                info!("Using {} sensors", self.config.sensors.type_name());
                Arc::new(SimulatedSensors::new(&self.config.sensors)) as Arc<dyn SensorSource>
            }
        };

        Ok(Station {
            wind: Arc::new(PulseAccumulator::new(self.config.wind.debounce)),
            rain: Arc::new(PulseAccumulator::new(self.config.rain.debounce)),
            config: self.config,
            store,
            sensors,
        })
    }
}

/// A configured station ready to run
pub struct Station {
    config: Config,
    store: ObservationStore,
    sensors: Arc<dyn SensorSource>,
    wind: Arc<PulseAccumulator>,
    rain: Arc<PulseAccumulator>,
}

impl Station {
    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    /// Anemometer edge counter, for an external edge source to feed
    pub fn wind_accumulator(&self) -> Arc<PulseAccumulator> {
        Arc::clone(&self.wind)
    }

    /// Rain gauge edge counter, for an external edge source to feed
    pub fn rain_accumulator(&self) -> Arc<PulseAccumulator> {
        Arc::clone(&self.rain)
    }

    /// Run until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let cancel = CancellationToken::new();

        let cancel_for_signal = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => error!("Failed to listen for ctrl-c: {}", e),
            }
        });

        self.run_until(cancel).await
    }

    /// Run the sampler, edge simulators and query API until `cancel` fires
    pub async fn run_until(self, cancel: CancellationToken) -> Result<()> {
        let mut tasks = Vec::new();

        let SensorConfig::Simulated {
            wind_ticks_per_second,
            rain_tips_per_hour,
            ..
        } = &self.config.sensors;
        tasks.extend(sensors::spawn_pulse_simulator(
            "wind",
            Arc::clone(&self.wind),
            *wind_ticks_per_second,
            cancel.clone(),
        ));
        tasks.extend(sensors::spawn_pulse_simulator(
            "rain",
            Arc::clone(&self.rain),
            *rain_tips_per_hour / 3600.0,
            cancel.clone(),
        ));

        if self.config.server.enabled {
            let router = api::build_router(RangeAggregator::new(self.store.clone()));
            let port = self.config.server.port;
            let cancel_for_api = cancel.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = serve_api(router, port, cancel_for_api).await {
                    error!("{}. Continuing without query API.", e);
                }
            }));
        }

        let scheduler = SamplingScheduler::new(
            &self.config,
            Arc::clone(&self.sensors),
            Arc::new(self.store.clone()),
            Arc::clone(&self.wind),
            Arc::clone(&self.rain),
        );

        info!("Weather station started");
        scheduler.run(cancel.clone()).await;

        // The sampler only returns once cancelled; make sure the rest follows
        cancel.cancel();
        for task in tasks {
            task.await?;
        }

        info!("Weather station stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("store", &self.store)
            .field("interval", &self.config.sampling.interval)
            .finish_non_exhaustive()
    }
}

async fn serve_api(router: Router, port: u16, cancel: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StationError::Server(format!("Failed to bind port {}: {}", port, e)))?;
    info!("Query API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .map_err(|e| StationError::Server(e.to_string()))?;

    debug!("Query API stopped");
    Ok(())
}

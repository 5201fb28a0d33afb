//! BDD test world for the weather station service

use std::time::Instant;

use cucumber::World;
use weather_station::derived::{Insight, WindDirection};
use weather_station::stats::{PeriodStats, PreviousPeriod};
use weather_station::{PulseAccumulator, RangeSelector};

#[derive(Debug, Default, World)]
pub struct StationWorld {
    // Pulse accumulator testing
    pub accumulator: Option<PulseAccumulator>,
    pub base_instant: Option<Instant>,
    pub drained: Option<u32>,

    // Insight testing
    pub stats: PeriodStats,
    pub previous: PreviousPeriod,
    pub range: Option<RangeSelector>,
    pub insights: Vec<Insight>,

    // Wind direction testing
    pub direction: Option<WindDirection>,
}

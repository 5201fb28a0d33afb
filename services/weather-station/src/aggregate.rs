//! Range summaries: chart series, period statistics and insights
//!
//! Everything here is recomputed from the store on every request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::derived::{
    classify_wind_direction, default_rules, evaluate_insights, Insight,
    InsightContext, InsightRule, WindDirection, VANE_DISCONNECTED_VOLTS,
};
use crate::range::RangeSelector;
use crate::stats::{BucketedSeries, PeriodStats, PreviousPeriod};
use crate::store::ObservationStore;

/// Everything the dashboard needs for one range
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub chart: BucketedSeries,
    pub stats: PeriodStats,
    pub latest_dir: WindDirection,
    /// The anemometer is reporting: the vane reads connected or wind was seen
    pub wind_ok: bool,
    pub insights: Vec<Insight>,
}

/// Builds [`Summary`] values from the observation store
#[derive(Clone)]
pub struct RangeAggregator {
    store: ObservationStore,
    rules: Arc<Vec<Box<dyn InsightRule>>>,
}

impl RangeAggregator {
    pub fn new(store: ObservationStore) -> Self {
        Self::with_rules(store, default_rules())
    }

    pub fn with_rules(store: ObservationStore, rules: Vec<Box<dyn InsightRule>>) -> Self {
        Self {
            store,
            rules: Arc::new(rules),
        }
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    /// Summarize the window ending at `now`
    ///
    /// All queries read one store snapshot, so a sample committed meanwhile
    /// shows up in every part of the summary or in none. Runs on the calling
    /// thread.
    pub fn summarize(&self, selector: RangeSelector, now: DateTime<Utc>) -> crate::Result<Summary> {
        let policy = selector.policy();
        let windows = policy.windows(now);

        let (points, stats, previous_pressure, latest) = self.store.read_snapshot(|snapshot| {
            Ok((
                snapshot.query_range(windows.start, windows.end, policy)?,
                snapshot.period_stats(windows.start, windows.end)?,
                snapshot.average_pressure(windows.previous_start, windows.start)?,
                snapshot.query_latest()?,
            ))
        })?;

        let previous = PreviousPeriod {
            avg_pressure_hpa: previous_pressure.unwrap_or(stats.avg_pressure_hpa),
        };

        let latest_volts = latest.and_then(|observation| observation.wind_dir_voltage);
        let latest_dir = classify_wind_direction(latest_volts);
        let wind_ok =
            latest_volts.is_some_and(|v| v > VANE_DISCONNECTED_VOLTS) || stats.max_wind_kph > 0.0;

        let ctx = InsightContext {
            current: &stats,
            previous: &previous,
            range: selector,
        };
        let insights = evaluate_insights(&self.rules, &ctx);

        debug!(
            "Summarized {} range: {} buckets, {} insights",
            selector,
            points.len(),
            insights.len()
        );

        Ok(Summary {
            chart: BucketedSeries::new(points),
            stats,
            latest_dir,
            wind_ok,
            insights,
        })
    }

    /// [`summarize`](Self::summarize) on the blocking pool
    pub async fn summarize_async(
        &self,
        selector: RangeSelector,
        now: DateTime<Utc>,
    ) -> crate::Result<Summary> {
        let aggregator = self.clone();
        tokio::task::spawn_blocking(move || aggregator.summarize(selector, now)).await?
    }
}

impl std::fmt::Debug for RangeAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeAggregator")
            .field("store", &self.store)
            .field("rules", &self.rules.len())
            .finish()
    }
}

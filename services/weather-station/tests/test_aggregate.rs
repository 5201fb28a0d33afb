//! Range aggregation tests against a real database

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;
use weather_station::derived::{InsightKind, WindDirection};
use weather_station::{NewObservation, ObservationStore, RangeAggregator, RangeSelector};

fn setup() -> (TempDir, RangeAggregator) {
    let dir = TempDir::new().unwrap();
    let store = ObservationStore::open(&dir.path().join("weather.db")).unwrap();
    (dir, RangeAggregator::new(store))
}

fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
}

fn sample(wind: f64, rain: f64) -> NewObservation {
    NewObservation {
        temperature_c: Some(16.0),
        humidity_pct: Some(70.0),
        pressure_hpa: Some(1013.0),
        wind_speed_kph: wind,
        rain_mm: rain,
        wind_dir_voltage: Some(2.0),
        ..NewObservation::default()
    }
}

#[test]
fn day_range_emits_every_sample_with_gust_equal_to_wind() {
    let (_dir, aggregator) = setup();
    let now = midnight();
    // One sample per minute across the whole day
    for i in 0..1440i64 {
        let wind = (i % 7) as f64;
        aggregator
            .store()
            .insert_at(sample(wind, 0.0), now - TimeDelta::minutes(i))
            .unwrap();
    }

    let summary = aggregator.summarize(RangeSelector::Day, now).unwrap();

    assert_eq!(summary.chart.len(), 1440);
    for point in &summary.chart.points {
        assert_eq!(point.wind_gust, point.wind_avg);
    }
    assert_eq!(summary.chart.points.last().map(|p| p.wind_avg), Some(0.0));
    let labels: Vec<&str> = summary
        .chart
        .points
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels.first(), Some(&"00:01"));
    assert_eq!(labels.last(), Some(&"00:00"));
}

#[test]
fn week_range_buckets_per_day() {
    let (_dir, aggregator) = setup();
    let now = midnight();
    for k in 1..=28 {
        // One 12 kph gust on each day, 4 kph otherwise
        let wind = if k % 4 == 0 { 12.0 } else { 4.0 };
        aggregator
            .store()
            .insert_at(sample(wind, 0.5), now - TimeDelta::hours(6 * k))
            .unwrap();
    }

    let summary = aggregator.summarize(RangeSelector::Week, now).unwrap();

    assert_eq!(summary.chart.len(), 7);
    assert_eq!(summary.chart.points[0].label, "2025-06-08");
    assert_eq!(summary.chart.points[6].label, "2025-06-14");
    for point in &summary.chart.points {
        assert!((point.rain - 2.0).abs() < 1e-9);
        assert_eq!(point.wind_avg, 6.0);
        assert_eq!(point.wind_gust, 12.0);
        assert_eq!(point.temp, Some(16.0));
    }

    assert!((summary.stats.total_rain_mm - 14.0).abs() < 1e-9);
    assert_eq!(summary.stats.max_wind_kph, 12.0);
    assert_eq!(summary.latest_dir.to_string(), "S");
    assert!(summary.wind_ok);
    // 14 mm is neither dry nor saturated; nothing else is unusual
    assert_eq!(summary.insights.len(), 1);
    assert_eq!(summary.insights[0].kind, InsightKind::Stable);
}

#[test]
fn month_range_labels_month_day() {
    let (_dir, aggregator) = setup();
    let now = midnight();
    aggregator
        .store()
        .insert_at(sample(1.0, 0.0), now - TimeDelta::days(20))
        .unwrap();
    aggregator
        .store()
        .insert_at(sample(1.0, 0.0), now - TimeDelta::days(2))
        .unwrap();
    // Before the 30 day window
    aggregator
        .store()
        .insert_at(sample(1.0, 0.0), now - TimeDelta::days(45))
        .unwrap();

    let summary = aggregator.summarize(RangeSelector::Month, now).unwrap();

    let labels: Vec<&str> = summary
        .chart
        .points
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels, vec!["05-26", "06-13"]);
}

#[test]
fn latest_direction_follows_newest_row() {
    let (_dir, aggregator) = setup();
    let now = midnight();
    aggregator
        .store()
        .insert_at(sample(0.0, 0.0), now - TimeDelta::minutes(2))
        .unwrap();
    aggregator
        .store()
        .insert_at(
            NewObservation {
                wind_dir_voltage: Some(3.5),
                ..NewObservation::default()
            },
            now - TimeDelta::minutes(1),
        )
        .unwrap();

    let summary = aggregator.summarize(RangeSelector::Day, now).unwrap();

    assert_eq!(summary.latest_dir, WindDirection::Ambiguous);
    assert!(summary.wind_ok);
}

#[test]
fn weekly_saturation_and_falling_pressure() {
    let (_dir, aggregator) = setup();
    let now = midnight();
    let store = aggregator.store();
    for day in 8..14 {
        store
            .insert_at(
                NewObservation {
                    pressure_hpa: Some(1021.0),
                    temperature_c: Some(10.0),
                    ..NewObservation::default()
                },
                now - TimeDelta::days(day),
            )
            .unwrap();
    }
    for day in 1..7 {
        store
            .insert_at(
                NewObservation {
                    pressure_hpa: Some(1009.0),
                    temperature_c: Some(10.0),
                    rain_mm: 12.0,
                    ..NewObservation::default()
                },
                now - TimeDelta::days(day),
            )
            .unwrap();
    }

    let summary = aggregator.summarize(RangeSelector::Week, now).unwrap();

    let kinds: Vec<InsightKind> = summary.insights.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![InsightKind::Saturation, InsightKind::PressureFalling]
    );
    assert_eq!(
        summary.insights[1].message,
        "Barometer pressure falling rapidly (12.0 hPa)."
    );
}

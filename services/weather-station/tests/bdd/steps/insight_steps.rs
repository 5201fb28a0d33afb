//! BDD step definitions for insight feature

use cucumber::{given, then, when};
use weather_station::derived::{default_rules, evaluate_insights, InsightContext};
use weather_station::RangeSelector;

use crate::world::StationWorld;

#[given(expr = "the {string} range")]
fn range(world: &mut StationWorld, selector: String) {
    world.range = Some(RangeSelector::parse(&selector));
}

#[given(expr = "a period with a low of {float} °C")]
fn low_temperature(world: &mut StationWorld, low: f64) {
    world.stats.min_temp_c = low;
}

#[given(expr = "a period with an average of {float} °C")]
fn average_temperature(world: &mut StationWorld, avg: f64) {
    world.stats.avg_temp_c = avg;
}

#[given(expr = "a period with {float} mm of rain")]
fn total_rain(world: &mut StationWorld, rain: f64) {
    world.stats.total_rain_mm = rain;
}

#[given(expr = "an average humidity of {float} %")]
fn average_humidity(world: &mut StationWorld, humidity: f64) {
    world.stats.avg_humidity_pct = humidity;
}

#[given(expr = "an average wind of {float} kph")]
fn average_wind(world: &mut StationWorld, wind: f64) {
    world.stats.avg_wind_kph = wind;
}

#[given(expr = "an average pressure of {float} hPa after {float} hPa")]
fn pressure_change(world: &mut StationWorld, current: f64, previous: f64) {
    world.stats.avg_pressure_hpa = current;
    world.previous.avg_pressure_hpa = previous;
}

#[when("insights are evaluated")]
fn evaluate(world: &mut StationWorld) {
    let rules = default_rules();
    let ctx = InsightContext {
        current: &world.stats,
        previous: &world.previous,
        range: world.range.unwrap_or(RangeSelector::Day),
    };
    world.insights = evaluate_insights(&rules, &ctx);
}

#[then(expr = "there should be {int} insight(s)")]
fn insight_count(world: &mut StationWorld, expected: usize) {
    assert_eq!(
        world.insights.len(),
        expected,
        "insights: {:?}",
        world.insights
    );
}

#[then(expr = "insight {int} should read {string}")]
fn insight_reads(world: &mut StationWorld, position: usize, expected: String) {
    let insight = world
        .insights
        .get(position - 1)
        .unwrap_or_else(|| panic!("no insight at position {}", position));
    assert_eq!(insight.message, expected);
}

#[then(expr = "insight {int} should have icon {string}")]
fn insight_icon(world: &mut StationWorld, position: usize, expected: String) {
    let insight = world
        .insights
        .get(position - 1)
        .unwrap_or_else(|| panic!("no insight at position {}", position));
    assert_eq!(insight.icon, expected);
}

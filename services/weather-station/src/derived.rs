//! Derived metrics: dew point, wind direction and period insights

use std::fmt;

use serde::{Serialize, Serializer};

use crate::range::RangeSelector;
use crate::stats::{PeriodStats, PreviousPeriod};

const MAGNUS_B: f64 = 17.625;
const MAGNUS_C: f64 = 243.04;

/// Dew point in °C using the Magnus approximation
///
/// Undefined for zero (or negative) humidity and for non-finite inputs.
pub fn dew_point(temperature_c: f64, humidity_pct: f64) -> Option<f64> {
    if !temperature_c.is_finite() || !humidity_pct.is_finite() || humidity_pct <= 0.0 {
        return None;
    }
    let gamma =
        (MAGNUS_B * temperature_c) / (MAGNUS_C + temperature_c) + (humidity_pct / 100.0).ln();
    Some((MAGNUS_C * gamma) / (MAGNUS_B - gamma))
}

/// Compass points the wind vane can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compass::N => "N",
            Compass::NE => "NE",
            Compass::E => "E",
            Compass::SE => "SE",
            Compass::S => "S",
            Compass::SW => "SW",
            Compass::W => "W",
            Compass::NW => "NW",
        };
        f.write_str(s)
    }
}

/// Vane divider voltage for each compass point
pub const WIND_VANE_CALIBRATION: [(f64, Compass); 8] = [
    (0.4, Compass::W),
    (0.9, Compass::NW),
    (1.2, Compass::N),
    (1.4, Compass::SW),
    (1.8, Compass::NE),
    (2.0, Compass::S),
    (2.2, Compass::SE),
    (2.8, Compass::E),
];

/// Below this the vane is disconnected
pub const VANE_DISCONNECTED_VOLTS: f64 = 0.1;

/// Furthest a reading may sit from its calibration point
pub const VANE_MAX_DISTANCE_VOLTS: f64 = 0.3;

/// Classified wind direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindDirection {
    Cardinal(Compass),
    Unavailable,
    Ambiguous,
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindDirection::Cardinal(c) => c.fmt(f),
            WindDirection::Unavailable => f.write_str("--"),
            WindDirection::Ambiguous => f.write_str("?"),
        }
    }
}

impl Serialize for WindDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Nearest calibration point to a vane voltage
pub fn classify_wind_direction(volts: Option<f64>) -> WindDirection {
    let volts = match volts {
        Some(v) if v.is_finite() && v >= VANE_DISCONNECTED_VOLTS => v,
        _ => return WindDirection::Unavailable,
    };

    let mut best = WIND_VANE_CALIBRATION[0];
    let mut best_distance = (best.0 - volts).abs();
    for entry in &WIND_VANE_CALIBRATION[1..] {
        let distance = (entry.0 - volts).abs();
        if distance < best_distance {
            best = *entry;
            best_distance = distance;
        }
    }

    if best_distance > VANE_MAX_DISTANCE_VOLTS {
        WindDirection::Ambiguous
    } else {
        WindDirection::Cardinal(best.1)
    }
}

/// What an insight is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    HardFreeze,
    FrostRisk,
    LowRainfall,
    Saturation,
    HighEvaporation,
    FungalRisk,
    PressureRising,
    PressureFalling,
    Stable,
}

/// A short diagnostic for the dashboard
///
/// Serializes as an `[icon, message]` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub kind: InsightKind,
    pub icon: &'static str,
    pub message: String,
}

impl Insight {
    pub fn new(kind: InsightKind, icon: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            icon,
            message: message.into(),
        }
    }

    fn stable() -> Self {
        Insight::new(InsightKind::Stable, "✅", "Conditions are stable.")
    }
}

impl Serialize for Insight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.icon, &self.message).serialize(serializer)
    }
}

/// Inputs every rule sees
#[derive(Debug, Clone, Copy)]
pub struct InsightContext<'a> {
    pub current: &'a PeriodStats,
    pub previous: &'a PreviousPeriod,
    pub range: RangeSelector,
}

/// A single independent insight check
pub trait InsightRule: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight>;
}

/// Freezing or near-freezing lows
#[derive(Debug, Default)]
pub struct FrostRule;

impl InsightRule for FrostRule {
    fn name(&self) -> &'static str {
        "frost"
    }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight> {
        let low = ctx.current.min_temp_c;
        if low < 0.0 {
            Some(Insight::new(
                InsightKind::HardFreeze,
                "❄️",
                format!("Hard freeze detected (Low: {:.1}°C).", low),
            ))
        } else if low < 4.0 {
            Some(Insight::new(
                InsightKind::FrostRisk,
                "❄️",
                format!("Frost risk present (Low: {:.1}°C).", low),
            ))
        } else {
            None
        }
    }
}

/// Weekly rainfall against watering needs
#[derive(Debug, Default)]
pub struct WateringRule;

impl InsightRule for WateringRule {
    fn name(&self) -> &'static str {
        "watering"
    }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight> {
        if ctx.range != RangeSelector::Week {
            return None;
        }
        let rain = ctx.current.total_rain_mm;
        if rain < 5.0 {
            Some(Insight::new(
                InsightKind::LowRainfall,
                "💧",
                format!("Low rainfall ({:.1}mm). Soil moisture likely depleted.", rain),
            ))
        } else if rain > 50.0 {
            Some(Insight::new(
                InsightKind::Saturation,
                "🌧️",
                format!("Heavy saturation ({:.1}mm). Soil likely waterlogged.", rain),
            ))
        } else {
            None
        }
    }
}

/// Dry air plus wind
#[derive(Debug, Default)]
pub struct EvaporationRule;

impl InsightRule for EvaporationRule {
    fn name(&self) -> &'static str {
        "evaporation"
    }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight> {
        (ctx.current.avg_humidity_pct < 40.0 && ctx.current.avg_wind_kph > 10.0).then(|| {
            Insight::new(
                InsightKind::HighEvaporation,
                "🍃",
                "High evaporation rate. Drying winds present.",
            )
        })
    }
}

/// Warm and humid
#[derive(Debug, Default)]
pub struct FungalRule;

impl InsightRule for FungalRule {
    fn name(&self) -> &'static str {
        "fungal"
    }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight> {
        (ctx.current.avg_humidity_pct > 85.0 && ctx.current.avg_temp_c > 18.0).then(|| {
            Insight::new(
                InsightKind::FungalRisk,
                "🍄",
                "High humidity & warmth detected. Risk of fungal growth.",
            )
        })
    }
}

/// Average pressure change against the previous period
#[derive(Debug, Default)]
pub struct PressureTendencyRule;

/// Change in average pressure that counts as rapid, hPa
pub const RAPID_PRESSURE_CHANGE_HPA: f64 = 4.0;

impl InsightRule for PressureTendencyRule {
    fn name(&self) -> &'static str {
        "pressure_tendency"
    }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Option<Insight> {
        let diff = ctx.current.avg_pressure_hpa - ctx.previous.avg_pressure_hpa;
        if diff.abs() <= RAPID_PRESSURE_CHANGE_HPA {
            return None;
        }
        let (kind, direction) = if diff > 0.0 {
            (InsightKind::PressureRising, "rising")
        } else {
            (InsightKind::PressureFalling, "falling")
        };
        Some(Insight::new(
            kind,
            "🧭",
            format!(
                "Barometer pressure {} rapidly ({:.1} hPa).",
                direction,
                diff.abs()
            ),
        ))
    }
}

/// The rule set in evaluation order
pub fn default_rules() -> Vec<Box<dyn InsightRule>> {
    vec![
        Box::new(FrostRule),
        Box::new(WateringRule),
        Box::new(EvaporationRule),
        Box::new(FungalRule),
        Box::new(PressureTendencyRule),
    ]
}

/// Run every rule in order; a quiet period yields the single stable insight
pub fn evaluate_insights(rules: &[Box<dyn InsightRule>], ctx: &InsightContext<'_>) -> Vec<Insight> {
    let mut insights: Vec<Insight> = rules
        .iter()
        .filter_map(|rule| {
            let insight = rule.evaluate(ctx);
            if let Some(i) = &insight {
                tracing::debug!("Rule '{}' fired: {}", rule.name(), i.message);
            }
            insight
        })
        .collect();

    if insights.is_empty() {
        insights.push(Insight::stable());
    }
    insights
}

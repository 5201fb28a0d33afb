//! Conversion of raw tick counts and readings into physical units

/// Anemometer calibration: one tick per second is 2.4 km/h
pub const KPH_PER_TICK_HZ: f64 = 2.4;

/// Rain bucket calibration: one tip is 0.2794 mm of rain
pub const MM_PER_TIP: f64 = 0.2794;

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Average wind speed over a window, in km/h
///
/// Returns 0 for an empty or non-positive window.
pub fn wind_speed_kph(ticks: u32, interval_secs: f64, kph_per_hz: f64) -> f64 {
    if interval_secs.is_nan() || interval_secs <= 0.0 {
        return 0.0;
    }
    round_to(f64::from(ticks) / interval_secs * kph_per_hz, 2)
}

/// Rainfall for a window, in mm
pub fn rain_mm(ticks: u32, mm_per_tip: f64) -> f64 {
    round_to(f64::from(ticks) * mm_per_tip, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_tick_per_second_is_calibration_speed() {
        assert_eq!(wind_speed_kph(60, 60.0, KPH_PER_TICK_HZ), 2.4);
    }

    #[test]
    fn wind_speed_is_rounded_to_two_decimals() {
        // 7 / 60 * 2.4 = 0.28
        assert_eq!(wind_speed_kph(7, 60.0, KPH_PER_TICK_HZ), 0.28);
        // 1 / 7 * 2.4 = 0.342857...
        assert_eq!(wind_speed_kph(1, 7.0, KPH_PER_TICK_HZ), 0.34);
    }

    #[test]
    fn zero_interval_yields_zero_speed() {
        assert_eq!(wind_speed_kph(100, 0.0, KPH_PER_TICK_HZ), 0.0);
        assert_eq!(wind_speed_kph(100, -1.0, KPH_PER_TICK_HZ), 0.0);
    }

    #[test]
    fn rain_tips_convert_to_mm() {
        assert_eq!(rain_mm(0, MM_PER_TIP), 0.0);
        assert_eq!(rain_mm(1, MM_PER_TIP), 0.28);
        assert_eq!(rain_mm(10, MM_PER_TIP), 2.79);
    }

    proptest! {
        #[test]
        fn wind_speed_matches_formula(ticks in 0u32..100_000, interval in 1u32..3600) {
            let interval = f64::from(interval);
            let expected = round_to(f64::from(ticks) / interval * 2.4, 2);
            prop_assert_eq!(wind_speed_kph(ticks, interval, KPH_PER_TICK_HZ), expected);
            prop_assert!(wind_speed_kph(ticks, interval, KPH_PER_TICK_HZ) >= 0.0);
        }

        #[test]
        fn rain_is_non_negative_and_monotonic(ticks in 0u32..100_000) {
            let now = rain_mm(ticks, MM_PER_TIP);
            prop_assert!(now >= 0.0);
            prop_assert!(rain_mm(ticks + 1, MM_PER_TIP) >= now);
        }
    }
}

//! Closed-form stint cost model and race-clock formatting.

/// Seconds shed per lap of fuel burned off.
pub const FUEL_PENALTY_PER_LAP: f64 = 0.015;

/// Elapsed time for one stint of `laps` laps on fresh tyres.
///
/// Lap `i` (1-based) costs `base + i * deg` plus a fuel correction that is
/// heaviest on the first lap and zero on the last, so the two arithmetic
/// series collapse to:
///
/// `laps * base + deg * laps(laps+1)/2 + fuel * laps(laps-1)/2`
pub fn stint_time_with_fuel(base_lap_s: f64, deg_per_lap_s: f64, laps: u32, fuel_per_lap_s: f64) -> f64 {
    let n = laps as f64;
    let degradation = deg_per_lap_s * n * (n + 1.0) / 2.0;
    let fuel = fuel_per_lap_s * n * (n - 1.0) / 2.0;
    n * base_lap_s + degradation + fuel
}

pub fn stint_time(base_lap_s: f64, deg_per_lap_s: f64, laps: u32) -> f64 {
    stint_time_with_fuel(base_lap_s, deg_per_lap_s, laps, FUEL_PENALTY_PER_LAP)
}

/// Formats elapsed seconds as `M:SS.mmm`, truncating (never rounding) at
/// each unit boundary. Minutes are unbounded.
pub fn format_clock(total_s: f64) -> String {
    let total_ms = (total_s.max(0.0) * 1000.0).floor() as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stint_time_matches_lap_by_lap_sum() {
        let (base, deg, laps) = (92.0, 0.09, 23u32);
        let expected: f64 = (1..=laps)
            .map(|i| {
                base + i as f64 * deg + FUEL_PENALTY_PER_LAP * (laps - i) as f64
            })
            .sum();
        let got = stint_time(base, deg, laps);
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn stint_time_is_strictly_increasing_in_laps() {
        let mut prev = stint_time(92.0, 0.0, 1);
        for n in 2..=60 {
            let t = stint_time(92.0, 0.0, n);
            assert!(t > prev);
            prev = t;
        }
    }

    #[test]
    fn zero_laps_cost_nothing() {
        assert_eq!(stint_time(92.0, 0.1, 0), 0.0);
    }

    #[test]
    fn clock_truncates_at_each_unit() {
        assert_eq!(format_clock(125.4567), "2:05.456");
        assert_eq!(format_clock(59.999), "0:59.999");
        assert_eq!(format_clock(3600.0), "60:00.000");
        assert_eq!(format_clock(0.0), "0:00.000");
    }

    #[test]
    fn clock_minutes_are_unbounded() {
        assert_eq!(format_clock(5427.5), "90:27.500");
    }
}

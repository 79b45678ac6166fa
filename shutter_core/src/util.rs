//! Unit conversions between turns, steps and centimetres.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Convert output turns to steps, rounding to nearest.
#[inline]
pub fn turns_to_steps(turns: f32, steps_per_rev: u32) -> i64 {
    if !turns.is_finite() {
        return 0;
    }
    (turns * steps_per_rev as f32).round() as i64
}

/// Convert steps to output turns. `steps_per_rev` of 0 is treated as 1.
#[inline]
pub fn steps_to_turns(steps: i64, steps_per_rev: u32) -> f32 {
    steps as f32 / steps_per_rev.max(1) as f32
}

/// Convert a linear distance reading to steps: round(cm / cm_per_turn * steps_per_rev).
/// Non-finite inputs and a non-positive `cm_per_turn` yield 0.
#[inline]
pub fn cm_to_steps(cm: f32, cm_per_turn: f32, steps_per_rev: u32) -> i64 {
    if !cm.is_finite() || !(cm_per_turn > 0.0) {
        return 0;
    }
    turns_to_steps(cm / cm_per_turn, steps_per_rev)
}

/// Step period in microseconds for `speed`, floored at `min_sps` and capped at `max_us`.
/// Rounds up so the period never undercuts `1 / speed`.
#[inline]
pub fn step_interval_us(speed: f32, min_sps: f32, max_us: u64) -> u64 {
    let sps = speed.abs().max(min_sps).max(f32::MIN_POSITIVE);
    let us = (MICROS_PER_SEC as f32 / sps).ceil();
    (us as u64).clamp(1, max_us.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 2000, 20_000)]
    #[case(0.5, 2000, 1_000)]
    #[case(-40.0, 2000, -80_000)]
    #[case(0.00024, 2000, 0)]
    fn turns_round_to_nearest(#[case] turns: f32, #[case] spr: u32, #[case] want: i64) {
        assert_eq!(turns_to_steps(turns, spr), want);
    }

    #[test]
    fn distance_conversion_matches_gear_ratio() {
        // one full turn of travel
        assert_eq!(cm_to_steps(25.4466, 25.4466, 2000), 2000);
        assert_eq!(cm_to_steps(50.0, 25.4466, 2000), 3930);
        assert_eq!(cm_to_steps(f32::NAN, 25.4466, 2000), 0);
        assert_eq!(cm_to_steps(10.0, 0.0, 2000), 0);
    }

    #[test]
    fn interval_is_floored_capped_and_rounded_up() {
        assert_eq!(step_interval_us(3200.0, 2.0, 50_000), 313);
        assert_eq!(step_interval_us(-1000.0, 2.0, 50_000), 1_000);
        assert_eq!(step_interval_us(0.0, 2.0, 50_000), 50_000);
        assert_eq!(step_interval_us(0.0, 2.0, 1_000_000), 500_000);
    }

    #[test]
    fn turns_from_steps() {
        assert!((steps_to_turns(3000, 2000) - 1.5).abs() < f32::EPSILON);
        assert!((steps_to_turns(5, 0) - 5.0).abs() < f32::EPSILON);
    }
}

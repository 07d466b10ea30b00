//! Playback position as a ratio of the total duration.

/// Clamp a ratio to `[0, 1]`; NaN becomes 0.
#[inline]
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Progress of `time` through `duration`: 0 at or before the start, 1 at or
/// after the end, linear in between. A non-positive duration yields 0.
pub fn calculate_progress(time: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || time <= 0.0 {
        return 0.0;
    }
    if time >= duration {
        return 1.0;
    }
    time / duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_progress_examples() {
        assert_eq!(calculate_progress(150.0, 100.0), 1.0);
        assert_eq!(calculate_progress(-10.0, 100.0), 0.0);
        assert_eq!(calculate_progress(25.0, 100.0), 0.25);
        assert_eq!(calculate_progress(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_clamp_ratio_nan() {
        assert_eq!(clamp_ratio(f64::NAN), 0.0);
        assert_eq!(clamp_ratio(1.5), 1.0);
    }

    proptest! {
        #[test]
        fn progress_is_zero_before_start(t in -1e6f64..=0.0, d in 0.001f64..1e6) {
            prop_assert_eq!(calculate_progress(t, d), 0.0);
        }

        #[test]
        fn progress_is_one_after_end(d in 0.001f64..1e6, extra in 0.0f64..1e6) {
            prop_assert_eq!(calculate_progress(d + extra, d), 1.0);
        }

        #[test]
        fn progress_is_linear_inside(d in 0.001f64..1e6, frac in 0.0f64..1.0) {
            let t = d * frac;
            let p = calculate_progress(t, d);
            prop_assert!((0.0..=1.0).contains(&p));
            prop_assert!((p - t / d).abs() < 1e-9 || t <= 0.0);
        }
    }
}

// Math utilities and helper functions

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Wrap `value` into `[0, period)`.
///
/// Handles arbitrarily negative or overshooting values in one step. A non-positive
/// period collapses everything to zero.
pub fn wrap(value: f32, period: f32) -> f32 {
    if period <= 0.0 || !value.is_finite() {
        return 0.0;
    }

    let wrapped = value.rem_euclid(period);
    // rem_euclid can round up to exactly `period` for tiny negative inputs
    if wrapped >= period {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(15.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_wrap_negative_and_overshoot() {
        assert_abs_diff_eq!(wrap(-0.25, 1.0), 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap(3.5, 1.0), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap(-7.25, 2.0), 0.75, epsilon = 1e-5);
        assert_eq!(wrap(2.0, 2.0), 0.0);
    }

    #[test]
    fn test_wrap_is_fixed_point() {
        for raw in [-13.7_f32, -1.0, -0.001, 0.0, 0.4, 1.0, 5.25, 1000.1] {
            let once = wrap(raw, 1.3);
            assert!(once >= 0.0 && once < 1.3);
            assert_eq!(wrap(once, 1.3), once);
        }
    }

    #[test]
    fn test_wrap_degenerate_period() {
        assert_eq!(wrap(5.0, 0.0), 0.0);
        assert_eq!(wrap(f32::NAN, 1.0), 0.0);
    }
}

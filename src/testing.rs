//! Assertion helpers shared by unit and integration tests.

/// Assert that two `f64` values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance.
///
/// # Examples
///
/// ```
/// # use forestrl::assert_approx_eq;
/// assert_approx_eq!(1.0, 1.0001, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn passes_within_tolerance() {
        assert_approx_eq!(1.0, 1.0 + 1e-9, 1e-6);
        assert_approx_eq!(-2.5, -2.5, 0.0);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn fails_outside_tolerance() {
        assert_approx_eq!(1.0, 1.1, 1e-6);
    }
}

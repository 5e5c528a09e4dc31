//! Error type shared by every detector.

/// Errors reported synchronously by constructors, `update`, and batch comparisons.
///
/// No variant is ever retried internally, and a failing `update` leaves the
/// detector exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid thresholds, levels, or sizes at construction time.
    #[error("invalid configuration: {0}")]
    Configuration(&'static str),
    /// NaN, infinite, or out-of-domain observation passed to `update`.
    #[error("invalid input {value}: {reason}")]
    InvalidInput { value: f64, reason: &'static str },
    /// A batch sample is too small for the requested comparison.
    #[error("insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },
    /// `compare` was called before `fit`.
    #[error("detector has no reference sample; call fit first")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject NaN and infinities.
pub(crate) fn check_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidInput {
            value,
            reason: "value must be finite",
        })
    }
}

/// Largest magnitude accepted by the real-valued families.
///
/// Squares and running sums of values this large stay finite, so window
/// variances and Welford moments cannot overflow into NaN.
pub const MAX_MAGNITUDE: f64 = 1e100;

/// Reject NaN, infinities, and values beyond [`MAX_MAGNITUDE`].
pub(crate) fn check_real(value: f64) -> Result<f64> {
    if value.is_finite() && value.abs() <= MAX_MAGNITUDE {
        Ok(value)
    } else {
        Err(Error::InvalidInput {
            value,
            reason: "value must be finite with magnitude at most 1e100",
        })
    }
}

/// Accept only a 0/1 error indicator (1 = error).
pub(crate) fn check_binary(value: f64) -> Result<f64> {
    if value == 0.0 || value == 1.0 {
        Ok(value)
    } else {
        Err(Error::InvalidInput {
            value,
            reason: "value must be 0.0 (correct) or 1.0 (error)",
        })
    }
}

/// Accept finite values in `[0, 1]`.
pub(crate) fn check_unit_interval(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidInput {
            value,
            reason: "value must lie in [0, 1]",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_checks_reject_nan_everywhere() {
        assert!(check_finite(f64::NAN).is_err());
        assert!(check_binary(f64::NAN).is_err());
        assert!(check_unit_interval(f64::NAN).is_err());
        assert!(check_real(f64::NAN).is_err());
    }

    #[test]
    fn real_check_bounds_magnitude() {
        assert_eq!(check_real(-MAX_MAGNITUDE), Ok(-MAX_MAGNITUDE));
        assert_eq!(check_real(1e9), Ok(1e9));
        assert!(check_real(1e101).is_err());
        assert!(check_real(-1e308).is_err());
        // Squares of accepted values stay finite.
        assert!((MAX_MAGNITUDE * MAX_MAGNITUDE).is_finite());
    }

    #[test]
    fn binary_check_rejects_fractional_values() {
        assert_eq!(check_binary(1.0), Ok(1.0));
        assert_eq!(check_binary(0.0), Ok(0.0));
        assert!(matches!(
            check_binary(0.5),
            Err(Error::InvalidInput { value, .. }) if value == 0.5
        ));
    }

    #[test]
    fn unit_interval_check_is_inclusive() {
        assert!(check_unit_interval(0.0).is_ok());
        assert!(check_unit_interval(1.0).is_ok());
        assert!(check_unit_interval(1.0 + 1e-9).is_err());
        assert!(check_unit_interval(-0.1).is_err());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let e = check_finite(f64::INFINITY).unwrap_err();
        assert!(e.to_string().contains("inf"), "{e}");
    }
}

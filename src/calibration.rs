//! False-alarm calibration helpers.
//!
//! Drift thresholds trade detection delay against false alarms. These helpers
//! estimate the per-run false-alarm probability of a configuration on an
//! in-control stream, with a Wilson interval so small Monte Carlo budgets are
//! read conservatively.

/// Wilson score interval for a Bernoulli proportion.
///
/// Returns `(lower, upper, half_width)`, with bounds clamped into `[0,1]`.
/// A non-finite or non-positive `z` falls back to 1.96.
pub fn wilson_bounds(successes: u64, trials: u64, z: f64) -> (f64, f64, f64) {
    if trials == 0 {
        return (0.0, 1.0, 0.5);
    }
    let n = trials as f64;
    let p_hat = successes.min(trials) as f64 / n;
    let z = if z.is_finite() && z > 0.0 { z } else { 1.96 };
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = (p_hat + z2 / (2.0 * n)) / denom;
    let rad = z * (p_hat * (1.0 - p_hat) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    let lo = (center - rad).clamp(0.0, 1.0);
    let hi = (center + rad).clamp(0.0, 1.0);
    (lo, hi, (hi - lo) / 2.0)
}

/// Empirical false-alarm rate over independent in-control runs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FalseAlarmEstimate {
    pub runs: u64,
    /// Runs in which at least one drift was reported.
    pub alarms: u64,
    /// `alarms / runs`.
    pub rate: f64,
    /// Wilson upper bound on the per-run false-alarm probability.
    pub wilson_hi: f64,
}

impl FalseAlarmEstimate {
    pub fn from_counts(alarms: u64, runs: u64, z: f64) -> Self {
        let alarms = alarms.min(runs);
        let rate = if runs == 0 {
            0.0
        } else {
            alarms as f64 / runs as f64
        };
        let (_, wilson_hi, _) = wilson_bounds(alarms, runs, z);
        Self {
            runs,
            alarms,
            rate,
            wilson_hi,
        }
    }
}

/// Monte Carlo false-alarm rate of a 0/1-input detector on a stationary
/// Bernoulli(`error_rate`) stream.
///
/// `make` builds a fresh detector per run; each run lasts `stream_len`
/// observations or until the first drift. Deterministic for a given `seed`.
#[cfg(feature = "stochastic")]
pub fn estimate_false_alarm_rate<D, F>(
    mut make: F,
    error_rate: f64,
    stream_len: usize,
    runs: u64,
    seed: u64,
) -> crate::Result<FalseAlarmEstimate>
where
    D: crate::DriftDetector,
    F: FnMut() -> crate::Result<D>,
{
    use crate::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Bernoulli, Distribution};

    let dist =
        Bernoulli::new(error_rate).map_err(|_| Error::Configuration("error_rate must lie in [0, 1]"))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut alarms = 0u64;
    for _ in 0..runs {
        let mut detector = make()?;
        for _ in 0..stream_len {
            let x = if dist.sample(&mut rng) { 1.0 } else { 0.0 };
            if detector.update(x)?.drift {
                alarms += 1;
                break;
            }
        }
    }
    let estimate = FalseAlarmEstimate::from_counts(alarms, runs, 1.96);
    tracing::debug!(alarms, runs, rate = estimate.rate, "false-alarm estimate");
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilson_contains_point_estimate() {
        let (lo, hi, half) = wilson_bounds(30, 100, 1.96);
        assert!(lo < 0.3 && 0.3 < hi);
        assert!((half - (hi - lo) / 2.0).abs() < 1e-15);
        // Reference: Wilson 95% for 30/100 is roughly [0.219, 0.396].
        assert!((lo - 0.219).abs() < 2e-3, "lo={lo}");
        assert!((hi - 0.396).abs() < 2e-3, "hi={hi}");
    }

    #[test]
    fn wilson_handles_edges() {
        assert_eq!(wilson_bounds(0, 0, 1.96), (0.0, 1.0, 0.5));
        let (lo, hi, _) = wilson_bounds(0, 50, 1.96);
        assert!(lo.abs() < 1e-12);
        assert!(hi > 0.0 && hi < 0.1);
        let (_, hi, _) = wilson_bounds(50, 50, f64::NAN);
        assert!((hi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_from_counts() {
        let e = FalseAlarmEstimate::from_counts(5, 200, 1.96);
        assert_eq!(e.rate, 0.025);
        assert!(e.wilson_hi > e.rate);
        assert_eq!(FalseAlarmEstimate::from_counts(0, 0, 1.96).rate, 0.0);
    }
}

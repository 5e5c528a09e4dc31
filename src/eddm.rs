//! EDDM: early drift detection from the spacing between errors.
//!
//! Instead of the error *rate*, EDDM watches the distance (in observations)
//! between consecutive errors. While a model is healthy errors are sparse and
//! the running \(\mu_d + \text{level}\cdot\sigma_d\) keeps growing; a shrinking
//! ratio against its historical maximum means errors are getting denser.
//!
//! Only error ticks move the statistic. Correct predictions report the state
//! reached at the last error.

use crate::error::{check_binary, Error, Result};
use crate::stats::NumericAccumulator;
use crate::status::{StateMachine, Status};

/// EDDM configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EddmConfig {
    /// Warning when the ratio to the maximum drops below this (`alpha` in the paper).
    pub warning_ratio: f64,
    /// Drift when the ratio drops below this (`beta`); must be below `warning_ratio`.
    pub drift_ratio: f64,
    /// Standard deviations added to the mean distance.
    pub level: f64,
    pub min_num_instances: u64,
    /// Errors required before any verdict.
    pub min_num_errors: u64,
}

impl Default for EddmConfig {
    fn default() -> Self {
        Self {
            warning_ratio: 0.95,
            drift_ratio: 0.90,
            level: 2.0,
            min_num_instances: 30,
            min_num_errors: 30,
        }
    }
}

impl EddmConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.drift_ratio > 0.0 && self.drift_ratio < self.warning_ratio) {
            return Err(Error::Configuration("drift_ratio must lie in (0, warning_ratio)"));
        }
        if self.warning_ratio > 1.0 {
            return Err(Error::Configuration("warning_ratio must be <= 1"));
        }
        if !(self.level.is_finite() && self.level > 0.0) {
            return Err(Error::Configuration("level must be finite and > 0"));
        }
        Ok(())
    }
}

/// Early Drift Detection Method (Baena-García et al., 2006).
#[derive(Debug, Clone)]
pub struct Eddm {
    cfg: EddmConfig,
    n: u64,
    last_error_at: u64,
    distances: NumericAccumulator,
    max_threshold: f64,
    ratio: f64,
    machine: StateMachine,
    last: Status,
}

impl Eddm {
    pub fn new(cfg: EddmConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            n: 0,
            last_error_at: 0,
            distances: NumericAccumulator::new(),
            max_threshold: f64::NEG_INFINITY,
            ratio: 1.0,
            machine: StateMachine::new("eddm", true),
            last: Status::normal(1.0),
        })
    }

    pub fn config(&self) -> &EddmConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    /// Errors since the last reset.
    pub fn num_errors(&self) -> u64 {
        self.distances.count()
    }

    /// Mean distance between consecutive errors.
    pub fn mean_distance(&self) -> f64 {
        self.distances.mean()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_binary(value)?;
        self.n += 1;
        if x == 0.0 {
            self.last = self.machine.hold(self.ratio);
            return Ok(self.last);
        }

        // Positions are zero-based: the first distance is measured from the
        // first observation, not from before it.
        let position = self.n - 1;
        let distance = (position - self.last_error_at) as f64;
        self.last_error_at = position;
        self.distances.update(distance);

        let (warning, drift) = if self.n < self.cfg.min_num_instances
            || self.distances.count() < self.cfg.min_num_errors
        {
            (false, false)
        } else {
            let threshold = self.distances.mean() + self.cfg.level * self.distances.std_dev();
            if threshold > self.max_threshold {
                self.max_threshold = threshold;
                self.ratio = 1.0;
                (false, false)
            } else {
                self.ratio = threshold / self.max_threshold;
                (
                    self.ratio < self.cfg.warning_ratio,
                    self.ratio < self.cfg.drift_ratio,
                )
            }
        };

        let status = self.machine.advance(warning, drift, self.n, self.ratio);
        if status.drift {
            self.clear();
        }
        self.last = status;
        Ok(status)
    }

    pub fn status(&self) -> Status {
        self.last
    }

    pub fn reset(&mut self) {
        self.clear();
        self.machine.reset();
        self.last = Status::normal(1.0);
    }

    fn clear(&mut self) {
        self.n = 0;
        self.last_error_at = 0;
        self.distances.reset();
        self.max_threshold = f64::NEG_INFINITY;
        self.ratio = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_drift_ratio_above_warning_ratio() {
        let cfg = EddmConfig {
            warning_ratio: 0.9,
            drift_ratio: 0.95,
            ..EddmConfig::default()
        };
        assert!(Eddm::new(cfg).is_err());
    }

    #[test]
    fn first_distance_counts_from_the_first_observation() {
        let mut d = Eddm::new(EddmConfig::default()).unwrap();
        for i in 1..=100u64 {
            d.update(if i % 10 == 0 { 1.0 } else { 0.0 }).unwrap();
        }
        assert_eq!(d.num_errors(), 10);
        // Distances are 9, then 10 nine times.
        assert!((d.mean_distance() - 9.9).abs() < 1e-12);

        let mut d = Eddm::new(EddmConfig::default()).unwrap();
        d.update(1.0).unwrap();
        assert_eq!(d.mean_distance(), 0.0);
    }

    #[test]
    fn denser_errors_trigger_warning_then_drift() {
        let mut d = Eddm::new(EddmConfig::default()).unwrap();
        for i in 1..=1_000u64 {
            let s = d.update(if i % 20 == 0 { 1.0 } else { 0.0 }).unwrap();
            assert!(!s.warning, "warning during the sparse phase at {i}");
        }
        let mut warned = false;
        for i in 1..=400u64 {
            let s = d.update(if i % 2 == 0 { 1.0 } else { 0.0 }).unwrap();
            if s.drift {
                assert!(warned);
                assert_eq!(d.num_errors(), 0);
                return;
            }
            warned |= s.warning;
        }
        panic!("expected drift");
    }

    #[test]
    fn correct_predictions_do_not_change_state() {
        let mut d = Eddm::new(EddmConfig::default()).unwrap();
        d.update(1.0).unwrap();
        let s1 = d.update(0.0).unwrap();
        let s2 = d.update(0.0).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(d.num_errors(), 1);
    }
}

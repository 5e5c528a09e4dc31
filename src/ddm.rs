//! DDM and RDDM: error-rate control charts.
//!
//! Input is a 0/1 error indicator. The detectors track the running error rate
//! \(p_t\) and its standard error \(s_t = \sqrt{p_t(1-p_t)/t}\), remember the best
//! operating point \((p_{min}, s_{min})\) (the one minimizing \(p+s\)), and react
//! to divergence from it:
//!
//! - warning: \(p_t + s_t > p_{min} + w \cdot s_{min}\)
//! - drift:   \(p_t + s_t > p_{min} + d \cdot s_{min}\), with \(d > w\)
//!
//! RDDM additionally caps the concept length so a slowly degrading model cannot
//! hide behind a minimum recorded long ago.

use std::collections::VecDeque;

use crate::error::{check_binary, Error, Result};
use crate::stats::NumericAccumulator;
use crate::status::{DriftState, StateMachine, Status};

fn validate_levels(warning_level: f64, drift_level: f64, min_num_instances: u64) -> Result<()> {
    if !(warning_level.is_finite() && warning_level > 0.0) {
        return Err(Error::Configuration("warning_level must be finite and > 0"));
    }
    if !(drift_level.is_finite() && drift_level > warning_level) {
        return Err(Error::Configuration("drift_level must be finite and exceed warning_level"));
    }
    if min_num_instances == 0 {
        return Err(Error::Configuration("min_num_instances must be >= 1"));
    }
    Ok(())
}

/// Running error rate plus the best point seen since the last reset.
#[derive(Debug, Clone)]
struct ErrorRate {
    errors: NumericAccumulator,
    p_min: f64,
    s_min: f64,
}

impl ErrorRate {
    fn new() -> Self {
        Self {
            errors: NumericAccumulator::new(),
            p_min: f64::INFINITY,
            s_min: f64::INFINITY,
        }
    }

    fn n(&self) -> u64 {
        self.errors.count()
    }

    /// Record one 0/1 value; returns `(p, s)`.
    fn observe(&mut self, x: f64) -> (f64, f64) {
        self.errors.update(x);
        let p = self.errors.mean();
        let s = (p * (1.0 - p) / self.n() as f64).max(0.0).sqrt();
        (p, s)
    }

    fn track_min(&mut self, p: f64, s: f64) {
        if p + s < self.p_min + self.s_min {
            self.p_min = p;
            self.s_min = s;
        }
    }

    /// `(warning, drift)` for the current `p + s`.
    fn conditions(&self, stat: f64, warning_level: f64, drift_level: f64) -> (bool, bool) {
        (
            stat > self.p_min + warning_level * self.s_min,
            stat > self.p_min + drift_level * self.s_min,
        )
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// DDM configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DdmConfig {
    pub warning_level: f64,
    pub drift_level: f64,
    pub min_num_instances: u64,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            warning_level: 2.0,
            drift_level: 3.0,
            min_num_instances: 30,
        }
    }
}

impl DdmConfig {
    pub fn validate(&self) -> Result<()> {
        validate_levels(self.warning_level, self.drift_level, self.min_num_instances)
    }
}

/// Drift Detection Method (Gama et al., 2004).
#[derive(Debug, Clone)]
pub struct Ddm {
    cfg: DdmConfig,
    rate: ErrorRate,
    machine: StateMachine,
    last: Status,
}

impl Ddm {
    pub fn new(cfg: DdmConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            rate: ErrorRate::new(),
            machine: StateMachine::new("ddm", true),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &DdmConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.rate.n()
    }

    /// `value` is 1.0 for an error, 0.0 for a correct prediction.
    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_binary(value)?;
        let (p, s) = self.rate.observe(x);
        let stat = p + s;
        let (warning, drift) = if self.rate.n() < self.cfg.min_num_instances {
            (false, false)
        } else {
            self.rate.track_min(p, s);
            self.rate
                .conditions(stat, self.cfg.warning_level, self.cfg.drift_level)
        };
        let status = self.machine.advance(warning, drift, self.rate.n(), stat);
        if status.drift {
            self.rate.reset();
        }
        self.last = status;
        Ok(status)
    }

    pub fn status(&self) -> Status {
        self.last
    }

    pub fn reset(&mut self) {
        self.rate.reset();
        self.machine.reset();
        self.last = Status::default();
    }
}

/// RDDM configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RddmConfig {
    pub warning_level: f64,
    pub drift_level: f64,
    pub min_num_instances: u64,
    /// Observations after which (outside a warning) the statistics are rebuilt.
    pub max_concept_size: u64,
    /// Number of most recent observations kept and replayed on a rebuild.
    pub min_concept_size: usize,
    /// A warning lasting this many ticks is promoted to drift.
    pub max_warning_instances: u64,
}

impl Default for RddmConfig {
    fn default() -> Self {
        Self {
            warning_level: 1.773,
            drift_level: 2.258,
            min_num_instances: 129,
            max_concept_size: 40_000,
            min_concept_size: 7_000,
            max_warning_instances: 1_400,
        }
    }
}

impl RddmConfig {
    pub fn validate(&self) -> Result<()> {
        validate_levels(self.warning_level, self.drift_level, self.min_num_instances)?;
        if self.min_concept_size == 0 {
            return Err(Error::Configuration("min_concept_size must be >= 1"));
        }
        if self.max_concept_size <= self.min_concept_size as u64 {
            return Err(Error::Configuration("max_concept_size must exceed min_concept_size"));
        }
        if self.max_warning_instances == 0 {
            return Err(Error::Configuration("max_warning_instances must be >= 1"));
        }
        Ok(())
    }
}

/// Reactive Drift Detection Method (Barros et al., 2017).
///
/// The truncation policy here is independent of HDDM's bounds: RDDM only ever
/// replays its own stored 0/1 history.
#[derive(Debug, Clone)]
pub struct Rddm {
    cfg: RddmConfig,
    rate: ErrorRate,
    stored: VecDeque<f64>,
    warning_ticks: u64,
    machine: StateMachine,
    last: Status,
}

impl Rddm {
    pub fn new(cfg: RddmConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            rate: ErrorRate::new(),
            stored: VecDeque::with_capacity(cfg.min_concept_size),
            warning_ticks: 0,
            machine: StateMachine::new("rddm", true),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &RddmConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.rate.n()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_binary(value)?;
        if self.stored.len() == self.cfg.min_concept_size {
            self.stored.pop_front();
        }
        self.stored.push_back(x);

        let (mut p, mut s) = self.rate.observe(x);
        if self.rate.n() >= self.cfg.max_concept_size && self.machine.state() != DriftState::Warning {
            (p, s) = self.rebuild();
        }
        let stat = p + s;

        let (warning, mut drift) = if self.rate.n() < self.cfg.min_num_instances {
            (false, false)
        } else {
            self.rate.track_min(p, s);
            self.rate
                .conditions(stat, self.cfg.warning_level, self.cfg.drift_level)
        };
        if warning && !drift {
            self.warning_ticks += 1;
            if self.warning_ticks >= self.cfg.max_warning_instances {
                tracing::debug!(ticks = self.warning_ticks, "rddm: warning too long, promoting to drift");
                drift = true;
            }
        } else if !warning {
            self.warning_ticks = 0;
        }

        let status = self.machine.advance(warning, drift, self.rate.n(), stat);
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
        self.last = Status::default();
    }

    fn clear(&mut self) {
        self.rate.reset();
        self.stored.clear();
        self.warning_ticks = 0;
    }

    /// Recompute the statistics from the stored tail; returns the final `(p, s)`.
    fn rebuild(&mut self) -> (f64, f64) {
        tracing::trace!(
            n = self.rate.n(),
            kept = self.stored.len(),
            "rddm: concept too long, rebuilding from recent history"
        );
        self.rate.reset();
        let (mut p, mut s) = (0.0, 0.0);
        for &y in &self.stored {
            (p, s) = self.rate.observe(y);
            if self.rate.n() >= self.cfg.min_num_instances {
                self.rate.track_min(p, s);
            }
        }
        (p, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddm_rejects_inverted_levels() {
        let cfg = DdmConfig {
            warning_level: 3.0,
            drift_level: 3.0,
            min_num_instances: 30,
        };
        assert_eq!(
            Ddm::new(cfg).unwrap_err(),
            Error::Configuration("drift_level must be finite and exceed warning_level")
        );
    }

    #[test]
    fn ddm_rejects_non_binary_input() {
        let mut d = Ddm::new(DdmConfig::default()).unwrap();
        assert!(d.update(0.3).is_err());
        assert_eq!(d.n(), 0);
    }

    #[test]
    fn ddm_clean_then_broken_warns_before_drift() {
        let mut d = Ddm::new(DdmConfig::default()).unwrap();
        for _ in 0..200 {
            let s = d.update(0.0).unwrap();
            assert!(!s.warning && !s.drift);
        }
        let mut warned_at = None;
        let mut drifted_at = None;
        for i in 0..200 {
            let s = d.update(1.0).unwrap();
            if s.warning && !s.drift && warned_at.is_none() {
                warned_at = Some(i);
            }
            if s.drift {
                drifted_at = Some(i);
                break;
            }
        }
        let (w, dr) = (warned_at.expect("warning"), drifted_at.expect("drift"));
        assert!(w < dr);
    }

    #[test]
    fn ddm_is_quiet_on_steady_error_rate() {
        let mut d = Ddm::new(DdmConfig::default()).unwrap();
        for i in 0..2_000 {
            let s = d.update(if i % 5 == 0 { 1.0 } else { 0.0 }).unwrap();
            assert!(!s.drift, "drift at {i}");
        }
    }

    fn small_rddm() -> RddmConfig {
        RddmConfig {
            warning_level: 1.773,
            drift_level: 2.258,
            min_num_instances: 30,
            max_concept_size: 400,
            min_concept_size: 100,
            max_warning_instances: 20,
        }
    }

    #[test]
    fn rddm_truncates_long_concepts() {
        let mut d = Rddm::new(small_rddm()).unwrap();
        for i in 0..400 {
            d.update(if i % 4 == 0 { 1.0 } else { 0.0 }).unwrap();
        }
        assert_eq!(d.n(), 100);
    }

    #[test]
    fn rddm_promotes_long_warning_to_drift() {
        // Drift level out of reach: only the warning-length rule can fire.
        let cfg = RddmConfig {
            drift_level: 1_000.0,
            max_warning_instances: 3,
            ..small_rddm()
        };
        let mut d = Rddm::new(cfg).unwrap();
        for i in 0..100 {
            d.update(if i % 4 == 0 { 1.0 } else { 0.0 }).unwrap();
        }
        let mut warnings = 0;
        let mut drift = false;
        for _ in 0..40 {
            let s = d.update(1.0).unwrap();
            if s.drift {
                drift = true;
                break;
            }
            warnings += s.warning as u32;
        }
        assert!(drift);
        assert_eq!(warnings, 2);
        assert_eq!(d.n(), 0);
    }

    #[test]
    fn rddm_rejects_inconsistent_concept_sizes() {
        let cfg = RddmConfig {
            max_concept_size: 100,
            min_concept_size: 100,
            ..small_rddm()
        };
        assert!(Rddm::new(cfg).is_err());
    }
}

//! HDDM: Hoeffding-bound drift detection (Frías-Blanco et al., 2015).
//!
//! Both variants compare the stream against a reference cut point chosen where
//! the estimate was most favourable (lowest for the increase test, highest for
//! the optional decrease test):
//!
//! - [`HddmA`] uses plain averages and the Hoeffding bound.
//! - [`HddmW`] uses EWMA estimates with McDiarmid's bound, which reacts to
//!   recent changes faster.
//!
//! Inputs lie in `[0, 1]`.

use crate::error::{check_unit_interval, Error, Result};
use crate::status::{StateMachine, Status};

fn validate_confidences(drift: f64, warning: f64) -> Result<()> {
    if !(drift > 0.0 && drift < 1.0) {
        return Err(Error::Configuration("drift_confidence must lie in (0, 1)"));
    }
    if !(warning > drift && warning < 1.0) {
        return Err(Error::Configuration(
            "warning_confidence must lie in (drift_confidence, 1)",
        ));
    }
    Ok(())
}

// =============================================================================
// HDDM-A
// =============================================================================

/// HDDM-A configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HddmAConfig {
    /// Significance for drift (smaller is stricter).
    pub drift_confidence: f64,
    /// Significance for warning; must exceed `drift_confidence`.
    pub warning_confidence: f64,
    /// Also flag significant *decreases* of the mean.
    pub two_sided: bool,
}

impl Default for HddmAConfig {
    fn default() -> Self {
        Self {
            drift_confidence: 0.001,
            warning_confidence: 0.005,
            two_sided: false,
        }
    }
}

impl HddmAConfig {
    pub fn validate(&self) -> Result<()> {
        validate_confidences(self.drift_confidence, self.warning_confidence)
    }
}

/// Prefix of the stream `(count, sum)` used as the reference point.
#[derive(Debug, Clone, Copy, Default)]
struct Cut {
    n: u64,
    sum: f64,
}

impl Cut {
    fn mean(&self) -> f64 {
        self.sum / self.n as f64
    }
}

/// Average-based Hoeffding drift detector.
#[derive(Debug, Clone)]
pub struct HddmA {
    cfg: HddmAConfig,
    total: Cut,
    min: Cut,
    max: Cut,
    machine: StateMachine,
    last: Status,
}

impl HddmA {
    pub fn new(cfg: HddmAConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            total: Cut::default(),
            min: Cut::default(),
            max: Cut::default(),
            machine: StateMachine::new("hddm_a", true),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &HddmAConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.total.n
    }

    /// Mean since the last reset.
    pub fn mean(&self) -> f64 {
        if self.total.n == 0 {
            0.0
        } else {
            self.total.mean()
        }
    }

    fn hoeffding(n: u64, confidence: f64) -> f64 {
        ((1.0 / confidence).ln() / (2.0 * n as f64)).sqrt()
    }

    /// Bound on the difference between the whole-stream mean and a prefix mean.
    fn cut_bound(&self, cut: &Cut, confidence: f64) -> f64 {
        let (n, n_cut) = (self.total.n as f64, cut.n as f64);
        let m = (n - n_cut) / (n_cut * n);
        (m / 2.0 * (2.0 / confidence).ln()).sqrt()
    }

    fn mean_increased(&self, confidence: f64) -> bool {
        self.min.n < self.total.n
            && self.total.mean() - self.min.mean() >= self.cut_bound(&self.min, confidence)
    }

    fn mean_decreased(&self, confidence: f64) -> bool {
        self.max.n < self.total.n
            && self.max.mean() - self.total.mean() >= self.cut_bound(&self.max, confidence)
    }

    fn changed(&self, confidence: f64) -> bool {
        self.mean_increased(confidence) || (self.cfg.two_sided && self.mean_decreased(confidence))
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_unit_interval(value)?;
        self.total.n += 1;
        self.total.sum += x;
        if self.min.n == 0 {
            self.min = self.total;
            self.max = self.total;
        }

        let conf = self.cfg.drift_confidence;
        let mean = self.total.mean();
        let eps = Self::hoeffding(self.total.n, conf);
        if self.min.mean() + Self::hoeffding(self.min.n, conf) >= mean + eps {
            self.min = self.total;
        }
        if self.max.mean() - Self::hoeffding(self.max.n, conf) <= mean - eps {
            self.max = self.total;
        }

        let drift = self.changed(self.cfg.drift_confidence);
        let warning = drift || self.changed(self.cfg.warning_confidence);
        let status = self.machine.advance(warning, drift, self.total.n, mean);
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
        self.total = Cut::default();
        self.min = Cut::default();
        self.max = Cut::default();
    }
}

// =============================================================================
// HDDM-W
// =============================================================================

/// HDDM-W configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HddmWConfig {
    pub drift_confidence: f64,
    pub warning_confidence: f64,
    /// EWMA weight of the newest observation.
    pub lambda: f64,
    pub two_sided: bool,
}

impl Default for HddmWConfig {
    fn default() -> Self {
        Self {
            drift_confidence: 0.001,
            warning_confidence: 0.005,
            lambda: 0.05,
            two_sided: false,
        }
    }
}

impl HddmWConfig {
    pub fn validate(&self) -> Result<()> {
        validate_confidences(self.drift_confidence, self.warning_confidence)?;
        if !(self.lambda > 0.0 && self.lambda < 1.0) {
            return Err(Error::Configuration("lambda must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// EWMA estimate with its independent-bounded-condition sum
/// (`Σ wᵢ²` of the EWMA weights, which scales McDiarmid's bound).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ewma {
    estimate: f64,
    ibc: f64,
}

impl Ewma {
    fn first(x: f64) -> Self {
        Self {
            estimate: x,
            ibc: 1.0,
        }
    }

    fn push(slot: &mut Option<Self>, x: f64, lambda: f64) -> Self {
        let next = match *slot {
            None => Self::first(x),
            Some(e) => Self {
                estimate: lambda * x + (1.0 - lambda) * e.estimate,
                ibc: lambda * lambda + (1.0 - lambda) * (1.0 - lambda) * e.ibc,
            },
        };
        *slot = Some(next);
        next
    }

    fn bound(&self, confidence: f64) -> f64 {
        (self.ibc * (1.0 / confidence).ln() / 2.0).sqrt()
    }
}

/// Reference sample frozen at the most favourable point, plus the EWMA of
/// everything observed after it.
///
/// `sign = 1.0` watches for increases (the reference minimises the upper
/// bound), `sign = -1.0` for decreases (it maximises the lower bound).
#[derive(Debug, Clone, Copy)]
struct Monitor {
    sign: f64,
    reference: Option<Ewma>,
    recent: Option<Ewma>,
}

impl Monitor {
    fn new(sign: f64) -> Self {
        Self {
            sign,
            reference: None,
            recent: None,
        }
    }

    fn key(&self, e: &Ewma, confidence: f64) -> f64 {
        self.sign * e.estimate + e.bound(confidence)
    }

    fn observe(&mut self, total: Ewma, x: f64, lambda: f64, confidence: f64) {
        let replace = match self.reference {
            None => true,
            Some(r) => self.key(&total, confidence) < self.key(&r, confidence),
        };
        if replace {
            self.reference = Some(total);
            self.recent = None;
        } else {
            Ewma::push(&mut self.recent, x, lambda);
        }
    }

    fn changed(&self, confidence: f64) -> bool {
        match (self.reference, self.recent) {
            (Some(r), Some(s)) => {
                let bound = ((r.ibc + s.ibc) * (1.0 / confidence).ln() / 2.0).sqrt();
                self.sign * (s.estimate - r.estimate) > bound
            }
            _ => false,
        }
    }
}

/// EWMA-based Hoeffding drift detector.
#[derive(Debug, Clone)]
pub struct HddmW {
    cfg: HddmWConfig,
    n: u64,
    total: Option<Ewma>,
    increase: Monitor,
    decrease: Monitor,
    machine: StateMachine,
    last: Status,
}

impl HddmW {
    pub fn new(cfg: HddmWConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            n: 0,
            total: None,
            increase: Monitor::new(1.0),
            decrease: Monitor::new(-1.0),
            machine: StateMachine::new("hddm_w", true),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &HddmWConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    /// Current EWMA of the stream (`0.0` before the first observation).
    pub fn estimate(&self) -> f64 {
        self.total.map_or(0.0, |t| t.estimate)
    }

    fn changed(&self, confidence: f64) -> bool {
        self.increase.changed(confidence)
            || (self.cfg.two_sided && self.decrease.changed(confidence))
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_unit_interval(value)?;
        let lambda = self.cfg.lambda;
        let conf = self.cfg.drift_confidence;
        self.n += 1;
        let total = Ewma::push(&mut self.total, x, lambda);
        self.increase.observe(total, x, lambda, conf);
        if self.cfg.two_sided {
            self.decrease.observe(total, x, lambda, conf);
        }

        let drift = self.changed(self.cfg.drift_confidence);
        let warning = drift || self.changed(self.cfg.warning_confidence);
        let status = self.machine.advance(warning, drift, self.n, total.estimate);
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
        self.n = 0;
        self.total = None;
        self.increase = Monitor::new(1.0);
        self.decrease = Monitor::new(-1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_drift(mut update: impl FnMut(f64) -> Status) -> (bool, usize) {
        for _ in 0..300 {
            assert!(!update(0.0).warning);
        }
        let mut warned = false;
        for i in 1..=200 {
            let s = update(1.0);
            if s.drift {
                assert!(warned, "drift without a warning tick");
                return (true, i);
            }
            warned |= s.warning;
        }
        (false, 0)
    }

    #[test]
    fn hddm_a_detects_jump_in_error_rate() {
        let mut d = HddmA::new(HddmAConfig::default()).unwrap();
        let (drifted, at) = run_until_drift(|x| d.update(x).unwrap());
        assert!(drifted);
        assert!(at < 20, "late detection at {at}");
        assert_eq!(d.n(), 0);
    }

    #[test]
    fn hddm_w_detects_jump_in_error_rate() {
        let mut d = HddmW::new(HddmWConfig::default()).unwrap();
        let (drifted, at) = run_until_drift(|x| d.update(x).unwrap());
        assert!(drifted);
        assert!(at < 40, "late detection at {at}");
    }

    #[test]
    fn one_sided_ignores_improvement_two_sided_does_not() {
        let mut one = HddmA::new(HddmAConfig::default()).unwrap();
        let mut two = HddmA::new(HddmAConfig {
            two_sided: true,
            ..HddmAConfig::default()
        })
        .unwrap();
        let mut two_drifted = false;
        for i in 0..600 {
            let x = if i < 300 { 1.0 } else { 0.0 };
            assert!(!one.update(x).unwrap().drift);
            two_drifted |= two.update(x).unwrap().drift;
        }
        assert!(two_drifted);
    }

    #[test]
    fn inputs_outside_unit_interval_are_rejected() {
        let mut d = HddmW::new(HddmWConfig::default()).unwrap();
        assert!(d.update(1.5).is_err());
        assert!(d.update(-0.1).is_err());
        assert!(d.update(0.25).is_ok());
    }

    #[test]
    fn warning_confidence_must_be_looser() {
        let cfg = HddmAConfig {
            drift_confidence: 0.01,
            warning_confidence: 0.005,
            two_sided: false,
        };
        assert!(HddmA::new(cfg).is_err());
    }
}

//! Cumulative-deviation detectors: CUSUM, Geometric Moving Average, Page–Hinkley.
//!
//! All three track how far the stream has moved *above* its own running mean
//! (an increase in error/loss) and compare that statistic against a threshold
//! expressed in units of the stream's running standard deviation:
//!
//! - CUSUM: \(g_t = \max(0, g_{t-1} + x_t - \bar x_t - \text{slack})\)
//! - GMA:   \(g_t = \alpha g_{t-1} + (1-\alpha)(x_t - \bar x_t)\)
//! - Page–Hinkley: \(m_t = \alpha m_{t-1} + x_t - \bar x_t - \delta\), statistic \(m_t - \min_{s \le t} m_s\)
//!
//! Drift fires when the statistic exceeds `drift_level * scale`, where `scale` is
//! the Welford standard deviation since the last reset, floored at `min_scale`
//! so a (temporarily) constant stream cannot divide the threshold down to zero.

use crate::error::{check_real, Error, Result};
use crate::stats::NumericAccumulator;
use crate::status::{StateMachine, Status};

fn validate_levels(drift_level: f64, warning_level: Option<f64>, min_scale: f64) -> Result<()> {
    if !(drift_level.is_finite() && drift_level > 0.0) {
        return Err(Error::Configuration("drift_level must be finite and > 0"));
    }
    if let Some(w) = warning_level {
        if !(w.is_finite() && w > 0.0) {
            return Err(Error::Configuration("warning_level must be finite and > 0"));
        }
        if w >= drift_level {
            return Err(Error::Configuration("drift_level must exceed warning_level"));
        }
    }
    if !(min_scale.is_finite() && min_scale > 0.0) {
        return Err(Error::Configuration("min_scale must be finite and > 0"));
    }
    Ok(())
}

/// Shared bookkeeping: running moments, min-instances guard, thresholds.
#[derive(Debug, Clone)]
struct Deviation {
    drift_level: f64,
    warning_level: Option<f64>,
    min_num_instances: u64,
    min_scale: f64,
    moments: NumericAccumulator,
}

impl Deviation {
    fn new(drift_level: f64, warning_level: Option<f64>, min_num_instances: u64, min_scale: f64) -> Self {
        Self {
            drift_level,
            warning_level,
            min_num_instances,
            min_scale,
            moments: NumericAccumulator::new(),
        }
    }

    /// Record `x`; returns `x - mean` with the mean already including `x`.
    fn observe(&mut self, x: f64) -> f64 {
        self.moments.update(x);
        x - self.moments.mean()
    }

    fn n(&self) -> u64 {
        self.moments.count()
    }

    /// `(warning, drift)` conditions for `stat`.
    fn conditions(&self, stat: f64) -> (bool, bool) {
        if self.n() < self.min_num_instances {
            return (false, false);
        }
        let scale = self.moments.std_dev().max(self.min_scale);
        let warning = self.warning_level.is_some_and(|w| stat > w * scale);
        (warning, stat > self.drift_level * scale)
    }

    fn reset(&mut self) {
        self.moments.reset();
    }
}

/// CUSUM configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CusumConfig {
    /// Drift threshold, in running standard deviations.
    pub drift_level: f64,
    /// Optional warning threshold (must be below `drift_level`). `None` disables
    /// the warning stage.
    pub warning_level: Option<f64>,
    /// Allowed per-observation drift above the mean before it accumulates.
    pub slack: f64,
    /// Observations required before any verdict other than Normal.
    pub min_num_instances: u64,
    /// Floor for the running standard deviation.
    pub min_scale: f64,
}

impl Default for CusumConfig {
    fn default() -> Self {
        Self {
            drift_level: 50.0,
            warning_level: None,
            slack: 0.005,
            min_num_instances: 30,
            min_scale: 1e-6,
        }
    }
}

impl CusumConfig {
    pub fn validate(&self) -> Result<()> {
        validate_levels(self.drift_level, self.warning_level, self.min_scale)?;
        if !(self.slack.is_finite() && self.slack >= 0.0) {
            return Err(Error::Configuration("slack must be finite and >= 0"));
        }
        Ok(())
    }
}

/// One-sided CUSUM against the running mean.
#[derive(Debug, Clone)]
pub struct Cusum {
    cfg: CusumConfig,
    dev: Deviation,
    sum: f64,
    machine: StateMachine,
    last: Status,
}

impl Cusum {
    pub fn new(cfg: CusumConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            dev: Deviation::new(cfg.drift_level, cfg.warning_level, cfg.min_num_instances, cfg.min_scale),
            sum: 0.0,
            machine: StateMachine::new("cusum", cfg.warning_level.is_some()),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &CusumConfig {
        &self.cfg
    }

    /// Observations since the last reset.
    pub fn n(&self) -> u64 {
        self.dev.n()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_real(value)?;
        let d = self.dev.observe(x);
        self.sum = (self.sum + d - self.cfg.slack).max(0.0);
        let (warning, drift) = self.dev.conditions(self.sum);
        let status = self.machine.advance(warning, drift, self.dev.n(), self.sum);
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
        self.dev.reset();
        self.sum = 0.0;
    }
}

/// Geometric Moving Average configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometricMovingAverageConfig {
    /// Forgetting factor in `(0, 1)`; larger means longer memory.
    pub alpha: f64,
    pub drift_level: f64,
    pub warning_level: Option<f64>,
    pub min_num_instances: u64,
    pub min_scale: f64,
}

impl Default for GeometricMovingAverageConfig {
    fn default() -> Self {
        Self {
            alpha: 0.99,
            drift_level: 1.0,
            warning_level: None,
            min_num_instances: 30,
            min_scale: 1e-6,
        }
    }
}

impl GeometricMovingAverageConfig {
    pub fn validate(&self) -> Result<()> {
        validate_levels(self.drift_level, self.warning_level, self.min_scale)?;
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::Configuration("alpha must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Exponentially weighted deviation above the running mean.
#[derive(Debug, Clone)]
pub struct GeometricMovingAverage {
    cfg: GeometricMovingAverageConfig,
    dev: Deviation,
    sum: f64,
    machine: StateMachine,
    last: Status,
}

impl GeometricMovingAverage {
    pub fn new(cfg: GeometricMovingAverageConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            dev: Deviation::new(cfg.drift_level, cfg.warning_level, cfg.min_num_instances, cfg.min_scale),
            sum: 0.0,
            machine: StateMachine::new("gma", cfg.warning_level.is_some()),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &GeometricMovingAverageConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.dev.n()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_real(value)?;
        let d = self.dev.observe(x);
        self.sum = self.cfg.alpha * self.sum + (1.0 - self.cfg.alpha) * d;
        let (warning, drift) = self.dev.conditions(self.sum);
        let status = self.machine.advance(warning, drift, self.dev.n(), self.sum);
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
        self.dev.reset();
        self.sum = 0.0;
    }
}

/// Page–Hinkley configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageHinkleyConfig {
    /// Fading factor in `(0, 1]` applied to the cumulative sum (`1.0` = classic PH).
    pub alpha: f64,
    /// Magnitude of change tolerated before it accumulates.
    pub delta: f64,
    pub drift_level: f64,
    pub warning_level: Option<f64>,
    pub min_num_instances: u64,
    pub min_scale: f64,
}

impl Default for PageHinkleyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.9999,
            delta: 0.005,
            drift_level: 50.0,
            warning_level: None,
            min_num_instances: 30,
            min_scale: 1e-6,
        }
    }
}

impl PageHinkleyConfig {
    pub fn validate(&self) -> Result<()> {
        validate_levels(self.drift_level, self.warning_level, self.min_scale)?;
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::Configuration("alpha must lie in (0, 1]"));
        }
        if !(self.delta.is_finite() && self.delta >= 0.0) {
            return Err(Error::Configuration("delta must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Page–Hinkley test for an increase in mean.
#[derive(Debug, Clone)]
pub struct PageHinkley {
    cfg: PageHinkleyConfig,
    dev: Deviation,
    sum: f64,
    min_sum: f64,
    machine: StateMachine,
    last: Status,
}

impl PageHinkley {
    pub fn new(cfg: PageHinkleyConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            dev: Deviation::new(cfg.drift_level, cfg.warning_level, cfg.min_num_instances, cfg.min_scale),
            sum: 0.0,
            min_sum: 0.0,
            machine: StateMachine::new("page_hinkley", cfg.warning_level.is_some()),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &PageHinkleyConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.dev.n()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_real(value)?;
        let d = self.dev.observe(x);
        self.sum = self.cfg.alpha * self.sum + d - self.cfg.delta;
        self.min_sum = self.min_sum.min(self.sum);
        let stat = self.sum - self.min_sum;
        let (warning, drift) = self.dev.conditions(stat);
        let status = self.machine.advance(warning, drift, self.dev.n(), stat);
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
        self.dev.reset();
        self.sum = 0.0;
        self.min_sum = 0.0;
    }
}

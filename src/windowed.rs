//! Two-window comparison detectors: KSWIN and STEPD.
//!
//! Both keep a `reference` buffer of older observations and a `recent` buffer
//! of the newest ones. A value leaving `recent` moves into `reference`, which in
//! turn evicts its own oldest value, so memory is bounded by the two
//! capacities. Once both buffers are full a two-sample test runs on every tick
//! and its tail probability is compared with `warning_alpha` / `drift_alpha`.
//!
//! `Status::value` is that tail probability (`1.0` until the buffers fill).

use std::collections::VecDeque;

use crate::error::{check_binary, check_real, Error, Result};
use crate::stats::{ks_p_value, ks_statistic_sorted, normal_sf};
use crate::status::{StateMachine, Status};

/// Bounded FIFO that also tracks the sum of its contents.
#[derive(Debug, Clone)]
struct Window {
    cap: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl Window {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: VecDeque::with_capacity(cap),
            sum: 0.0,
        }
    }

    fn is_full(&self) -> bool {
        self.buf.len() == self.cap
    }

    /// Push `x`, returning the evicted oldest value when at capacity.
    fn push(&mut self, x: f64) -> Option<f64> {
        let evicted = if self.is_full() {
            self.buf.pop_front()
        } else {
            None
        };
        if let Some(old) = evicted {
            self.sum -= old;
        }
        self.buf.push_back(x);
        self.sum += x;
        evicted
    }

    fn sorted(&self) -> Vec<f64> {
        let mut v: Vec<f64> = self.buf.iter().copied().collect();
        v.sort_by(f64::total_cmp);
        v
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.sum = 0.0;
    }
}

/// Reference/recent buffer pair shared by the window-comparison detectors.
#[derive(Debug, Clone)]
pub struct TwoWindow {
    reference: Window,
    recent: Window,
}

impl TwoWindow {
    pub fn new(reference_size: usize, recent_size: usize) -> Result<Self> {
        if reference_size == 0 || recent_size == 0 {
            return Err(Error::Configuration("window sizes must be >= 1"));
        }
        Ok(Self {
            reference: Window::new(reference_size),
            recent: Window::new(recent_size),
        })
    }

    pub fn push(&mut self, x: f64) {
        if let Some(old) = self.recent.push(x) {
            self.reference.push(old);
        }
    }

    /// Both buffers at capacity.
    pub fn is_full(&self) -> bool {
        self.reference.is_full() && self.recent.is_full()
    }

    /// Reference values, oldest first.
    pub fn reference(&self) -> impl Iterator<Item = f64> + '_ {
        self.reference.buf.iter().copied()
    }

    /// Recent values, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = f64> + '_ {
        self.recent.buf.iter().copied()
    }

    pub fn reference_len(&self) -> usize {
        self.reference.buf.len()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.buf.len()
    }

    pub fn clear(&mut self) {
        self.reference.clear();
        self.recent.clear();
    }
}

fn validate_alphas(warning_alpha: f64, drift_alpha: f64) -> Result<()> {
    if !(drift_alpha > 0.0 && drift_alpha < warning_alpha && warning_alpha < 1.0) {
        return Err(Error::Configuration(
            "alphas must satisfy 0 < drift_alpha < warning_alpha < 1",
        ));
    }
    Ok(())
}

// =============================================================================
// KSWIN
// =============================================================================

/// KSWIN configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KswinConfig {
    pub reference_size: usize,
    pub recent_size: usize,
    pub warning_alpha: f64,
    pub drift_alpha: f64,
}

impl Default for KswinConfig {
    fn default() -> Self {
        Self {
            reference_size: 70,
            recent_size: 30,
            warning_alpha: 0.01,
            drift_alpha: 0.005,
        }
    }
}

impl KswinConfig {
    pub fn validate(&self) -> Result<()> {
        validate_alphas(self.warning_alpha, self.drift_alpha)
    }
}

/// Kolmogorov–Smirnov windowing (Raab et al., 2020) on real-valued streams.
#[derive(Debug, Clone)]
pub struct Kswin {
    cfg: KswinConfig,
    windows: TwoWindow,
    n: u64,
    machine: StateMachine,
    last: Status,
}

impl Kswin {
    pub fn new(cfg: KswinConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            windows: TwoWindow::new(cfg.reference_size, cfg.recent_size)?,
            n: 0,
            machine: StateMachine::new("kswin", true),
            last: Status::normal(1.0),
        })
    }

    pub fn config(&self) -> &KswinConfig {
        &self.cfg
    }

    pub fn windows(&self) -> &TwoWindow {
        &self.windows
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_real(value)?;
        self.n += 1;
        self.windows.push(x);

        let mut p = 1.0;
        if self.windows.is_full() {
            let reference = self.windows.reference.sorted();
            let recent = self.windows.recent.sorted();
            let d = ks_statistic_sorted(&reference, &recent);
            p = ks_p_value(d, reference.len(), recent.len());
        }
        let status = self.machine.advance(
            p < self.cfg.warning_alpha,
            p < self.cfg.drift_alpha,
            self.n,
            p,
        );
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
        self.windows.clear();
        self.n = 0;
    }
}

// =============================================================================
// STEPD
// =============================================================================

/// STEPD configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepdConfig {
    pub reference_size: usize,
    pub recent_size: usize,
    pub warning_alpha: f64,
    pub drift_alpha: f64,
}

impl Default for StepdConfig {
    fn default() -> Self {
        Self {
            reference_size: 300,
            recent_size: 30,
            warning_alpha: 0.05,
            drift_alpha: 0.003,
        }
    }
}

impl StepdConfig {
    pub fn validate(&self) -> Result<()> {
        validate_alphas(self.warning_alpha, self.drift_alpha)
    }
}

/// Statistical test of equal proportions (Nishida & Yamauchi, 2007).
///
/// Inputs are 0/1 error indicators. The test is one-sided: only a recent error
/// rate *above* the reference rate counts as evidence.
#[derive(Debug, Clone)]
pub struct Stepd {
    cfg: StepdConfig,
    windows: TwoWindow,
    n: u64,
    machine: StateMachine,
    last: Status,
}

impl Stepd {
    pub fn new(cfg: StepdConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            windows: TwoWindow::new(cfg.reference_size, cfg.recent_size)?,
            n: 0,
            machine: StateMachine::new("stepd", true),
            last: Status::normal(1.0),
        })
    }

    pub fn config(&self) -> &StepdConfig {
        &self.cfg
    }

    pub fn windows(&self) -> &TwoWindow {
        &self.windows
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    /// One-sided p-value for "recent error rate exceeds reference error rate".
    fn p_value(&self) -> f64 {
        let (e_o, n_o) = (self.windows.reference.sum, self.windows.reference_len() as f64);
        let (e_r, n_r) = (self.windows.recent.sum, self.windows.recent_len() as f64);
        let (rate_o, rate_r) = (e_o / n_o, e_r / n_r);
        if rate_r <= rate_o {
            return 1.0;
        }
        let pooled = (e_o + e_r) / (n_o + n_r);
        let inv = 1.0 / n_o + 1.0 / n_r;
        let denom = (pooled * (1.0 - pooled) * inv).sqrt();
        if denom == 0.0 {
            return 1.0;
        }
        let t = ((rate_r - rate_o).abs() - 0.5 * inv) / denom;
        normal_sf(t)
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_binary(value)?;
        self.n += 1;
        self.windows.push(x);

        let p = if self.windows.is_full() {
            self.p_value()
        } else {
            1.0
        };
        let status = self.machine.advance(
            p < self.cfg.warning_alpha,
            p < self.cfg.drift_alpha,
            self.n,
            p,
        );
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
        self.windows.clear();
        self.n = 0;
    }
}

//! Status snapshots and the Normal → Warning → Drift state machine.
//!
//! Every detector computes its own warning/drift *conditions*; the transition
//! rules themselves live here so they are identical across families:
//!
//! ```text
//!            warning ∨ drift             drift
//!   Normal ───────────────────► Warning ───────► Drift ──(reset)──► Normal
//!     ▲                            │
//!     └──────── ¬warning ∧ ¬drift ─┘
//! ```
//!
//! Detectors without a warning stage (ADWIN, CUSUM family with no
//! `warning_level`) are *unstaged*: their drift condition moves Normal → Drift
//! directly.

/// Detector state after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriftState {
    /// In control.
    #[default]
    Normal,
    /// Early evidence of drift.
    Warning,
    /// Drift confirmed; the detector has already discarded its history.
    Drift,
}

/// Snapshot returned after every `update`.
///
/// `warning` is true for Warning and Drift ticks, `drift` only for Drift ticks.
/// `value` is the family's monitored statistic after the observation (e.g. `p + s`
/// for DDM, the cumulative sum for CUSUM, the window mean for ADWIN).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    pub drift: bool,
    pub warning: bool,
    pub value: f64,
}

impl Status {
    /// Build a status from a state and the monitored statistic.
    pub fn from_state(state: DriftState, value: f64) -> Self {
        Self {
            drift: state == DriftState::Drift,
            warning: state != DriftState::Normal,
            value,
        }
    }

    /// In-control status carrying `value`.
    pub fn normal(value: f64) -> Self {
        Self::from_state(DriftState::Normal, value)
    }

    /// The state encoded by the flags.
    pub fn state(&self) -> DriftState {
        if self.drift {
            DriftState::Drift
        } else if self.warning {
            DriftState::Warning
        } else {
            DriftState::Normal
        }
    }
}

/// Shared transition logic; one per detector instance.
#[derive(Debug, Clone)]
pub(crate) struct StateMachine {
    name: &'static str,
    staged: bool,
    state: DriftState,
}

impl StateMachine {
    /// `staged = true` forces every drift through at least one Warning tick.
    pub(crate) fn new(name: &'static str, staged: bool) -> Self {
        Self {
            name,
            staged,
            state: DriftState::Normal,
        }
    }

    pub(crate) fn state(&self) -> DriftState {
        self.state
    }

    pub(crate) fn reset(&mut self) {
        self.state = DriftState::Normal;
    }

    /// Report the current state without evaluating new conditions (for ticks
    /// that carry no information for the detector's statistic).
    pub(crate) fn hold(&mut self, value: f64) -> Status {
        if self.state == DriftState::Drift {
            self.state = DriftState::Normal;
        }
        Status::from_state(self.state, value)
    }

    /// Apply this tick's conditions. `n` is only used for logging.
    ///
    /// A previous Drift behaves like Normal: the detector has already reset.
    pub(crate) fn advance(&mut self, warning: bool, drift: bool, n: u64, value: f64) -> Status {
        let prev = self.state;
        let next = match prev {
            DriftState::Warning if drift => DriftState::Drift,
            _ if drift && !self.staged => DriftState::Drift,
            _ if warning || drift => DriftState::Warning,
            _ => DriftState::Normal,
        };
        match next {
            DriftState::Drift => {
                tracing::debug!(detector = self.name, n, value, "drift detected");
            }
            DriftState::Warning if prev != DriftState::Warning => {
                tracing::trace!(detector = self.name, n, value, "entered warning zone");
            }
            _ => {}
        }
        self.state = next;
        Status::from_state(next, value)
    }
}

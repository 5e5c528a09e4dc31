//! ECDD-WT: EWMA chart for error streams, with a warning threshold.
//!
//! Ross et al. (2012). An exponentially weighted moving average `z` of the
//! 0/1 error indicator is compared with the running error rate `p̂`. The
//! control limit `L` comes from a polynomial in `p̂` fitted for a target
//! in-control average run length (`λ = 0.2`).

use crate::error::{check_binary, Error, Result};
use crate::stats::NumericAccumulator;
use crate::status::{StateMachine, Status};

/// Target in-control average run length (expected observations between false alarms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AverageRunLength {
    Arl100,
    #[default]
    Arl400,
    Arl1000,
}

impl AverageRunLength {
    /// Control limit `L` for error rate `p`.
    pub fn control_limit(self, p: f64) -> f64 {
        let (p3, p5, p7) = (p.powi(3), p.powi(5), p.powi(7));
        match self {
            Self::Arl100 => 2.76 - 6.23 * p + 18.12 * p3 - 312.45 * p5 + 1002.18 * p7,
            Self::Arl400 => 3.97 - 6.56 * p + 48.73 * p3 - 330.13 * p5 + 848.18 * p7,
            Self::Arl1000 => 1.17 + 7.56 * p - 21.24 * p3 + 112.12 * p5 - 987.23 * p7,
        }
    }
}

/// ECDD-WT configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EcddWtConfig {
    /// EWMA weight of the newest observation.
    pub lambda: f64,
    pub average_run_length: AverageRunLength,
    /// Warning fires at this fraction of the control limit.
    pub warning_level: f64,
    pub min_num_instances: u64,
}

impl Default for EcddWtConfig {
    fn default() -> Self {
        Self {
            lambda: 0.2,
            average_run_length: AverageRunLength::Arl400,
            warning_level: 0.5,
            min_num_instances: 30,
        }
    }
}

impl EcddWtConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda > 0.0 && self.lambda <= 1.0) {
            return Err(Error::Configuration("lambda must lie in (0, 1]"));
        }
        if !(self.warning_level > 0.0 && self.warning_level < 1.0) {
            return Err(Error::Configuration("warning_level must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// EWMA chart detector.
#[derive(Debug, Clone)]
pub struct EcddWt {
    cfg: EcddWtConfig,
    rate: NumericAccumulator,
    z: f64,
    machine: StateMachine,
    last: Status,
}

impl EcddWt {
    pub fn new(cfg: EcddWtConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            rate: NumericAccumulator::new(),
            z: 0.0,
            machine: StateMachine::new("ecdd_wt", true),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &EcddWtConfig {
        &self.cfg
    }

    pub fn n(&self) -> u64 {
        self.rate.count()
    }

    /// Running error rate `p̂`.
    pub fn error_rate(&self) -> f64 {
        self.rate.mean()
    }

    /// Current EWMA.
    pub fn ewma(&self) -> f64 {
        self.z
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_binary(value)?;
        let lambda = self.cfg.lambda;
        self.rate.update(x);
        self.z = (1.0 - lambda) * self.z + lambda * x;

        let n = self.rate.count();
        let (warning, drift) = if n < self.cfg.min_num_instances {
            (false, false)
        } else {
            let p = self.rate.mean();
            let decay = 1.0 - (1.0 - lambda).powf(2.0 * n as f64);
            let sigma_z = (p * (1.0 - p) * lambda / (2.0 - lambda) * decay).sqrt();
            let limit = self.cfg.average_run_length.control_limit(p) * sigma_z;
            (
                self.z > p + self.cfg.warning_level * limit,
                self.z > p + limit,
            )
        };

        let status = self.machine.advance(warning, drift, n, self.z);
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
        self.z = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_limits_at_zero_rate() {
        assert!((AverageRunLength::Arl100.control_limit(0.0) - 2.76).abs() < 1e-12);
        assert!((AverageRunLength::Arl400.control_limit(0.0) - 3.97).abs() < 1e-12);
        assert!((AverageRunLength::Arl1000.control_limit(0.0) - 1.17).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_lambda() {
        let cfg = EcddWtConfig {
            lambda: 0.0,
            ..EcddWtConfig::default()
        };
        assert_eq!(
            EcddWt::new(cfg).unwrap_err(),
            Error::Configuration("lambda must lie in (0, 1]")
        );
    }

    #[test]
    fn burst_of_errors_after_clean_stream_drifts() {
        let mut d = EcddWt::new(EcddWtConfig::default()).unwrap();
        for _ in 0..200 {
            assert!(!d.update(0.0).unwrap().warning);
        }
        let first = d.update(1.0).unwrap();
        assert!(first.warning && !first.drift);
        let second = d.update(1.0).unwrap();
        assert!(second.drift);
        assert_eq!(d.n(), 0);
    }

    #[test]
    fn holds_before_min_instances() {
        let mut d = EcddWt::new(EcddWtConfig::default()).unwrap();
        for i in 0..29 {
            let s = d.update((i % 2) as f64).unwrap();
            assert!(!s.warning);
        }
    }
}

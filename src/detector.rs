//! The common detector contract and a closed enum over every family.
//!
//! Each concrete detector also exposes inherent `update`/`status`/`reset`
//! methods with the same signatures, so the trait is only needed for generic
//! code (see [`crate::StreamingComparison`]).

use crate::adwin::{Adwin, AdwinConfig};
use crate::cusum::{
    Cusum, CusumConfig, GeometricMovingAverage, GeometricMovingAverageConfig, PageHinkley,
    PageHinkleyConfig,
};
use crate::ddm::{Ddm, DdmConfig, Rddm, RddmConfig};
use crate::ecdd::{EcddWt, EcddWtConfig};
use crate::eddm::{Eddm, EddmConfig};
use crate::error::Result;
use crate::hddm::{HddmA, HddmAConfig, HddmW, HddmWConfig};
use crate::status::Status;
use crate::windowed::{Kswin, KswinConfig, Stepd, StepdConfig};

/// Online drift detector fed one scalar per call.
pub trait DriftDetector {
    /// Consume one observation and return the resulting status.
    ///
    /// Errors on out-of-domain input; the detector is left untouched in that case.
    fn update(&mut self, value: f64) -> Result<Status>;

    /// Status produced by the most recent `update` (or the initial status).
    fn status(&self) -> Status;

    /// Discard all history; configuration is kept.
    fn reset(&mut self);

    /// Stable short identifier, used in logs.
    fn name(&self) -> &'static str;
}

macro_rules! impl_drift_detector {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl DriftDetector for $ty {
                fn update(&mut self, value: f64) -> Result<Status> {
                    <$ty>::update(self, value)
                }
                fn status(&self) -> Status {
                    <$ty>::status(self)
                }
                fn reset(&mut self) {
                    <$ty>::reset(self)
                }
                fn name(&self) -> &'static str {
                    $name
                }
            }
        )*
    };
}

impl_drift_detector!(
    Cusum => "cusum",
    GeometricMovingAverage => "gma",
    PageHinkley => "page_hinkley",
    Ddm => "ddm",
    Eddm => "eddm",
    EcddWt => "ecdd_wt",
    HddmA => "hddm_a",
    HddmW => "hddm_w",
    Rddm => "rddm",
    Adwin => "adwin",
    Kswin => "kswin",
    Stepd => "stepd",
);

/// Configuration for any detector family; see [`Detector::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum DetectorConfig {
    Cusum(CusumConfig),
    Gma(GeometricMovingAverageConfig),
    PageHinkley(PageHinkleyConfig),
    Ddm(DdmConfig),
    Eddm(EddmConfig),
    EcddWt(EcddWtConfig),
    HddmA(HddmAConfig),
    HddmW(HddmWConfig),
    Rddm(RddmConfig),
    Adwin(AdwinConfig),
    Kswin(KswinConfig),
    Stepd(StepdConfig),
}

impl DetectorConfig {
    /// Every family with its default configuration.
    pub fn all_defaults() -> [DetectorConfig; 12] {
        [
            Self::Cusum(CusumConfig::default()),
            Self::Gma(GeometricMovingAverageConfig::default()),
            Self::PageHinkley(PageHinkleyConfig::default()),
            Self::Ddm(DdmConfig::default()),
            Self::Eddm(EddmConfig::default()),
            Self::EcddWt(EcddWtConfig::default()),
            Self::HddmA(HddmAConfig::default()),
            Self::HddmW(HddmWConfig::default()),
            Self::Rddm(RddmConfig::default()),
            Self::Adwin(AdwinConfig::default()),
            Self::Kswin(KswinConfig::default()),
            Self::Stepd(StepdConfig::default()),
        ]
    }
}

/// A detector of any family, dispatched by `match`.
#[derive(Debug, Clone)]
pub enum Detector {
    Cusum(Cusum),
    Gma(GeometricMovingAverage),
    PageHinkley(PageHinkley),
    Ddm(Ddm),
    Eddm(Eddm),
    EcddWt(EcddWt),
    HddmA(HddmA),
    HddmW(HddmW),
    Rddm(Rddm),
    Adwin(Adwin),
    Kswin(Kswin),
    Stepd(Stepd),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Detector::Cusum($d) => $body,
            Detector::Gma($d) => $body,
            Detector::PageHinkley($d) => $body,
            Detector::Ddm($d) => $body,
            Detector::Eddm($d) => $body,
            Detector::EcddWt($d) => $body,
            Detector::HddmA($d) => $body,
            Detector::HddmW($d) => $body,
            Detector::Rddm($d) => $body,
            Detector::Adwin($d) => $body,
            Detector::Kswin($d) => $body,
            Detector::Stepd($d) => $body,
        }
    };
}

impl Detector {
    /// Validate `cfg` and build the matching detector.
    pub fn new(cfg: DetectorConfig) -> Result<Self> {
        Ok(match cfg {
            DetectorConfig::Cusum(c) => Self::Cusum(Cusum::new(c)?),
            DetectorConfig::Gma(c) => Self::Gma(GeometricMovingAverage::new(c)?),
            DetectorConfig::PageHinkley(c) => Self::PageHinkley(PageHinkley::new(c)?),
            DetectorConfig::Ddm(c) => Self::Ddm(Ddm::new(c)?),
            DetectorConfig::Eddm(c) => Self::Eddm(Eddm::new(c)?),
            DetectorConfig::EcddWt(c) => Self::EcddWt(EcddWt::new(c)?),
            DetectorConfig::HddmA(c) => Self::HddmA(HddmA::new(c)?),
            DetectorConfig::HddmW(c) => Self::HddmW(HddmW::new(c)?),
            DetectorConfig::Rddm(c) => Self::Rddm(Rddm::new(c)?),
            DetectorConfig::Adwin(c) => Self::Adwin(Adwin::new(c)?),
            DetectorConfig::Kswin(c) => Self::Kswin(Kswin::new(c)?),
            DetectorConfig::Stepd(c) => Self::Stepd(Stepd::new(c)?),
        })
    }

    /// The configuration this detector was built from.
    pub fn config(&self) -> DetectorConfig {
        match self {
            Self::Cusum(d) => DetectorConfig::Cusum(*d.config()),
            Self::Gma(d) => DetectorConfig::Gma(*d.config()),
            Self::PageHinkley(d) => DetectorConfig::PageHinkley(*d.config()),
            Self::Ddm(d) => DetectorConfig::Ddm(*d.config()),
            Self::Eddm(d) => DetectorConfig::Eddm(*d.config()),
            Self::EcddWt(d) => DetectorConfig::EcddWt(*d.config()),
            Self::HddmA(d) => DetectorConfig::HddmA(*d.config()),
            Self::HddmW(d) => DetectorConfig::HddmW(*d.config()),
            Self::Rddm(d) => DetectorConfig::Rddm(*d.config()),
            Self::Adwin(d) => DetectorConfig::Adwin(*d.config()),
            Self::Kswin(d) => DetectorConfig::Kswin(*d.config()),
            Self::Stepd(d) => DetectorConfig::Stepd(*d.config()),
        }
    }
}

impl DriftDetector for Detector {
    fn update(&mut self, value: f64) -> Result<Status> {
        dispatch!(self, d => d.update(value))
    }

    fn status(&self) -> Status {
        dispatch!(self, d => d.status())
    }

    fn reset(&mut self) {
        dispatch!(self, d => d.reset())
    }

    fn name(&self) -> &'static str {
        dispatch!(self, d => DriftDetector::name(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_config_builds() {
        for cfg in DetectorConfig::all_defaults() {
            let d = Detector::new(cfg).unwrap();
            assert_eq!(d.config(), cfg);
            assert_eq!(d.status(), Detector::new(cfg).unwrap().status());
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = DetectorConfig::all_defaults()
            .into_iter()
            .map(|c| Detector::new(c).unwrap().name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        let cfg = DetectorConfig::Ddm(DdmConfig {
            warning_level: 3.0,
            drift_level: 2.0,
            min_num_instances: 30,
        });
        assert!(Detector::new(cfg).is_err());
    }
}

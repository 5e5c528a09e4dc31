//! `driftwatch`: online concept-drift detectors with bounded state.
//!
//! Feed one scalar per call to `update`; every detector answers with a
//! [`Status`] `{ drift, warning, value }` after each observation. All families
//! share the same state machine (Normal → Warning → Drift) and the same reset
//! rule: a drift tick is reported, then the detector forgets its history.
//!
//! **Families:**
//! - CUSUM family on real-valued streams: [`Cusum`], [`GeometricMovingAverage`],
//!   [`PageHinkley`].
//! - Statistical process control on 0/1 error streams: [`Ddm`], [`Eddm`],
//!   [`EcddWt`], [`Rddm`]; Hoeffding-bound variants on `[0, 1]` values:
//!   [`HddmA`], [`HddmW`].
//! - Window comparison: [`Adwin`] (exponential-histogram adaptive window),
//!   [`Kswin`] (Kolmogorov–Smirnov), [`Stepd`] (test of equal proportions).
//!
//! **Shared surface:**
//! - [`DriftDetector`]: `update` / `status` / `reset` for generic code.
//! - [`Detector`] / [`DetectorConfig`]: one closed enum over every family,
//!   buildable from (optionally serde-deserialized) configuration.
//! - [`BatchDetector`] / [`ComparisonResult`]: two-sample comparison API, with
//!   [`KsTest`] and the [`StreamingComparison`] adapter.
//! - [`wilson_bounds`] / [`FalseAlarmEstimate`]: false-alarm calibration
//!   (Monte Carlo runner behind the `stochastic` feature).
//!
//! **Input domains:** CUSUM family, ADWIN and KSWIN accept finite values of
//! magnitude at most [`MAX_MAGNITUDE`];
//! DDM, EDDM, ECDD-WT, RDDM and STEPD accept `0.0` (correct) or `1.0` (error);
//! HDDM accepts `[0, 1]`. Anything else is rejected with
//! [`Error::InvalidInput`] and leaves the detector unchanged.
//!
//! **Non-goals:**
//! - No callbacks into caller code and no persistence of detector state.
//! - Not thread-safe for concurrent mutation of one instance; independent
//!   instances share nothing.
//!
//! # Example
//!
//! ```
//! use driftwatch::{Ddm, DdmConfig};
//!
//! let mut ddm = Ddm::new(DdmConfig::default()).unwrap();
//! let mut saw_drift = false;
//! for i in 0..400 {
//!     let error = if i < 200 { 0.0 } else { 1.0 };
//!     saw_drift |= ddm.update(error).unwrap().drift;
//! }
//! assert!(saw_drift);
//! ```
//!
//! Logging goes through `tracing`: drift and forced resets at `debug`,
//! warning entry and window shrinks at `trace`.

#![forbid(unsafe_code)]

mod error;
pub use error::{Error, Result, MAX_MAGNITUDE};

mod status;
pub use status::{DriftState, Status};

pub mod stats;
pub use stats::NumericAccumulator;

mod detector;
pub use detector::*;

mod cusum;
pub use cusum::*;

mod ddm;
pub use ddm::*;

mod eddm;
pub use eddm::*;

mod ecdd;
pub use ecdd::*;

mod hddm;
pub use hddm::*;

pub mod adwin;
pub use adwin::{AdaptiveWindow, Adwin, AdwinConfig, Bucket};

mod windowed;
pub use windowed::*;

mod batch;
pub use batch::*;

mod calibration;
pub use calibration::*;

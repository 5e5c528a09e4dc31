//! Batch comparison: one reference sample against one current sample.
//!
//! Batch detectors and streaming detectors wrapped in
//! [`StreamingComparison`] share the [`BatchDetector`] API and both report a
//! [`ComparisonResult`].

use crate::detector::DriftDetector;
use crate::error::{check_finite, Error, Result};
use crate::stats::{ks_p_value, ks_statistic_sorted};

/// Outcome of comparing a current sample with the fitted reference.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonResult {
    pub statistic: f64,
    /// `None` when the method has no closed-form tail probability.
    pub p_value: Option<f64>,
}

/// Fit on a reference sample, then compare any number of current samples.
pub trait BatchDetector {
    fn fit(&mut self, reference: &[f64]) -> Result<()>;
    fn compare(&self, current: &[f64]) -> Result<ComparisonResult>;
}

fn checked_sorted(sample: &[f64]) -> Result<Vec<f64>> {
    if sample.is_empty() {
        return Err(Error::InsufficientSamples { needed: 1, got: 0 });
    }
    let mut v = sample
        .iter()
        .map(|&x| check_finite(x))
        .collect::<Result<Vec<f64>>>()?;
    v.sort_by(f64::total_cmp);
    Ok(v)
}

/// Two-sample Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Default)]
pub struct KsTest {
    reference: Option<Vec<f64>>,
}

impl KsTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.reference.is_some()
    }
}

impl BatchDetector for KsTest {
    fn fit(&mut self, reference: &[f64]) -> Result<()> {
        self.reference = Some(checked_sorted(reference)?);
        Ok(())
    }

    fn compare(&self, current: &[f64]) -> Result<ComparisonResult> {
        let reference = self.reference.as_deref().ok_or(Error::NotFitted)?;
        let current = checked_sorted(current)?;
        let d = ks_statistic_sorted(reference, &current);
        Ok(ComparisonResult {
            statistic: d,
            p_value: Some(ks_p_value(d, reference.len(), current.len())),
        })
    }
}

/// Adapts a streaming detector to the batch API.
///
/// `fit` streams the reference sample through a fresh detector and keeps that
/// state. `compare` continues a clone of it with the current sample; the
/// statistic is the number of drift signals raised while doing so, and there
/// is no p-value.
#[derive(Debug, Clone)]
pub struct StreamingComparison<D> {
    detector: D,
    fitted: bool,
}

impl<D: DriftDetector + Clone> StreamingComparison<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            fitted: false,
        }
    }

    /// The detector state after `fit`.
    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: DriftDetector + Clone> BatchDetector for StreamingComparison<D> {
    fn fit(&mut self, reference: &[f64]) -> Result<()> {
        if reference.is_empty() {
            return Err(Error::InsufficientSamples { needed: 1, got: 0 });
        }
        let mut d = self.detector.clone();
        d.reset();
        for &x in reference {
            d.update(x)?;
        }
        self.detector = d;
        self.fitted = true;
        Ok(())
    }

    fn compare(&self, current: &[f64]) -> Result<ComparisonResult> {
        if !self.fitted {
            return Err(Error::NotFitted);
        }
        let mut d = self.detector.clone();
        let mut drifts = 0u64;
        for &x in current {
            if d.update(x)?.drift {
                drifts += 1;
            }
        }
        Ok(ComparisonResult {
            statistic: drifts as f64,
            p_value: None,
        })
    }
}

//! ADWIN: adaptive windowing (Bifet & Gavaldà, 2007).
//!
//! The window is stored as an exponential histogram: row `i` holds buckets
//! summarising `2^i` consecutive observations, at most `max_buckets` per row.
//! Memory and per-tick work are `O(max_buckets · log W)` for a window of width
//! `W`. Whenever two adjacent sub-windows have means that differ by more than a
//! variance-aware (Bernstein-style) bound, the older sub-window is dropped;
//! that shrink is the drift signal.

use std::collections::VecDeque;

use crate::error::{check_real, Error, Result};
use crate::status::{StateMachine, Status};

/// Summary of `capacity` consecutive observations.
///
/// Spread is kept as the sum of squared deviations from the bucket's own mean,
/// so merging and dropping buckets never subtracts two large sums of squares.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bucket {
    capacity: u64,
    sum: f64,
    m2: f64,
}

impl Bucket {
    fn single(x: f64) -> Self {
        Self {
            capacity: 1,
            sum: x,
            m2: 0.0,
        }
    }

    fn merge(a: Self, b: Self) -> Self {
        let capacity = a.capacity + b.capacity;
        let gap = a.mean() - b.mean();
        let weight = (a.capacity as f64 * b.capacity as f64) / capacity as f64;
        Self {
            capacity,
            sum: a.sum + b.sum,
            m2: a.m2 + b.m2 + gap * gap * weight,
        }
    }

    /// Number of observations summarised.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.sum / self.capacity as f64
        }
    }

    /// Population variance of the summarised observations.
    pub fn variance(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.m2 / self.capacity as f64
        }
    }
}

/// Exponential-histogram window with incremental totals.
#[derive(Debug, Clone)]
pub struct AdaptiveWindow {
    max_buckets: usize,
    /// `rows[i]` holds buckets of capacity `2^i`, oldest at the front.
    rows: Vec<VecDeque<Bucket>>,
    width: u64,
    total: f64,
    /// Sum of squared deviations from the window mean.
    m2: f64,
}

impl AdaptiveWindow {
    /// `max_buckets` must be at least 2.
    pub fn new(max_buckets: usize) -> Result<Self> {
        if max_buckets < 2 {
            return Err(Error::Configuration("max_buckets must be >= 2"));
        }
        Ok(Self {
            max_buckets,
            rows: vec![VecDeque::with_capacity(max_buckets + 1)],
            width: 0,
            total: 0.0,
            m2: 0.0,
        })
    }

    /// Observations currently summarised.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Window mean (`0.0` when empty).
    pub fn mean(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.total / self.width as f64
        }
    }

    /// Population variance of the window.
    pub fn variance(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.m2 / self.width as f64
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.rows.iter().map(VecDeque::len).sum()
    }

    /// Buckets from oldest to newest.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.rows.iter().rev().flat_map(|row| row.iter())
    }

    /// Append one observation and restore the per-row bucket limit.
    pub fn insert(&mut self, x: f64) {
        let delta = x - self.mean();
        self.rows[0].push_back(Bucket::single(x));
        self.width += 1;
        self.total += x;
        self.m2 += delta * (x - self.mean());
        self.compress();
    }

    fn compress(&mut self) {
        let mut level = 0;
        while self.rows[level].len() > self.max_buckets {
            let (Some(a), Some(b)) = (self.rows[level].pop_front(), self.rows[level].pop_front())
            else {
                break;
            };
            if level + 1 == self.rows.len() {
                self.rows.push(VecDeque::with_capacity(self.max_buckets + 1));
            }
            self.rows[level + 1].push_back(Bucket::merge(a, b));
            level += 1;
        }
    }

    /// Size of the oldest sub-window to drop, if any split is significant.
    ///
    /// Splits fall on bucket boundaries. A split with sides `n0`, `n1` is
    /// significant when the gap between the side means exceeds
    /// `sqrt(2σ²·L / m) + 2L / (3m)`, where `σ²` is the window variance,
    /// `L = ln(2W/δ)` and `m = 1 / (1/n0 + 1/n1)`. Among significant splits
    /// the one whose gap exceeds its bound by the largest factor is returned,
    /// which puts the cut at the change point rather than next to it.
    fn find_cut(&self, delta: f64, min_sub_window: u64) -> Option<u64> {
        if self.width < 2 {
            return None;
        }
        let log_term = (2.0 * self.width as f64 / delta).ln();
        let variance = self.variance();
        let mut best: Option<(f64, u64)> = None;
        let (mut n0, mut s0) = (0u64, 0.0);
        for bucket in self.buckets() {
            n0 += bucket.capacity;
            s0 += bucket.sum;
            let n1 = self.width - n0;
            if n1 < min_sub_window {
                break;
            }
            if n0 < min_sub_window {
                continue;
            }
            let (f0, f1) = (n0 as f64, n1 as f64);
            let gap = (s0 / f0 - (self.total - s0) / f1).abs();
            let m = 1.0 / (1.0 / f0 + 1.0 / f1);
            let eps = (2.0 * variance * log_term / m).sqrt() + 2.0 * log_term / (3.0 * m);
            let ratio = gap / eps;
            if ratio > 1.0 && best.map_or(true, |(r, _)| ratio > r) {
                best = Some((ratio, n0));
            }
        }
        best.map(|(_, n0)| n0)
    }

    /// Drop the oldest `count` observations; `count` must fall on a bucket boundary.
    fn drop_oldest(&mut self, count: u64) {
        let mut dropped = 0;
        while dropped < count {
            let Some(row) = self.rows.iter_mut().rev().find(|r| !r.is_empty()) else {
                break;
            };
            let Some(bucket) = row.pop_front() else {
                break;
            };
            dropped += bucket.capacity;
            let rest = self.width - bucket.capacity;
            if rest == 0 {
                self.width = 0;
                self.total = 0.0;
                self.m2 = 0.0;
                continue;
            }
            let rest_total = self.total - bucket.sum;
            let gap = bucket.mean() - rest_total / rest as f64;
            let weight = (bucket.capacity as f64 * rest as f64) / self.width as f64;
            self.m2 = (self.m2 - bucket.m2 - gap * gap * weight).max(0.0);
            self.width = rest;
            self.total = rest_total;
        }
    }

    /// Repeatedly cut the window while a significant split exists.
    /// Returns the number of observations discarded.
    pub fn shrink(&mut self, delta: f64, min_sub_window: u64) -> u64 {
        let mut removed = 0;
        while let Some(n0) = self.find_cut(delta, min_sub_window) {
            self.drop_oldest(n0);
            removed += n0;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.rows.push(VecDeque::with_capacity(self.max_buckets + 1));
        self.width = 0;
        self.total = 0.0;
        self.m2 = 0.0;
    }
}

/// ADWIN configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdwinConfig {
    /// Confidence of each cut test.
    pub delta: f64,
    /// Buckets kept per histogram row (`M`).
    pub max_buckets: usize,
    /// Smallest sub-window considered on either side of a split.
    pub min_sub_window: u64,
    /// Check for cuts every `clock` observations.
    pub clock: u64,
}

impl Default for AdwinConfig {
    fn default() -> Self {
        Self {
            delta: 0.002,
            max_buckets: 5,
            min_sub_window: 1,
            clock: 1,
        }
    }
}

impl AdwinConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(Error::Configuration("delta must lie in (0, 1)"));
        }
        if self.max_buckets < 2 {
            return Err(Error::Configuration("max_buckets must be >= 2"));
        }
        if self.min_sub_window == 0 {
            return Err(Error::Configuration("min_sub_window must be >= 1"));
        }
        if self.clock == 0 {
            return Err(Error::Configuration("clock must be >= 1"));
        }
        Ok(())
    }
}

/// ADWIN drift detector. Unstaged: a shrink is reported as drift directly.
#[derive(Debug, Clone)]
pub struct Adwin {
    cfg: AdwinConfig,
    window: AdaptiveWindow,
    ticks: u64,
    machine: StateMachine,
    last: Status,
}

impl Adwin {
    pub fn new(cfg: AdwinConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            window: AdaptiveWindow::new(cfg.max_buckets)?,
            ticks: 0,
            machine: StateMachine::new("adwin", false),
            last: Status::default(),
        })
    }

    pub fn config(&self) -> &AdwinConfig {
        &self.cfg
    }

    pub fn window(&self) -> &AdaptiveWindow {
        &self.window
    }

    pub fn width(&self) -> u64 {
        self.window.width()
    }

    pub fn mean(&self) -> f64 {
        self.window.mean()
    }

    pub fn variance(&self) -> f64 {
        self.window.variance()
    }

    pub fn update(&mut self, value: f64) -> Result<Status> {
        let x = check_real(value)?;
        self.window.insert(x);
        self.ticks += 1;

        let mut drift = false;
        if self.ticks % self.cfg.clock == 0 {
            let removed = self.window.shrink(self.cfg.delta, self.cfg.min_sub_window);
            if removed > 0 {
                tracing::trace!(removed, width = self.window.width(), "adwin window shrunk");
                drift = true;
            }
        }

        let status = self
            .machine
            .advance(false, drift, self.window.width(), self.window.mean());
        self.last = status;
        Ok(status)
    }

    pub fn status(&self) -> Status {
        self.last
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.ticks = 0;
        self.machine.reset();
        self.last = Status::default();
    }
}

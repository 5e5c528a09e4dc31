//! End-to-end scenarios on synthetic streams with known change points.

use driftwatch::{
    Adwin, AdwinConfig, Cusum, CusumConfig, Ddm, DdmConfig, Detector, DetectorConfig,
    DriftDetector, DriftState, EcddWt, EcddWtConfig, Eddm, EddmConfig, GeometricMovingAverage,
    GeometricMovingAverageConfig, PageHinkley, PageHinkleyConfig, Rddm, RddmConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

// ---------------------------------------------------------------------------
// DDM: clean stream, then constant errors
// ---------------------------------------------------------------------------

#[test]
fn ddm_warns_before_drifting_on_error_burst() {
    let cfg = DdmConfig {
        warning_level: 2.0,
        drift_level: 3.0,
        min_num_instances: 30,
    };
    let mut d = Ddm::new(cfg).unwrap();
    for i in 0..200 {
        let s = d.update(0.0).unwrap();
        assert!(!s.warning && !s.drift, "alarm in clean segment at {i}");
    }

    let mut first_warning = None;
    let mut first_drift = None;
    for i in 0..200 {
        let s = d.update(1.0).unwrap();
        if s.warning && first_warning.is_none() {
            first_warning = Some(i);
        }
        if s.drift && first_drift.is_none() {
            first_drift = Some(i);
        }
    }
    let w = first_warning.expect("no warning in error segment");
    let dr = first_drift.expect("no drift in error segment");
    assert!(w < dr, "warning at {w}, drift at {dr}");
}

// ---------------------------------------------------------------------------
// ADWIN: level shift
// ---------------------------------------------------------------------------

#[test]
fn adwin_keeps_only_the_new_regime_after_a_shift() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut d = Adwin::new(AdwinConfig::default()).unwrap();
    for i in 0..1_000 {
        let s = d.update(rng.gen::<f64>()).unwrap();
        assert!(!s.drift, "false alarm at {i}");
    }

    let mut drifted = false;
    for seen in 1..=1_000u64 {
        let s = d.update(10.0 + rng.gen::<f64>()).unwrap();
        if s.drift {
            drifted = true;
            assert!(d.width() <= seen, "window still holds pre-shift data");
            assert!((d.mean() - 10.5).abs() < 0.5, "mean={}", d.mean());
        }
    }
    assert!(drifted);
    assert!((d.mean() - 10.5).abs() < 0.05, "mean={}", d.mean());
}

#[test]
fn adwin_is_quiet_on_stationary_gaussian_noise() {
    let mut rng = StdRng::seed_from_u64(1);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut d = Adwin::new(AdwinConfig::default()).unwrap();
    for i in 0..10_000 {
        let s = d.update(noise.sample(&mut rng)).unwrap();
        assert!(!s.drift, "false alarm at {i}, width={}", d.width());
    }
    assert_eq!(d.width(), 10_000);
    assert!((d.variance() - 1.0).abs() < 0.1, "variance={}", d.variance());
}

#[test]
fn adwin_cuts_at_a_gaussian_mean_shift() {
    let mut rng = StdRng::seed_from_u64(3);
    let before = Normal::new(0.0, 1.0).unwrap();
    let after = Normal::new(3.0, 1.0).unwrap();
    let mut d = Adwin::new(AdwinConfig::default()).unwrap();
    for _ in 0..2_000 {
        d.update(before.sample(&mut rng)).unwrap();
    }
    let mut first = None;
    for seen in 1..=500u64 {
        if d.update(after.sample(&mut rng)).unwrap().drift && first.is_none() {
            first = Some(seen);
        }
    }
    let at = first.expect("shift not detected");
    assert!(at <= 100, "detected after {at} shifted samples");
    assert!((d.mean() - 3.0).abs() < 0.3, "mean={}", d.mean());
}

#[test]
fn adwin_buckets_cover_the_window() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut d = Adwin::new(AdwinConfig::default()).unwrap();
    for _ in 0..3_000 {
        d.update(rng.gen_range(-5.0..5.0)).unwrap();
    }
    let w = d.window();
    let buckets: Vec<_> = w.buckets().collect();
    assert_eq!(buckets.len(), w.bucket_count());
    assert_eq!(buckets.iter().map(|b| b.capacity()).sum::<u64>(), w.width());
    let total: f64 = buckets.iter().map(|b| b.sum()).sum();
    assert!((total / w.width() as f64 - w.mean()).abs() < 1e-9);
    for b in &buckets {
        assert!((0.0..=25.0).contains(&b.variance()), "variance={}", b.variance());
        assert!((-5.0..=5.0).contains(&b.mean()), "mean={}", b.mean());
    }
}

// ---------------------------------------------------------------------------
// min_num_instances guard
// ---------------------------------------------------------------------------

fn assert_quiet(mut d: impl DriftDetector, values: impl Iterator<Item = f64>) {
    for (i, x) in values.enumerate() {
        let s = d.update(x).unwrap();
        assert!(
            !s.warning && !s.drift,
            "{} alarmed at {i} before min_num_instances",
            d.name()
        );
    }
}

#[test]
fn guarded_families_stay_quiet_before_min_instances() {
    let extreme = |i: usize| if i % 2 == 0 { 0.0 } else { 1e9 };
    let errors = |_| 1.0;

    let c = CusumConfig::default();
    assert_quiet(Cusum::new(c).unwrap(), (0..c.min_num_instances as usize - 1).map(extreme));
    let g = GeometricMovingAverageConfig::default();
    assert_quiet(
        GeometricMovingAverage::new(g).unwrap(),
        (0..g.min_num_instances as usize - 1).map(extreme),
    );
    let p = PageHinkleyConfig::default();
    assert_quiet(
        PageHinkley::new(p).unwrap(),
        (0..p.min_num_instances as usize - 1).map(extreme),
    );

    let dd = DdmConfig::default();
    assert_quiet(Ddm::new(dd).unwrap(), (0..dd.min_num_instances as usize - 1).map(errors));
    let e = EddmConfig::default();
    assert_quiet(Eddm::new(e).unwrap(), (0..e.min_num_instances as usize - 1).map(errors));
    let ec = EcddWtConfig::default();
    assert_quiet(EcddWt::new(ec).unwrap(), (0..ec.min_num_instances as usize - 1).map(errors));
    let r = RddmConfig::default();
    assert_quiet(Rddm::new(r).unwrap(), (0..r.min_num_instances as usize - 1).map(errors));
}

// ---------------------------------------------------------------------------
// All families: a gross change is detected, staged ones warn first
// ---------------------------------------------------------------------------

/// Map a raw `[0, 1)` draw into the family's input domain.
fn to_domain(cfg: &DetectorConfig, u: f64, shifted: bool) -> f64 {
    match cfg {
        DetectorConfig::Ddm(_)
        | DetectorConfig::Eddm(_)
        | DetectorConfig::EcddWt(_)
        | DetectorConfig::Rddm(_)
        | DetectorConfig::Stepd(_) => {
            let p = if shifted { 0.9 } else { 0.05 };
            if u < p {
                1.0
            } else {
                0.0
            }
        }
        DetectorConfig::HddmA(_) | DetectorConfig::HddmW(_) => {
            if shifted {
                0.8 + 0.2 * u
            } else {
                0.2 * u
            }
        }
        _ => {
            if shifted {
                20.0 + u
            } else {
                u
            }
        }
    }
}

#[test]
fn every_family_detects_a_gross_shift() {
    for cfg in DetectorConfig::all_defaults() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut d = Detector::new(cfg).unwrap();
        for _ in 0..500 {
            d.update(to_domain(&cfg, rng.gen(), false)).unwrap();
        }
        // Start from a clean state machine so the staging check below is exact.
        for _ in 0..1_000 {
            if d.status().state() == DriftState::Normal {
                break;
            }
            d.update(to_domain(&cfg, rng.gen(), false)).unwrap();
        }
        assert_eq!(d.status().state(), DriftState::Normal, "{} stuck", d.name());

        let mut prev = d.status().state();
        let mut detected = false;
        for _ in 0..2_000 {
            let s = d.update(to_domain(&cfg, rng.gen(), true)).unwrap();
            let now = s.state();
            if now == DriftState::Drift {
                let unstaged = matches!(cfg, DetectorConfig::Adwin(_))
                    || matches!(cfg, DetectorConfig::Cusum(c) if c.warning_level.is_none())
                    || matches!(cfg, DetectorConfig::Gma(c) if c.warning_level.is_none())
                    || matches!(cfg, DetectorConfig::PageHinkley(c) if c.warning_level.is_none());
                if !unstaged {
                    assert_eq!(prev, DriftState::Warning, "{} skipped warning", d.name());
                }
                detected = true;
                break;
            }
            prev = now;
        }
        assert!(detected, "{} missed the shift", d.name());
    }
}

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use driftwatch::{AdaptiveWindow, Adwin, AdwinConfig};
use std::hint::black_box;

fn bench_adwin(c: &mut Criterion) {
    let mut group = c.benchmark_group("adwin");

    // Stationary stream: the window only grows, so this measures compression
    // plus the logarithmic cut scan.
    for &n in &[1_000usize, 10_000, 100_000] {
        let xs: Vec<f64> = (0..n).map(|i| (i as f64 * 0.618_033_988_75).fract()).collect();
        group.bench_with_input(BenchmarkId::new("update/stationary", n), &xs, |b, xs| {
            b.iter(|| {
                let mut d = Adwin::new(AdwinConfig::default()).unwrap();
                for &x in xs {
                    black_box(d.update(x).unwrap());
                }
                black_box(d.width());
            })
        });
    }

    group.bench_function("update/clock32", |b| {
        let cfg = AdwinConfig {
            clock: 32,
            ..AdwinConfig::default()
        };
        b.iter(|| {
            let mut d = Adwin::new(cfg).unwrap();
            for i in 0..10_000 {
                black_box(d.update((i as f64 * 0.618_033_988_75).fract()).unwrap());
            }
        })
    });

    group.bench_function("window/insert", |b| {
        b.iter(|| {
            let mut w = AdaptiveWindow::new(5).unwrap();
            for i in 0..10_000 {
                w.insert(i as f64);
            }
            black_box(w.bucket_count());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_adwin);
criterion_main!(benches);

//! Criterion benchmarks for the cluster-bootstrap hot loop.
//!
//! Run with: `cargo bench -p claimlens-runner`
//!
//! The bootstrap dominates analysis wall time (hundreds of resamples over the
//! full record table), so the benchmark sweeps the table size at the default
//! resample count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use claimlens_core::domain::RawRecord;
use claimlens_core::features;
use claimlens_runner::{cluster_bootstrap, tam_statistic, BootstrapConfig};

/// Synthetic record table with `providers` providers over four years.
fn generate_records(providers: u64) -> Vec<RawRecord> {
    let drgs = ["190 - COPD", "291 - HEART FAILURE", "470 - JOINT REPLACEMENT"];
    let mut records = Vec::new();
    for provider in 1..=providers {
        for year in 2012..2016 {
            for (i, drg) in drgs.iter().enumerate() {
                let payments = 8_000.0 + (provider % 7) as f64 * 1_500.0;
                records.push(RawRecord::new(
                    provider,
                    format!("PROVIDER {provider}"),
                    if provider % 2 == 0 { "GA" } else { "TX" },
                    format!("30{:03}", provider % 100),
                    year,
                    *drg,
                    50.0 + (provider + i as u64) as f64,
                    40_000.0 + (provider % 11) as f64 * 5_000.0,
                    payments,
                    payments * 0.8,
                ));
            }
        }
    }
    features::derive(records)
}

fn bench_cluster_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_bootstrap");
    group.sample_size(10);

    for providers in [10u64, 50, 200] {
        let records = generate_records(providers);
        let config = BootstrapConfig::default();

        group.bench_with_input(
            BenchmarkId::from_parameter(providers),
            &providers,
            |b, _| {
                b.iter(|| {
                    cluster_bootstrap(
                        black_box(&records),
                        "tam",
                        |r| r.drg_code.clone(),
                        tam_statistic,
                        &config,
                    )
                    .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_tam_statistic(c: &mut Criterion) {
    let records = generate_records(200);
    let refs: Vec<&RawRecord> = records.iter().collect();
    c.bench_function("tam_statistic_200_providers", |b| {
        b.iter(|| tam_statistic(black_box(&refs)));
    });
}

criterion_group!(benches, bench_cluster_bootstrap, bench_tam_statistic);
criterion_main!(benches);

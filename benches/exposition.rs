//! Benchmarks for metrics exposition
//!
//! Measures the cost of one `/metrics` scrape: counter increment plus text
//! encoding of the registry.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use uptime_probe::metrics::Metrics;

fn populated_metrics(include_process: bool) -> Metrics {
    let metrics = Metrics::new("bench-host", include_process).expect("metrics should build");
    let target = "https://example.com/status";
    metrics.add_scrape_bytes(target, 4096);
    for status in ["", "200", "301", "404", "503"] {
        metrics
            .set_probe_duration("bench-host", target, status, 0.125)
            .expect("valid duration");
    }
    metrics
}

fn bench_gather(c: &mut Criterion) {
    let metrics = populated_metrics(false);
    c.bench_function("gather_probe_metrics", |b| {
        b.iter(|| {
            metrics.increment_scrape_count();
            black_box(metrics.gather().expect("encoding should succeed"))
        })
    });

    let with_process = populated_metrics(true);
    c.bench_function("gather_with_process_metrics", |b| {
        b.iter(|| black_box(with_process.gather().expect("encoding should succeed")))
    });
}

fn bench_record_cycle(c: &mut Criterion) {
    let metrics = populated_metrics(false);
    c.bench_function("record_probe_cycle", |b| {
        b.iter(|| {
            metrics
                .set_probe_duration("bench-host", black_box("https://example.com/status"), "200", 0.01)
                .expect("valid duration");
            metrics.add_scrape_bytes("https://example.com/status", black_box(1256));
        })
    });
}

criterion_group!(benches, bench_gather, bench_record_cycle);
criterion_main!(benches);

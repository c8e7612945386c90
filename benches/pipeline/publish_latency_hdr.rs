//! Publish-to-handle latency percentiles, recorded with HdrHistogram.
//!
//! Run with `cargo bench --bench publish_latency_hdr`.

use eventring::{ConsumerGroup, Pipeline, PipelineConfig, WaitStrategyKind};
use hdrhistogram::Histogram;
use std::sync::{Arc, Mutex};
use std::time::Instant;

const WARMUP: usize = 10_000;
const SAMPLES: usize = 200_000;

fn measure(kind: WaitStrategyKind) -> Histogram<u64> {
    let origin = Instant::now();
    let histogram = Arc::new(Mutex::new(
        Histogram::<u64>::new_with_bounds(1, 10_000_000_000, 3).expect("histogram bounds"),
    ));

    let pipeline: Pipeline<u64> = Pipeline::new(
        PipelineConfig::new()
            .with_ring_capacity(4096)
            .with_wait_strategy(kind),
    );
    let recorder = Arc::clone(&histogram);
    let mut seen = 0usize;
    pipeline
        .register(
            ConsumerGroup::new("latency").handle_with(move |sent_at: &u64, _, _| {
                let now = origin.elapsed().as_nanos() as u64;
                seen += 1;
                if seen > WARMUP {
                    let mut histogram = recorder.lock().expect("histogram lock");
                    let _ = histogram.record(now.saturating_sub(*sent_at).max(1));
                }
                Ok(())
            }),
        )
        .expect("register");
    pipeline.start().expect("start");

    let publisher = pipeline.publisher().expect("publisher");
    for _ in 0..WARMUP + SAMPLES {
        publisher
            .publish_with(|slot, _| *slot = origin.elapsed().as_nanos() as u64)
            .expect("publish");
    }
    pipeline.drain();

    let histogram = histogram.lock().expect("histogram lock");
    histogram.clone()
}

fn main() {
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "strategy", "samples", "p50 ns", "p90 ns", "p99 ns", "p99.9 ns", "max ns"
    );
    for kind in [
        WaitStrategyKind::Blocking,
        WaitStrategyKind::Yielding,
        WaitStrategyKind::Sleeping,
        WaitStrategyKind::BusySpin,
    ] {
        let histogram = measure(kind);
        println!(
            "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            kind.to_string(),
            histogram.len(),
            histogram.value_at_quantile(0.50),
            histogram.value_at_quantile(0.90),
            histogram.value_at_quantile(0.99),
            histogram.value_at_quantile(0.999),
            histogram.max(),
        );
    }
}

//! Single-group throughput across wait strategies and producer modes.

use criterion::{BenchmarkId, Criterion, Throughput};
use eventring::{ConsumerGroup, Pipeline, PipelineConfig, ProducerMode, WaitStrategyKind};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

const EVENTS: u64 = 100_000;

fn summing_pipeline(config: PipelineConfig) -> (Pipeline<u64>, Arc<AtomicU64>) {
    let total = Arc::new(AtomicU64::new(0));
    let sum = Arc::clone(&total);
    let pipeline = Pipeline::new(config);
    pipeline
        .register(ConsumerGroup::new("sum").handle_with(move |event: &u64, _, _| {
            sum.fetch_add(*event, Ordering::Relaxed);
            Ok(())
        }))
        .expect("register must succeed in bench setup");
    pipeline.start().expect("start must succeed in bench setup");
    (pipeline, total)
}

/// Register the throughput benchmarks.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline - Throughput");
    group.throughput(Throughput::Elements(EVENTS));
    group.sample_size(20);

    for kind in [
        WaitStrategyKind::Blocking,
        WaitStrategyKind::Yielding,
        WaitStrategyKind::Sleeping,
        WaitStrategyKind::BusySpin,
    ] {
        group.bench_with_input(
            BenchmarkId::new("publish_single_producer", kind),
            &kind,
            |b, &kind| {
                b.iter_with_setup(
                    || {
                        summing_pipeline(
                            PipelineConfig::new()
                                .with_ring_capacity(1024)
                                .with_wait_strategy(kind)
                                .with_producer_mode(ProducerMode::Single),
                        )
                    },
                    |(pipeline, total)| {
                        let publisher = pipeline.publisher().expect("publisher");
                        for value in 0..EVENTS {
                            publisher.publish(black_box(value)).expect("publish");
                        }
                        pipeline.drain();
                        black_box(total.load(Ordering::Relaxed));
                    },
                );
            },
        );
    }

    for &batch in &[8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::new("publish_batch", batch), &batch, |b, &batch| {
            b.iter_with_setup(
                || summing_pipeline(PipelineConfig::new().with_ring_capacity(1024)),
                |(pipeline, total)| {
                    let publisher = pipeline.publisher().expect("publisher");
                    let mut next = 0u64;
                    while next < EVENTS {
                        let len = (batch as u64).min(EVENTS - next) as usize;
                        let range = next..next + len as u64;
                        publisher
                            .publish_batch(range.collect::<Vec<_>>())
                            .expect("publish batch");
                        next += len as u64;
                    }
                    pipeline.drain();
                    black_box(total.load(Ordering::Relaxed));
                },
            );
        });
    }

    for &producers in &[2u64, 4] {
        group.bench_with_input(
            BenchmarkId::new("publish_multi_producer", producers),
            &producers,
            |b, &producers| {
                b.iter_with_setup(
                    || summing_pipeline(PipelineConfig::new().with_ring_capacity(1024)),
                    |(pipeline, total)| {
                        let per_producer = EVENTS / producers;
                        let handles: Vec<_> = (0..producers)
                            .map(|_| {
                                let publisher = pipeline.publisher().expect("publisher");
                                thread::spawn(move || {
                                    for value in 0..per_producer {
                                        publisher.publish(value).expect("publish");
                                    }
                                })
                            })
                            .collect();
                        for handle in handles {
                            handle.join().expect("producer thread");
                        }
                        pipeline.drain();
                        black_box(total.load(Ordering::Relaxed));
                    },
                );
            },
        );
    }

    group.finish();
}

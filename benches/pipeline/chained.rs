//! Cost of dependency depth: a chain of groups versus a fan-out.

use criterion::{BenchmarkId, Criterion, Throughput};
use eventring::{ConsumerGroup, Pipeline, PipelineConfig};
use std::hint::black_box;

const EVENTS: u64 = 50_000;

fn noop(name: String) -> ConsumerGroup<u64> {
    ConsumerGroup::new(name).handle_with(|event: &u64, _, _| {
        black_box(event);
        Ok(())
    })
}

/// Register the chained and fan-out benchmarks.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline - Topology");
    group.throughput(Throughput::Elements(EVENTS));
    group.sample_size(20);

    for &depth in &[1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, &depth| {
            b.iter_with_setup(
                || {
                    let pipeline: Pipeline<u64> =
                        Pipeline::new(PipelineConfig::new().with_ring_capacity(1024));
                    for stage in 0..depth {
                        let mut consumer = noop(format!("stage-{stage}"));
                        if stage > 0 {
                            consumer = consumer.after(format!("stage-{}", stage - 1));
                        }
                        pipeline.register(consumer).expect("register");
                    }
                    pipeline.start().expect("start");
                    pipeline
                },
                |pipeline| {
                    let publisher = pipeline.publisher().expect("publisher");
                    for value in 0..EVENTS {
                        publisher.publish(value).expect("publish");
                    }
                    pipeline.drain();
                },
            );
        });

        group.bench_with_input(BenchmarkId::new("fan_out", depth), &depth, |b, &width| {
            b.iter_with_setup(
                || {
                    let pipeline: Pipeline<u64> =
                        Pipeline::new(PipelineConfig::new().with_ring_capacity(1024));
                    for branch in 0..width {
                        pipeline
                            .register(noop(format!("branch-{branch}")))
                            .expect("register");
                    }
                    pipeline.start().expect("start");
                    pipeline
                },
                |pipeline| {
                    let publisher = pipeline.publisher().expect("publisher");
                    for value in 0..EVENTS {
                        publisher.publish(value).expect("publish");
                    }
                    pipeline.drain();
                },
            );
        });
    }

    group.finish();
}

use criterion::{criterion_group, criterion_main};

mod pipeline;

use pipeline::register_benchmarks as register_pipeline_benchmarks;

criterion_group!(benches, register_pipeline_benchmarks);

criterion_main!(benches);

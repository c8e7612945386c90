pub mod chained;
pub mod throughput;

use criterion::Criterion;

/// Register all pipeline benchmarks.
pub fn register_benchmarks(c: &mut Criterion) {
    throughput::register_benchmarks(c);
    chained::register_benchmarks(c);
}

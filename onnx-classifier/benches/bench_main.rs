use benchmarks::{bench_prepare::preprocessings, bench_ranking::rankings};
use criterion::criterion_main;
mod benchmarks;

criterion_main!(preprocessings, rankings);

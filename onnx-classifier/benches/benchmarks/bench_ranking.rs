use criterion::{black_box, criterion_group, Criterion};
use onnx_classifier::service::{labels::PRODUCE, InferenceOutput, DEFAULT_TOP_K};

fn bench_top_k(c: &mut Criterion) {
    let logits = (0..PRODUCE.len())
        .map(|i| ((i * 37) % 11) as f32 - 5.0)
        .collect::<Vec<_>>();

    c.bench_function("Produce top 5", |b| {
        b.iter(|| {
            InferenceOutput::new(black_box(&logits), PRODUCE)
                .unwrap()
                .top_k(DEFAULT_TOP_K)
        })
    });
}

criterion_group!(rankings, bench_top_k);

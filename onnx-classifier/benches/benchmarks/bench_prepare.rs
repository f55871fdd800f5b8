use criterion::{black_box, criterion_group, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use onnx_classifier::service::prepare::preprocessing;

fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocessing");
    for (width, height) in [(224, 224), (640, 480), (1920, 1080)] {
        let image = gradient_image(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &image,
            |b, image| b.iter(|| preprocessing(black_box(image))),
        );
    }
    group.finish();
}

criterion_group!(preprocessings, bench_preprocessing);

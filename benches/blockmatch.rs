use blockmatch::{
    BlockMatcher, ComputeEnvironment, EnvConfig, ImageView, MatchConfig, Offset, ReferenceBlock,
    VectorWidth,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as f32);
        }
    }
    data
}

fn search_window(cx: i32, cy: i32, radius: i32) -> Vec<Offset> {
    let mut out = Vec::new();
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            out.push(Offset::new(x, y));
        }
    }
    out
}

fn bench_dispatch(c: &mut Criterion) {
    let img_width = 512;
    let img_height = 512;
    let image = make_image(img_width, img_height);
    let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
    let block = ReferenceBlock::from_view(image_view, 240, 240, 16, 16).unwrap();
    let candidates = search_window(240, 240, 32);

    for (name, width, parallel) in [
        ("sse_16x16_scalar", VectorWidth::Scalar, false),
        ("sse_16x16_x4", VectorWidth::X4, false),
        ("sse_16x16_x8", VectorWidth::X8, false),
        ("sse_16x16_x4_parallel", VectorWidth::X4, true),
    ] {
        let env = ComputeEnvironment::acquire(EnvConfig {
            vector_width: width,
            parallel,
            ..EnvConfig::default()
        })
        .unwrap();
        let matcher = BlockMatcher::new(&env).with_config(MatchConfig {
            th_sse: 500_000.0,
            ..MatchConfig::default()
        });
        c.bench_function(name, |b| {
            b.iter(|| black_box(matcher.match_block(&block, image_view, &candidates).unwrap()));
        });
    }
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);

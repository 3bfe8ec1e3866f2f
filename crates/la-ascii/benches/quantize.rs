use criterion::{Criterion, black_box, criterion_group, criterion_main};
use la_ascii::luminance::Quantizer;
use la_core::charset::GlyphRamp;
use la_core::frame::GrayFrame;

fn bench_quantize(c: &mut Criterion) {
    let q = Quantizer::new(GlyphRamp::default());

    // Budget image statique (~10 000 px) et frame 1080p non réduite.
    for &(w, h) in &[(133u32, 75u32), (1920, 1080)] {
        let data = (0..w * h).map(|i| (i % 251) as u8).collect();
        let Ok(frame) = GrayFrame::from_raw(w, h, data) else {
            return;
        };
        c.bench_function(&format!("quantize_{w}x{h}"), |b| {
            b.iter(|| q.quantize(black_box(&frame)));
        });
    }
}

criterion_group!(benches, bench_quantize);
criterion_main!(benches);

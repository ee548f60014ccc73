use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use strided_buffer::{Component, Size, SliceSpec, StridedArrayView, StridedBuffer};

fn random_floats(len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..len).map(|_| rng.gen::<f32>()).collect()
}

fn bench_slice_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_chain");
    for size in [64usize, 256, 1024] {
        let data = random_floats(size * size);
        let bytes: Vec<u8> = bytemuck::cast_slice(&data).to_vec();
        let buffer = StridedBuffer::from_vec(bytes, Size::new([size, size]), Component::F32).unwrap();
        let typed = StridedArrayView::contiguous(&data, Size::new([size, size])).unwrap();

        group.bench_with_input(BenchmarkId::new("typed", size), &size, |b, &size| {
            b.iter(|| {
                black_box(typed)
                    .slice_axis(0, 1, size - 1)
                    .and_then(|v| v.flipped(1))
                    .and_then(|v| v.transposed(0, 1))
                    .and_then(|v| v.sliced(0, SliceSpec::step(-3)))
                    .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("owned", size), &size, |b, &size| {
            b.iter(|| {
                black_box(&buffer)
                    .slice_axis(0, 1, size - 1)
                    .and_then(|v| v.flipped(1))
                    .and_then(|v| v.transposed(0, 1))
                    .and_then(|v| v.sliced(0, SliceSpec::step(-3)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_linearize(c: &mut Criterion) {
    let mut group = c.benchmark_group("linearize");
    for size in [64usize, 256, 1024] {
        let data = random_floats(size * size);
        let bytes: Vec<u8> = bytemuck::cast_slice(&data).to_vec();
        let buffer = StridedBuffer::from_vec(bytes, Size::new([size, size]), Component::F32).unwrap();
        let transposed = buffer.transposed(0, 1).unwrap();
        let typed = StridedArrayView::contiguous(&data, Size::new([size, size]))
            .unwrap()
            .transposed(0, 1)
            .unwrap();
        group.throughput(Throughput::Bytes((size * size * 4) as u64));

        group.bench_with_input(BenchmarkId::new("to_bytes_contiguous", size), &size, |b, _| {
            b.iter(|| black_box(&buffer).to_bytes())
        });
        group.bench_with_input(BenchmarkId::new("to_bytes_transposed", size), &size, |b, _| {
            b.iter(|| black_box(&transposed).to_bytes())
        });
        group.bench_with_input(BenchmarkId::new("typed_to_vec_transposed", size), &size, |b, _| {
            b.iter(|| black_box(typed).to_vec())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_slice_chain, bench_linearize);
criterion_main!(benches);

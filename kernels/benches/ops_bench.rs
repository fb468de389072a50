use criterion::{Criterion, criterion_group, criterion_main};
use decoder_rs_kernels::{cpu_causal_softmax, cpu_matmul, cpu_transpose};
use std::hint::black_box;

fn benchmark_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");

    for &size in &[64, 128, 256] {
        let shape = [size, size];
        let lhs = vec![1.0f32; size * size];
        let rhs = vec![0.5f32; size * size];

        group.bench_function(format!("{size}x{size}"), |b| {
            b.iter(|| {
                cpu_matmul(
                    black_box(&lhs),
                    black_box(&rhs),
                    black_box(&shape),
                    black_box(&shape),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn benchmark_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose");

    for &size in &[128, 512, 1024] {
        let shape = [size, size];
        let data = vec![1.0f32; size * size];

        group.bench_function(format!("{size}x{size}"), |b| {
            b.iter(|| cpu_transpose(black_box(&data), black_box(&shape)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_causal_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("causal_softmax");

    // [heads, seq, seq]
    for &seq in &[32, 128, 256] {
        let heads = 8;
        let scores = vec![0.25f32; heads * seq * seq];

        group.bench_function(format!("h{heads}_s{seq}"), |b| {
            b.iter(|| {
                let mut s = scores.clone();
                cpu_causal_softmax(black_box(&mut s), seq).unwrap();
                s
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_matmul,
    benchmark_transpose,
    benchmark_causal_softmax
);
criterion_main!(benches);

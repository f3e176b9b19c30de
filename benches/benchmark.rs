use criterion::{black_box, criterion_group, criterion_main, Criterion};
use collatz_mapora::graph::GRAPH_ROOT_LABEL;
use collatz_mapora::*;
use num_bigint::BigUint;
use num_traits::One;

fn bench_next_state(c: &mut Criterion) {
    let s = ResidueClass::from_u64(32, 987).unwrap();

    c.bench_function("next_state 987 mod 32", |b| {
        b.iter(|| black_box(&s).next_state())
    });
}

fn bench_ratio_small(c: &mut Criterion) {
    let m = BigUint::from(32u64);
    let r = BigUint::from(987u64);

    c.bench_function("stability_ratio 987 mod 32 (400)", |b| {
        b.iter(|| stability_ratio(black_box(&m), black_box(&r), 400))
    });
}

fn bench_ratio_2pow1000(c: &mut Criterion) {
    let m = BigUint::one() << 1000u32;
    let r = m.clone() - BigUint::from(12345u64);

    c.bench_function("stability_ratio 2^1000 (3000)", |b| {
        b.iter(|| stability_ratio(black_box(&m), black_box(&r), 3000))
    });
}

fn bench_graph_depth14(c: &mut Criterion) {
    c.bench_function("transition graph 987 mod 32 depth 14", |b| {
        b.iter(|| {
            let root = ResidueClass::new(BigUint::from(32u64), BigUint::from(987u64), GRAPH_ROOT_LABEL).unwrap();
            TransitionGraph::build(black_box(root), 14)
        })
    });
}

criterion_group!(
    benches,
    bench_next_state,
    bench_ratio_small,
    bench_ratio_2pow1000,
    bench_graph_depth14,
);
criterion_main!(benches);

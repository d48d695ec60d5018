#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rainvox_utils::random::{Random, Xoroshiro, shuffle};

fn bench_xoroshiro(c: &mut Criterion) {
    let mut rng = Xoroshiro::from_seed(0xDEAD_BEEF);
    c.bench_function("xoroshiro_next_f32", |b| b.iter(|| black_box(rng.next_f32())));
    c.bench_function("xoroshiro_next_i32_bounded", |b| {
        b.iter(|| black_box(rng.next_i32_bounded(black_box(49))));
    });

    let mut items: Vec<u32> = (0..4096).collect();
    c.bench_function("shuffle_4096", |b| {
        b.iter(|| shuffle(black_box(&mut items), &mut rng));
    });
}

criterion_group!(benches, bench_xoroshiro);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use powchain_core::{constants::GENESIS_PROOF, mine::search_parallel, pow, Block, Transaction};
use std::hint::black_box;

fn bench_pow(c: &mut Criterion) {
    c.bench_function("search_from_genesis", |b| {
        b.iter(|| pow::search(black_box(GENESIS_PROOF)))
    });

    c.bench_function("search_parallel_from_genesis", |b| {
        b.iter(|| search_parallel(black_box(GENESIS_PROOF)))
    });

    c.bench_function("validate", |b| {
        b.iter(|| pow::validate(black_box(GENESIS_PROOF), black_box(8862)))
    });
}

fn bench_hash(c: &mut Criterion) {
    let txs: Vec<Transaction> = (0..10)
        .map(|i| Transaction::new(format!("alice-{i}"), "bob", f64::from(i)))
        .collect();
    let block = Block::new(2, txs, 8862, "1");

    c.bench_function("hash_block_10_txs", |b| b.iter(|| black_box(&block).hash()));
}

criterion_group!(benches, bench_pow, bench_hash);
criterion_main!(benches);

// Commitment-scheme benchmarks for the Umbra registry core.
//
// Benchmarks secret generation, commitment derivation, and ownership
// verification. Derivation and verification sit on the request path of
// every record mutation, so their cost matters more than generation,
// which runs once per delivered order.

use criterion::{criterion_group, criterion_main, Criterion};

use umbra_core::commitment;

fn bench_generate(c: &mut Criterion) {
    c.bench_function("commitment/generate", |b| {
        b.iter(commitment::generate);
    });
}

fn bench_derive(c: &mut Criterion) {
    let (secret, _) = commitment::generate();

    c.bench_function("commitment/derive", |b| {
        b.iter(|| commitment::derive(&secret));
    });
}

fn bench_verify_match(c: &mut Criterion) {
    let (secret, stored) = commitment::generate();
    let claimed = secret.reveal_hex();

    c.bench_function("commitment/verify_match", |b| {
        b.iter(|| commitment::verify(&claimed, &stored));
    });
}

fn bench_verify_mismatch(c: &mut Criterion) {
    let (_, stored) = commitment::generate();
    let (wrong_secret, _) = commitment::generate();
    let claimed = wrong_secret.reveal_hex();

    c.bench_function("commitment/verify_mismatch", |b| {
        b.iter(|| commitment::verify(&claimed, &stored));
    });
}

criterion_group!(
    benches,
    bench_generate,
    bench_derive,
    bench_verify_match,
    bench_verify_mismatch,
);
criterion_main!(benches);

#[macro_use]
extern crate criterion;
use criterion::Criterion;
use key_cascade::cascade::Ring;
use key_cascade::common::{PublicKey, SecretKey};
use key_cascade::traits::CascadeSigner;
use key_cascade::trust::Trust;
use key_cascade::walk::Walker;

fn keys(n: usize) -> Vec<SecretKey> {
    (0..n)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_be_bytes());
            SecretKey::from_bytes(&seed).unwrap()
        })
        .collect()
}

fn chain(keys: &[SecretKey]) -> Ring {
    keys.windows(2)
        .map(|w| Trust::create(&w[0], w[1].public_key()))
        .collect()
}

fn bench_single_walk(len: usize, c: &mut Criterion) {
    let keys = keys(len + 1);
    let ring = chain(&keys);
    let (source, target): (PublicKey, PublicKey) = (keys[0].public_key(), keys[len].public_key());
    c.bench_function(format!("Single walk over {} trusts", len).as_str(), |b| {
        b.iter(|| Walker::new().run(&ring, &target, &source).unwrap())
    });
}

fn bench_dual_walk_split(len: usize, c: &mut Criterion) {
    // every key diverges into a dead end on the secondary ring
    let keys = keys(len + 2);
    let primary = chain(&keys[..=len]);
    let secondary: Ring = keys[..len]
        .iter()
        .map(|k| Trust::create(k, keys[len + 1].public_key()))
        .collect();
    let (source, target) = (keys[0].public_key(), keys[len].public_key());
    c.bench_function(format!("Dual walk with {} splits", len).as_str(), |b| {
        b.iter(|| {
            Walker::new()
                .dual_run(&target, &source, &primary, &secondary)
                .unwrap()
        })
    });
}

fn single_16(c: &mut Criterion) {
    bench_single_walk(16, c)
}
fn single_256(c: &mut Criterion) {
    bench_single_walk(256, c)
}
fn dual_16(c: &mut Criterion) {
    bench_dual_walk_split(16, c)
}
fn dual_256(c: &mut Criterion) {
    bench_dual_walk_split(256, c)
}

criterion_group!(single_benches, single_16, single_256);
criterion_group!(dual_benches, dual_16, dual_256);
criterion_main!(single_benches, dual_benches);

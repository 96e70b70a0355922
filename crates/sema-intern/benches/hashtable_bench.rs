//! Hashtable core microbenchmarks (insert, lookup hit/miss, growth).

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sema_intern::HashTable;

fn keys(n: u32) -> Vec<[u8; 4]> {
    (0..n).map(u32::to_le_bytes).collect()
}

fn bench_insert(c: &mut Criterion) {
    let ks = keys(1024);
    c.bench_function("hashtable_insert_1024", |b| {
        b.iter(|| {
            let mut table: HashTable<u32> = HashTable::new();
            for (i, k) in ks.iter().enumerate() {
                table.insert(k, i as u32);
            }
            black_box(table.len())
        })
    });
}

fn bench_lookup_hit(c: &mut Criterion) {
    let ks = keys(1024);
    let mut table: HashTable<u32> = HashTable::new();
    for (i, k) in ks.iter().enumerate() {
        table.insert(k, i as u32);
    }

    c.bench_function("hashtable_lookup_hit", |b| {
        b.iter(|| {
            for k in &ks {
                black_box(table.get(k));
            }
        })
    });
}

fn bench_lookup_miss(c: &mut Criterion) {
    let ks = keys(1024);
    let misses = keys(2048);
    let misses = &misses[1024..];
    let mut table: HashTable<u32> = HashTable::new();
    for (i, k) in ks.iter().enumerate() {
        table.insert(k, i as u32);
    }

    c.bench_function("hashtable_lookup_miss", |b| {
        b.iter(|| {
            for k in misses {
                black_box(table.get(k));
            }
        })
    });
}

fn bench_insert_delete_churn(c: &mut Criterion) {
    let ks = keys(512);
    c.bench_function("hashtable_insert_delete_churn", |b| {
        b.iter(|| {
            let mut table: HashTable<u32> = HashTable::new();
            for (i, k) in ks.iter().enumerate() {
                table.insert(k, i as u32);
            }
            for k in ks.iter().step_by(2) {
                table.remove(k);
            }
            for (i, k) in ks.iter().enumerate() {
                table.insert(k, i as u32);
            }
            black_box(table.len())
        })
    });
}

criterion_group!(
    hashtable_benches,
    bench_insert,
    bench_lookup_hit,
    bench_lookup_miss,
    bench_insert_delete_churn
);
criterion_main!(hashtable_benches);

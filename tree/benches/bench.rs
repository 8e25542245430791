use core::hint::black_box;
use core::time::Duration;
use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rbtree::RedBlackTree;

pub fn gen_ascending_ints(count: usize) -> Vec<i32> {
    (0..count as i32).collect()
}

pub fn gen_random_ints(count: usize) -> Vec<i32> {
    let mut vec = Vec::with_capacity(count);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for _ in 0..count {
        vec.push(rng.gen_range(10_000..100_000))
    }
    assert_eq!(vec.len(), count);
    vec
}

const COUNTS: [usize; 3] = [1_000, 10_000, 100_000];

type GenFunc = fn(usize) -> Vec<i32>;

fn inputs() -> [(&'static str, GenFunc); 2] {
    [
        ("ascending", gen_ascending_ints as GenFunc),
        ("random", gen_random_ints as GenFunc),
    ]
}

fn insert(c: &mut Criterion) {
    for (kind, gen_func) in inputs() {
        let mut g = c.benchmark_group(format!("insert_{}", kind));
        for count in COUNTS {
            let keys = gen_func(count);
            g.bench_with_input(BenchmarkId::new("btree_map", count), &keys, |b, keys| {
                b.iter(|| {
                    let mut map = BTreeMap::new();
                    for k in keys {
                        map.entry(*k).or_insert(*k);
                    }
                    map
                })
            });
            g.bench_with_input(BenchmarkId::new("red_black_tree", count), &keys, |b, keys| {
                b.iter(|| {
                    let mut tree = RedBlackTree::new();
                    for k in keys {
                        tree.insert(*k, *k);
                    }
                    tree
                })
            });
        }
        g.finish();
    }
}

fn get(c: &mut Criterion) {
    for (kind, gen_func) in inputs() {
        let mut g = c.benchmark_group(format!("get_{}", kind));
        for count in COUNTS {
            let keys = gen_func(count);
            let map: BTreeMap<_, _> = keys.iter().map(|k| (*k, *k)).collect();
            let tree: RedBlackTree<_, _> = keys.iter().map(|k| (*k, *k)).collect();

            g.bench_with_input(BenchmarkId::new("btree_map", count), &keys, |b, keys| {
                b.iter(|| {
                    for k in keys {
                        black_box(map.get(black_box(k)));
                    }
                })
            });
            g.bench_with_input(BenchmarkId::new("red_black_tree", count), &keys, |b, keys| {
                b.iter(|| {
                    for k in keys {
                        black_box(tree.get_value(black_box(k)));
                    }
                })
            });
        }
        g.finish();
    }
}

fn erase(c: &mut Criterion) {
    for (kind, gen_func) in inputs() {
        let mut g = c.benchmark_group(format!("erase_{}", kind));
        for count in COUNTS {
            let keys = gen_func(count);
            let map: BTreeMap<_, _> = keys.iter().map(|k| (*k, *k)).collect();

            g.bench_with_input(BenchmarkId::new("btree_map", count), &keys, |b, keys| {
                b.iter_batched_ref(
                    || map.clone(),
                    |map| {
                        for k in keys {
                            black_box(map.remove(k));
                        }
                    },
                    BatchSize::LargeInput,
                )
            });
            g.bench_with_input(BenchmarkId::new("red_black_tree", count), &keys, |b, keys| {
                b.iter_batched_ref(
                    || keys.iter().map(|k| (*k, *k)).collect::<RedBlackTree<_, _>>(),
                    |tree| {
                        for k in keys {
                            black_box(tree.erase(k));
                        }
                    },
                    BatchSize::LargeInput,
                )
            });
        }
        g.finish();
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(1))
        .warm_up_time(Duration::from_millis(100))
        ;
    targets = insert, get, erase
);
criterion_main!(benches);

use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use probe_hash::HashTable as ProbeTable;
use probe_hash::MAX_LOAD_FACTOR;
use probe_hash::hash_table::Entry as ProbeEntry;
use probe_hash::policy::MapPolicy;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

type Sip = BuildHasherDefault<SipHasher>;

trait KeyValuePair {
    type Key: Hash + Eq + Clone;
    type Value: Clone;

    fn new(key: u64) -> (Self::Key, Self::Value);
}

struct SmallItem;

impl KeyValuePair for SmallItem {
    type Key = u64;
    type Value = u64;

    fn new(key: u64) -> (u64, u64) {
        black_box((key, key))
    }
}

struct StringItem;

impl KeyValuePair for StringItem {
    type Key = String;
    type Value = u64;

    fn new(key: u64) -> (String, u64) {
        black_box((format!("key_{:016X}", key), key))
    }
}

struct LargeItem;

impl KeyValuePair for LargeItem {
    type Key = String;
    type Value = [u8; 256];

    fn new(key: u64) -> (String, [u8; 256]) {
        let mut value = [0u8; 256];
        for (i, byte) in value.iter_mut().enumerate() {
            *byte = ((key >> ((i % 8) * 8)) & 0xFF) as u8;
        }
        black_box((format!("key_{:064b}", key), value))
    }
}

type Probe<I> = ProbeTable<MapPolicy<<I as KeyValuePair>::Key, <I as KeyValuePair>::Value>, Sip>;
type Brown<I> = HashbrownMap<<I as KeyValuePair>::Key, <I as KeyValuePair>::Value, Sip>;

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
    (1 << 17),
    (1 << 18),
];

/// Entries each table holds at `size` requested slots before it must grow.
fn capacities<I: KeyValuePair>(size: usize) -> (usize, usize) {
    let probe = (Probe::<I>::with_capacity(size).capacity() as f32 * MAX_LOAD_FACTOR) as usize;
    let brown = Brown::<I>::with_capacity_and_hasher(size, Sip::default()).capacity();
    (probe, brown)
}

fn random_items<I: KeyValuePair>(count: usize) -> Vec<(I::Key, I::Value)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| I::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn shuffled<T: Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.shuffle(&mut SmallRng::from_os_rng());
    items
}

fn bench_insert_random<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for preallocate in [false, true] {
        let mut group = c.benchmark_group(format!(
            "insert_random{}_{}",
            if preallocate { "_preallocated" } else { "" },
            core::any::type_name::<I>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let (probe_capacity, brown_capacity) = capacities::<I>(size);
            let items = random_items::<I>(probe_capacity.max(brown_capacity));
            let initial = if preallocate { size } else { 0 };

            group.throughput(Throughput::Elements(probe_capacity as u64));
            group.bench_function("probe_hash", |b| {
                b.iter_batched(
                    || shuffled(&items),
                    |items| {
                        let mut table = Probe::<I>::with_capacity(initial);
                        for item in items.into_iter().take(probe_capacity) {
                            black_box(table.insert(item));
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });

            group.throughput(Throughput::Elements(brown_capacity as u64));
            group.bench_function("hashbrown", |b| {
                b.iter_batched(
                    || shuffled(&items),
                    |items| {
                        let mut table = Brown::<I>::with_capacity_and_hasher(
                            if preallocate { brown_capacity } else { 0 },
                            Sip::default(),
                        );
                        for (k, v) in items.into_iter().take(brown_capacity) {
                            black_box(table.insert(k, v));
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.finish();
    }
}

fn bench_find<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for hit_percent in [100usize, 50, 0] {
        let mut group = c.benchmark_group(format!(
            "find_hit_{}_{}",
            hit_percent,
            core::any::type_name::<I>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let (probe_capacity, brown_capacity) = capacities::<I>(size);
            let count = probe_capacity.max(brown_capacity);
            let items = random_items::<I>(count);
            let misses = random_items::<I>(count);

            let probes = |capacity: usize| {
                let mut keys: Vec<I::Key> = (0..capacity)
                    .map(|i| {
                        if i * 100 < capacity * hit_percent {
                            items[i].0.clone()
                        } else {
                            misses[i].0.clone()
                        }
                    })
                    .collect();
                keys.shuffle(&mut SmallRng::from_os_rng());
                keys
            };

            let mut probe_table = Probe::<I>::with_capacity(0);
            probe_table.extend(items.iter().take(probe_capacity).cloned());
            let probe_keys = probes(probe_capacity);

            group.throughput(Throughput::Elements(probe_capacity as u64));
            group.bench_function("probe_hash", |b| {
                b.iter(|| {
                    for key in &probe_keys {
                        black_box(probe_table.find(key));
                    }
                })
            });

            let mut brown_table = Brown::<I>::with_capacity_and_hasher(0, Sip::default());
            brown_table.extend(items.iter().take(brown_capacity).cloned());
            let brown_keys = probes(brown_capacity);

            group.throughput(Throughput::Elements(brown_capacity as u64));
            group.bench_function("hashbrown", |b| {
                b.iter(|| {
                    for key in &brown_keys {
                        black_box(brown_table.get(key));
                    }
                })
            });
        }

        group.finish();
    }
}

fn bench_remove<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<I>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let (probe_capacity, brown_capacity) = capacities::<I>(size);
        let items = random_items::<I>(probe_capacity.max(brown_capacity));

        let mut probe_table = Probe::<I>::with_capacity(0);
        probe_table.extend(items.iter().take(probe_capacity).cloned());
        let probe_keys: Vec<I::Key> = shuffled(&items[..probe_capacity])
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        group.throughput(Throughput::Elements(probe_capacity as u64));
        group.bench_function("probe_hash", |b| {
            b.iter_batched(
                || probe_table.clone(),
                |mut table| {
                    for key in &probe_keys {
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        let mut brown_table = Brown::<I>::with_capacity_and_hasher(0, Sip::default());
        brown_table.extend(items.iter().take(brown_capacity).cloned());
        let brown_keys: Vec<I::Key> = shuffled(&items[..brown_capacity])
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        group.throughput(Throughput::Elements(brown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || brown_table.clone(),
                |mut table| {
                    for key in &brown_keys {
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<I>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let (probe_capacity, brown_capacity) = capacities::<I>(size);
        let items = random_items::<I>(probe_capacity.max(brown_capacity));

        let mut probe_table = Probe::<I>::with_capacity(0);
        probe_table.extend(items.iter().take(probe_capacity).cloned());

        group.throughput(Throughput::Elements(probe_capacity as u64));
        group.bench_function("probe_hash", |b| {
            b.iter(|| {
                for entry in probe_table.iter() {
                    black_box(entry);
                }
            })
        });

        let mut brown_table = Brown::<I>::with_capacity_and_hasher(0, Sip::default());
        brown_table.extend(items.iter().take(brown_capacity).cloned());

        group.throughput(Throughput::Elements(brown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for entry in brown_table.iter() {
                    black_box(entry);
                }
            })
        });
    }

    group.finish();
}

fn bench_churn<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<I>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let (probe_capacity, brown_capacity) = capacities::<I>(size);

        // Every key appears twice: the first visit inserts it, the second
        // removes it.
        let operations = (0..probe_capacity.max(brown_capacity) as u64)
            .flat_map(|key| {
                let item = I::new(key);
                [item.clone(), item]
            })
            .collect::<Vec<(I::Key, I::Value)>>();

        group.throughput(Throughput::Elements(probe_capacity as u64 * 2));
        group.bench_function("probe_hash", |b| {
            b.iter_batched(
                || shuffled(&operations),
                |operations| {
                    let mut table = Probe::<I>::with_capacity(0);
                    for item in operations.into_iter().take(probe_capacity * 2) {
                        match table.entry(item.0.clone()) {
                            ProbeEntry::Vacant(entry) => {
                                black_box(entry.insert_with(|k| (k, item.1)));
                            }
                            ProbeEntry::Occupied(entry) => {
                                black_box(entry.remove());
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.throughput(Throughput::Elements(brown_capacity as u64 * 2));
        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || shuffled(&operations),
                |operations| {
                    let mut table = Brown::<I>::with_capacity_and_hasher(0, Sip::default());
                    for (k, v) in operations.into_iter().take(brown_capacity * 2) {
                        match table.entry(k) {
                            hashbrown::hash_map::Entry::Vacant(entry) => {
                                black_box(entry.insert(v));
                            }
                            hashbrown::hash_map::Entry::Occupied(entry) => {
                                black_box(entry.remove());
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Find,
    Insert,
    Remove,
}

fn bench_mixed_probabilistic_zipf<I: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    for exponent in [1.0, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_probabilistic_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<I>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let (probe_capacity, brown_capacity) = capacities::<I>(size);
            let count = probe_capacity.max(brown_capacity);

            let mut rng = SmallRng::from_os_rng();
            let op_distr = Zipf::new(3.0, exponent).unwrap();
            let insert_distr = Zipf::new(count as f32 - 1.0, 1.0).unwrap();
            let find_remove_distr = Zipf::new(count as f32 * KEY_SPACE_MULTIPLIER - 1.0, 1.0).unwrap();

            let operations = (0..count * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    if op_choice <= 1.0 {
                        (Operation::Find, rng.sample(find_remove_distr) as u64)
                    } else if op_choice <= 2.0 {
                        (Operation::Insert, rng.sample(insert_distr) as u64)
                    } else {
                        (Operation::Remove, rng.sample(find_remove_distr) as u64)
                    }
                })
                .map(|(op, key)| (op, I::new(key)))
                .collect::<Vec<_>>();

            group.throughput(Throughput::Elements(probe_capacity as u64 * 3));
            group.bench_function("probe_hash", |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut table = Probe::<I>::with_capacity(0);
                        for (operation, (k, v)) in operations.into_iter().take(probe_capacity * 3) {
                            match operation {
                                Operation::Insert => match table.entry(k) {
                                    ProbeEntry::Vacant(entry) => {
                                        black_box(entry.insert_with(|k| (k, v)));
                                    }
                                    ProbeEntry::Occupied(mut entry) => {
                                        entry.get_mut().1 = v;
                                    }
                                },
                                Operation::Remove => {
                                    black_box(table.remove(&k));
                                }
                                Operation::Find => {
                                    black_box(table.find(&k));
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });

            group.throughput(Throughput::Elements(brown_capacity as u64 * 3));
            group.bench_function("hashbrown", |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut table = Brown::<I>::with_capacity_and_hasher(0, Sip::default());
                        for (operation, (k, v)) in operations.into_iter().take(brown_capacity * 3) {
                            match operation {
                                Operation::Insert => {
                                    black_box(table.insert(k, v));
                                }
                                Operation::Remove => {
                                    black_box(table.remove(&k));
                                }
                                Operation::Find => {
                                    black_box(table.get(&k));
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.finish();
    }
}

criterion_group!(
    benches,
    bench_mixed_probabilistic_zipf::<SmallItem, 8>,
    bench_mixed_probabilistic_zipf::<StringItem, 8>,
    bench_mixed_probabilistic_zipf::<LargeItem, 5>,
    bench_churn::<SmallItem, 8>,
    bench_churn::<StringItem, 8>,
    bench_churn::<LargeItem, 5>,
    bench_insert_random::<SmallItem, 8>,
    bench_insert_random::<StringItem, 8>,
    bench_insert_random::<LargeItem, 5>,
    bench_find::<SmallItem, 8>,
    bench_find::<StringItem, 8>,
    bench_find::<LargeItem, 5>,
    bench_remove::<SmallItem, 8>,
    bench_remove::<StringItem, 8>,
    bench_remove::<LargeItem, 5>,
    bench_iteration::<SmallItem, 8>,
    bench_iteration::<StringItem, 8>,
    bench_iteration::<LargeItem, 5>,
);

criterion_main!(benches);

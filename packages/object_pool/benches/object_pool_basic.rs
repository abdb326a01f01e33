//! Basic benchmarks for the `object_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use object_pool::ObjectPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = [u64; 4];
const TEST_VALUE: TestItem = [1, 2, 3, 4];

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("object_pool_basic");

    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(ObjectPool::<TestItem>::builder().build()));
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_one", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| ObjectPool::<TestItem>::builder().build())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.acquire().unwrap());
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_release_churn", |b| {
        b.iter_custom(|iters| {
            let mut pool = ObjectPool::<TestItem>::builder()
                .initial_block_size(nz!(1024))
                .build();

            // Half-fill the pool so the next-fit scan has live rows to step over.
            let _residents = iter::repeat_with(|| pool.acquire().unwrap())
                .take(512)
                .collect::<Vec<_>>();

            let start = Instant::now();

            for _ in 0..iters {
                let handle = pool
                    .acquire_with(|payload| *payload = TEST_VALUE)
                    .unwrap();
                pool.release(black_box(handle)).unwrap();
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_with_growth", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut pool = ObjectPool::<TestItem>::builder()
                    .initial_block_size(nz!(4))
                    .build();

                for _ in 0..100 {
                    _ = black_box(pool.acquire().unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("box_churn_baseline", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Box::new(TEST_VALUE)));
            }

            start.elapsed()
        });
    });

    group.finish();
}

use contig::{ProcessId, RegionAllocator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Address space split into `count` allocated regions with every other one freed
fn fragmented(count: u32) -> (RegionAllocator, Vec<ProcessId>) {
    let mut allocator = RegionAllocator::new(count * 8).unwrap();
    let ids: Vec<ProcessId> = (0..count)
        .map(|i| ProcessId::new(format!("p{i}")).unwrap())
        .collect();

    for id in &ids {
        allocator.allocate(id, 4).unwrap();
    }
    for id in ids.iter().step_by(2) {
        allocator.free(id).unwrap();
    }

    (allocator, ids)
}

/// Allocate into the tail past every hole, then release it again
fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free");

    for count in [10u32, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (mut allocator, _) = fragmented(count);
            let probe = ProcessId::new("probe").unwrap();

            b.iter(|| {
                black_box(allocator.allocate(&probe, 8)).unwrap();
                black_box(allocator.free(&probe)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");

    for count in [10u32, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || fragmented(count).0,
                |mut allocator| {
                    allocator.compact();
                    black_box(allocator)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_allocate_free, bench_compact);
criterion_main!(benches);

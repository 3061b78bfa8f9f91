use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fitalloc::{FreeListAllocator, MappedArena};

const ARENA_SIZE: usize = 1 << 20;

/// Benchmark one allocate/free round trip while a growing number of live
/// blocks keeps the free-size tree populated. This is what verifies the
/// logarithmic time complexity: the cost should barely move as the live
/// set grows.
fn bench_alloc_free_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_pair");

    for live in [100usize, 1_000, 4_000] {
        group.bench_with_input(BenchmarkId::from_parameter(live), &live, |b, &live| {
            let arena = MappedArena::new(ARENA_SIZE).unwrap();
            let mut allocator =
                unsafe { FreeListAllocator::new(arena.base(), arena.len()) }.unwrap();

            // Keep `live` allocations outstanding for the whole measurement
            // and one reusable slot at the front of the arena
            let slot = unsafe { allocator.try_allocate_raw(32) }.unwrap();
            let _live: Vec<_> = (0..live)
                .map(|_| unsafe { allocator.try_allocate_raw(32) }.unwrap())
                .collect();
            unsafe { allocator.free_raw(slot.as_ptr()) };

            b.iter(|| unsafe {
                let ptr = allocator.try_allocate_raw(32).unwrap();
                black_box(ptr);
                allocator.free_raw(ptr.as_ptr());
            });
        });
    }

    group.finish();
}

/// Benchmark allocation into a deliberately fragmented arena: every other
/// block is freed first, so each request has to search the tree across
/// many candidate blocks.
fn bench_fragmented_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragmented_alloc");

    for live in [100usize, 1_000, 4_000] {
        group.bench_with_input(BenchmarkId::from_parameter(live), &live, |b, &live| {
            let arena = MappedArena::new(ARENA_SIZE).unwrap();
            let mut allocator =
                unsafe { FreeListAllocator::new(arena.base(), arena.len()) }.unwrap();

            let blocks: Vec<_> = (0..live)
                .map(|_| unsafe { allocator.try_allocate_raw(32) }.unwrap())
                .collect();
            for block in blocks.iter().step_by(2) {
                unsafe { allocator.free_raw(block.as_ptr()) };
            }

            b.iter(|| unsafe {
                let ptr = allocator.try_allocate_raw(32).unwrap();
                black_box(ptr);
                allocator.free_raw(ptr.as_ptr());
            });
        });
    }

    group.finish();
}

/// Benchmark the coalescing path: freeing a block sandwiched between two
/// free neighbors merges three blocks and reinserts one grown node.
fn bench_triple_coalesce(c: &mut Criterion) {
    c.bench_function("triple_coalesce", |b| {
        let arena = MappedArena::new(ARENA_SIZE).unwrap();
        let mut allocator =
            unsafe { FreeListAllocator::new(arena.base(), arena.len()) }.unwrap();

        // A tail allocation pins the rest of the arena away
        let first = unsafe { allocator.try_allocate_raw(256) }.unwrap();
        let mut middle = unsafe { allocator.try_allocate_raw(256) }.unwrap();
        let last = unsafe { allocator.try_allocate_raw(256) }.unwrap();
        let _pin = unsafe { allocator.try_allocate_raw(256) }.unwrap();
        unsafe {
            allocator.free_raw(first.as_ptr());
            allocator.free_raw(last.as_ptr());
        }

        b.iter(|| unsafe {
            allocator.free_raw(black_box(middle.as_ptr()));
            // Rebuild the sandwich for the next iteration
            let head = allocator.try_allocate_raw(256).unwrap();
            middle = allocator.try_allocate_raw(256).unwrap();
            let tail = allocator.try_allocate_raw(256).unwrap();
            allocator.free_raw(head.as_ptr());
            allocator.free_raw(tail.as_ptr());
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_free_pair,
    bench_fragmented_alloc,
    bench_triple_coalesce
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rtnet::buffer::{BufferPool, BufferQueue, PoolConfig};

/// Allocation churn against the free list versus fresh storage.
fn benchmark_pool_operations(c: &mut Criterion) {
    let pool = BufferPool::new();

    c.bench_function("pool_alloc_release", |b| {
        b.iter(|| {
            let mut buf = pool.alloc(black_box(512)).unwrap();
            buf.write_i32(1).unwrap();
            black_box(buf.readable_bytes())
        })
    });

    let bounded = BufferPool::with_config(PoolConfig::new().preallocate(0).max_idle(Some(0)));
    c.bench_function("pool_alloc_unpooled", |b| {
        b.iter(|| black_box(bounded.alloc(black_box(512)).unwrap()))
    });

    let queue = BufferQueue::new();
    let mut sink = Vec::with_capacity(64);
    c.bench_function("queue_push_transfer_64", |b| {
        b.iter(|| {
            for _ in 0..64 {
                queue.push_back(pool.alloc(64).unwrap());
            }
            queue.transfer_to(&mut sink);
            sink.clear();
        })
    });
}

criterion_group!(benches, benchmark_pool_operations);
criterion_main!(benches);

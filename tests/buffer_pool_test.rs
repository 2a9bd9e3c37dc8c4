//! Buffer pool and queue tests.
//!
//! Covers:
//! - Storage reuse after release
//! - Shared handles and reference counts
//! - Queue ordering and cross-thread hand-off

use rtnet::buffer::{BufferPool, BufferQueue, ByteBuffer, PoolConfig};
use std::sync::Arc;
use std::thread;

fn tagged(pool: &BufferPool, tag: i64) -> ByteBuffer {
    let mut buf = pool.alloc(8).unwrap();
    buf.write_i64(tag).unwrap();
    buf
}

#[test]
fn test_reallocation_is_served_from_free_list() {
    let pool = BufferPool::with_config(PoolConfig::new().preallocate(0));
    const N: usize = 32;

    let first: Vec<ByteBuffer> = (0..N).map(|_| pool.alloc(256).unwrap()).collect();
    drop(first);
    let created = pool.stats().created;
    assert_eq!(created, N as u64);

    let second: Vec<ByteBuffer> = (0..N).map(|_| pool.alloc(256).unwrap()).collect();
    assert_eq!(pool.stats().created, created);
    assert_eq!(pool.idle_count(), 0);
    drop(second);
    assert_eq!(pool.idle_count(), N);
}

#[test]
fn test_shared_buffer_returns_on_last_release() {
    let pool = BufferPool::with_config(PoolConfig::new().preallocate(0));
    let shared = tagged(&pool, 99).share();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = shared.retain();
            thread::spawn(move || {
                let mut copy = ByteBuffer::with_capacity(8, 8);
                copy.write_bytes(handle.readable()).unwrap();
                copy.read_i64().unwrap()
            })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 99);
    }

    assert_eq!(shared.ref_count(), 1);
    assert_eq!(pool.idle_count(), 0);
    shared.release();
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_queue_fifo_with_push_front() {
    let pool = BufferPool::new();
    let queue = BufferQueue::new();
    for tag in [1, 2, 3] {
        queue.push_back(tagged(&pool, tag));
    }
    queue.push_front(tagged(&pool, 0));

    let mut drained = Vec::new();
    queue.transfer_to(&mut drained);
    let tags: Vec<i64> = drained.iter_mut().map(|b| b.read_i64().unwrap()).collect();
    assert_eq!(tags, vec![0, 1, 2, 3]);
}

#[test]
fn test_queue_hand_off_between_threads() {
    let pool = BufferPool::with_config(PoolConfig::new().preallocate(0));
    let queue = Arc::new(BufferQueue::new());
    const PER_PRODUCER: i64 = 500;

    let producers: Vec<_> = (0..2)
        .map(|p| {
            let pool = pool.clone();
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push_back(tagged(&pool, p * PER_PRODUCER + i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut drained = Vec::new();
    assert_eq!(queue.transfer_to(&mut drained), 2 * PER_PRODUCER as usize);

    // Each producer's buffers keep their relative order.
    let tags: Vec<i64> = drained.iter_mut().map(|b| b.read_i64().unwrap()).collect();
    for p in 0..2 {
        let own: Vec<i64> = tags.iter().copied().filter(|t| t / PER_PRODUCER == p).collect();
        assert!(own.windows(2).all(|w| w[0] < w[1]));
    }

    drop(drained);
    assert_eq!(pool.stats().idle as u64, pool.stats().created);
}

#[test]
fn test_trim_after_burst() {
    let pool = BufferPool::with_config(PoolConfig::new().preallocate(0));
    let burst: Vec<ByteBuffer> = (0..100).map(|_| pool.alloc(64).unwrap()).collect();
    drop(burst);
    assert_eq!(pool.idle_count(), 100);

    assert_eq!(pool.trim(16), 84);
    assert_eq!(pool.idle_count(), 16);
    assert_eq!(pool.stats().discarded, 84);
}

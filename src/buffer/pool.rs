use crate::base::neterror::NetError;
use crate::buffer::bytebuffer::ByteBuffer;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Buffer pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Storages created up front
    pub preallocate: usize,
    /// Capacity of freshly created storage
    pub initial_capacity: usize,
    /// Upper bound on any buffer's capacity
    pub max_capacity: usize,
    /// Idle storages kept on the free list (None = unbounded)
    pub max_idle: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            preallocate: 16,
            initial_capacity: 1024,
            max_capacity: 1024 * 1024, // 1 MiB
            max_idle: None,
        }
    }
}

impl PoolConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of storages created up front.
    pub fn preallocate(mut self, count: usize) -> Self {
        self.preallocate = count;
        self
    }

    /// Set the capacity of freshly created storage.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum buffer capacity.
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Bound the free list. Storage recycled beyond this is freed.
    pub fn max_idle(mut self, max_idle: Option<usize>) -> Self {
        self.max_idle = max_idle;
        self
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Storages constructed (including preallocation)
    pub created: u64,
    /// Allocations served from the free list
    pub reused: u64,
    /// Storages returned to the free list
    pub recycled: u64,
    /// Storages freed because the free list was full or trimmed
    pub discarded: u64,
    /// Storages currently on the free list
    pub idle: usize,
}

#[derive(Default)]
struct PoolMetrics {
    created: AtomicU64,
    reused: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
}

struct PoolInner {
    config: PoolConfig,
    free_list: Mutex<Vec<BytesMut>>,
    metrics: PoolMetrics,
}

/// A thread-safe free list of buffer storage.
///
/// Cloning is cheap and yields a handle to the same pool. Buffers allocated
/// here return their storage to the free list when dropped. Allocation and
/// recycling are serialized by a single pool-wide lock and are O(1).
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("max_capacity", &self.inner.config.max_capacity)
            .field("max_idle", &self.inner.config.max_idle)
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let initial = config.initial_capacity.min(config.max_capacity);
        let free_list: Vec<BytesMut> =
            (0..config.preallocate).map(|_| BytesMut::with_capacity(initial)).collect();

        let metrics = PoolMetrics::default();
        metrics.created.store(free_list.len() as u64, Ordering::Relaxed);

        Self { inner: Arc::new(PoolInner { config, free_list: Mutex::new(free_list), metrics }) }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn max_capacity(&self) -> usize {
        self.inner.config.max_capacity
    }

    /// Hand out a buffer able to hold at least `min_size` bytes.
    ///
    /// The most recently recycled storage is reused when available.
    pub fn alloc(&self, min_size: usize) -> Result<ByteBuffer, NetError> {
        let max = self.inner.config.max_capacity;
        if min_size > max {
            return Err(NetError::CapacityExceeded { requested: min_size, max });
        }

        let reused = self.inner.free_list.lock().pop();
        let data = match reused {
            Some(mut data) => {
                self.inner.metrics.reused.fetch_add(1, Ordering::Relaxed);
                if data.capacity() < min_size {
                    data.reserve(min_size);
                }
                data
            }
            None => {
                self.inner.metrics.created.fetch_add(1, Ordering::Relaxed);
                let initial = self.inner.config.initial_capacity.max(min_size).min(max);
                BytesMut::with_capacity(initial)
            }
        };

        Ok(ByteBuffer::from_pool(data, max, self.clone()))
    }

    /// Return storage to the free list. Only called from `ByteBuffer::drop`.
    pub(crate) fn recycle(&self, mut data: BytesMut) {
        data.clear();
        let mut list = self.inner.free_list.lock();
        if let Some(max_idle) = self.inner.config.max_idle {
            if list.len() >= max_idle {
                drop(list);
                self.inner.metrics.discarded.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        list.push(data);
        self.inner.metrics.recycled.fetch_add(1, Ordering::Relaxed);
    }

    /// Free idle storage until at most `keep` entries remain.
    /// Returns the number of storages freed.
    pub fn trim(&self, keep: usize) -> usize {
        let dropped: Vec<BytesMut> = {
            let mut list = self.inner.free_list.lock();
            if list.len() <= keep {
                return 0;
            }
            list.split_off(keep)
        };
        let count = dropped.len();
        self.inner.metrics.discarded.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(freed = count, kept = keep, "trimmed buffer pool");
        count
    }

    /// Number of storages on the free list.
    pub fn idle_count(&self) -> usize {
        self.inner.free_list.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        let metrics = &self.inner.metrics;
        PoolStats {
            created: metrics.created.load(Ordering::Relaxed),
            reused: metrics.reused.load(Ordering::Relaxed),
            recycled: metrics.recycled.load(Ordering::Relaxed),
            discarded: metrics.discarded.load(Ordering::Relaxed),
            idle: self.idle_count(),
        }
    }
}

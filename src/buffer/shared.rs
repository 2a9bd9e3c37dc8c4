use crate::buffer::bytebuffer::ByteBuffer;
use std::ops::Deref;
use std::sync::Arc;

/// A reference-counted, read-only handle to a [`ByteBuffer`].
///
/// `retain` adds a holder and `release` drops one. The underlying storage
/// goes back to its pool when the last holder releases.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<ByteBuffer>,
}

impl SharedBuffer {
    pub(crate) fn new(buffer: ByteBuffer) -> Self {
        Self { inner: Arc::new(buffer) }
    }

    /// Add a holder and return its handle.
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Drop this holder's reference.
    pub fn release(self) {}

    /// Number of live holders.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Recover exclusive ownership if this is the only holder.
    pub fn try_unwrap(self) -> Result<ByteBuffer, Self> {
        Arc::try_unwrap(self.inner).map_err(|inner| Self { inner })
    }
}

impl Deref for SharedBuffer {
    type Target = ByteBuffer;

    fn deref(&self) -> &ByteBuffer {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::pool::{BufferPool, PoolConfig};

    #[test]
    fn test_retain_release_counts() {
        let pool = BufferPool::with_config(PoolConfig::new().preallocate(0));
        let mut buf = pool.alloc(16).unwrap();
        buf.write_bytes(b"shared").unwrap();

        let first = buf.share();
        assert_eq!(first.ref_count(), 1);

        let second = first.retain();
        let third = second.retain();
        assert_eq!(first.ref_count(), 3);
        assert_eq!(third.readable(), b"shared");

        second.release();
        assert_eq!(first.ref_count(), 2);
        assert_eq!(pool.idle_count(), 0);

        third.release();
        first.release();
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_try_unwrap() {
        let pool = BufferPool::new();
        let shared = pool.alloc(4).unwrap().share();
        let other = shared.retain();

        let shared = shared.try_unwrap().unwrap_err();
        drop(other);
        let buf = shared.try_unwrap().unwrap();
        assert!(buf.is_pooled());
    }
}

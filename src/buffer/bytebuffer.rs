use crate::base::neterror::NetError;
use crate::buffer::pool::BufferPool;
use crate::buffer::shared::SharedBuffer;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// A growable byte container with independent read and write cursors.
///
/// All integer codecs use network byte order. `reader_index <= writer_index <=
/// capacity <= max_capacity` holds after every operation.
///
/// A `ByteBuffer` has exactly one owner. Handing it to a queue or a
/// connection moves it; dropping it (or calling [`release`](Self::release))
/// returns pooled storage to the [`BufferPool`] it came from.
pub struct ByteBuffer {
    data: BytesMut,
    reader_index: usize,
    max_capacity: usize,
    pool: Option<BufferPool>,
}

impl ByteBuffer {
    /// Create an unpooled buffer. Its storage is freed on drop.
    pub fn with_capacity(initial_capacity: usize, max_capacity: usize) -> Self {
        let initial = initial_capacity.min(max_capacity);
        Self { data: BytesMut::with_capacity(initial), reader_index: 0, max_capacity, pool: None }
    }

    pub(crate) fn from_pool(data: BytesMut, max_capacity: usize, pool: BufferPool) -> Self {
        Self { data, reader_index: 0, max_capacity, pool: Some(pool) }
    }

    /// Current storage capacity, never reported above `max_capacity`.
    pub fn capacity(&self) -> usize {
        self.data.capacity().min(self.max_capacity)
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn reader_index(&self) -> usize {
        self.reader_index
    }

    pub fn writer_index(&self) -> usize {
        self.data.len()
    }

    /// Bytes between the read and write cursors.
    pub fn readable_bytes(&self) -> usize {
        self.data.len() - self.reader_index
    }

    /// Bytes that can still be written before hitting `max_capacity`.
    pub fn writable_bytes(&self) -> usize {
        self.max_capacity - self.data.len()
    }

    pub fn is_readable(&self) -> bool {
        self.readable_bytes() > 0
    }

    /// Whether the storage returns to a pool on drop.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// The unread region.
    pub fn readable(&self) -> &[u8] {
        &self.data[self.reader_index..]
    }

    /// Copy the unread region into an immutable `Bytes`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.readable())
    }

    /// Reset both cursors. Capacity is kept.
    pub fn clear(&mut self) {
        self.data.clear();
        self.reader_index = 0;
    }

    /// Release this handle. Equivalent to dropping it.
    pub fn release(self) {}

    /// Convert into a reference-counted handle for multiple readers.
    pub fn share(self) -> SharedBuffer {
        SharedBuffer::new(self)
    }

    /// Grow storage so `additional` more bytes fit after the write cursor.
    fn ensure_writable(&mut self, additional: usize) -> Result<(), NetError> {
        let required = self.data.len().saturating_add(additional);
        if required > self.max_capacity {
            return Err(NetError::CapacityExceeded { requested: required, max: self.max_capacity });
        }
        if required > self.data.capacity() {
            let target = required.max(self.data.capacity() * 2).min(self.max_capacity);
            self.data.reserve(target - self.data.len());
        }
        Ok(())
    }

    fn ensure_readable(&self, needed: usize) -> Result<(), NetError> {
        let available = self.readable_bytes();
        if available < needed {
            return Err(NetError::Underflow { needed, available });
        }
        Ok(())
    }

    /// Append `src` at the write cursor.
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<(), NetError> {
        self.ensure_writable(src.len())?;
        self.data.put_slice(src);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), NetError> {
        self.ensure_writable(1)?;
        self.data.put_u8(value);
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), NetError> {
        self.ensure_writable(2)?;
        self.data.put_i16(value);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), NetError> {
        self.ensure_writable(4)?;
        self.data.put_i32(value);
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), NetError> {
        self.ensure_writable(8)?;
        self.data.put_i64(value);
        Ok(())
    }

    /// Consume `len` bytes and return them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], NetError> {
        self.ensure_readable(len)?;
        let start = self.reader_index;
        self.reader_index += len;
        Ok(&self.data[start..start + len])
    }

    /// Advance the read cursor without looking at the bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), NetError> {
        self.ensure_readable(len)?;
        self.reader_index += len;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, NetError> {
        self.ensure_readable(1)?;
        let value = (&self.data[self.reader_index..]).get_u8();
        self.reader_index += 1;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16, NetError> {
        self.ensure_readable(2)?;
        let value = (&self.data[self.reader_index..]).get_i16();
        self.reader_index += 2;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32, NetError> {
        self.ensure_readable(4)?;
        let value = (&self.data[self.reader_index..]).get_i32();
        self.reader_index += 4;
        Ok(value)
    }

    pub fn read_i64(&mut self) -> Result<i64, NetError> {
        self.ensure_readable(8)?;
        let value = (&self.data[self.reader_index..]).get_i64();
        self.reader_index += 8;
        Ok(value)
    }
}

impl Drop for ByteBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.recycle(std::mem::take(&mut self.data));
        }
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("reader_index", &self.reader_index)
            .field("writer_index", &self.data.len())
            .field("capacity", &self.capacity())
            .field("max_capacity", &self.max_capacity)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

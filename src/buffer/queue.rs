use crate::buffer::bytebuffer::ByteBuffer;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A thread-safe FIFO of owned buffers with head re-insertion.
///
/// Buffers move in and out; the queue never holds a buffer someone else
/// still owns. Clearing releases every queued buffer back to its pool.
#[derive(Default)]
pub struct BufferQueue {
    entries: Mutex<VecDeque<ByteBuffer>>,
}

impl BufferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&self, buf: ByteBuffer) {
        self.entries.lock().push_back(buf);
    }

    /// Put a buffer back at the head, ahead of everything queued.
    pub fn push_front(&self, buf: ByteBuffer) {
        self.entries.lock().push_front(buf);
    }

    pub fn pop(&self) -> Option<ByteBuffer> {
        self.entries.lock().pop_front()
    }

    /// Inspect the head without removing it.
    pub fn peek<R>(&self, f: impl FnOnce(&ByteBuffer) -> R) -> Option<R> {
        self.entries.lock().front().map(f)
    }

    /// Move every queued buffer into `sink`, preserving order.
    /// Returns the number moved.
    pub fn transfer_to<E: Extend<ByteBuffer>>(&self, sink: &mut E) -> usize {
        let drained = std::mem::take(&mut *self.entries.lock());
        let count = drained.len();
        sink.extend(drained);
        count
    }

    /// Release every queued buffer. Returns the number released.
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.entries.lock());
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for BufferQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferQueue").field("len", &self.len()).finish()
    }
}

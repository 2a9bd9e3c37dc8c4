//! Pooled byte buffers.
//!
//! - [`ByteBuffer`]: growable buffer with read/write cursors and
//!   big-endian integer codecs
//! - [`SharedBuffer`]: reference-counted read-only handle
//! - [`BufferPool`]: free list that recycles buffer storage
//! - [`BufferQueue`]: thread-safe FIFO of owned buffers

pub mod bytebuffer;
pub mod pool;
pub mod queue;
pub mod shared;

pub use bytebuffer::ByteBuffer;
pub use pool::{BufferPool, PoolConfig, PoolStats};
pub use queue::BufferQueue;
pub use shared::SharedBuffer;

//! # rtnet
//!
//! Client-side TCP/UDP transport for real-time applications.
//!
//! `rtnet` moves bytes between a socket and an application update loop
//! without blocking that loop: per-connection I/O tasks feed buffer queues,
//! the application drains them on its own tick, and a packetizer turns the
//! byte stream back into length-prefixed messages.
//!
//! ## Features
//!
//! - **Pooled Buffers**: move-only buffers whose storage returns to a free list on drop
//! - **Connections**: TCP and UDP with a `Closed → Connecting → Connected → Running → Closing` lifecycle
//! - **Framing**: `[i32 length][payload]` reassembly that is independent of chunk boundaries
//! - **Sessions**: message envelopes over TCP, or over UDP under a pluggable reliability protocol
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rtnet::buffer::BufferPool;
//! use rtnet::framing::PacketizerConfig;
//! use rtnet::session::StreamSession;
//! use rtnet::socket::ConnectionConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = BufferPool::new();
//!     let mut session =
//!         StreamSession::new(pool, ConnectionConfig::new(), PacketizerConfig::new()).unwrap();
//!     session.on_message(|envelope, payload| {
//!         println!("msg {} ({} bytes)", envelope.msg_id, payload.readable_bytes());
//!     });
//!     session.connect("127.0.0.1:7000".parse().unwrap()).unwrap();
//!
//!     loop {
//!         session.update();
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes, connection state, error context helpers
//! - [`buffer`] - Byte buffers, the buffer pool, and buffer queues
//! - [`framing`] - Length-prefixed message reassembly
//! - [`socket`] - Connections and their I/O tasks
//! - [`session`] - Message envelopes and sessions

pub mod base;
pub mod buffer;
pub mod framing;
pub mod session;
pub mod socket;

pub use base::{ConnectionState, ErrorCode, NetError};
pub use buffer::{BufferPool, BufferQueue, ByteBuffer, PoolConfig, SharedBuffer};
pub use framing::{Packetizer, PacketizerConfig};
pub use socket::{Connection, ConnectionConfig, ConnectionEvents};

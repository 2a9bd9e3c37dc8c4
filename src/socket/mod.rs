//! Client connections over TCP and UDP.
//!
//! - [`connection`]: the connection state machine and its I/O tasks
//! - [`tcp`]: stream transport with an asynchronous connect
//! - [`udp`]: datagram transport, bound up front
//! - [`client`]: the socket wrapper both transports share
//! - [`config`]: per-connection settings

pub mod client;
pub mod config;
pub mod connection;
pub mod tcp;
pub mod udp;

pub use client::SocketType;
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionEvents};
pub use tcp::ConnectJob;

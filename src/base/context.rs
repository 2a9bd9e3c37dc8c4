//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::{ErrorCode, NetError};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use rtnet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context(addr)?;
    /// // Error: "connect 127.0.0.1:7000 failed: connection refused"
    /// ```
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError>;

    /// Add bind context to an IO error.
    fn bind_context(self, addr: SocketAddr) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| io_error("connect", addr, e))
    }

    fn bind_context(self, addr: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| io_error("bind", addr, e))
    }
}

fn io_error(op: &'static str, addr: SocketAddr, source: io::Error) -> NetError {
    NetError::Io { op, addr, code: ErrorCode::from(&source), source: Arc::new(source) }
}

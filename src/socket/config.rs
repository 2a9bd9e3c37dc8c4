//! Connection configuration.

use crate::base::neterror::NetError;
use tokio::runtime::Handle;

/// Smallest receive scratch buffer a connection will use.
pub const MIN_RECV_BUFFER: usize = 4 * 1024;

/// Receive scratch size when the socket does not report `SO_RCVBUF`.
pub const DEFAULT_RECV_BUFFER: usize = 64 * 1024;

/// Per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Receive scratch size (None = the socket's SO_RCVBUF)
    pub recv_buffer_size: Option<usize>,
    /// Disable Nagle on TCP sockets
    pub nodelay: bool,
    /// Trace every send and receive
    pub debug: bool,
    /// Runtime that drives socket I/O (None = the current runtime)
    pub runtime: Option<Handle>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { recv_buffer_size: None, nodelay: true, debug: false, runtime: None }
    }
}

impl ConnectionConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the receive scratch size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Enable or disable TCP_NODELAY.
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Enable per-transfer tracing.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Drive socket I/O on an explicit runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// The configured runtime, else the one this thread is running in.
    pub(crate) fn runtime_handle(&self) -> Result<Handle, NetError> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| NetError::RuntimeUnavailable),
        }
    }

    /// Clamp a requested scratch size into `[MIN_RECV_BUFFER, max]`.
    pub(crate) fn scratch_size(&self, reported: Option<usize>, max: usize) -> usize {
        let wanted = self.recv_buffer_size.or(reported).unwrap_or(DEFAULT_RECV_BUFFER);
        wanted.max(MIN_RECV_BUFFER).min(max)
    }
}

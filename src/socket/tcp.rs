use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::buffer::BufferPool;
use crate::socket::client::SocketType;
use crate::socket::config::ConnectionConfig;
use crate::socket::connection::{Connection, Transport};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

/// One TCP connect attempt.
#[derive(Debug, Clone, Copy)]
pub struct ConnectJob {
    remote: SocketAddr,
    nodelay: bool,
}

impl ConnectJob {
    pub fn new(remote: SocketAddr, nodelay: bool) -> Self {
        Self { remote, nodelay }
    }

    pub async fn connect(self) -> Result<TcpStream, NetError> {
        let stream = TcpStream::connect(self.remote).await.connect_context(self.remote)?;
        stream.set_nodelay(self.nodelay).connect_context(self.remote)?;
        Ok(stream)
    }
}

impl Connection {
    /// A stream connection. It starts `Closed`; call
    /// [`set_remote_endpoint`](Self::set_remote_endpoint) to connect.
    pub fn tcp(pool: BufferPool, config: ConnectionConfig) -> Result<Self, NetError> {
        Self::new(pool, config, Transport::Tcp)
    }

    /// Run the connect off the caller's thread. The result lands in shared
    /// state and is picked up by the next update tick.
    pub(super) fn spawn_connect(&self, remote: SocketAddr, epoch: u64) {
        let job = ConnectJob::new(remote, self.config().nodelay);
        let shared = Arc::clone(self.shared());
        self.runtime().spawn(async move {
            match job.connect().await {
                Ok(stream) => {
                    if shared.connected(epoch, SocketType::Tcp(stream)) {
                        tracing::debug!(remote = %remote, "connected");
                    }
                }
                Err(e) => {
                    tracing::debug!(remote = %remote, error = %e, "connect failed");
                    shared.fail(epoch, e.code());
                }
            }
        });
    }
}

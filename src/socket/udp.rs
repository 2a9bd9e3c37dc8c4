use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::base::state::ConnectionState;
use crate::buffer::BufferPool;
use crate::socket::client::SocketType;
use crate::socket::config::ConnectionConfig;
use crate::socket::connection::{Connection, Transport};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;

/// Bind a non-blocking UDP socket registered with `runtime`.
fn bind(runtime: &Handle, local: SocketAddr) -> Result<UdpSocket, NetError> {
    let socket = std::net::UdpSocket::bind(local).bind_context(local)?;
    socket.set_nonblocking(true).bind_context(local)?;
    let _guard = runtime.enter();
    UdpSocket::from_std(socket).bind_context(local)
}

impl Connection {
    /// A datagram connection bound to `local`.
    ///
    /// There is no handshake: the connection starts `Connected` and runs on
    /// the first update tick. `remote` is the default peer for sends; it
    /// can be set later with [`set_remote_endpoint`](Self::set_remote_endpoint).
    pub fn udp(
        pool: BufferPool,
        config: ConnectionConfig,
        local: SocketAddr,
        remote: Option<SocketAddr>,
    ) -> Result<Self, NetError> {
        let conn = Self::new(pool, config, Transport::Udp { local })?;
        let socket = bind(conn.runtime(), local)?;
        tracing::debug!(local = %local, remote = ?remote, "udp bound");
        conn.shared().bound(SocketType::Udp(socket), remote);
        Ok(conn)
    }

    /// Change the default peer, re-binding if the socket was closed.
    pub(super) fn retarget(&mut self, local: SocketAddr, remote: SocketAddr) -> Result<(), NetError> {
        if self.shared().set_remote(remote) == ConnectionState::Closed {
            self.rebind(local)?;
        }
        Ok(())
    }

    pub(super) fn rebind(&mut self, local: SocketAddr) -> Result<(), NetError> {
        let socket = bind(self.runtime(), local)?;
        tracing::debug!(local = %local, "udp re-bound");
        self.shared().bound(SocketType::Udp(socket), None);
        Ok(())
    }
}

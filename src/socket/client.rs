use socket2::SockRef;
use std::io;
use std::net::{Shutdown, SocketAddr};
use tokio::net::{TcpStream, UdpSocket};

/// The socket under a connection: a TCP stream or a UDP socket.
///
/// Both I/O tasks of a running connection share one `SocketType` behind an
/// `Arc`, so every operation here takes `&self`.
#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl SocketType {
    /// Write some of `data`. Returns how many bytes the kernel accepted.
    ///
    /// UDP sends go to `remote`; without one the send fails with
    /// `NotConnected`.
    pub async fn send(&self, data: &[u8], remote: Option<SocketAddr>) -> io::Result<usize> {
        match self {
            SocketType::Tcp(stream) => loop {
                stream.writable().await?;
                match stream.try_write(data) {
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    result => return result,
                }
            },
            SocketType::Udp(socket) => {
                let remote = remote.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotConnected, "no remote endpoint")
                })?;
                socket.send_to(data, remote).await
            }
        }
    }

    /// Read into `buf`. Zero means the peer closed (TCP) or sent an empty
    /// datagram (UDP).
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SocketType::Tcp(stream) => loop {
                stream.readable().await?;
                match stream.try_read(buf) {
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    result => return result,
                }
            },
            SocketType::Udp(socket) => socket.recv_from(buf).await.map(|(n, _)| n),
        }
    }

    /// Shut down both directions so a pending read observes EOF.
    /// UDP sockets have nothing to shut down.
    pub fn shutdown(&self) {
        if let SocketType::Tcp(stream) = self {
            if let Err(e) = SockRef::from(stream).shutdown(Shutdown::Both) {
                tracing::debug!(error = %e, "socket shutdown failed");
            }
        }
    }

    /// The kernel receive buffer size (SO_RCVBUF).
    pub fn recv_buffer_size(&self) -> io::Result<usize> {
        match self {
            SocketType::Tcp(stream) => SockRef::from(stream).recv_buffer_size(),
            SocketType::Udp(socket) => SockRef::from(socket).recv_buffer_size(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            SocketType::Tcp(stream) => stream.local_addr(),
            SocketType::Udp(socket) => socket.local_addr(),
        }
    }
}

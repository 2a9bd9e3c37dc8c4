use crate::base::neterror::NetError;
use crate::base::state::ConnectionState;
use crate::buffer::{BufferPool, ByteBuffer};
use crate::framing::{Packetizer, PacketizerConfig};
use crate::session::reliability::Reliability;
use crate::session::{deliver, Envelope, MessageHandler};
use crate::socket::{Connection, ConnectionConfig, ConnectionEvents};
use std::net::SocketAddr;
use std::time::Instant;

/// Framed messages over UDP, made reliable by `R`.
///
/// Each tick: received datagrams go into `R`, the ordered bytes `R` hands
/// back go through the packetizer, `R`'s timers run, and whatever `R` wants
/// transmitted is sent.
pub struct ReliableSession<R: Reliability> {
    conn: Connection,
    reliability: R,
    packetizer: Packetizer,
    handler: Option<MessageHandler>,
    started: Instant,
}

impl<R: Reliability> ReliableSession<R> {
    /// Bind `local` and wrap the datagram connection in `reliability`.
    pub fn new(
        pool: BufferPool,
        config: ConnectionConfig,
        framing: PacketizerConfig,
        local: SocketAddr,
        reliability: R,
    ) -> Result<Self, NetError> {
        let conn = Connection::udp(pool.clone(), config, local, None)?;
        Ok(Self {
            conn,
            reliability,
            packetizer: Packetizer::new(pool, framing),
            handler: None,
            started: Instant::now(),
        })
    }

    pub fn on_message(&mut self, f: impl FnMut(Envelope, &mut ByteBuffer) + Send + 'static) {
        self.handler = Some(Box::new(f));
    }

    pub fn set_events(&mut self, events: ConnectionEvents) {
        self.conn.set_events(events);
    }

    /// Set the peer datagrams go to.
    pub fn connect(&mut self, remote: SocketAddr) -> Result<(), NetError> {
        self.conn.set_remote_endpoint(remote)
    }

    /// Milliseconds since the session was created, wrapping at `u32::MAX`.
    fn now_millis(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    pub fn update(&mut self) -> usize {
        let now = self.now_millis();
        let Self { conn, reliability, packetizer, handler, .. } = self;

        conn.update_with(&mut |datagram: &mut ByteBuffer| reliability.input(datagram.readable()));

        while let Some(bytes) = reliability.receive() {
            if let Err(e) = packetizer.input(&bytes) {
                tracing::debug!(error = %e, "framing error");
                conn.abort(e.code());
                break;
            }
        }

        let delivered = deliver(conn, packetizer, handler);
        if conn.state() == ConnectionState::Closed {
            packetizer.clear();
        }

        reliability.update(now);
        self.flush();
        delivered
    }

    /// Send a message with session id 0.
    pub fn post(&mut self, msg_id: i16, payload: &[u8]) -> Result<(), NetError> {
        self.send(0, msg_id, payload)
    }

    pub fn send(&mut self, session_id: i32, msg_id: i16, payload: &[u8]) -> Result<(), NetError> {
        let frame = Envelope::new(msg_id, session_id).encode(self.conn.pool(), payload)?;
        self.reliability.send(frame.readable());
        self.flush();
        Ok(())
    }

    /// Hand every datagram the protocol wants sent to the connection.
    fn flush(&mut self) {
        if self.conn.state() == ConnectionState::Closed {
            return;
        }
        while let Some(datagram) = self.reliability.poll_transmit() {
            if let Err(e) = self.conn.send_bytes(&datagram) {
                tracing::debug!(error = %e, "datagram dropped");
                break;
            }
        }
    }

    pub fn close(&mut self) {
        self.conn.close();
        self.packetizer.clear();
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn reliability(&self) -> &R {
        &self.reliability
    }

    pub fn reliability_mut(&mut self) -> &mut R {
        &mut self.reliability
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }
}

impl<R: Reliability + std::fmt::Debug> std::fmt::Debug for ReliableSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliableSession")
            .field("conn", &self.conn)
            .field("reliability", &self.reliability)
            .field("packetizer", &self.packetizer)
            .finish()
    }
}

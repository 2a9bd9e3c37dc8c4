use crate::base::neterror::NetError;
use crate::base::state::ConnectionState;
use crate::buffer::{BufferPool, ByteBuffer};
use crate::framing::{Packetizer, PacketizerConfig};
use crate::session::{deliver, Envelope, MessageHandler};
use crate::socket::{Connection, ConnectionConfig, ConnectionEvents};
use std::net::{IpAddr, SocketAddr};

/// Framed messages over a TCP connection.
pub struct StreamSession {
    conn: Connection,
    packetizer: Packetizer,
    handler: Option<MessageHandler>,
}

impl StreamSession {
    pub fn new(
        pool: BufferPool,
        config: ConnectionConfig,
        framing: PacketizerConfig,
    ) -> Result<Self, NetError> {
        let conn = Connection::tcp(pool.clone(), config)?;
        Ok(Self { conn, packetizer: Packetizer::new(pool, framing), handler: None })
    }

    /// Set the handler for decoded messages.
    pub fn on_message(&mut self, f: impl FnMut(Envelope, &mut ByteBuffer) + Send + 'static) {
        self.handler = Some(Box::new(f));
    }

    /// Set connection notifications. `on_packet` is ignored; raw chunks go
    /// to the packetizer.
    pub fn set_events(&mut self, events: ConnectionEvents) {
        self.conn.set_events(events);
    }

    pub fn connect(&mut self, remote: SocketAddr) -> Result<(), NetError> {
        self.packetizer.clear();
        self.conn.set_remote_endpoint(remote)
    }

    /// Connect to a literal IP address. Host names are not resolved.
    pub fn connect_host(&mut self, host: &str, port: u16) -> Result<(), NetError> {
        let ip: IpAddr = host.parse().map_err(|_| NetError::Unreachable)?;
        self.connect(SocketAddr::new(ip, port))
    }

    /// Drive the connection and deliver every complete message.
    /// Returns the number of messages delivered.
    pub fn update(&mut self) -> usize {
        let Self { conn, packetizer, handler } = self;

        let mut failure = None;
        conn.update_with(&mut |chunk: &mut ByteBuffer| {
            if failure.is_none() {
                if let Err(e) = packetizer.input(chunk.readable()) {
                    failure = Some(e);
                }
            }
        });
        if let Some(e) = failure {
            tracing::debug!(error = %e, "framing error");
            conn.abort(e.code());
        }

        let delivered = deliver(conn, packetizer, handler);
        if conn.state() == ConnectionState::Closed {
            packetizer.clear();
        }
        delivered
    }

    /// Send a message with session id 0.
    pub fn post(&self, msg_id: i16, payload: &[u8]) -> Result<(), NetError> {
        self.send(0, msg_id, payload)
    }

    pub fn send(&self, session_id: i32, msg_id: i16, payload: &[u8]) -> Result<(), NetError> {
        let frame = Envelope::new(msg_id, session_id).encode(self.conn.pool(), payload)?;
        self.conn.send(frame);
        Ok(())
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

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("conn", &self.conn)
            .field("packetizer", &self.packetizer)
            .finish()
    }
}

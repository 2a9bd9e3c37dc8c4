/// The lifecycle state of a [`Connection`](crate::socket::Connection).
///
/// ```text
/// Closed --set_remote_endpoint--> Connecting --connect ok--> Connected
/// Connecting --connect failed--> Closing
/// Connected --first update tick--> Running
/// Running --I/O error, peer reset, abort--> Closing
/// Closing --update tick / close()--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket. The initial and terminal state.
    #[default]
    Closed,

    /// Stream handshake in flight.
    Connecting,

    /// Socket ready; I/O tasks start on the next update tick.
    Connected,

    /// Sender and receiver tasks are live.
    Running,

    /// Teardown requested; the next update tick closes the connection.
    Closing,
}

impl ConnectionState {
    /// True once teardown has been requested or completed.
    pub fn is_closing_or_closed(self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Running => "running",
            ConnectionState::Closing => "closing",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by buffers, framing and connections.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Remote endpoint unreachable")]
    Unreachable,
    #[error("Connection refused")]
    Refused,
    #[error("Connection aborted by peer")]
    Aborted,
    #[error("Connection error")]
    ConnectionError,
    #[error("{op} {addr} failed: {source}")]
    Io {
        op: &'static str,
        addr: SocketAddr,
        code: ErrorCode,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("No tokio runtime available to drive socket I/O")]
    RuntimeUnavailable,

    // Framing Errors
    #[error("Frame payload of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },
    #[error("Malformed frame length field: {0}")]
    MalformedFrame(i32),

    // Buffer Errors
    #[error("Buffer capacity exceeded: requested {requested}, max {max}")]
    CapacityExceeded { requested: usize, max: usize },
    #[error("Buffer underflow: needed {needed} bytes, {available} readable")]
    Underflow { needed: usize, available: usize },
}

impl NetError {
    /// The code recorded on a connection when this error ends it.
    pub fn code(&self) -> ErrorCode {
        match self {
            NetError::Unreachable => ErrorCode::Unreachable,
            NetError::Refused => ErrorCode::Refused,
            NetError::Aborted => ErrorCode::Aborted,
            NetError::Io { code, .. } => *code,
            NetError::FrameTooLarge { .. } | NetError::MalformedFrame(_) => {
                ErrorCode::FrameTooLarge
            }
            NetError::ConnectionError
            | NetError::RuntimeUnavailable
            | NetError::CapacityExceeded { .. }
            | NetError::Underflow { .. } => ErrorCode::ConnectionError,
        }
    }
}

/// The error code a connection records when it leaves the running state.
///
/// Codes are stable integers so hosts can forward them across FFI or into
/// telemetry without matching on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// Unclassified socket failure.
    ConnectionError,
    /// No error.
    #[default]
    None,
    /// Host or network could not be reached.
    Unreachable,
    /// The peer actively refused the connection.
    Refused,
    /// The peer closed or reset the connection (zero-byte read or send).
    Aborted,
    /// The link was lost.
    Lost,
    /// The peer violated the framing protocol.
    FrameTooLarge,
    Unknown(i32),
}

impl ErrorCode {
    pub fn as_i32(&self) -> i32 {
        match self {
            ErrorCode::ConnectionError => -1,
            ErrorCode::None => 0,
            ErrorCode::Unreachable => 1,
            ErrorCode::Refused => 2,
            ErrorCode::Aborted => 3,
            ErrorCode::Lost => 4,
            ErrorCode::FrameTooLarge => 5,
            ErrorCode::Unknown(code) => *code,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == ErrorCode::None
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -1 => ErrorCode::ConnectionError,
            0 => ErrorCode::None,
            1 => ErrorCode::Unreachable,
            2 => ErrorCode::Refused,
            3 => ErrorCode::Aborted,
            4 => ErrorCode::Lost,
            5 => ErrorCode::FrameTooLarge,
            _ => ErrorCode::Unknown(code),
        }
    }
}

impl From<&io::Error> for ErrorCode {
    /// Maps a socket error onto the connection taxonomy. Anything unmapped is
    /// a plain `ConnectionError`.
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable => ErrorCode::Unreachable,
            io::ErrorKind::ConnectionRefused => ErrorCode::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ErrorCode::Aborted,
            _ => ErrorCode::ConnectionError,
        }
    }
}

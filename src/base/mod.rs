//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): errors returned by fallible operations
//! - [`ErrorCode`](neterror::ErrorCode): the last-error code a connection records
//! - [`ConnectionState`](state::ConnectionState): connection lifecycle states

pub mod context;
pub mod neterror;
pub mod state;

pub use neterror::{ErrorCode, NetError};
pub use state::ConnectionState;

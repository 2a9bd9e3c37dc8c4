//! Message sessions on top of a connection.
//!
//! A session pairs a [`Connection`](crate::socket::Connection) with a
//! [`Packetizer`](crate::framing::Packetizer) and hands each complete
//! message to the application along with its [`Envelope`].
//!
//! - [`StreamSession`]: TCP
//! - [`ReliableSession`]: UDP under a [`Reliability`] protocol

pub mod envelope;
pub mod reliability;
pub mod reliable;
pub mod stream;

pub use envelope::Envelope;
pub use reliability::{Passthrough, Reliability};
pub use reliable::ReliableSession;
pub use stream::StreamSession;

use crate::buffer::ByteBuffer;
use crate::framing::Packetizer;
use crate::socket::Connection;

/// Receives each decoded message. The read cursor sits at the payload.
pub type MessageHandler = Box<dyn FnMut(Envelope, &mut ByteBuffer) + Send>;

/// Hand completed messages to `handler`. A message too short to carry an
/// envelope aborts the connection.
fn deliver(
    conn: &Connection,
    packetizer: &mut Packetizer,
    handler: &mut Option<MessageHandler>,
) -> usize {
    let mut delivered = 0;
    while let Some(mut packet) = packetizer.next_packet() {
        let envelope = match Envelope::decode(&mut packet) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "message without envelope");
                conn.abort(e.code());
                packetizer.clear();
                break;
            }
        };
        if let Some(f) = handler.as_mut() {
            f(envelope, &mut packet);
        }
        delivered += 1;
    }
    delivered
}

use crate::base::neterror::NetError;
use crate::buffer::{BufferPool, ByteBuffer};
use crate::framing::HEADER_SIZE;

/// Message header carried inside every frame.
///
/// ```text
/// [i32 length = 10 + payload][i16 msg_id][i32 session_id][payload]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Envelope {
    pub msg_id: i16,
    /// 0 for fire-and-forget posts
    pub session_id: i32,
}

impl Envelope {
    /// Length prefix plus message id plus session id.
    pub const HEADER_SIZE: usize = HEADER_SIZE + 2 + 4;

    pub fn new(msg_id: i16, session_id: i32) -> Self {
        Self { msg_id, session_id }
    }

    /// Build the complete frame for `payload`.
    pub fn encode(&self, pool: &BufferPool, payload: &[u8]) -> Result<ByteBuffer, NetError> {
        let total = Self::HEADER_SIZE + payload.len();
        let declared = i32::try_from(total).map_err(|_| NetError::FrameTooLarge {
            len: payload.len(),
            max: i32::MAX as usize - Self::HEADER_SIZE,
        })?;
        let mut buf = pool.alloc(total)?;
        buf.write_i32(declared)?;
        buf.write_i16(self.msg_id)?;
        buf.write_i32(self.session_id)?;
        buf.write_bytes(payload)?;
        Ok(buf)
    }

    /// Read the header off a message the packetizer delivered. The read
    /// cursor is left at the start of the payload.
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self, NetError> {
        let msg_id = buf.read_i16()?;
        let session_id = buf.read_i32()?;
        Ok(Self { msg_id, session_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let pool = BufferPool::new();
        let buf = Envelope::new(7, 42).encode(&pool, b"hi").unwrap();
        assert_eq!(buf.readable(), &[0, 0, 0, 12, 0, 7, 0, 0, 0, 42, b'h', b'i']);
    }

    #[test]
    fn test_decode_leaves_payload() {
        let pool = BufferPool::new();
        let mut buf = Envelope::new(-3, 9).encode(&pool, b"body").unwrap();
        buf.skip(HEADER_SIZE).unwrap();

        let envelope = Envelope::decode(&mut buf).unwrap();
        assert_eq!(envelope, Envelope::new(-3, 9));
        assert_eq!(buf.readable(), b"body");
    }

    #[test]
    fn test_decode_short_message() {
        let mut buf = ByteBuffer::with_capacity(4, 4);
        buf.write_i16(1).unwrap();
        assert!(matches!(Envelope::decode(&mut buf), Err(NetError::Underflow { .. })));
    }
}

use crate::base::neterror::NetError;
use crate::buffer::{BufferPool, ByteBuffer};
use bytes::BytesMut;
use std::collections::VecDeque;

/// Size of the length prefix.
pub const HEADER_SIZE: usize = 4;

/// Largest payload accepted by default (512 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024;

const _: () = assert!(DEFAULT_MAX_FRAME_SIZE <= i32::MAX as usize - HEADER_SIZE);

/// Packetizer configuration.
#[derive(Debug, Clone)]
pub struct PacketizerConfig {
    /// Largest payload a frame may declare
    pub max_frame_size: usize,
}

impl Default for PacketizerConfig {
    fn default() -> Self {
        Self { max_frame_size: DEFAULT_MAX_FRAME_SIZE }
    }
}

impl PacketizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest accepted payload.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

/// Reassembles length-prefixed messages from an arbitrarily chunked byte
/// stream.
///
/// Chunk boundaries never affect the result: the same bytes fed one at a
/// time or all at once yield the same messages in the same order. A framing
/// violation poisons the packetizer until [`clear`](Self::clear).
pub struct Packetizer {
    pool: BufferPool,
    config: PacketizerConfig,
    /// Partial header or payload; never longer than the current target
    scratch: BytesMut,
    /// Payload length of the frame being read, once its header is known
    expected: Option<usize>,
    completed: VecDeque<ByteBuffer>,
    failure: Option<NetError>,
}

impl Packetizer {
    pub fn new(pool: BufferPool, config: PacketizerConfig) -> Self {
        Self {
            pool,
            config,
            scratch: BytesMut::with_capacity(HEADER_SIZE),
            expected: None,
            completed: VecDeque::new(),
            failure: None,
        }
    }

    pub fn config(&self) -> &PacketizerConfig {
        &self.config
    }

    /// Consume a chunk of stream bytes.
    ///
    /// Returns how many messages this chunk completed. Completed messages
    /// are retrieved with [`next_packet`](Self::next_packet).
    pub fn input(&mut self, mut chunk: &[u8]) -> Result<usize, NetError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut produced = 0;
        while !chunk.is_empty() {
            let Some(len) = self.expected else {
                let take = (HEADER_SIZE - self.scratch.len()).min(chunk.len());
                self.scratch.extend_from_slice(&chunk[..take]);
                chunk = &chunk[take..];
                if self.scratch.len() < HEADER_SIZE {
                    break;
                }

                let declared = i32::from_be_bytes([
                    self.scratch[0],
                    self.scratch[1],
                    self.scratch[2],
                    self.scratch[3],
                ]);
                self.scratch.clear();

                let len = self.payload_len(declared)?;
                if len == 0 {
                    self.emit(&[])?;
                    produced += 1;
                } else {
                    self.expected = Some(len);
                }
                continue;
            };

            if self.scratch.is_empty() && chunk.len() >= len {
                // Whole payload is in this chunk.
                let (payload, rest) = chunk.split_at(len);
                self.emit(payload)?;
                chunk = rest;
            } else {
                let take = (len - self.scratch.len()).min(chunk.len());
                self.scratch.extend_from_slice(&chunk[..take]);
                chunk = &chunk[take..];
                if self.scratch.len() < len {
                    break;
                }
                let mut msg = self.alloc(len)?;
                msg.write_bytes(&self.scratch)?;
                self.scratch.clear();
                self.completed.push_back(msg);
            }
            self.expected = None;
            produced += 1;
        }

        Ok(produced)
    }

    /// Pop the oldest completed message.
    pub fn next_packet(&mut self) -> Option<ByteBuffer> {
        self.completed.pop_front()
    }

    /// Drain completed messages in arrival order.
    pub fn packets(&mut self) -> impl Iterator<Item = ByteBuffer> + '_ {
        std::iter::from_fn(move || self.completed.pop_front())
    }

    pub fn pending_packets(&self) -> usize {
        self.completed.len()
    }

    /// Bytes held for the frame currently being assembled.
    pub fn buffered_bytes(&self) -> usize {
        self.scratch.len()
    }

    /// The error that poisoned this packetizer, if any.
    pub fn failure(&self) -> Option<&NetError> {
        self.failure.as_ref()
    }

    /// Drop partial state and release every undelivered message.
    pub fn clear(&mut self) {
        self.scratch.clear();
        self.expected = None;
        self.completed.clear();
        self.failure = None;
    }

    fn payload_len(&mut self, declared: i32) -> Result<usize, NetError> {
        if declared < HEADER_SIZE as i32 {
            return Err(self.poison(NetError::MalformedFrame(declared)));
        }
        let len = declared as usize - HEADER_SIZE;
        if len > self.config.max_frame_size {
            let max = self.config.max_frame_size;
            return Err(self.poison(NetError::FrameTooLarge { len, max }));
        }
        Ok(len)
    }

    fn emit(&mut self, payload: &[u8]) -> Result<(), NetError> {
        let mut msg = self.alloc(payload.len())?;
        msg.write_bytes(payload)?;
        self.completed.push_back(msg);
        Ok(())
    }

    fn alloc(&mut self, len: usize) -> Result<ByteBuffer, NetError> {
        self.pool.alloc(len).map_err(|err| self.poison(err))
    }

    fn poison(&mut self, err: NetError) -> NetError {
        tracing::debug!(error = %err, "packetizer poisoned");
        self.scratch.clear();
        self.expected = None;
        self.failure = Some(err.clone());
        err
    }
}

impl std::fmt::Debug for Packetizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packetizer")
            .field("expected", &self.expected)
            .field("buffered", &self.scratch.len())
            .field("pending", &self.completed.len())
            .field("failure", &self.failure)
            .finish()
    }
}

/// Build a frame carrying `payload`.
pub fn encode_frame(pool: &BufferPool, payload: &[u8]) -> Result<ByteBuffer, NetError> {
    let total = payload.len() + HEADER_SIZE;
    let declared = i32::try_from(total)
        .map_err(|_| NetError::FrameTooLarge { len: payload.len(), max: i32::MAX as usize - HEADER_SIZE })?;
    let mut frame = pool.alloc(total)?;
    frame.write_i32(declared)?;
    frame.write_bytes(payload)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packetizer() -> Packetizer {
        Packetizer::new(BufferPool::new(), PacketizerConfig::default())
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + HEADER_SIZE) as i32).to_be_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_single_frame() {
        let mut p = packetizer();
        assert_eq!(p.input(&frame(b"hello")).unwrap(), 1);
        let msg = p.next_packet().unwrap();
        assert_eq!(msg.readable(), b"hello");
        assert!(p.next_packet().is_none());
    }

    #[test]
    fn test_partial_header_is_kept() {
        let mut p = packetizer();
        let bytes = frame(b"abc");
        assert_eq!(p.input(&bytes[..2]).unwrap(), 0);
        assert_eq!(p.buffered_bytes(), 2);
        assert_eq!(p.input(&bytes[2..5]).unwrap(), 0);
        assert_eq!(p.input(&bytes[5..]).unwrap(), 1);
        assert_eq!(p.next_packet().unwrap().readable(), b"abc");
        assert_eq!(p.buffered_bytes(), 0);
    }

    #[test]
    fn test_empty_payload() {
        let mut p = packetizer();
        assert_eq!(p.input(&4i32.to_be_bytes()).unwrap(), 1);
        assert_eq!(p.next_packet().unwrap().readable_bytes(), 0);
    }

    #[test]
    fn test_malformed_length() {
        let mut p = packetizer();
        let err = p.input(&3i32.to_be_bytes()).unwrap_err();
        assert!(matches!(err, NetError::MalformedFrame(3)));

        let mut p = packetizer();
        let err = p.input(&(-1i32).to_be_bytes()).unwrap_err();
        assert!(matches!(err, NetError::MalformedFrame(-1)));
    }

    #[test]
    fn test_oversized_poisons_until_clear() {
        let mut p = Packetizer::new(BufferPool::new(), PacketizerConfig::new().max_frame_size(8));
        let err = p.input(&frame(&[0u8; 9])).unwrap_err();
        assert!(matches!(err, NetError::FrameTooLarge { len: 9, max: 8 }));
        assert_eq!(p.pending_packets(), 0);

        // Still poisoned, even for a valid frame.
        assert!(p.input(&frame(b"ok")).is_err());
        assert!(p.failure().is_some());

        p.clear();
        assert_eq!(p.input(&frame(b"ok")).unwrap(), 1);
    }

    #[test]
    fn test_clear_releases_completed() {
        let pool = BufferPool::with_config(crate::buffer::PoolConfig::new().preallocate(0));
        let mut p = Packetizer::new(pool.clone(), PacketizerConfig::default());
        let mut bytes = frame(b"one");
        bytes.extend(frame(b"two"));
        bytes.extend(&frame(b"three")[..3]);
        assert_eq!(p.input(&bytes).unwrap(), 2);
        assert_eq!(p.pending_packets(), 2);

        p.clear();
        assert_eq!(p.pending_packets(), 0);
        assert_eq!(p.buffered_bytes(), 0);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_encode_frame_layout() {
        let pool = BufferPool::new();
        let buf = encode_frame(&pool, b"xy").unwrap();
        assert_eq!(buf.readable(), &[0, 0, 0, 6, b'x', b'y']);
    }
}

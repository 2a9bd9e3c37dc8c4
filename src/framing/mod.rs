//! Length-prefixed message framing.
//!
//! Wire format: `[i32 length L, big-endian][payload of L - 4 bytes]`. The
//! length field counts itself.

pub mod packetizer;

pub use packetizer::{encode_frame, Packetizer, PacketizerConfig, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};

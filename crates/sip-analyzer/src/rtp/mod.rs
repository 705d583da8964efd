//! RTP/RTCP dissection and per-stream statistics (§4.4).

pub mod codec;
pub mod packet;
pub mod rtcp;
pub mod stream;

pub use packet::Classification;
pub use stream::{Stream, StreamKey, StreamKind};

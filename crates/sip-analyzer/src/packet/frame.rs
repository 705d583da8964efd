//! A single captured wire frame (§3).

/// One raw frame as handed over by a packet source.
///
/// A [`super::Packet`] owns an ordered list of these; fragmentation and
/// TCP/TLS/WS reassembly append additional frames to the same packet as
/// more bytes arrive.
#[derive(Debug, Clone)]
pub struct PacketFrame {
    /// Capture timestamp, microseconds since the Unix epoch.
    pub ts_micros: i64,
    /// Bytes actually captured (may be less than `wire_len` if snaplen
    /// truncated the frame).
    pub caplen: u32,
    /// Original length of the frame on the wire.
    pub wire_len: u32,
    /// Captured bytes (length equals `caplen`).
    pub bytes: Vec<u8>,
}

impl PacketFrame {
    /// Build a frame from a full captured buffer (`caplen == wire_len == bytes.len()`).
    pub fn new(ts_micros: i64, bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u32;
        Self {
            ts_micros,
            caplen: len,
            wire_len: len,
            bytes,
        }
    }

    /// Build a frame where the wire length is known but capture was truncated.
    pub fn with_snaplen(ts_micros: i64, wire_len: u32, bytes: Vec<u8>) -> Self {
        Self {
            ts_micros,
            caplen: bytes.len() as u32,
            wire_len,
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_caplen_equal_to_wire_len() {
        let f = PacketFrame::new(1_000_000, vec![1, 2, 3, 4]);
        assert_eq!(f.caplen, 4);
        assert_eq!(f.wire_len, 4);
    }

    #[test]
    fn with_snaplen_allows_truncation() {
        let f = PacketFrame::with_snaplen(1_000_000, 1500, vec![0u8; 64]);
        assert_eq!(f.caplen, 64);
        assert_eq!(f.wire_len, 1500);
    }
}

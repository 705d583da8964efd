//! Stream reassembly for TCP/TLS/WS-carried SIP (§4.5).
//!
//! One [`ReassemblyTable`] per transport kind, keyed by `(src, dst)`
//! address pairs. Out-of-order bytes past a 64 KiB gap reset the flow;
//! flows idle for 60 s are evicted on the next sweep.

use std::collections::HashMap;

use crate::address::Address;

const MAX_GAP_BYTES: usize = 64 * 1024;
const FLOW_IDLE_TIMEOUT_MICROS: i64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src: Address,
    pub dst: Address,
}

struct Flow {
    buf: Vec<u8>,
    last_activity: i64,
}

impl Flow {
    fn new(now: i64) -> Self {
        Self {
            buf: Vec::new(),
            last_activity: now,
        }
    }
}

/// How a flow's assembled bytes should be cut into PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// SIP's own `Content-Length` framing: a PDU ends at the header
    /// block's blank line plus `Content-Length` more bytes.
    SipContentLength,
    /// WebSocket frame boundaries (opcode 1/2), unmasking if needed.
    WebSocket,
    /// TLS record boundaries: a 5-byte header plus its declared length.
    /// The full record (header + body) is returned as the "PDU" so the
    /// caller can still read the record's content type.
    TlsRecord,
}

pub struct ReassemblyTable {
    flows: HashMap<FlowKey, Flow>,
}

impl ReassemblyTable {
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
        }
    }

    /// Drop flows that have seen no activity in the last 60 seconds.
    pub fn sweep_idle(&mut self, now: i64) {
        self.flows
            .retain(|_, flow| now - flow.last_activity <= FLOW_IDLE_TIMEOUT_MICROS);
    }

    /// Append `bytes` to the named flow at `now`, then try to extract
    /// as many complete PDUs as the buffer currently contains.
    ///
    /// Segments are assumed delivered in order by the caller (UDP/TCP
    /// capture order is preserved per spec.md §5's ordering guarantee);
    /// a segment that would grow the buffer past `MAX_GAP_BYTES` without
    /// yielding a PDU is treated as an unrecoverable gap and the flow
    /// is reset.
    pub fn push(
        &mut self,
        key: FlowKey,
        bytes: &[u8],
        now: i64,
        mode: FramingMode,
    ) -> Vec<Vec<u8>> {
        let flow = self.flows.entry(key).or_insert_with(|| Flow::new(now));
        flow.last_activity = now;
        flow.buf.extend_from_slice(bytes);

        if flow.buf.len() > MAX_GAP_BYTES {
            flow.buf.clear();
            return Vec::new();
        }

        let mut pdus = Vec::new();
        loop {
            let extracted = match mode {
                FramingMode::SipContentLength => extract_sip_pdu(&flow.buf),
                FramingMode::WebSocket => extract_ws_frame(&flow.buf),
                FramingMode::TlsRecord => extract_tls_record(&flow.buf),
            };
            match extracted {
                Some((pdu, consumed)) => {
                    pdus.push(pdu);
                    flow.buf.drain(..consumed);
                }
                None => break,
            }
        }
        pdus
    }
}

impl Default for ReassemblyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the end of the SIP header block (`\r\n\r\n` or `\n\n`) and, if
/// `Content-Length` bytes of body are also present, return the
/// complete PDU and how many bytes it consumed.
fn extract_sip_pdu(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    let header_end = find_header_end(buf)?;
    let headers = std::str::from_utf8(&buf[..header_end]).ok()?;
    let content_length = headers
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            let canonical = crate::sip::header::expand_compact_name(name.trim());
            if canonical.eq_ignore_ascii_case("Content-Length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let total = header_end + content_length;
    if buf.len() < total {
        return None;
    }
    Some((buf[..total].to_vec(), total))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| buf.windows(2).position(|w| w == b"\n\n").map(|i| i + 2))
}

/// Extract one WebSocket frame (RFC 6455 §5.2), unmasking the payload
/// if the frame's MASK bit is set. Only opcode 1 (text) and 2 (binary)
/// frames are meaningful here; others are consumed and skipped.
fn extract_ws_frame(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    if buf.len() < 2 {
        return None;
    }
    let opcode = buf[0] & 0x0f;
    let masked = buf[1] & 0x80 != 0;
    let mut len = (buf[1] & 0x7f) as u64;
    let mut offset = 2;

    if len == 126 {
        if buf.len() < offset + 2 {
            return None;
        }
        len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as u64;
        offset += 2;
    } else if len == 127 {
        if buf.len() < offset + 8 {
            return None;
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[offset..offset + 8]);
        len = u64::from_be_bytes(raw);
        offset += 8;
    }

    let mask_key = if masked {
        if buf.len() < offset + 4 {
            return None;
        }
        let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        offset += 4;
        Some(key)
    } else {
        None
    };

    let len = len as usize;
    if buf.len() < offset + len {
        return None;
    }

    let mut payload = buf[offset..offset + len].to_vec();
    if let Some(key) = mask_key {
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= key[i % 4];
        }
    }

    let total = offset + len;
    if opcode == 1 || opcode == 2 {
        Some((payload, total))
    } else {
        // Control/continuation frame: consume it but yield no PDU.
        payload.clear();
        Some((Vec::new(), total))
    }
}

const TLS_RECORD_HEADER_LEN: usize = 5;

/// Extract one complete TLS record (header + body) per RFC 8446 §5.1
/// framing, which TLS 1.2 shares byte-for-byte at the record layer.
fn extract_tls_record(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    if buf.len() < TLS_RECORD_HEADER_LEN {
        return None;
    }
    let body_len = u16::from_be_bytes([buf[3], buf[4]]) as usize;
    let total = TLS_RECORD_HEADER_LEN + body_len;
    if buf.len() < total {
        return None;
    }
    Some((buf[..total].to_vec(), total))
}

//! RTP fixed header parsing (RFC 3550 §5.1) and the RTP/RTCP
//! heuristic demultiplex (§4.4).

use crate::error::DissectError;
use crate::packet::RtpMeta;

const FIXED_HEADER_LEN: usize = 12;

/// What a UDP payload looks like under the spec's demux heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Rtp,
    Rtcp,
}

/// Classify a UDP payload as RTP or RTCP, or neither.
///
/// Mirrors spec.md §4.4 exactly: version 2 with an ordinary payload
/// type is RTP; payload types 72-76 or 200-204 (the RTCP SR/RR/SDES/
/// BYE/APP range) are RTCP. Anything else is not media.
pub fn classify(payload: &[u8]) -> Option<Classification> {
    let first = *payload.first()?;
    let second = *payload.get(1)?;
    if first >> 6 != 2 {
        return None;
    }
    let pt = second & 0x7f;
    if (72..=76).contains(&pt) || (200..=204).contains(&pt) {
        return Some(Classification::Rtcp);
    }
    Some(Classification::Rtp)
}

/// Parse the fixed 12-byte RTP header. CSRC list and header extension
/// (if present) are skipped to compute `payload_offset`, but are not
/// otherwise retained since nothing downstream consumes them.
pub fn parse(payload: &[u8]) -> Result<RtpMeta, DissectError> {
    if payload.len() < FIXED_HEADER_LEN {
        return Err(DissectError::Truncated {
            layer: "rtp",
            expected: FIXED_HEADER_LEN,
            actual: payload.len(),
        });
    }

    let b0 = payload[0];
    let b1 = payload[1];
    let version = b0 >> 6;
    if version != 2 {
        return Err(DissectError::InvalidHeader {
            layer: "rtp",
            reason: format!("unsupported RTP version {version}"),
        });
    }
    let padding = b0 & 0x20 != 0;
    let csrc_count = (b0 & 0x0f) as usize;
    let marker = b1 & 0x80 != 0;
    let payload_type = b1 & 0x7f;
    let sequence = u16::from_be_bytes([payload[2], payload[3]]);
    let timestamp = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    let ssrc = u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]);

    let mut offset = FIXED_HEADER_LEN + csrc_count * 4;
    if b0 & 0x10 != 0 {
        // Header extension: 4-byte profile+length header, length in
        // 32-bit words not counting itself.
        if payload.len() < offset + 4 {
            return Err(DissectError::Truncated {
                layer: "rtp",
                expected: offset + 4,
                actual: payload.len(),
            });
        }
        let ext_words =
            u16::from_be_bytes([payload[offset + 2], payload[offset + 3]]) as usize;
        offset += 4 + ext_words * 4;
    }
    if offset > payload.len() {
        return Err(DissectError::Truncated {
            layer: "rtp",
            expected: offset,
            actual: payload.len(),
        });
    }

    Ok(RtpMeta {
        version,
        padding,
        marker,
        payload_type,
        sequence,
        timestamp,
        ssrc,
        payload_offset: offset,
        payload: payload[offset..].to_vec(),
    })
}

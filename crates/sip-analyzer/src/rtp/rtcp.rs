//! RTCP packet parsing, limited to the fields stream association needs
//! (packet type, SSRC) rather than a full per-type report decoder.

use crate::error::DissectError;
use crate::packet::RtcpMeta;

const FIXED_HEADER_LEN: usize = 8;

pub const SR: u8 = 200;
pub const RR: u8 = 201;
pub const SDES: u8 = 202;
pub const BYE: u8 = 203;
pub const APP: u8 = 204;

/// Parse the first RTCP packet in a (possibly compound) RTCP payload.
///
/// Compound packets may carry several RTCP packets back to back; only
/// the first is dissected since SSRC/type of the first packet in a
/// compound report is sufficient to identify the sending stream.
pub fn parse(payload: &[u8]) -> Result<RtcpMeta, DissectError> {
    if payload.len() < FIXED_HEADER_LEN {
        return Err(DissectError::Truncated {
            layer: "rtcp",
            expected: FIXED_HEADER_LEN,
            actual: payload.len(),
        });
    }
    let version = payload[0] >> 6;
    if version != 2 {
        return Err(DissectError::InvalidHeader {
            layer: "rtcp",
            reason: format!("unsupported RTCP version {version}"),
        });
    }
    let packet_type = payload[1];
    // BYE's first 4 bytes after the header are an SC-count list of
    // SSRC/CSRC, same layout as SR/RR's sender SSRC.
    let ssrc = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Ok(RtcpMeta { packet_type, ssrc })
}

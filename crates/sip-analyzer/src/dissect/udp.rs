//! UDP dissection and the port-based SIP/RTP dispatch heuristic (§4.1, §4.4).

use crate::dissect::DissectResult;
use crate::error::DissectError;
use crate::packet::{Packet, ProtoData, ProtocolId, UdpMeta};
use crate::rtp::{self, Classification};

const UDP_HEADER_LEN: usize = 8;

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    if payload.len() < UDP_HEADER_LEN {
        return DissectResult::Drop(
            DissectError::Truncated {
                layer: "udp",
                expected: UDP_HEADER_LEN,
                actual: payload.len(),
            }
            .into(),
        );
    }

    let sport = u16::from_be_bytes([payload[0], payload[1]]);
    let dport = u16::from_be_bytes([payload[2], payload[3]]);
    let length = u16::from_be_bytes([payload[4], payload[5]]);

    packet.set(ProtoData::Udp(UdpMeta {
        sport,
        dport,
        length,
    }));

    let body = &payload[UDP_HEADER_LEN..];
    dispatch(body)
}

/// The dispatch rule from spec.md §4.4: classify by payload shape
/// first (RTP/RTCP have a distinctive fixed header), falling back to
/// SIP for anything that isn't clearly media. HEP3 framing is checked
/// first since it wraps an entirely different wire format.
fn dispatch(body: &[u8]) -> DissectResult<'_> {
    if body.starts_with(b"HEP3") {
        return DissectResult::Next(ProtocolId::Hep, body);
    }
    match rtp::packet::classify(body) {
        Some(Classification::Rtp) => DissectResult::Next(ProtocolId::Rtp, body),
        Some(Classification::Rtcp) => DissectResult::Next(ProtocolId::Rtcp, body),
        None => DissectResult::Next(ProtocolId::Sip, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFrame;

    fn udp_frame(body: &[u8]) -> Vec<u8> {
        let mut buf = vec![0x13, 0xc4, 0x13, 0xc5, 0, 0, 0, 0]; // ports 5060->5061
        buf.extend_from_slice(body);
        buf
    }

    #[test]
    fn sip_like_payload_routes_to_sip() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let frame = udp_frame(b"INVITE sip:b@x SIP/2.0\r\n");
        match dissect(&mut packet, &frame) {
            DissectResult::Next(ProtocolId::Sip, _) => {}
            _ => panic!("expected Next(Sip, ..)"),
        }
    }

    #[test]
    fn hep3_prefix_routes_to_hep() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let frame = udp_frame(b"HEP3\x00\x00\x00\x10");
        match dissect(&mut packet, &frame) {
            DissectResult::Next(ProtocolId::Hep, _) => {}
            _ => panic!("expected Next(Hep, ..)"),
        }
    }

    #[test]
    fn rtp_shaped_payload_routes_to_rtp() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let rtp_payload = [0x80u8, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
        let frame = udp_frame(&rtp_payload);
        match dissect(&mut packet, &frame) {
            DissectResult::Next(ProtocolId::Rtp, _) => {}
            _ => panic!("expected Next(Rtp, ..)"),
        }
    }
}

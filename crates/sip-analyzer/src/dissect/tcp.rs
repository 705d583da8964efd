//! TCP header dissection. Reassembly and PDU extraction happen one
//! layer up in [`crate::dissect::Chain`], since they need the flow
//! table and framing-mode decision that a single dissector doesn't
//! have visibility into (§4.1, §4.5).

use crate::dissect::DissectResult;
use crate::error::DissectError;
use crate::packet::{Packet, ProtoData, ProtocolId, TcpMeta};

const TCP_MIN_HEADER_LEN: usize = 20;

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    if payload.len() < TCP_MIN_HEADER_LEN {
        return DissectResult::Drop(
            DissectError::Truncated {
                layer: "tcp",
                expected: TCP_MIN_HEADER_LEN,
                actual: payload.len(),
            }
            .into(),
        );
    }

    let sport = u16::from_be_bytes([payload[0], payload[1]]);
    let dport = u16::from_be_bytes([payload[2], payload[3]]);
    let seq = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    let ack = u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]);
    let data_offset = ((payload[12] >> 4) as usize) * 4;
    let flags = payload[13];

    if data_offset < TCP_MIN_HEADER_LEN || payload.len() < data_offset {
        return DissectResult::Drop(
            DissectError::InvalidHeader {
                layer: "tcp",
                reason: format!("invalid data offset {data_offset}"),
            }
            .into(),
        );
    }

    packet.set(ProtoData::Tcp(TcpMeta {
        sport,
        dport,
        seq,
        ack,
        flags,
    }));

    // Terminal here: the chain driver reads `packet.tcp()` and routes
    // the returned segment payload into reassembly itself rather than
    // following a `Next` hop, since which framing mode applies (plain
    // SIP vs TLS vs WS) depends on port-based configuration the
    // dissector trait doesn't carry.
    DissectResult::Next(ProtocolId::Tcp, &payload[data_offset..])
}

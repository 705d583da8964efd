//! IPv4/IPv6 dissection: enough of the fixed header to recover
//! addresses, TTL and the next-layer protocol (§4.1).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::dissect::{DissectResult, DropReason};
use crate::error::DissectError;
use crate::packet::{IpMeta, Packet, ProtoData, ProtocolId};

const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;

pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    let Some(&first_byte) = payload.first() else {
        return DissectResult::Drop(
            DissectError::Truncated {
                layer: "ip",
                expected: 1,
                actual: 0,
            }
            .into(),
        );
    };
    let version = first_byte >> 4;

    let result = match version {
        4 => dissect_v4(payload),
        6 => dissect_v6(payload),
        other => Err(DissectError::InvalidHeader {
            layer: "ip",
            reason: format!("unsupported IP version {other}"),
        }),
    };

    match result {
        Ok((meta, next_proto, rest)) => {
            packet.set(ProtoData::Ip(meta));
            match next_proto {
                PROTO_TCP => DissectResult::Next(ProtocolId::Tcp, rest),
                PROTO_UDP => DissectResult::Next(ProtocolId::Udp, rest),
                _ => DissectResult::Drop(DropReason::Dissect(DissectError::NoSubdissector {
                    layer: "ip",
                })),
            }
        }
        Err(e) => DissectResult::Drop(e.into()),
    }
}

fn dissect_v4(payload: &[u8]) -> Result<(IpMeta, u8, &[u8]), DissectError> {
    if payload.len() < IPV4_MIN_HEADER_LEN {
        return Err(DissectError::Truncated {
            layer: "ip",
            expected: IPV4_MIN_HEADER_LEN,
            actual: payload.len(),
        });
    }
    let ihl = (payload[0] & 0x0f) as usize * 4;
    if ihl < IPV4_MIN_HEADER_LEN || payload.len() < ihl {
        return Err(DissectError::InvalidHeader {
            layer: "ip",
            reason: format!("invalid IHL {ihl}"),
        });
    }
    let ttl = payload[8];
    let next_proto = payload[9];
    let src = Ipv4Addr::new(payload[12], payload[13], payload[14], payload[15]);
    let dst = Ipv4Addr::new(payload[16], payload[17], payload[18], payload[19]);

    Ok((
        IpMeta {
            src: IpAddr::V4(src),
            dst: IpAddr::V4(dst),
            ttl,
            next_proto,
        },
        next_proto,
        &payload[ihl..],
    ))
}

fn dissect_v6(payload: &[u8]) -> Result<(IpMeta, u8, &[u8]), DissectError> {
    if payload.len() < IPV6_HEADER_LEN {
        return Err(DissectError::Truncated {
            layer: "ip",
            expected: IPV6_HEADER_LEN,
            actual: payload.len(),
        });
    }
    let next_proto = payload[6];
    let ttl = payload[7];
    let mut src_bytes = [0u8; 16];
    src_bytes.copy_from_slice(&payload[8..24]);
    let mut dst_bytes = [0u8; 16];
    dst_bytes.copy_from_slice(&payload[24..40]);

    Ok((
        IpMeta {
            src: IpAddr::V6(Ipv6Addr::from(src_bytes)),
            dst: IpAddr::V6(Ipv6Addr::from(dst_bytes)),
            ttl,
            next_proto,
        },
        next_proto,
        &payload[IPV6_HEADER_LEN..],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFrame;

    fn ipv4_udp_packet() -> Vec<u8> {
        let mut buf = vec![0u8; 28];
        buf[0] = 0x45; // version 4, IHL 5
        buf[8] = 64; // TTL
        buf[9] = PROTO_UDP;
        buf[12..16].copy_from_slice(&[192, 0, 2, 1]);
        buf[16..20].copy_from_slice(&[192, 0, 2, 2]);
        buf
    }

    #[test]
    fn ipv4_header_yields_udp_next_dissector() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let data = ipv4_udp_packet();
        match dissect(&mut packet, &data) {
            DissectResult::Next(ProtocolId::Udp, rest) => assert_eq!(rest.len(), 8),
            _ => panic!("expected Next(Udp, ..)"),
        }
        assert_eq!(packet.ip().unwrap().ttl, 64);
    }

    #[test]
    fn truncated_buffer_is_dropped() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        match dissect(&mut packet, &[0x45, 0, 0]) {
            DissectResult::Drop(_) => {}
            _ => panic!("expected Drop"),
        }
    }
}

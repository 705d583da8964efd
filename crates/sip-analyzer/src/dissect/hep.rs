//! HEP3 chunked-TLV dissection (§4.1 "HEP path", §6).
//!
//! A HEP3 frame carries a captured packet's addressing and timing as
//! typed chunks rather than a raw IP/UDP header; this dissector
//! reconstructs synthetic [`crate::packet::IpMeta`]/[`crate::packet::UdpMeta`]
//! records from those chunks so the rest of the pipeline runs
//! unmodified on HEP-delivered traffic.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::dissect::{ChainConfig, DissectResult, DropReason};
use crate::error::DissectError;
use crate::packet::{HepMeta, IpMeta, Packet, ProtoData, ProtocolId, UdpMeta};

const MAGIC: &[u8; 4] = b"HEP3";
const HEADER_LEN: usize = 6;
const CHUNK_HEADER_LEN: usize = 6;

const CHUNK_IP_FAMILY: u16 = 0x0001;
const CHUNK_IP_PROTO: u16 = 0x0002;
const CHUNK_SRC_IP4: u16 = 0x0003;
const CHUNK_DST_IP4: u16 = 0x0004;
const CHUNK_SRC_IP6: u16 = 0x0005;
const CHUNK_DST_IP6: u16 = 0x0006;
const CHUNK_SRC_PORT: u16 = 0x0007;
const CHUNK_DST_PORT: u16 = 0x0008;
const CHUNK_TS_SEC: u16 = 0x0009;
const CHUNK_TS_USEC: u16 = 0x000a;
const CHUNK_PROTO_TYPE: u16 = 0x000b;
const CHUNK_CAPTURE_ID: u16 = 0x000c;
const CHUNK_AUTH_KEY: u16 = 0x000e;
const CHUNK_PAYLOAD: u16 = 0x000f;

#[derive(Default)]
struct Chunks {
    src_ip: Option<IpAddr>,
    dst_ip: Option<IpAddr>,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    proto_type: u8,
    capture_id: u32,
    auth_key: Option<String>,
    payload_range: Option<(usize, usize)>,
}

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8], config: &ChainConfig) -> DissectResult<'p> {
    if payload.len() < HEADER_LEN || &payload[..4] != MAGIC {
        return DissectResult::Drop(
            DissectError::InvalidHeader {
                layer: "hep",
                reason: "missing HEP3 magic".to_string(),
            }
            .into(),
        );
    }
    let total_len = u16::from_be_bytes([payload[4], payload[5]]) as usize;
    if payload.len() < total_len || total_len < HEADER_LEN {
        return DissectResult::Drop(
            DissectError::Truncated {
                layer: "hep",
                expected: total_len,
                actual: payload.len(),
            }
            .into(),
        );
    }

    let chunks = match parse_chunks(&payload[HEADER_LEN..total_len]) {
        Ok(c) => c,
        Err(e) => return DissectResult::Drop(e.into()),
    };

    if let Some(expected_password) = &config.hep_auth_password {
        let auth_ok = chunks.auth_key.as_deref() == Some(expected_password.as_str());
        if !auth_ok {
            return DissectResult::Drop(DropReason::HepAuthMismatch);
        }
    }

    let (Some(src), Some(dst), Some(sport), Some(dport)) =
        (chunks.src_ip, chunks.dst_ip, chunks.src_port, chunks.dst_port)
    else {
        return DissectResult::Drop(
            DissectError::InvalidHeader {
                layer: "hep",
                reason: "missing address chunks".to_string(),
            }
            .into(),
        );
    };
    let Some((start, end)) = chunks.payload_range else {
        return DissectResult::Drop(
            DissectError::InvalidHeader {
                layer: "hep",
                reason: "missing payload chunk".to_string(),
            }
            .into(),
        );
    };

    packet.set(ProtoData::Ip(IpMeta {
        src,
        dst,
        ttl: 0,
        next_proto: 17,
    }));
    packet.set(ProtoData::Udp(UdpMeta {
        sport,
        dport,
        length: (end - start) as u16,
    }));
    packet.set(ProtoData::Hep(HepMeta {
        proto_type: chunks.proto_type,
        capture_id: chunks.capture_id,
        auth_ok: config.hep_auth_password.is_some(),
    }));

    DissectResult::Next(ProtocolId::Sip, &payload[HEADER_LEN + start..HEADER_LEN + end])
}

fn parse_chunks(mut buf: &[u8]) -> Result<Chunks, DissectError> {
    let base_offset_within_chunks = 0usize;
    let mut chunks = Chunks::default();
    let mut offset = base_offset_within_chunks;

    while !buf.is_empty() {
        if buf.len() < CHUNK_HEADER_LEN {
            return Err(DissectError::Truncated {
                layer: "hep",
                expected: CHUNK_HEADER_LEN,
                actual: buf.len(),
            });
        }
        let _vendor_id = u16::from_be_bytes([buf[0], buf[1]]);
        let chunk_type = u16::from_be_bytes([buf[2], buf[3]]);
        let chunk_len = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        if chunk_len < CHUNK_HEADER_LEN || buf.len() < chunk_len {
            return Err(DissectError::Truncated {
                layer: "hep",
                expected: chunk_len,
                actual: buf.len(),
            });
        }
        let data = &buf[CHUNK_HEADER_LEN..chunk_len];

        match chunk_type {
            CHUNK_IP_FAMILY | CHUNK_IP_PROTO => {}
            CHUNK_SRC_IP4 if data.len() >= 4 => {
                chunks.src_ip = Some(IpAddr::V4(Ipv4Addr::new(data[0], data[1], data[2], data[3])));
            }
            CHUNK_DST_IP4 if data.len() >= 4 => {
                chunks.dst_ip = Some(IpAddr::V4(Ipv4Addr::new(data[0], data[1], data[2], data[3])));
            }
            CHUNK_SRC_IP6 if data.len() >= 16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&data[..16]);
                chunks.src_ip = Some(IpAddr::V6(Ipv6Addr::from(bytes)));
            }
            CHUNK_DST_IP6 if data.len() >= 16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&data[..16]);
                chunks.dst_ip = Some(IpAddr::V6(Ipv6Addr::from(bytes)));
            }
            CHUNK_SRC_PORT if data.len() >= 2 => {
                chunks.src_port = Some(u16::from_be_bytes([data[0], data[1]]));
            }
            CHUNK_DST_PORT if data.len() >= 2 => {
                chunks.dst_port = Some(u16::from_be_bytes([data[0], data[1]]));
            }
            CHUNK_TS_SEC | CHUNK_TS_USEC => {}
            CHUNK_PROTO_TYPE if !data.is_empty() => {
                chunks.proto_type = data[0];
            }
            CHUNK_CAPTURE_ID if data.len() >= 4 => {
                chunks.capture_id = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
            }
            CHUNK_AUTH_KEY => {
                chunks.auth_key = std::str::from_utf8(data).ok().map(|s| s.to_string());
            }
            CHUNK_PAYLOAD => {
                let start = offset + CHUNK_HEADER_LEN;
                let end = offset + chunk_len;
                chunks.payload_range = Some((start, end));
            }
            _ => {
                // Unknown chunk type: skipped per spec.md §6.
            }
        }

        offset += chunk_len;
        buf = &buf[chunk_len..];
    }

    Ok(chunks)
}

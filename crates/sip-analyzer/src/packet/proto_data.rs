//! Protocol-specific metadata attached to a [`super::Packet`] by each
//! dissector in the chain (§3, §4.1).

use std::net::IpAddr;

use crate::sdp::types::SdpSession;
use crate::sip::message::SipMeta;

/// Tag identifying which dissector produced a given [`ProtoData`] entry,
/// and which subdissector a dissector's dispatch rule selected next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    Ip,
    Udp,
    Tcp,
    Tls,
    Ws,
    Hep,
    Sip,
    Sdp,
    Rtp,
    Rtcp,
    Mrcp,
}

/// IP-layer metadata.
#[derive(Debug, Clone)]
pub struct IpMeta {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub ttl: u8,
    /// IANA protocol number carried in the next-header/protocol field.
    pub next_proto: u8,
}

/// UDP-layer metadata.
#[derive(Debug, Clone, Copy)]
pub struct UdpMeta {
    pub sport: u16,
    pub dport: u16,
    pub length: u16,
}

/// TCP-layer metadata.
#[derive(Debug, Clone, Copy)]
pub struct TcpMeta {
    pub sport: u16,
    pub dport: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u8,
}

impl TcpMeta {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
}

/// TLS record + handshake metadata, populated incrementally as the
/// handshake and (optionally) decrypted application data are observed.
#[derive(Debug, Clone, Default)]
pub struct TlsMeta {
    pub content_type: u8,
    pub version: u16,
    pub handshake_type: Option<u8>,
    pub cipher_suite: Option<u16>,
    pub client_random: Option<[u8; 32]>,
    pub server_random: Option<[u8; 32]>,
    pub decrypted: bool,
}

/// WebSocket frame metadata.
#[derive(Debug, Clone, Copy)]
pub struct WsMeta {
    pub opcode: u8,
    pub masked: bool,
    pub fin: bool,
}

/// HEP3 chunk metadata (the fields spec.md §6 lists as vendor-0 chunks).
#[derive(Debug, Clone)]
pub struct HepMeta {
    pub proto_type: u8,
    pub capture_id: u32,
    pub auth_ok: bool,
}

/// RTP header fields (RFC 3550 §5.1).
#[derive(Debug, Clone)]
pub struct RtpMeta {
    pub version: u8,
    pub padding: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Offset into the UDP payload where the RTP payload bytes begin.
    pub payload_offset: usize,
    /// The media payload bytes themselves (after CSRC list and header
    /// extension), owned since nothing else retains the UDP-payload
    /// slice past dissection.
    pub payload: Vec<u8>,
}

/// RTCP packet type (a subset; enough to classify for stream association).
#[derive(Debug, Clone, Copy)]
pub struct RtcpMeta {
    pub packet_type: u8,
    pub ssrc: u32,
}

/// The protocol-data map entry variants.
///
/// Modeled as a sum type rather than a literal string/enum-keyed map:
/// a packet carries at most a handful of layers, so a small `Vec`
/// scanned linearly is both simpler and faster than a hash map, and
/// `match` exhaustiveness replaces the need for a runtime key lookup.
#[derive(Debug, Clone)]
pub enum ProtoData {
    Ip(IpMeta),
    Udp(UdpMeta),
    Tcp(TcpMeta),
    Tls(TlsMeta),
    Ws(WsMeta),
    Hep(HepMeta),
    Sip(SipMeta),
    Sdp(SdpSession),
    Rtp(RtpMeta),
    Rtcp(RtcpMeta),
}

impl ProtoData {
    pub fn id(&self) -> ProtocolId {
        match self {
            ProtoData::Ip(_) => ProtocolId::Ip,
            ProtoData::Udp(_) => ProtocolId::Udp,
            ProtoData::Tcp(_) => ProtocolId::Tcp,
            ProtoData::Tls(_) => ProtocolId::Tls,
            ProtoData::Ws(_) => ProtocolId::Ws,
            ProtoData::Hep(_) => ProtocolId::Hep,
            ProtoData::Sip(_) => ProtocolId::Sip,
            ProtoData::Sdp(_) => ProtocolId::Sdp,
            ProtoData::Rtp(_) => ProtocolId::Rtp,
            ProtoData::Rtcp(_) => ProtocolId::Rtcp,
        }
    }
}

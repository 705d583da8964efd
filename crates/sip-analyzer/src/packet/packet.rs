//! The dissector chain's output value (§3).

use crate::address::{Address, Transport};
use crate::packet::frame::PacketFrame;
use crate::packet::proto_data::{IpMeta, ProtoData, ProtocolId, RtcpMeta, RtpMeta, TcpMeta};

/// Output of the dissector chain: an ordered list of frames plus the
/// protocol metadata each dissector in the chain attached.
///
/// Invariant (enforced by [`crate::dissect::Chain`], not by this type):
/// every `Packet` that reaches storage has at least an IP layer, a
/// transport layer, and exactly one of {SIP, RTP, RTCP} at the payload
/// layer.
#[derive(Debug, Clone)]
pub struct Packet {
    data: Vec<ProtoData>,
    pub frames: Vec<PacketFrame>,
}

impl Packet {
    /// Start a new packet from its first captured frame.
    pub fn new(frame: PacketFrame) -> Self {
        Self {
            data: Vec::with_capacity(4),
            frames: vec![frame],
        }
    }

    /// Attach a protocol-layer record, replacing any existing record of
    /// the same kind (a dissector runs at most once per packet).
    pub fn set(&mut self, data: ProtoData) {
        let id = data.id();
        self.data.retain(|d| d.id() != id);
        self.data.push(data);
    }

    /// Append an additional frame (reassembly).
    pub fn push_frame(&mut self, frame: PacketFrame) {
        self.frames.push(frame);
    }

    /// Look up the most specific protocol record of a given kind.
    pub fn get(&self, id: ProtocolId) -> Option<&ProtoData> {
        self.data.iter().find(|d| d.id() == id)
    }

    /// Mutable lookup, for dissectors that enrich a record in place.
    pub fn get_mut(&mut self, id: ProtocolId) -> Option<&mut ProtoData> {
        self.data.iter_mut().find(|d| d.id() == id)
    }

    pub fn ip(&self) -> Option<&IpMeta> {
        match self.get(ProtocolId::Ip) {
            Some(ProtoData::Ip(m)) => Some(m),
            _ => None,
        }
    }

    pub fn tcp(&self) -> Option<&TcpMeta> {
        match self.get(ProtocolId::Tcp) {
            Some(ProtoData::Tcp(m)) => Some(m),
            _ => None,
        }
    }

    pub fn rtp(&self) -> Option<&RtpMeta> {
        match self.get(ProtocolId::Rtp) {
            Some(ProtoData::Rtp(m)) => Some(m),
            _ => None,
        }
    }

    pub fn rtcp(&self) -> Option<&RtcpMeta> {
        match self.get(ProtocolId::Rtcp) {
            Some(ProtoData::Rtcp(m)) => Some(m),
            _ => None,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &ProtoData> {
        self.data.iter()
    }

    /// The transport this packet arrived on, derived from whichever
    /// L4/session layer is present.
    pub fn transport(&self) -> Option<Transport> {
        for d in &self.data {
            match d {
                ProtoData::Udp(_) => return Some(Transport::Udp),
                ProtoData::Tcp(_) => return Some(Transport::Tcp),
                ProtoData::Tls(_) => return Some(Transport::Tls),
                ProtoData::Ws(_) => return Some(Transport::Ws),
                _ => {}
            }
        }
        None
    }

    fn ports(&self) -> Option<(u16, u16)> {
        for d in &self.data {
            match d {
                ProtoData::Udp(m) => return Some((m.sport, m.dport)),
                ProtoData::Tcp(m) => return Some((m.sport, m.dport)),
                _ => {}
            }
        }
        None
    }

    /// Source `(ip, port, transport)` of this packet, if both an IP
    /// layer and a transport layer with a source port were dissected.
    pub fn src_address(&self) -> Option<Address> {
        let ip = self.ip()?;
        let (sport, _) = self.ports()?;
        let transport = self.transport()?;
        Some(Address::new(ip.src, sport, transport))
    }

    /// Destination `(ip, port, transport)` of this packet.
    pub fn dst_address(&self) -> Option<Address> {
        let ip = self.ip()?;
        let (_, dport) = self.ports()?;
        let transport = self.transport()?;
        Some(Address::new(ip.dst, dport, transport))
    }

    /// Timestamp of the first captured frame.
    pub fn timestamp(&self) -> i64 {
        self.frames
            .first()
            .map(|f| f.ts_micros)
            .unwrap_or_default()
    }

    /// Sum of captured bytes across all frames, used for memory accounting.
    pub fn caplen_total(&self) -> u64 {
        self.frames.iter().map(|f| f.caplen as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::proto_data::UdpMeta;
    use std::net::{IpAddr, Ipv4Addr};

    fn sample_packet() -> Packet {
        let mut p = Packet::new(PacketFrame::new(1_000_000, vec![0u8; 64]));
        p.set(ProtoData::Ip(IpMeta {
            src: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            dst: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)),
            ttl: 64,
            next_proto: 17,
        }));
        p.set(ProtoData::Udp(UdpMeta {
            sport: 5060,
            dport: 5061,
            length: 44,
        }));
        p
    }

    #[test]
    fn src_and_dst_address_combine_ip_and_port() {
        let p = sample_packet();
        assert_eq!(p.src_address().unwrap().port(), 5060);
        assert_eq!(p.dst_address().unwrap().port(), 5061);
        assert_eq!(p.transport(), Some(Transport::Udp));
    }

    #[test]
    fn set_replaces_existing_record_of_same_kind() {
        let mut p = sample_packet();
        assert_eq!(p.all().count(), 2);
        p.set(ProtoData::Udp(UdpMeta {
            sport: 1,
            dport: 2,
            length: 0,
        }));
        assert_eq!(p.all().count(), 2);
        assert_eq!(p.src_address().unwrap().port(), 1);
    }

    #[test]
    fn timestamp_is_first_frame_ts() {
        let mut p = sample_packet();
        p.push_frame(PacketFrame::new(2_000_000, vec![]));
        assert_eq!(p.timestamp(), 1_000_000);
    }
}

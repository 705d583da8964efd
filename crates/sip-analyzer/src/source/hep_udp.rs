use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;

use crate::error::SourceError;
use crate::packet::PacketFrame;
use crate::pcap::LinkType;

use super::Source;

const MAX_DATAGRAM: usize = 65_535;

/// Live HEP3 listener (spec.md §6's "HEP listen address" input).
///
/// A HEP3 datagram arrives with its transport headers already stripped
/// by the kernel, but [`crate::dissect::Chain::run`] always starts
/// dissection at the IP layer so that pcap-sourced and HEP-sourced
/// traffic share one entry point. This source wraps each datagram in a
/// minimal synthetic IPv4/UDP header before handing it to the chain;
/// `dissect::hep` replaces that synthetic addressing with the real
/// addressing carried inside the HEP3 chunks.
pub struct HepUdpSource {
    socket: UdpSocket,
    local_port: u16,
    buf: Vec<u8>,
}

impl HepUdpSource {
    pub async fn bind(addr: SocketAddr) -> Result<Self, SourceError> {
        let socket = UdpSocket::bind(addr).await.map_err(SourceError::Io)?;
        let local_port = socket.local_addr().map_err(SourceError::Io)?.port();
        Ok(Self {
            socket,
            local_port,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }
}

impl Source for HepUdpSource {
    async fn next_frame(&mut self) -> Result<Option<PacketFrame>, SourceError> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await.map_err(SourceError::Io)?;
        let ts_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);

        let frame_bytes = synthetic_ipv4_udp_frame(peer, self.local_port, &self.buf[..len]);
        Ok(Some(PacketFrame::new(ts_micros, frame_bytes)))
    }

    fn link_type(&self) -> LinkType {
        LinkType::Raw
    }
}

/// Build a minimal 20-byte IPv4 header plus 8-byte UDP header around
/// `payload`, so the generic dissector chain can start at the IP layer
/// the same way it does for pcap-replayed frames. No checksum is
/// computed; neither `dissect::ip` nor `dissect::udp` validate one.
fn synthetic_ipv4_udp_frame(peer: SocketAddr, local_port: u16, payload: &[u8]) -> Vec<u8> {
    let src_ip = match peer.ip() {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    };
    let dst_ip = Ipv4Addr::UNSPECIFIED;

    let mut frame = Vec::with_capacity(28 + payload.len());
    frame.push(0x45); // version 4, IHL 5
    frame.push(0); // DSCP/ECN
    let total_len = (28 + payload.len()).min(u16::MAX as usize) as u16;
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0]); // identification
    frame.extend_from_slice(&[0, 0]); // flags/fragment offset
    frame.push(64); // TTL
    frame.push(17); // protocol: UDP
    frame.extend_from_slice(&[0, 0]); // header checksum (unchecked downstream)
    frame.extend_from_slice(&src_ip.octets());
    frame.extend_from_slice(&dst_ip.octets());

    frame.extend_from_slice(&peer.port().to_be_bytes());
    frame.extend_from_slice(&local_port.to_be_bytes());
    let udp_len = (8 + payload.len()).min(u16::MAX as usize) as u16;
    frame.extend_from_slice(&udp_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0]); // UDP checksum (unchecked downstream)

    frame.extend_from_slice(payload);
    frame
}

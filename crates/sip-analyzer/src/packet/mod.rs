//! Packet frame, protocol-data map and the assembled [`Packet`] type (§3).

pub(crate) mod frame;
mod packet;
mod proto_data;

pub use frame::PacketFrame;
pub use packet::Packet;
pub use proto_data::{
    HepMeta, IpMeta, ProtoData, ProtocolId, RtcpMeta, RtpMeta, TcpMeta, TlsMeta, UdpMeta, WsMeta,
};

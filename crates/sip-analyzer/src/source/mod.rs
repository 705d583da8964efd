//! Packet sources: pcap file replay, a live HEP3 listener, and a live
//! device capture stub (§5 "only the packet source may block", §6
//! "Inputs").

mod hep_udp;
mod live_device;
mod pcap_file;

pub use hep_udp::HepUdpSource;
pub use live_device::LiveDeviceSource;
pub use pcap_file::PcapFileSource;

use crate::error::SourceError;
use crate::packet::PacketFrame;
use crate::pcap::LinkType;

/// A stream of captured frames. Implementations own whatever I/O handle
/// backs them (file, socket, live device) and may block on read per
/// spec.md §5 ("only the packet source may block").
pub trait Source {
    /// Read the next frame. A file-backed source returns `Ok(None)` at
    /// clean EOF; a live source runs until cancelled or the underlying
    /// I/O fails.
    async fn next_frame(&mut self) -> Result<Option<PacketFrame>, SourceError>;

    /// Link type of the frames this source yields, needed to locate the
    /// IP header before handing a frame to [`crate::dissect::Chain`].
    fn link_type(&self) -> LinkType;
}

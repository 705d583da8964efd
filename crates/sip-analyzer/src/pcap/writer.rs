use std::io::Write;
use std::time::Duration;

use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter as RawPcapWriter};
use pcap_file::DataLink;

use crate::error::SourceError;
use crate::packet::frame::PacketFrame;

use super::LinkType;

/// A libpcap file writer, link type copied from whatever source produced
/// the frames being saved (spec.md §6's "link type copied from the
/// ingest source").
pub struct PcapWriter<W: Write> {
    inner: RawPcapWriter<W>,
}

impl<W: Write> PcapWriter<W> {
    pub fn new(writer: W, link_type: LinkType) -> Result<Self, SourceError> {
        let datalink = match link_type {
            LinkType::Ethernet => DataLink::ETHERNET,
            LinkType::Raw => DataLink::RAW,
        };
        let header = PcapHeader {
            datalink,
            snaplen: 65535,
            ..PcapHeader::default()
        };
        let inner = RawPcapWriter::with_header(writer, header)
            .map_err(|e| SourceError::InvalidCaptureFile(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn write_frame(&mut self, frame: &PacketFrame) -> Result<(), SourceError> {
        let timestamp = Duration::from_micros(frame.ts_micros.max(0) as u64);
        let packet = PcapPacket::new(timestamp, frame.wire_len, &frame.bytes);
        self.inner
            .write_packet(&packet)
            .map_err(|e| SourceError::InvalidCaptureFile(e.to_string()))?;
        Ok(())
    }
}

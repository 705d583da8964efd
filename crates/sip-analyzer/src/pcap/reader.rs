use std::io::Read;

use pcap_file::pcap::PcapReader as RawPcapReader;
use pcap_file::DataLink;

use crate::error::SourceError;
use crate::packet::frame::PacketFrame;

use super::LinkType;

/// A libpcap file reader yielding [`PacketFrame`]s in capture order.
pub struct PcapReader<R: Read> {
    inner: RawPcapReader<R>,
    link_type: LinkType,
}

impl<R: Read> PcapReader<R> {
    pub fn new(reader: R) -> Result<Self, SourceError> {
        let inner =
            RawPcapReader::new(reader).map_err(|e| SourceError::InvalidCaptureFile(e.to_string()))?;
        let link_type = match inner.header().datalink {
            DataLink::ETHERNET => LinkType::Ethernet,
            DataLink::RAW | DataLink::IPV4 | DataLink::IPV6 => LinkType::Raw,
            other => {
                return Err(SourceError::NotSupported(format!(
                    "pcap link type {other:?} is not understood by this dissector chain"
                )))
            }
        };
        Ok(Self { inner, link_type })
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Read the next frame. Returns `Ok(None)` on clean EOF.
    pub fn next_frame(&mut self) -> Result<Option<PacketFrame>, SourceError> {
        match self.inner.next_packet() {
            None => Ok(None),
            Some(Ok(pkt)) => {
                let ts_micros = pkt.timestamp.as_micros() as i64;
                Ok(Some(PacketFrame::with_snaplen(
                    ts_micros,
                    pkt.orig_len,
                    pkt.data.into_owned(),
                )))
            }
            Some(Err(e)) => Err(SourceError::InvalidCaptureFile(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_a_buffer_with_no_valid_pcap_header() {
        let buf = vec![0u8; 8];
        let result = PcapReader::new(Cursor::new(buf));
        assert!(result.is_err());
    }
}

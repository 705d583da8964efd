use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::SourceError;
use crate::packet::PacketFrame;
use crate::pcap::{LinkType, PcapReader};

use super::Source;

/// Replays a libpcap file frame by frame, in capture order.
pub struct PcapFileSource {
    reader: PcapReader<BufReader<File>>,
}

impl PcapFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(SourceError::Io)?;
        let reader = PcapReader::new(BufReader::new(file))?;
        Ok(Self { reader })
    }
}

impl Source for PcapFileSource {
    async fn next_frame(&mut self) -> Result<Option<PacketFrame>, SourceError> {
        self.reader.next_frame()
    }

    fn link_type(&self) -> LinkType {
        self.reader.link_type()
    }
}

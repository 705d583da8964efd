use crate::error::SourceError;
use crate::packet::PacketFrame;
use crate::pcap::LinkType;

use super::Source;

/// Live network-device capture. Out of scope for this crate (raw-socket
/// or libpcap-binding device capture needs platform-specific privilege
/// handling spec.md does not otherwise constrain); `next_frame` always
/// fails with [`SourceError::NotSupported`] so callers get a normal
/// [`Error::Source`](crate::Error::Source) rather than a panic when
/// `--device` is requested.
pub struct LiveDeviceSource {
    device: String,
}

impl LiveDeviceSource {
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: device.into() }
    }
}

impl Source for LiveDeviceSource {
    async fn next_frame(&mut self) -> Result<Option<PacketFrame>, SourceError> {
        Err(SourceError::NotSupported(format!(
            "live device capture ({}) is not implemented",
            self.device
        )))
    }

    fn link_type(&self) -> LinkType {
        LinkType::Ethernet
    }
}

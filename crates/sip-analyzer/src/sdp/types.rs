//! Parsed SDP session/media records (§4.3).

use std::net::IpAddr;

/// One `m=` media description line, with its (possibly session-level)
/// connection address and resolved codec list.
#[derive(Debug, Clone)]
pub struct Media {
    pub media_type: String,
    pub port: u16,
    pub proto: String,
    /// Raw format identifiers from the `m=` line, in order.
    pub formats: Vec<String>,
    /// Connection address for this media block: the `c=` line inside
    /// the media section if present, otherwise the session-level `c=`.
    pub connection: Option<IpAddr>,
    /// Codec names resolved from `rtpmap` attributes, keyed by payload
    /// type number as carried in `formats`.
    pub rtpmap: Vec<(u8, String)>,
}

impl Media {
    /// First format whose codec name is known, preferring a resolved
    /// `rtpmap` entry over the static payload-type table.
    pub fn preferred_codec(&self) -> Option<&str> {
        for fmt in &self.formats {
            let pt: u8 = fmt.parse().ok()?;
            if let Some((_, name)) = self.rtpmap.iter().find(|(p, _)| *p == pt) {
                return Some(name);
            }
            if let Some(name) = crate::rtp::codec::static_codec_name(pt) {
                return Some(name);
            }
        }
        None
    }

    pub fn address_port(&self) -> Option<(IpAddr, u16)> {
        self.connection.map(|ip| (ip, self.port))
    }
}

/// A parsed SDP body, attached to the [`crate::sip::SipMeta`] message
/// that carried it.
#[derive(Debug, Clone)]
pub struct SdpSession {
    pub session_connection: Option<IpAddr>,
    pub media: Vec<Media>,
}

impl SdpSession {
    pub fn new() -> Self {
        Self {
            session_connection: None,
            media: Vec::new(),
        }
    }
}

impl Default for SdpSession {
    fn default() -> Self {
        Self::new()
    }
}

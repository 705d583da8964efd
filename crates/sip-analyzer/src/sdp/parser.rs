//! SDP body parser: a line-oriented `<type>=<value>` grammar (RFC 4566),
//! built with the same `winnow` combinators as [`crate::sip::parser`].

use std::net::IpAddr;

use crate::error::ParseError;
use crate::sdp::types::{Media, SdpSession};

/// Parse the connection address out of a `c=<nettype> <addrtype> <address>`
/// line, e.g. `c=IN IP4 192.0.2.2`.
fn parse_connection_line(value: &str) -> Option<IpAddr> {
    let mut parts = value.split_whitespace();
    let _nettype = parts.next()?;
    let _addrtype = parts.next()?;
    let address = parts.next()?;
    address.parse().ok()
}

/// Parse an `m=<media> <port> <proto> <fmt> ...` line.
fn parse_media_line(value: &str) -> Option<(String, u16, String, Vec<String>)> {
    let mut parts = value.split_whitespace();
    let media_type = parts.next()?.to_string();
    let port = parts.next()?.parse().ok()?;
    let proto = parts.next()?.to_string();
    let formats = parts.map(|s| s.to_string()).collect();
    Some((media_type, port, proto, formats))
}

/// Parse an `a=rtpmap:<pt> <name>/<rate>` line.
fn parse_rtpmap_line(value: &str) -> Option<(u8, String)> {
    let value = value.strip_prefix("rtpmap:")?;
    let mut parts = value.splitn(2, char::is_whitespace);
    let pt: u8 = parts.next()?.parse().ok()?;
    let encoding = parts.next()?;
    let name = encoding.split('/').next()?.to_string();
    Some((pt, name))
}

/// Parse a complete SDP body into a [`SdpSession`].
///
/// Tolerant of unknown line types (per RFC 4566, unrecognized `<type>=`
/// lines are ignored rather than rejected); only malformed `m=`/`c=`
/// lines that this analysis actually depends on are treated as errors.
pub fn parse_sdp(body: &[u8]) -> Result<SdpSession, ParseError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ParseError::BadSdp("body is not valid UTF-8".to_string()))?;

    let mut session = SdpSession::new();
    let mut current_media: Option<Media> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim_end_matches('\r');
        let Some((kind, value)) = line.split_once('=') else {
            continue;
        };

        match kind {
            "c" => {
                let addr = parse_connection_line(value)
                    .ok_or_else(|| ParseError::BadSdp(format!("malformed c= line: {value:?}")))?;
                match &mut current_media {
                    Some(media) => media.connection = Some(addr),
                    None => session.session_connection = Some(addr),
                }
            }
            "m" => {
                if let Some(prev) = current_media.take() {
                    session.media.push(prev);
                }
                let (media_type, port, proto, formats) = parse_media_line(value)
                    .ok_or_else(|| ParseError::BadSdp(format!("malformed m= line: {value:?}")))?;
                current_media = Some(Media {
                    media_type,
                    port,
                    proto,
                    formats,
                    connection: session.session_connection,
                    rtpmap: Vec::new(),
                });
            }
            "a" => {
                if let Some((pt, name)) = parse_rtpmap_line(value) {
                    if let Some(media) = &mut current_media {
                        media.rtpmap.push((pt, name));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(prev) = current_media.take() {
        session.media.push(prev);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const BASIC: &str = "v=0\r\n\
o=- 0 0 IN IP4 192.0.2.2\r\n\
s=-\r\n\
c=IN IP4 192.0.2.2\r\n\
t=0 0\r\n\
m=audio 40000 RTP/AVP 0 101\r\n\
a=rtpmap:101 telephone-event/8000\r\n";

    #[test]
    fn parses_session_connection_and_media() {
        let sdp = parse_sdp(BASIC.as_bytes()).unwrap();
        assert_eq!(
            sdp.session_connection,
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)))
        );
        assert_eq!(sdp.media.len(), 1);
        let m = &sdp.media[0];
        assert_eq!(m.media_type, "audio");
        assert_eq!(m.port, 40000);
        assert_eq!(m.formats, vec!["0", "101"]);
    }

    #[test]
    fn media_inherits_session_connection_when_no_override() {
        let sdp = parse_sdp(BASIC.as_bytes()).unwrap();
        assert_eq!(
            sdp.media[0].connection,
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)))
        );
    }

    #[test]
    fn media_level_connection_overrides_session() {
        let with_override = "v=0\r\n\
c=IN IP4 192.0.2.2\r\n\
m=audio 40000 RTP/AVP 0\r\n\
c=IN IP4 192.0.2.9\r\n";
        let sdp = parse_sdp(with_override.as_bytes()).unwrap();
        assert_eq!(
            sdp.media[0].connection,
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 9)))
        );
    }

    #[test]
    fn preferred_codec_resolves_dynamic_payload_type_via_rtpmap() {
        let sdp = parse_sdp(BASIC.as_bytes()).unwrap();
        assert_eq!(sdp.media[0].preferred_codec(), Some("PCMU"));
    }

    #[test]
    fn malformed_media_line_is_rejected() {
        let bad = "v=0\r\nm=audio notaport\r\n";
        let err = parse_sdp(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::BadSdp(_)));
    }
}

//! Post-index display filters, applied when a snapshot is requested
//! (§4.9 layer 2).

use regex::Regex;

use crate::call::Call;
use crate::sip::{Message, StartLine};

/// Filters applied to an already-stored call set. A call passes iff
/// every filter that is `Some` matches at least one of its messages
/// (`method` is checked against the call's first request method
/// instead, since "method" is a call-level attribute).
#[derive(Debug, Clone, Default)]
pub struct DisplayFilters {
    pub sip_from: Option<Regex>,
    pub sip_to: Option<Regex>,
    pub source: Option<Regex>,
    pub destination: Option<Regex>,
    pub payload: Option<Regex>,
    pub method: Option<Regex>,
    pub call_list: Option<Regex>,
}

impl DisplayFilters {
    pub fn is_empty(&self) -> bool {
        self.sip_from.is_none()
            && self.sip_to.is_none()
            && self.source.is_none()
            && self.destination.is_none()
            && self.payload.is_none()
            && self.method.is_none()
            && self.call_list.is_none()
    }

    pub fn matches(&self, call: &Call) -> bool {
        matches_opt(&self.sip_from, || {
            any_message(call, |m| m.meta.headers.get("From").unwrap_or("").to_string())
        }) && matches_opt(&self.sip_to, || {
            any_message(call, |m| m.meta.headers.get("To").unwrap_or("").to_string())
        }) && matches_opt(&self.source, || any_message(call, |m| m.src.to_string()))
            && matches_opt(&self.destination, || any_message(call, |m| m.dst.to_string()))
            && matches_opt(&self.payload, || any_message(call, message_blob))
            && self
                .method
                .as_ref()
                .map(|re| call.first_request_method().map(|m| re.is_match(m)).unwrap_or(false))
                .unwrap_or(true)
            && matches_opt(&self.call_list, || call.call_id.clone())
    }
}

fn any_message(call: &Call, extract: impl Fn(&Message) -> String) -> String {
    call.messages.iter().map(extract).collect::<Vec<_>>().join("\n")
}

/// Reassembles the start line and headers of a message into the text a
/// `FILTER_PAYLOAD` regex matches against, i.e. the SIP PDU a human
/// reading a capture would see (spec.md §4.9), not an arbitrary
/// internal field.
fn message_blob(m: &Message) -> String {
    let start_line = match &m.meta.start_line {
        StartLine::Request { method, request_uri } => format!("{method} {request_uri} SIP/2.0"),
        StartLine::Response {
            status_code,
            reason_phrase,
        } => format!("SIP/2.0 {status_code} {reason_phrase}"),
    };
    let headers = m
        .meta
        .headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\r\n");
    format!("{start_line}\r\n{headers}")
}

/// Runs `build_haystack` (only if `filter` is set) and checks the regex
/// against it; a `None` filter always passes.
fn matches_opt(filter: &Option<Regex>, build_haystack: impl FnOnce() -> String) -> bool {
    match filter {
        None => true,
        Some(re) => re.is_match(&build_haystack()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Transport};
    use crate::sip::{CSeq, HeaderMap, SipMeta, StartLine};
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> Address {
        Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), port, Transport::Udp)
    }

    fn call_with_from(from: &str) -> Call {
        let mut headers = HeaderMap::new();
        headers.push("From", from.to_string());
        let meta = SipMeta {
            start_line: StartLine::Request {
                method: "INVITE".to_string(),
                request_uri: "sip:b@x".to_string(),
            },
            headers,
            call_id: "abc".to_string(),
            from_tag: None,
            to_tag: None,
            cseq: CSeq {
                sequence: 1,
                method: "INVITE".to_string(),
            },
            content_length: 0,
            body_offset: 0,
            payload_hash: 1,
        };
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(meta, addr(5060), addr(5061), 0);
        call
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = DisplayFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&call_with_from("<sip:alice@x>")));
    }

    #[test]
    fn sip_from_filter_matches_header_value() {
        let mut filters = DisplayFilters::default();
        filters.sip_from = Some(Regex::new("alice").unwrap());
        assert!(filters.matches(&call_with_from("<sip:alice@x>")));
        assert!(!filters.matches(&call_with_from("<sip:bob@x>")));
    }

    #[test]
    fn payload_filter_matches_header_text_not_call_id() {
        // Call-ID deliberately shares no substring with the header
        // value being matched, so a pass here can only come from the
        // serialized start-line/headers blob, not a Call-ID fallback.
        let mut filters = DisplayFilters::default();
        filters.payload = Some(Regex::new("alice").unwrap());
        assert!(filters.matches(&call_with_from("<sip:alice@x>")));
        assert!(!filters.matches(&call_with_from("<sip:bob@x>")));
    }

    #[test]
    fn method_filter_checks_first_request_method() {
        let mut filters = DisplayFilters::default();
        filters.method = Some(Regex::new("INVITE").unwrap());
        assert!(filters.matches(&call_with_from("<sip:alice@x>")));
        filters.method = Some(Regex::new("BYE").unwrap());
        assert!(!filters.matches(&call_with_from("<sip:alice@x>")));
    }
}

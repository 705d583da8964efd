//! SIP message parser, built with winnow combinators over the textual
//! SIP grammar (RFC 3261 §7). The teacher applies winnow to binary
//! netlink framing; here the same combinator style parses text lines
//! instead, since SIP headers are line-oriented and whitespace-delimited
//! in a way combinators express more directly than a hand-rolled scanner.

use winnow::ascii::{digit1, space0, till_line_ending};
use winnow::combinator::{alt, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::error::ParseError;
use crate::sip::header::HeaderMap;
use crate::sip::message::{CSeq, SipMeta, StartLine};

pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

const CRLF: &str = "\r\n";

fn line<'s>(input: &mut &'s str) -> PResult<&'s str> {
    terminated(till_line_ending, alt((CRLF.void(), "\n".void()))).parse_next(input)
}

fn request_line(input: &mut &str) -> PResult<(String, String)> {
    let method = take_till(1.., |c: char| c == ' ').parse_next(input)?;
    space0.parse_next(input)?;
    let uri = take_till(1.., |c: char| c == ' ').parse_next(input)?;
    space0.parse_next(input)?;
    let _version = take_till(0.., |c: char| c == '\r' || c == '\n').parse_next(input)?;
    Ok((method.to_string(), uri.to_string()))
}

fn status_line(input: &mut &str) -> PResult<(u16, String)> {
    let _version = take_till(1.., |c: char| c == ' ').parse_next(input)?;
    space0.parse_next(input)?;
    let code: &str = digit1.parse_next(input)?;
    space0.parse_next(input)?;
    let reason = take_till(0.., |c: char| c == '\r' || c == '\n').parse_next(input)?;
    let code = code.parse::<u16>().unwrap_or(0);
    Ok((code, reason.to_string()))
}

fn header_name<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(1.., |c: char| c != ':' && !c.is_whitespace()).parse_next(input)
}

/// Parse a single header line, which may be continued on following
/// lines by leading whitespace (RFC 3261 §7.3.1 line folding).
fn header_line<'s>(input: &mut &'s str) -> PResult<(&'s str, String)> {
    let name = header_name.parse_next(input)?;
    ':'.parse_next(input)?;
    space0.parse_next(input)?;
    let first = till_line_ending.parse_next(input)?;
    alt((CRLF.void(), "\n".void())).parse_next(input)?;

    let mut value = first.to_string();
    loop {
        let checkpoint = *input;
        let starts_folded = input
            .chars()
            .next()
            .map(|c| c == ' ' || c == '\t')
            .unwrap_or(false);
        if !starts_folded {
            break;
        }
        let Ok(cont) = line(input) else {
            *input = checkpoint;
            break;
        };
        value.push(' ');
        value.push_str(cont.trim());
    }
    Ok((name, value))
}

fn headers(input: &mut &str) -> PResult<HeaderMap> {
    let pairs: Vec<(&str, String)> = repeat(0.., header_line).parse_next(input)?;
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.push(name, value);
    }
    Ok(map)
}

fn start_line(input: &mut &str) -> PResult<StartLine> {
    alt((
        preceded(
            "SIP/2.0",
            preceded(space0, status_line),
        )
        .map(|(status_code, reason_phrase)| StartLine::Response {
            status_code,
            reason_phrase,
        }),
        terminated(request_line, alt((CRLF.void(), "\n".void())))
            .map(|(method, request_uri)| StartLine::Request {
                method,
                request_uri,
            }),
    ))
    .parse_next(input)
}

fn parse_cseq(value: &str) -> Result<CSeq, ParseError> {
    let mut parts = value.trim().splitn(2, char::is_whitespace);
    let sequence = parts
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| ParseError::BadCSeq(value.to_string()))?;
    let method = parts
        .next()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ParseError::BadCSeq(value.to_string()))?;
    Ok(CSeq { sequence, method })
}

fn tag_param(header_value: &str) -> Option<String> {
    header_value
        .split(';')
        .find_map(|p| p.trim().strip_prefix("tag="))
        .map(|t| t.trim().to_string())
}

/// Parse a complete SIP message (start line + headers + optional body)
/// from raw bytes, enforcing mandatory-header presence.
///
/// `data` must be UTF-8 (or at least ASCII-compatible for header
/// parsing purposes); non-ASCII bytes are only ever seen in the body,
/// which is addressed via `body_offset` rather than parsed as text.
pub fn parse_message(data: &[u8]) -> Result<SipMeta, ParseError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| ParseError::BadStartLine("not valid UTF-8".to_string()))?;

    let mut remaining = text;
    let start = start_line
        .parse_next(&mut remaining)
        .map_err(|_| ParseError::BadStartLine(text.lines().next().unwrap_or("").to_string()))?;

    let header_map = headers
        .parse_next(&mut remaining)
        .map_err(|_| ParseError::BadStartLine("malformed headers".to_string()))?;

    // `remaining` now begins right after the blank line separating
    // headers from body (or at EOF if there is no body).
    let body_offset = data.len() - remaining.as_bytes().len();

    let call_id = header_map
        .get("Call-ID")
        .ok_or(ParseError::MissingMandatoryHeader { header: "Call-ID" })?
        .to_string();
    let cseq_raw = header_map
        .get("CSeq")
        .ok_or(ParseError::MissingMandatoryHeader { header: "CSeq" })?;
    let cseq = parse_cseq(cseq_raw)?;
    let from = header_map
        .get("From")
        .ok_or(ParseError::MissingMandatoryHeader { header: "From" })?;
    let to = header_map
        .get("To")
        .ok_or(ParseError::MissingMandatoryHeader { header: "To" })?;
    if !header_map.contains("Via") {
        return Err(ParseError::MissingMandatoryHeader { header: "Via" });
    }

    let content_length = header_map
        .get("Content-Length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    Ok(SipMeta {
        start_line: start,
        from_tag: tag_param(from),
        to_tag: tag_param(to),
        call_id,
        cseq,
        content_length,
        body_offset,
        payload_hash: hash_bytes(data),
        headers: header_map,
    })
}

fn hash_bytes(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

//! SIP message types: the raw dissector output and the higher-level
//! [`Message`] a [`crate::call::Call`] stores (§4.2).

use crate::sip::header::HeaderMap;

/// Stable id of a [`Message`] within a call, used for cross-references
/// (e.g. `Call::cstart_msg`) instead of a pointer or index into a `Vec`
/// that might move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// The SIP request line or status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request {
        method: String,
        request_uri: String,
    },
    Response {
        status_code: u16,
        reason_phrase: String,
    },
}

impl StartLine {
    pub fn is_request(&self) -> bool {
        matches!(self, StartLine::Request { .. })
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Response { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            StartLine::Response { status_code, .. } => Some(*status_code),
            StartLine::Request { .. } => None,
        }
    }
}

/// The `CSeq` header, parsed into its two components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub sequence: u32,
    pub method: String,
}

/// Raw output of the SIP dissector (§4.2): everything that can be
/// determined from a single SIP frame in isolation, with no knowledge
/// of the call it belongs to.
#[derive(Debug, Clone)]
pub struct SipMeta {
    pub start_line: StartLine,
    pub headers: HeaderMap,
    pub call_id: String,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub cseq: CSeq,
    pub content_length: usize,
    /// Byte offset into the frame where the message body begins.
    pub body_offset: usize,
    /// Hash of the raw PDU bytes, used for retransmission detection
    /// (spec.md §4.2: identical `(is_request, method_or_status, cseq,
    /// payload_hash)` within a Call marks a message as a retransmit).
    pub payload_hash: u64,
}

impl SipMeta {
    pub fn is_request(&self) -> bool {
        self.start_line.is_request()
    }

    pub fn method(&self) -> Option<&str> {
        self.start_line.method()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.start_line.status_code()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }
}

/// A SIP message as stored by a [`crate::call::Call`]: the dissected
/// metadata plus the bookkeeping flags that only make sense once the
/// message has been correlated against the rest of the dialog.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub meta: SipMeta,
    pub src: crate::address::Address,
    pub dst: crate::address::Address,
    pub timestamp: i64,
    /// True when an earlier message in this call has the same method,
    /// `CSeq`, and `Via branch` (i.e. this is a retransmission, not a
    /// new transaction).
    pub is_retransmission: bool,
    /// True when this message is a request opening a transaction this
    /// call hasn't seen before (resolved Open Question: the first
    /// non-retransmitted request with this `CSeq` number in the call,
    /// not merely the call's very first message — see
    /// `Call::is_initial_transaction`).
    pub is_initial_transaction: bool,
}

impl Message {
    pub fn new(
        id: MessageId,
        meta: SipMeta,
        src: crate::address::Address,
        dst: crate::address::Address,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            meta,
            src,
            dst,
            timestamp,
            is_retransmission: false,
            is_initial_transaction: false,
        }
    }

    pub fn via_branch(&self) -> Option<&str> {
        let via = self.meta.headers.get("Via")?;
        via.split(';')
            .find_map(|p| p.trim().strip_prefix("branch="))
    }
}

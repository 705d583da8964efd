//! A SIP dialog: ingest, retransmission detection and state tracking
//! (§4.6).

use std::collections::HashSet;

use crate::address::Address;
use crate::call::state::{transition, CallEvent, CallState};
use crate::rtp::Stream;
use crate::sip::{Message, MessageId, SipMeta};

/// Reads `X-Call-ID`/`X-CID` off a message's headers, for extended-flow
/// grouping (spec.md §4.6 step 4).
fn extended_call_id(meta: &SipMeta) -> Option<String> {
    meta.headers
        .get("X-Call-ID")
        .or_else(|| meta.headers.get("X-CID"))
        .map(|s| s.to_string())
}

/// A SIP dialog, or (once merged via `x_call_ids`) a cluster of related
/// dialogs (§3).
#[derive(Debug, Clone)]
pub struct Call {
    pub call_id: String,
    pub x_call_ids: HashSet<String>,
    pub messages: Vec<Message>,
    pub streams: Vec<Stream>,
    pub state: Option<CallState>,
    pub cstart_msg: Option<MessageId>,
    pub cend_msg: Option<MessageId>,
    pub index: u32,
    pub changed: bool,

    next_message_id: u64,
    /// `(CSeq-number, CSeq-method)` of an observed BYE/CANCEL request
    /// whose terminating final response hasn't arrived yet. Cleared
    /// once that response sets `cend_msg` (spec.md §3: `cend_msg` is
    /// the *response*, not the request, that closes the dialog).
    pending_terminal_cseq: Option<(u32, String)>,
}

impl Call {
    pub fn new(call_id: String, index: u32) -> Self {
        Self {
            call_id,
            x_call_ids: HashSet::new(),
            messages: Vec::new(),
            streams: Vec::new(),
            state: None,
            cstart_msg: None,
            cend_msg: None,
            index,
            changed: false,
            next_message_id: 0,
            pending_terminal_cseq: None,
        }
    }

    fn alloc_message_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    /// True iff a message with the same `(is_request, method_or_status,
    /// cseq, payload_hash)` already exists in this call (spec.md §4.2).
    fn is_retransmission(&self, meta: &SipMeta) -> bool {
        self.messages.iter().any(|m| {
            m.meta.is_request() == meta.is_request()
                && m.meta.method() == meta.method()
                && m.meta.status_code() == meta.status_code()
                && m.meta.cseq == meta.cseq
                && m.meta.payload_hash == meta.payload_hash
        })
    }

    /// True iff `meta` is a request opening a transaction this call
    /// hasn't seen before: no earlier non-retransmitted request in the
    /// call shares its `CSeq` number (Open Question resolution, see
    /// SPEC_FULL.md §4.6 — "first request with this `(Call-ID,
    /// CSeq-number)` that is not itself a retransmission").
    fn is_initial_transaction(&self, meta: &SipMeta, is_retransmission: bool) -> bool {
        meta.is_request()
            && !is_retransmission
            && !self.messages.iter().any(|m| {
                m.meta.is_request() && !m.is_retransmission && m.meta.cseq.sequence == meta.cseq.sequence
            })
    }

    /// Ingest one SIP message (spec.md §4.6 steps 2-6). Returns the id
    /// of the stored message.
    pub fn ingest_message(&mut self, meta: SipMeta, src: Address, dst: Address, ts: i64) -> MessageId {
        let is_retransmission = self.is_retransmission(&meta);
        let is_initial_transaction = self.is_initial_transaction(&meta, is_retransmission);

        if let Some(xcid) = extended_call_id(&meta) {
            self.x_call_ids.insert(xcid);
        }

        let event = CallEvent::classify(meta.method(), meta.status_code());
        let is_request = meta.is_request();
        let status_code = meta.status_code();
        let cseq_sequence = meta.cseq.sequence;
        let cseq_method = meta.cseq.method.clone();
        let id = self.alloc_message_id();

        let mut message = Message::new(id, meta, src, dst, ts);
        message.is_retransmission = is_retransmission;
        message.is_initial_transaction = is_initial_transaction;

        // Keep messages time-ordered; usually an append, but a packet
        // delivered slightly out of capture order re-sorts on insert
        // (spec.md §5's per-Call ordering guarantee).
        let insert_at = self
            .messages
            .iter()
            .position(|m| m.timestamp > ts)
            .unwrap_or(self.messages.len());
        self.messages.insert(insert_at, message);

        if let Some(event) = event {
            let previous_state = self.state;
            let new_state = transition(self.state, event);
            self.state = new_state;
            let previous_final = previous_state.map(CallState::is_final).unwrap_or(false);

            if previous_state.is_none() && matches!(new_state, Some(CallState::CallSetup)) {
                // call opened; nothing else to record yet.
            } else if !matches!(previous_state, Some(s) if s == CallState::InCall)
                && matches!(new_state, Some(CallState::InCall))
            {
                self.cstart_msg = Some(id);
            } else if !previous_final && is_request && matches!(event, CallEvent::Bye | CallEvent::Cancel) {
                // Dialog-closing request observed; the state machine
                // already moved to the terminal state, but spec.md §3
                // wants `cend_msg` to point at the final *response*
                // that closes this transaction, not the request.
                self.pending_terminal_cseq = Some((cseq_sequence, cseq_method.clone()));
            } else if new_state.map(CallState::is_final).unwrap_or(false) && !previous_final {
                self.cend_msg = Some(id);
            }
        }

        if !is_request {
            if let Some(code) = status_code {
                if code >= 200 {
                    if let Some((seq, method)) = &self.pending_terminal_cseq {
                        if *seq == cseq_sequence && method.eq_ignore_ascii_case(&cseq_method) {
                            self.cend_msg = Some(id);
                            self.pending_terminal_cseq = None;
                        }
                    }
                }
            }
        }

        self.changed = true;
        id
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The call's first request method, used by `FILTER_METHOD` display
    /// filtering (spec.md §4.9).
    pub fn first_request_method(&self) -> Option<&str> {
        self.messages.iter().find_map(|m| m.meta.method())
    }

    pub fn contains_invite(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.meta.method().is_some_and(|m| m.eq_ignore_ascii_case("INVITE")))
    }

    /// Wall-clock duration from the first message to the last, in
    /// microseconds.
    pub fn total_duration_micros(&self) -> i64 {
        match (self.messages.first(), self.messages.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        }
    }

    /// Conversation duration: from `cstart_msg` to `cend_msg`, or zero
    /// if the call never entered `InCall`.
    pub fn conversation_duration_micros(&self) -> i64 {
        match (self.cstart_msg, self.cend_msg) {
            (Some(start), Some(end)) => {
                let start_ts = self.message(start).map(|m| m.timestamp).unwrap_or(0);
                let end_ts = self.message(end).map(|m| m.timestamp).unwrap_or(0);
                end_ts - start_ts
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Transport;
    use crate::sip::{CSeq, StartLine};
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> Address {
        Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5060, Transport::Udp)
    }

    fn request(method: &str, cseq: u32, hash: u64) -> SipMeta {
        SipMeta {
            start_line: StartLine::Request {
                method: method.to_string(),
                request_uri: "sip:b@x".to_string(),
            },
            headers: crate::sip::HeaderMap::new(),
            call_id: "abc".to_string(),
            from_tag: None,
            to_tag: None,
            cseq: CSeq {
                sequence: cseq,
                method: method.to_string(),
            },
            content_length: 0,
            body_offset: 0,
            payload_hash: hash,
        }
    }

    fn response(code: u16, cseq_method: &str, cseq: u32, hash: u64) -> SipMeta {
        SipMeta {
            start_line: StartLine::Response {
                status_code: code,
                reason_phrase: "x".to_string(),
            },
            headers: crate::sip::HeaderMap::new(),
            call_id: "abc".to_string(),
            from_tag: None,
            to_tag: None,
            cseq: CSeq {
                sequence: cseq,
                method: cseq_method.to_string(),
            },
            content_length: 0,
            body_offset: 0,
            payload_hash: hash,
        }
    }

    #[test]
    fn invite_then_200_transitions_to_in_call_and_sets_cstart() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 1), addr(), addr(), 0);
        assert_eq!(call.state, Some(CallState::CallSetup));
        let id = call.ingest_message(response(200, "INVITE", 1, 2), addr(), addr(), 1000);
        assert_eq!(call.state, Some(CallState::InCall));
        assert_eq!(call.cstart_msg, Some(id));
    }

    #[test]
    fn bye_after_in_call_completes_and_sets_cend_on_its_final_response() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 1), addr(), addr(), 0);
        call.ingest_message(response(200, "INVITE", 1, 2), addr(), addr(), 1000);
        let bye_id = call.ingest_message(request("BYE", 2, 3), addr(), addr(), 2000);
        assert_eq!(call.state, Some(CallState::Completed));
        assert_eq!(call.cend_msg, None, "cend_msg waits for the response, not the BYE itself");
        let bye_ok_id = call.ingest_message(response(200, "BYE", 2, 4), addr(), addr(), 2500);
        assert_ne!(bye_ok_id, bye_id);
        assert_eq!(call.cend_msg, Some(bye_ok_id));
    }

    #[test]
    fn duplicate_message_is_flagged_retransmission() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 42), addr(), addr(), 0);
        call.ingest_message(request("INVITE", 1, 42), addr(), addr(), 500);
        assert!(!call.messages[0].is_retransmission);
        assert!(call.messages[1].is_retransmission);
    }

    #[test]
    fn terminal_state_is_sticky_against_further_events() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 1), addr(), addr(), 0);
        call.ingest_message(response(486, "INVITE", 1, 2), addr(), addr(), 1000);
        assert_eq!(call.state, Some(CallState::Busy));
        call.ingest_message(request("BYE", 2, 3), addr(), addr(), 2000);
        assert_eq!(call.state, Some(CallState::Busy));
    }

    #[test]
    fn every_new_cseq_number_opens_its_own_initial_transaction() {
        // Resolved Open Question (SPEC_FULL.md §4.6): a request is the
        // initial transaction for its own CSeq number, not just the
        // call's very first message, so a BYE on a fresh CSeq counts too.
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 1), addr(), addr(), 0);
        call.ingest_message(request("BYE", 2, 2), addr(), addr(), 1000);
        assert!(call.messages[0].is_initial_transaction);
        assert!(call.messages[1].is_initial_transaction);
    }

    #[test]
    fn retransmitted_request_is_not_an_initial_transaction() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 42), addr(), addr(), 0);
        call.ingest_message(request("INVITE", 1, 42), addr(), addr(), 500);
        assert!(call.messages[0].is_initial_transaction);
        assert!(!call.messages[1].is_initial_transaction);
    }

    #[test]
    fn responses_are_never_initial_transactions() {
        let mut call = Call::new("abc".to_string(), 1);
        call.ingest_message(request("INVITE", 1, 1), addr(), addr(), 0);
        let id = call.ingest_message(response(200, "INVITE", 1, 2), addr(), addr(), 1000);
        assert!(!call.message(id).unwrap().is_initial_transaction);
    }
}

//! The displayable-attribute engine (§4.9, supplemented from
//! `original_source/sngrep`'s `src/storage/attribute.h`).
//!
//! Each attribute is a `{name, title, length, extractor}` record.
//! Extractors are either hard-coded Rust closures (index, state, timing)
//! or a named-capture regex run over a message's raw header blob.

use regex::Regex;

use crate::call::{Call, CallState};
use crate::sip::{header::user_part, Message};

/// Where an attribute's value comes from.
pub enum Extractor {
    /// A closure with direct access to the owning call (and, for
    /// per-message attributes, the specific message).
    Builtin(fn(&Call, Option<&Message>) -> String),
    /// A regex with a named `(?P<value>...)` capture group, matched
    /// against the header blob built from a message's headers.
    Regex(Regex),
}

/// One entry in the attribute table.
pub struct Attribute {
    pub name: &'static str,
    pub title: &'static str,
    pub length: usize,
    pub mutable: bool,
    extractor: Extractor,
}

impl Attribute {
    pub fn builtin(
        name: &'static str,
        title: &'static str,
        length: usize,
        mutable: bool,
        f: fn(&Call, Option<&Message>) -> String,
    ) -> Self {
        Self {
            name,
            title,
            length,
            mutable,
            extractor: Extractor::Builtin(f),
        }
    }

    pub fn regex(name: &'static str, title: &'static str, length: usize, pattern: &str) -> Option<Self> {
        let re = Regex::new(pattern).ok()?;
        Some(Self {
            name,
            title,
            length,
            mutable: false,
            extractor: Extractor::Regex(re),
        })
    }

    /// Compute this attribute's value for `call` (and, for per-message
    /// attributes, `message`).
    pub fn value(&self, call: &Call, message: Option<&Message>) -> String {
        match &self.extractor {
            Extractor::Builtin(f) => f(call, message),
            Extractor::Regex(re) => {
                let Some(m) = message else { return String::new() };
                let blob = header_blob(m);
                re.captures(&blob)
                    .and_then(|c| c.name("value"))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            }
        }
    }
}

fn header_blob(message: &Message) -> String {
    message
        .meta
        .headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn call_state_name(state: Option<CallState>) -> &'static str {
    match state {
        None => "n/a",
        Some(CallState::CallSetup) => "CALL SETUP",
        Some(CallState::InCall) => "IN CALL",
        Some(CallState::Completed) => "COMPLETED",
        Some(CallState::Cancelled) => "CANCELLED",
        Some(CallState::Rejected) => "REJECTED",
        Some(CallState::Busy) => "BUSY",
        Some(CallState::Diverted) => "DIVERTED",
    }
}

/// The full built-in attribute set sngrep exposes, carried in full even
/// though the distilled spec only gestures at a subset.
pub fn builtin_attributes() -> Vec<Attribute> {
    vec![
        Attribute::builtin("callindex", "Idx", 4, false, |c, _| c.index.to_string()),
        Attribute::builtin("sipfrom", "SIP From", 30, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("From")).unwrap_or("").to_string()
        }),
        Attribute::builtin("sipfromuser", "From User", 20, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("From"))
                .and_then(user_part)
                .unwrap_or("")
                .to_string()
        }),
        Attribute::builtin("sipto", "SIP To", 30, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("To")).unwrap_or("").to_string()
        }),
        Attribute::builtin("siptouser", "To User", 20, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("To"))
                .and_then(user_part)
                .unwrap_or("")
                .to_string()
        }),
        Attribute::builtin("src", "Source", 22, false, |_, m| {
            m.map(|m| m.src.to_string()).unwrap_or_default()
        }),
        Attribute::builtin("dst", "Destination", 22, false, |_, m| {
            m.map(|m| m.dst.to_string()).unwrap_or_default()
        }),
        Attribute::builtin("callid", "Call-ID", 50, false, |c, _| c.call_id.clone()),
        Attribute::builtin("xcallid", "X-Call-ID", 50, false, |c, _| {
            c.x_call_ids.iter().next().cloned().unwrap_or_default()
        }),
        Attribute::builtin("method", "Method", 10, false, |c, _| {
            c.first_request_method().unwrap_or("").to_string()
        }),
        Attribute::builtin("transport", "Transport", 5, false, |_, m| {
            m.map(|m| m.src.transport().to_string()).unwrap_or_default()
        }),
        Attribute::builtin("msgcnt", "Msgs", 5, true, |c, _| c.messages.len().to_string()),
        Attribute::builtin("callstate", "State", 12, true, |c, _| {
            call_state_name(c.state).to_string()
        }),
        Attribute::builtin("convdur", "ConvDur", 8, true, |c, _| {
            format!("{:.3}", c.conversation_duration_micros() as f64 / 1_000_000.0)
        }),
        Attribute::builtin("totaldur", "TotalDur", 8, true, |c, _| {
            format!("{:.3}", c.total_duration_micros() as f64 / 1_000_000.0)
        }),
        Attribute::builtin("reason_txt", "Reason", 25, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("Reason")).unwrap_or("").to_string()
        }),
        Attribute::builtin("warning", "Warning", 25, false, |_, m| {
            m.and_then(|m| m.meta.headers.get("Warning")).unwrap_or("").to_string()
        }),
    ]
}

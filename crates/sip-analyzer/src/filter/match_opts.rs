//! Pre-index match rules, applied at ingest (§4.9 layer 1).

use regex::Regex;

/// Filters applied before a message is accepted into [`crate::storage::Storage`].
///
/// Unlike [`super::display::DisplayFilters`], a rejection here means the
/// message (and, for `invite_only`, the whole call) never enters storage
/// at all — there is nothing left to filter later.
#[derive(Debug, Clone, Default)]
pub struct StorageMatchOpts {
    /// SIP payload must match this regex to be accepted.
    pub mexpr: Option<Regex>,
    /// Only accept calls that contain at least one INVITE.
    pub invite_only: bool,
    /// Maximum number of concurrent dialogs; the oldest is evicted past
    /// this cap.
    pub dialog_cap: usize,
}

impl StorageMatchOpts {
    pub fn new(dialog_cap: usize) -> Self {
        Self {
            mexpr: None,
            invite_only: false,
            dialog_cap,
        }
    }

    pub fn accepts_payload(&self, payload: &[u8]) -> bool {
        match &self.mexpr {
            None => true,
            Some(re) => re.is_match(&String::from_utf8_lossy(payload)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mexpr_accepts_everything() {
        let opts = StorageMatchOpts::new(100);
        assert!(opts.accepts_payload(b"anything"));
    }

    #[test]
    fn mexpr_rejects_non_matching_payloads() {
        let mut opts = StorageMatchOpts::new(100);
        opts.mexpr = Some(Regex::new("INVITE").unwrap());
        assert!(opts.accepts_payload(b"INVITE sip:b@x SIP/2.0"));
        assert!(!opts.accepts_payload(b"BYE sip:b@x SIP/2.0"));
    }
}

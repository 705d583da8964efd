//! Error types, one enum per component boundary (§7 of the design spec).

use std::io;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error, composed of the per-boundary error kinds.
///
/// Only [`Error::Source`] and startup [`Error::Config`] are meant to
/// propagate out of `main`; every other variant is caught at its
/// component boundary and converted into a dropped-packet counter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The packet source failed (I/O, EOF on a live capture). Fatal.
    #[error("packet source error: {0}")]
    Source(#[from] SourceError),

    /// A packet was malformed at some dissection layer. Non-fatal.
    #[error("dissect error: {0}")]
    Dissect(#[from] DissectError),

    /// A flow's reassembly buffer aged out. Non-fatal.
    #[error("reassembly timeout for flow {0}")]
    ReassemblyTimeout(String),

    /// TLS decryption is unavailable for this flow. Non-fatal.
    #[error("key file error: {0}")]
    KeyFile(#[from] KeyFileError),

    /// Storage reached a capacity limit and evicted the oldest call.
    #[error("storage full: evicted call {call_id}")]
    StorageFull {
        /// `Call-ID` of the evicted call.
        call_id: String,
    },

    /// The configuration file had an unrecognized option or bad value.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from a packet source (pcap file, live device, HEP listener).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The capture file's global header was invalid or its format is unsupported.
    #[error("invalid capture file: {0}")]
    InvalidCaptureFile(String),

    /// The live device path is not implemented (out of scope; see DESIGN.md).
    #[error("unsupported packet source: {0}")]
    NotSupported(String),

    /// The source was closed (clean EOF, not an error condition by itself,
    /// but callers that need it as a terminal signal can match on it).
    #[error("packet source closed")]
    Closed,
}

/// Errors raised while dissecting a packet at some protocol layer.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DissectError {
    /// Buffer was shorter than a fixed-size header required at this layer.
    #[error("truncated {layer} header: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Protocol layer name (for logging).
        layer: &'static str,
        /// Minimum bytes required.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A length field or version field held an unexpected value.
    #[error("invalid {layer} header: {reason}")]
    InvalidHeader {
        /// Protocol layer name.
        layer: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// SIP/SDP-specific parse failure.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An HEP3 frame's auth_key chunk did not match the configured password.
    #[error("HEP authentication mismatch")]
    HepAuthMismatch,

    /// No subdissector claimed this payload.
    #[error("no subdissector for payload under {layer}")]
    NoSubdissector {
        /// Protocol layer whose dispatch rule failed to match.
        layer: &'static str,
    },
}

/// SIP/SDP parse failures (a specialization of [`DissectError`]).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A mandatory header (`Call-ID`, `CSeq`, `From`, `To`) was missing.
    #[error("missing mandatory header: {header}")]
    MissingMandatoryHeader {
        /// Name of the missing header.
        header: &'static str,
    },

    /// The first line was neither a valid request-line nor status-line.
    #[error("malformed start line: {0:?}")]
    BadStartLine(String),

    /// The `CSeq` header did not parse as `<number> <method>`.
    #[error("malformed CSeq header: {0:?}")]
    BadCSeq(String),

    /// The SDP body failed to parse (malformed `m=`/`c=` line).
    #[error("malformed SDP: {0}")]
    BadSdp(String),
}

/// TLS key-file / decryption failures.
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    /// The key file could not be read from disk.
    #[error("cannot read key file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The key file's contents were not a parseable RSA private key.
    #[error("invalid RSA private key in {path}: {reason}")]
    InvalidKey {
        /// Path to the offending file.
        path: String,
        /// Parser failure reason.
        reason: String,
    },

    /// The negotiated cipher suite is not decryptable with a static RSA key
    /// (e.g. any `(EC)DHE` suite).
    #[error("cipher suite {0:#06x} is not decryptable from a static RSA key")]
    UnsupportedCipherSuite(u16),

    /// RSA decryption of the encrypted pre-master secret failed.
    #[error("RSA decryption failed")]
    DecryptionFailed,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be opened/read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A required option was missing after parsing the whole file.
    #[error("missing required option: {0}")]
    MissingRequired(&'static str),

    /// A recognized option had a value that failed to parse; the caller
    /// should log a warning and skip the line rather than abort, unless
    /// the option is required (see [`ConfigError::MissingRequired`]).
    #[error("invalid value for {option}: {value:?}")]
    InvalidValue {
        /// Option name.
        option: String,
        /// The unparsable value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dissect_error_messages() {
        let err = DissectError::Truncated {
            layer: "ip",
            expected: 20,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "truncated ip header: expected at least 20 bytes, got 4"
        );
    }

    #[test]
    fn parse_error_wraps_into_dissect_error() {
        let parse = ParseError::MissingMandatoryHeader { header: "Call-ID" };
        let dissect: DissectError = parse.into();
        assert!(dissect.to_string().contains("Call-ID"));
    }

    #[test]
    fn top_level_error_from_source() {
        let src = SourceError::Closed;
        let err: Error = src.into();
        assert!(matches!(err, Error::Source(SourceError::Closed)));
    }
}

//! Error taxonomy for the transfer engine.
//!
//! [`B2Error`] is the type every public API returns. [`B2ErrorKind`] is the
//! classification the policy stack (see [`crate::policy`]) dispatches retries on;
//! [`TransferError`] is the context wrapper the orchestrators (see [`crate::upload`],
//! [`crate::download`]) attach before returning a failure to the caller.

#[derive(Debug, Deserialize)]
pub struct B2ErrorMessage {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for B2ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for B2ErrorMessage {}

/// Broad classification of a failure, used by the policy stack to decide whether and how
/// to retry. See SPEC_FULL.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum B2ErrorKind {
    /// HTTP 401, or service code `bad_auth_token`/`expired_auth_token`.
    Authentication,
    /// Service code `bad_digest`, or a locally computed SHA-1 mismatch.
    InvalidHash,
    /// HTTP 408/429/5xx, connection reset, or timeout.
    Transient,
    CapExceeded,
    NotFound,
    BadRequest,
    Conflict,
    Forbidden,
    /// A cancellation signal was observed at a suspension point.
    Cancelled,
    /// The source/sink can't be rewound or doesn't know its length up front.
    ///
    /// Surfaced to callers as [`B2ErrorKind::BadRequest`] (SPEC_FULL.md §4.4 step 1), but
    /// classified distinctly so the hash policy can fail fast instead of attempting a
    /// rewind it knows is impossible.
    NonSeekableStream,
}

impl B2ErrorMessage {
    /// Classifies a service error envelope per SPEC_FULL.md §4.1.
    pub fn classify(&self) -> B2ErrorKind {
        match self.code.as_str() {
            "bad_auth_token" | "expired_auth_token" => B2ErrorKind::Authentication,
            "bad_digest" => B2ErrorKind::InvalidHash,
            "cap_exceeded" => B2ErrorKind::CapExceeded,
            "not_found" | "file_not_present" => B2ErrorKind::NotFound,
            "duplicate_bucket_name" | "conflict" => B2ErrorKind::Conflict,
            "unauthorized" | "access_denied" => B2ErrorKind::Forbidden,
            _ => match self.status {
                401 => B2ErrorKind::Authentication,
                403 => B2ErrorKind::Forbidden,
                404 => B2ErrorKind::NotFound,
                408 | 429 => B2ErrorKind::Transient,
                409 => B2ErrorKind::Conflict,
                400 => B2ErrorKind::BadRequest,
                s if s >= 500 => B2ErrorKind::Transient,
                _ => B2ErrorKind::BadRequest,
            },
        }
    }
}

/// Operation context attached to a transfer-level failure (SPEC_FULL.md §7).
#[derive(Debug, Clone, Default)]
pub struct TransferContext {
    pub op: &'static str,
    pub attempt: u32,
    pub bucket_id: Option<String>,
    pub file_id: Option<String>,
    pub bytes_transferred: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum B2Error {
    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serde JSON Error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Unknown")]
    Unknown,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("B2 Error Message: {0}")]
    B2ErrorMessage(#[from] B2ErrorMessage),

    #[error("B2 File Header Error: {0}")]
    B2FileHeaderError(#[from] B2FileHeaderError),

    #[error("Missing Bucket ID")]
    MissingBucketId,

    #[error("Missing File Name")]
    MissingFileName,

    #[error("Invalid Part Sorting")]
    InvalidPartSorting,

    #[error("Missing Capability: {0}")]
    MissingCapability(&'static str),

    #[error("locally computed content SHA-1 does not match the value reported by the service")]
    HashMismatch,

    #[error("source cannot be rewound or its length could not be determined")]
    NonSeekableStream,

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context:?}: {source}")]
    Transfer {
        #[source]
        source: Box<B2Error>,
        context: TransferContext,
    },
}

impl B2Error {
    /// Classifies this error per SPEC_FULL.md §4.1, for the policy stack.
    pub fn kind(&self) -> B2ErrorKind {
        match self {
            B2Error::B2ErrorMessage(msg) => msg.classify(),
            B2Error::Unauthorized => B2ErrorKind::Authentication,
            B2Error::HashMismatch => B2ErrorKind::InvalidHash,
            B2Error::NonSeekableStream => B2ErrorKind::NonSeekableStream,
            B2Error::Cancelled => B2ErrorKind::Cancelled,
            B2Error::InvalidPartSorting | B2Error::MissingBucketId | B2Error::MissingFileName => B2ErrorKind::BadRequest,
            B2Error::MissingCapability(_) => B2ErrorKind::Forbidden,
            B2Error::Transfer { source, .. } => source.kind(),
            B2Error::ReqwestError(e) if e.is_timeout() || e.is_connect() => B2ErrorKind::Transient,
            _ => B2ErrorKind::BadRequest,
        }
    }

    /// Wraps this error with operation context, per SPEC_FULL.md §7.
    pub fn with_context(self, context: TransferContext) -> B2Error {
        B2Error::Transfer {
            source: Box::new(self),
            context,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum B2FileHeaderError {
    #[error("Missing Header: {0}")]
    MissingHeader(&'static str),

    #[error("Integer Parse Error: {0}")]
    IntegerParseError(#[from] std::num::ParseIntError),

    #[error("Bool Parse Error")]
    BoolParseError,

    #[error("String error: {0}")]
    ToStrError(#[from] reqwest::header::ToStrError),

    #[error("Invalid Timestamp")]
    InvalidTimestamp,

    #[error("Invalid Retention Mode")]
    InvalidRetentionMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(status: u16, code: &str) -> B2ErrorMessage {
        B2ErrorMessage {
            status,
            code: code.to_owned(),
            message: "x".into(),
        }
    }

    #[test]
    fn classifies_auth_errors() {
        assert_eq!(msg(401, "bad_auth_token").classify(), B2ErrorKind::Authentication);
        assert_eq!(msg(401, "expired_auth_token").classify(), B2ErrorKind::Authentication);
        assert_eq!(msg(401, "").classify(), B2ErrorKind::Authentication);
    }

    #[test]
    fn classifies_hash_mismatch() {
        assert_eq!(msg(400, "bad_digest").classify(), B2ErrorKind::InvalidHash);
    }

    #[test]
    fn classifies_transient_status_codes() {
        for status in [408, 429, 500, 503, 599] {
            assert_eq!(msg(status, "").classify(), B2ErrorKind::Transient, "status {status}");
        }
    }

    #[test]
    fn classifies_not_found() {
        assert_eq!(msg(404, "").classify(), B2ErrorKind::NotFound);
        assert_eq!(msg(400, "file_not_present").classify(), B2ErrorKind::NotFound);
    }

    #[test]
    fn transfer_context_preserves_inner_kind() {
        let err = B2Error::from(msg(401, "expired_auth_token")).with_context(TransferContext {
            op: "b2_upload_part",
            attempt: 2,
            bucket_id: None,
            file_id: Some("f1".into()),
            bytes_transferred: 1024,
        });

        assert_eq!(err.kind(), B2ErrorKind::Authentication);
    }
}

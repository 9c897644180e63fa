//! Error types for ipfs-pinner.
//!
//! A single taxonomy is shared by every crate. Adapter errors are wrapped with
//! the backend name through [`PinnerError::Backend`] without changing their
//! [`ErrorKind`].

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Pinner;

/// Result type alias using `PinnerError`.
pub type Result<T> = std::result::Result<T, PinnerError>;

/// Main error type for all pinning operations.
#[derive(Debug, Error)]
pub enum PinnerError {
    // ═══════════════════════════════════════════════════════════════════════════
    // LOCAL VALIDATION ERRORS (never reach the network)
    // ═══════════════════════════════════════════════════════════════════════════

    /// Local path does not exist.
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    /// Path is neither a regular file nor a directory.
    #[error("unrecognized file type for {}: {kind}", .path.display())]
    UnsupportedFileType { path: PathBuf, kind: String },

    /// A node was built from a directory without any regular file.
    #[error("node is empty: {}", .0.display())]
    EmptyNode(PathBuf),

    /// Configuration names a backend without an adapter.
    #[error("unsupported pinner: {0}")]
    UnsupportedPinner(String),

    /// Operation is unavailable for the chosen backend.
    #[error("{operation} is not supported by {pinner}")]
    NotSupported {
        pinner: Pinner,
        operation: &'static str,
    },

    /// Backend requires credentials that were not supplied.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Pin-by-hash argument is not a valid CID.
    #[error("invalid hash '{0}'")]
    InvalidHash(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // REMOTE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Backend rejected the credentials (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Backend kept answering 429 after the retry budget.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Network failure or 5xx after the retry budget.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Backend answered with a well-formed error payload or a 4xx status.
    #[error("rejected by backend: {0}")]
    BackendRejected(String),

    /// Response body did not parse or lacked the expected field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // LOCAL I/O ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Invalid multipart part, or a one-shot part encoded twice.
    #[error("multipart error: {0}")]
    Multipart(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request could not be built.
    #[error("HTTP request failed: {0}")]
    Http(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTEXT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Adapter error prefixed with the backend identifier.
    #[error("{pinner}: {source}")]
    Backend {
        pinner: Pinner,
        #[source]
        source: Box<PinnerError>,
    },
}

/// Classification of a [`PinnerError`], stable across backend wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ErrorKind {
    NotFound,
    UnsupportedFileType,
    EmptyNode,
    UnsupportedPinner,
    NotSupported,
    MissingCredentials,
    InvalidHash,
    Unauthorized,
    RateLimited,
    Transient,
    BackendRejected,
    MalformedResponse,
    Multipart,
    Io,
    Http,
}

impl PinnerError {
    /// Returns the kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PinnerError::NotFound(_) => ErrorKind::NotFound,
            PinnerError::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            PinnerError::EmptyNode(_) => ErrorKind::EmptyNode,
            PinnerError::UnsupportedPinner(_) => ErrorKind::UnsupportedPinner,
            PinnerError::NotSupported { .. } => ErrorKind::NotSupported,
            PinnerError::MissingCredentials(_) => ErrorKind::MissingCredentials,
            PinnerError::InvalidHash(_) => ErrorKind::InvalidHash,
            PinnerError::Unauthorized(_) => ErrorKind::Unauthorized,
            PinnerError::RateLimited(_) => ErrorKind::RateLimited,
            PinnerError::Transient(_) => ErrorKind::Transient,
            PinnerError::BackendRejected(_) => ErrorKind::BackendRejected,
            PinnerError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            PinnerError::Multipart(_) => ErrorKind::Multipart,
            PinnerError::Io(_) => ErrorKind::Io,
            PinnerError::Http(_) => ErrorKind::Http,
            PinnerError::Backend { source, .. } => source.kind(),
        }
    }

    /// Prefixes the error with the backend it came from.
    ///
    /// Already wrapped errors are returned unchanged.
    pub fn with_pinner(self, pinner: Pinner) -> Self {
        match self {
            wrapped @ PinnerError::Backend { .. } => wrapped,
            other => PinnerError::Backend {
                pinner,
                source: Box::new(other),
            },
        }
    }

    /// Maps a non-2xx HTTP status to an error.
    ///
    /// `status_text` is surfaced verbatim, e.g. `"401 Unauthorized"`.
    pub fn from_status(code: u16, status_text: impl Into<String>) -> Self {
        let text = status_text.into();
        match code {
            401 | 403 => PinnerError::Unauthorized(text),
            429 => PinnerError::RateLimited(text),
            500..=599 => PinnerError::Transient(text),
            _ => PinnerError::BackendRejected(text),
        }
    }

    /// Maps a JSON decoding failure of `body` to `MalformedResponse`.
    ///
    /// Syntax errors report the byte offset at which decoding stopped.
    pub fn from_json(err: serde_json::Error, body: &[u8]) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof => PinnerError::MalformedResponse(format!(
                "json syntax error at byte offset {}",
                byte_offset(body, err.line(), err.column())
            )),
            _ => PinnerError::MalformedResponse(err.to_string()),
        }
    }

    /// Returns true if the error was recovered locally before surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Transient)
    }

    /// Returns true if the error was raised without contacting a backend.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::UnsupportedFileType
                | ErrorKind::EmptyNode
                | ErrorKind::UnsupportedPinner
                | ErrorKind::NotSupported
                | ErrorKind::MissingCredentials
                | ErrorKind::InvalidHash
        )
    }
}

/// Converts serde_json's 1-based line/column into a byte offset within `body`.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split_inclusive(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(<[u8]>::len)
        .sum();
    (line_start + column).min(body.len())
}

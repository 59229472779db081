//! Storage Error Types
//!
//! Probe failures are raised as `exn` errors so that the transport error
//! (I/O, HTTP client) stays attached as a child frame.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing exists at the location
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Connection, DNS or timeout failure talking to a remote host
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote answered with a non-success status code
    #[display("{location} responded with HTTP {code}")]
    Status { location: String, code: u16 },
    /// The remote answered, but without usable size or checksum
    #[display("malformed response from {location}: {reason}")]
    MalformedResponse { location: String, reason: String },
    /// The location cannot be handled by this probe
    #[display("invalid location: {_0}")]
    InvalidLocation(#[error(not(source))] String),
    /// A blocking probe task panicked or was cancelled
    #[display("probe task interrupted")]
    Interrupted,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Network(_) | Self::Interrupted => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

//! Cache Error Types

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("cache file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The file exists but cannot be trusted. Never repaired automatically.
    #[display("corrupt cache: {_0}")]
    Corrupt(#[error(not(source))] String),
    /// An entry has no filename yet, so it cannot be written.
    #[display("entry has unassigned placeholders: {_0}")]
    Incomplete(#[error(not(source))] String),
    #[display("could not serialize cache")]
    Serialize,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

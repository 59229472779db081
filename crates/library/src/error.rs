//! Library Error Types
//!
//! Structural errors (bad templates, misuse of `expand`, unbound entries)
//! surface immediately. Per-entry probe failures are data, recorded on the
//! entry, unless the caller asked to stop on the first one.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid template")]
    Template,
    /// The placeholder was already assigned by an earlier expansion or
    /// earlier in the same call.
    #[display("placeholder `{_0}` is already assigned")]
    DuplicatePlaceholder(#[error(not(source))] String),
    #[display("template has no placeholder `{_0}`")]
    UnknownPlaceholder(#[error(not(source))] String),
    /// Some entries still have placeholders without values.
    #[display("unexpanded placeholders: {_0}")]
    Unexpanded(#[error(not(source))] String),
    #[display("templates differ: `{left}` vs `{right}`")]
    TemplateMismatch { left: String, right: String },
    /// No base directory is bound, so there is nothing to probe.
    #[display("no location bound for `{_0}`")]
    Unbound(#[error(not(source))] String),
    #[display("fetch aborted at `{filename}`: {reason}")]
    FetchAborted { filename: String, reason: String },
    #[display("metadata for `{filename}` is {status}")]
    UnresolvedMetadata { filename: String, status: String },
    #[display("total size does not fit in 64 bits")]
    SizeOverflow,
    #[display("duplicate filename `{_0}`")]
    DuplicateFilename(#[error(not(source))] String),
    #[display("unknown match field `{_0}`")]
    UnknownField(#[error(not(source))] String),
    #[display("invalid date: {_0}")]
    InvalidDate(#[error(not(source))] String),
    /// The delta would never move past the start date.
    #[display("invalid date delta: {_0}")]
    InvalidDelta(#[error(not(source))] String),
    #[display("cache error")]
    Cache,
    #[display("could not start async runtime")]
    Runtime,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchAborted { .. } | Self::Runtime)
    }
}

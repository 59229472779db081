//! Template Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, shared by parsing, formatting and extraction.

use derive_more::{Display, Error};

/// A template error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Everything here is a caller error: fix the pattern or the values, don't
/// retry.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The pattern has an empty, invalid or duplicated placeholder name, or
    /// unbalanced braces.
    #[display("malformed template `{pattern}`: {reason}")]
    Malformed { pattern: String, reason: String },
    /// Two placeholders touch without a literal between them, so a formatted
    /// name could not be split back into its values.
    #[display("ambiguous template: placeholders `{left}` and `{right}` have no separator")]
    Ambiguous { left: String, right: String },
    /// A value required by the template was not supplied.
    #[display("missing value for placeholder `{_0}`")]
    MissingValue(#[error(not(source))] String),
    /// The string given to extract does not follow the template.
    #[display("`{_0}` does not match the template")]
    NoMatch(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::MissingValue("var".to_string()).to_string(), "missing value for placeholder `var`");
        assert_eq!(
            ErrorKind::Ambiguous { left: "a".to_string(), right: "b".to_string() }.to_string(),
            "ambiguous template: placeholders `a` and `b` have no separator"
        );
        assert_eq!(ErrorKind::NoMatch("x.tif".to_string()).to_string(), "`x.tif` does not match the template");
    }
}

//! Filename templating with `{name}` placeholders.
//!
//! The pattern syntax is deliberately tiny: literal text with placeholders
//! enclosed in braces. A placeholder name starts with an ASCII letter or an
//! underscore, followed by ASCII letters, digits or underscores.
//!
//! # Example
//!
//! ```
//! use sheaf_template::{Properties, Template};
//!
//! let template: Template = "wv_{variable}_{start_date}.tif".parse().unwrap();
//! let properties = Properties::from([("variable", "ndvi"), ("start_date", "20000101")]);
//!
//! let filename = template.format(&properties).unwrap();
//! assert_eq!(filename, "wv_ndvi_20000101.tif");
//! assert_eq!(template.extract(&filename).unwrap(), properties);
//! ```

use crate::Properties;
use crate::error::{Error, ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed filename template.
///
/// Constructed via [`FromStr`], which validates the pattern and compiles the
/// extraction matcher eagerly so that malformed or ambiguous patterns fail at
/// creation time rather than silently mis-splitting names later. Two templates
/// are equal when their parsed segments are equal.
#[derive(Debug, Clone)]
pub struct Template {
    pattern: String,
    segments: Vec<Segment>,
    matcher: Regex,
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(pattern: &str) -> std::result::Result<Self, Self::Err> {
        let segments = parse_segments(pattern)?;
        let matcher = compile(&segments).or_raise(|| ErrorKind::Malformed {
            pattern: pattern.to_string(),
            reason: "could not build matcher".to_string(),
        })?;
        tracing::trace!(pattern, placeholders = segments.len(), "compiled template");
        Ok(Self { pattern: pattern.to_string(), segments, matcher })
    }
}

impl Template {
    /// The pattern string this template was parsed from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in the order they appear in the pattern.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Placeholders that `properties` does not supply a value for.
    pub fn missing<'a>(&'a self, properties: &'a Properties) -> impl Iterator<Item = &'a str> {
        self.placeholders().filter(|name| !properties.contains(name))
    }

    /// Substitutes every placeholder with its value from `properties`.
    ///
    /// Keys the template does not use are ignored.
    pub fn format(&self, properties: &Properties) -> Result<String> {
        let mut out = String::with_capacity(self.pattern.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Placeholder(name) => {
                    let value = properties.get(name).ok_or_raise(|| ErrorKind::MissingValue(name.clone()))?;
                    out.push_str(value);
                },
            }
        }
        Ok(out)
    }

    /// Recovers the placeholder values from a string rendered by
    /// [`format`](Self::format), in template order.
    ///
    /// Literal segments must match exactly. Each placeholder captures the
    /// shortest run of characters that still lets the rest of the name match,
    /// left to right. When a value may itself contain the separator that
    /// follows it, earlier placeholders stay short and the last one absorbs
    /// the rest: `{var}_{date}.tif` splits `wv_ndvi_20000101.tif` into
    /// `var = "wv"` and `date = "ndvi_20000101"`.
    pub fn extract(&self, filename: &str) -> Result<Properties> {
        let captures = self.matcher.captures(filename).ok_or_raise(|| ErrorKind::NoMatch(filename.to_string()))?;
        Ok(self
            .placeholders()
            .zip(captures.iter().skip(1))
            .map(|(name, value)| (name, value.map(|m| m.as_str()).unwrap_or_default()))
            .collect())
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}
impl Eq for Template {}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn malformed(pattern: &str, reason: impl Into<String>) -> ErrorKind {
    ErrorKind::Malformed { pattern: pattern.to_string(), reason: reason.into() }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_segments(pattern: &str) -> Result<Vec<Segment>> {
    if pattern.trim().is_empty() {
        exn::bail!(malformed(pattern, "pattern is empty"));
    }
    let mut segments: Vec<Segment> = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices();
    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => {
                            exn::bail!(malformed(pattern, format!("unclosed brace at offset {position}")))
                        },
                        Some((_, c)) => name.push(c),
                    }
                }
                if name.is_empty() {
                    exn::bail!(malformed(pattern, format!("empty placeholder at offset {position}")));
                }
                if !is_valid_name(&name) {
                    exn::bail!(malformed(pattern, format!("invalid placeholder name `{name}`")));
                }
                if segments.iter().any(|s| matches!(s, Segment::Placeholder(n) if *n == name)) {
                    exn::bail!(malformed(pattern, format!("duplicate placeholder `{name}`")));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                } else if let Some(Segment::Placeholder(left)) = segments.last() {
                    exn::bail!(ErrorKind::Ambiguous { left: left.clone(), right: name });
                }
                segments.push(Segment::Placeholder(name));
            },
            '}' => exn::bail!(malformed(pattern, format!("unmatched closing brace at offset {position}"))),
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Literal segments become exact anchors, placeholders non-greedy captures.
fn compile(segments: &[Segment]) -> std::result::Result<Regex, regex::Error> {
    let mut expression = String::from("(?s)^");
    for segment in segments {
        match segment {
            Segment::Literal(literal) => expression.push_str(&regex::escape(literal)),
            Segment::Placeholder(_) => expression.push_str("(.*?)"),
        }
    }
    expression.push('$');
    Regex::new(&expression)
}

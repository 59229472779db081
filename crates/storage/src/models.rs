//! Entry models.
//!
//! A [`FileEntry`] is one concrete file of a templated list: its placeholder
//! values, the name and location derived from them, and whatever metadata a
//! probe has reported so far.

use sheaf_template::Properties;
use std::borrow::Cow;
use std::fmt;

/// Outcome of probing an entry's location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    /// Never probed.
    #[default]
    Unresolved,
    Ok,
    /// Probed, and the probe failed with the given reason.
    Error(String),
}

impl Status {
    /// The lowercase label used in cache files.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Ok => "ok",
            Self::Error(_) => "error",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(reason) => write!(f, "error: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Size and checksum as reported by the remote provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub status: Status,
}

impl Metadata {
    pub fn ok(size: u64, checksum: impl Into<String>) -> Self {
        Self { size: Some(size), checksum: Some(checksum.into()), status: Status::Ok }
    }

    /// A failed probe. Size and checksum are cleared so that stale values
    /// never survive next to an error.
    pub fn error(reason: impl Into<String>) -> Self {
        Self { size: None, checksum: None, status: Status::Error(reason.into()) }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Metadata for a single location, as returned by a [`Probe`](crate::Probe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    pub size: u64,
    pub checksum: String,
}

impl From<RemoteMeta> for Metadata {
    fn from(remote: RemoteMeta) -> Self {
        Self::ok(remote.size, remote.checksum)
    }
}

/// One concrete file.
///
/// `filename` is only set once every placeholder of the owning template has a
/// value; `url` only once a base directory is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    pub properties: Properties,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub metadata: Metadata,
}

/// Attribute names that [`FileEntry::get`] resolves before properties.
pub const BUILTIN_ATTRIBUTES: [&str; 4] = ["filename", "size", "checksum", "url"];

impl FileEntry {
    pub fn new(properties: Properties) -> Self {
        Self { properties, ..Self::default() }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata.size
    }

    pub fn checksum(&self) -> Option<&str> {
        self.metadata.checksum.as_deref()
    }

    pub fn status(&self) -> &Status {
        &self.metadata.status
    }

    pub fn is_ok(&self) -> bool {
        self.metadata.is_ok()
    }

    /// Looks up an attribute by name.
    ///
    /// The built-ins `filename`, `size`, `checksum` and `url` shadow any
    /// property of the same name; everything else comes from the properties.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "filename" => self.filename().map(Cow::Borrowed),
            "size" => self.size().map(|size| Cow::Owned(size.to_string())),
            "checksum" => self.checksum().map(Cow::Borrowed),
            "url" => self.url().map(Cow::Borrowed),
            _ => self.properties.get(key).map(Cow::Borrowed),
        }
    }

    /// The location to probe or list: the bound URL, else the bare filename.
    pub fn path(&self) -> Option<&str> {
        self.url().or_else(|| self.filename())
    }
}

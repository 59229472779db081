//! The [`FileList`] aggregate.

use crate::error::{ErrorKind, Result};
use crate::expand::Step;
use exn::ResultExt;
use sheaf_cache::{CacheStore, Snapshot};
use sheaf_storage::{FileEntry, join_location};
use sheaf_template::{Properties, Template};
use std::path::Path;

/// An ordered collection of [`FileEntry`] values generated from one
/// [`Template`].
///
/// Every operation returns a new list; the receiver is never modified.
///
/// # Example
///
/// ```
/// use sheaf_library::{FileList, Values};
///
/// # fn main() -> sheaf_library::error::Result<()> {
/// let list = FileList::from_template("{var}_{year}.tif")?
///     .expand([("var", Values::from(["ndvi", "evi"]))])?
///     .expand([("year", Values::from(["2000", "2001", "2002"]))])?
///     .set_dir("https://example.org/data");
///
/// assert_eq!(list.len(), 6);
/// assert_eq!(list.path_list()?[1], "https://example.org/data/ndvi_2001.tif");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList {
    pub(crate) template: Template,
    pub(crate) dir: Option<String>,
    pub(crate) entries: Vec<FileEntry>,
    pub(crate) steps: Vec<Step>,
}

impl FileList {
    /// An empty list for an already parsed template.
    pub fn new(template: Template) -> Self {
        Self { template, dir: None, entries: Vec::new(), steps: Vec::new() }
    }

    pub fn from_template(pattern: &str) -> Result<Self> {
        let template = pattern.parse::<Template>().or_raise(|| ErrorKind::Template)?;
        Ok(Self::new(template))
    }

    /// Loads a list previously written by [`cache`](Self::cache).
    pub fn from_cache(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = CacheStore::new(path.as_ref()).load().or_raise(|| ErrorKind::Cache)?;
        Ok(Self::from(snapshot))
    }

    /// Builds a list from names that already exist, recovering each entry's
    /// properties from its filename.
    pub fn from_filenames<I, S>(template: Template, filenames: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filenames: Vec<String> = filenames.into_iter().map(Into::into).collect();
        let mut list = Self::new(template);
        list.entries = filenames
            .iter()
            .map(|filename| {
                let properties = list.template.extract(filename).or_raise(|| ErrorKind::Template)?;
                Ok(list.complete(properties))
            })
            .collect::<Result<_>>()?;
        list.steps.push(Step::Import(filenames));
        Ok(list)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn dir(&self) -> Option<&str> {
        self.dir.as_deref()
    }

    /// Expansion history, oldest first.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Binds a base directory (URL or path); every complete entry's `url`
    /// becomes `dir` joined with its filename. An empty `dir` unbinds.
    pub fn set_dir(&self, dir: impl Into<String>) -> Self {
        let dir = Some(dir.into()).filter(|dir| !dir.is_empty());
        let mut list = self.clone();
        list.dir = dir;
        for entry in &mut list.entries {
            entry.url = list.dir.as_deref().zip(entry.filename()).map(|(dir, name)| join_location(dir, name));
        }
        list
    }

    /// Concatenates `other`'s entries after this list's.
    ///
    /// The templates must be structurally equal. The result keeps this list's
    /// directory, or `other`'s if this one has none, and rebinds every entry
    /// to it.
    pub fn merge(&self, other: &FileList) -> Result<Self> {
        if self.template != other.template {
            exn::bail!(ErrorKind::TemplateMismatch {
                left: self.template.pattern().to_string(),
                right: other.template.pattern().to_string(),
            });
        }
        let mut merged = self.clone();
        merged.entries.extend(other.entries.iter().cloned());
        merged.steps.push(Step::Merge(other.history()));
        let dir = self.dir.clone().or_else(|| other.dir.clone()).unwrap_or_default();
        Ok(merged.set_dir(dir))
    }

    /// Rewrites every entry's location with `f`, e.g. to append a query
    /// string a download endpoint needs.
    ///
    /// `f` receives the current URL, or the bare filename on an unbound list.
    /// Fails with [`Unexpanded`](ErrorKind::Unexpanded) while any placeholder
    /// is unfilled. [`set_dir`](Self::set_dir),
    /// [`merge`](Self::merge) and [`expand`](Self::expand) recompute URLs from
    /// the directory, so apply this last.
    ///
    /// ```
    /// use sheaf_library::{FileList, Values};
    ///
    /// # fn main() -> sheaf_library::error::Result<()> {
    /// let list = FileList::from_template("{var}.tif")?
    ///     .expand([("var", Values::from(["ndvi"]))])?
    ///     .set_dir("https://example.org/files")
    ///     .modify_url(|url| format!("{url}?download=1"))?;
    ///
    /// assert_eq!(list[0].url(), Some("https://example.org/files/ndvi.tif?download=1"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn modify_url(&self, f: impl Fn(&str) -> String) -> Result<Self> {
        self.ensure_complete()?;
        let mut list = self.clone();
        for entry in &mut list.entries {
            entry.url = entry.path().map(&f);
        }
        Ok(list)
    }

    /// `true` once every entry has a value for every placeholder.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|entry| entry.filename.is_some())
    }

    /// Fails with [`Unexpanded`](ErrorKind::Unexpanded) naming the
    /// placeholders still missing from the first incomplete entry.
    pub fn ensure_complete(&self) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|entry| entry.filename.is_none()) {
            let missing: Vec<&str> = self.template.missing(&entry.properties).collect();
            exn::bail!(ErrorKind::Unexpanded(missing.join(", ")));
        }
        Ok(())
    }

    /// A copy of this list's state in the form the cache stores it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { template: self.template.clone(), dir: self.dir.clone(), entries: self.entries.clone() }
    }

    /// Steps that rebuild this list's entries. Lists loaded from a cache carry
    /// no expansion history, so their filenames stand in for it.
    fn history(&self) -> Vec<Step> {
        if self.steps.is_empty() && !self.entries.is_empty() {
            return vec![Step::Import(filenames(&self.entries))];
        }
        self.steps.clone()
    }

    /// Same template, directory and history, different entries.
    pub(crate) fn with_entries(&self, entries: Vec<FileEntry>) -> Self {
        Self { template: self.template.clone(), dir: self.dir.clone(), entries, steps: self.steps.clone() }
    }

    /// Turns properties into an entry, deriving filename and URL when every
    /// placeholder has a value. Properties are reordered to template order.
    pub(crate) fn complete(&self, properties: Properties) -> FileEntry {
        let properties: Properties = self
            .template
            .placeholders()
            .filter_map(|name| properties.get(name).map(|value| (name, value)))
            .collect();
        let filename = self.template.format(&properties).ok();
        let url = self.dir.as_deref().zip(filename.as_deref()).map(|(dir, name)| join_location(dir, name));
        FileEntry { properties, filename, url, ..FileEntry::default() }
    }
}

impl From<Snapshot> for FileList {
    fn from(snapshot: Snapshot) -> Self {
        let steps = vec![Step::Import(filenames(&snapshot.entries))];
        Self { template: snapshot.template, dir: snapshot.dir, entries: snapshot.entries, steps }
    }
}

fn filenames(entries: &[FileEntry]) -> Vec<String> {
    entries.iter().filter_map(FileEntry::filename).map(str::to_string).collect()
}

impl std::ops::Index<usize> for FileList {
    type Output = FileEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for FileList {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

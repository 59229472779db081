//! Filtering and reconciliation against reference collections.

use crate::FileList;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use serde::{Deserialize, Deserializer, Serialize};
use sheaf_storage::{FileEntry, normalize_checksum};
use sheaf_template::Properties;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// The attribute two records are compared on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Field {
    Filename,
    /// Content-based comparison.
    #[default]
    Checksum,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Filename => "filename",
            Self::Checksum => "checksum",
        })
    }
}

impl FromStr for Field {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "filename" => Ok(Self::Filename),
            "checksum" => Ok(Self::Checksum),
            other => exn::bail!(ErrorKind::UnknownField(other.to_string())),
        }
    }
}

/// Anything that can be matched against on a [`Field`].
///
/// `None` means the record has no value for the field; such records never
/// match anything.
pub trait Record {
    fn field(&self, field: Field) -> Option<&str>;
}

impl Record for FileEntry {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Filename => self.filename(),
            Field::Checksum => self.checksum(),
        }
    }
}

impl<T: Record + ?Sized> Record for &T {
    fn field(&self, field: Field) -> Option<&str> {
        (**self).field(field)
    }
}

/// A file already present on a remote deposition.
///
/// `checksum` is kept in canonical form (`md5:<hex>`), whether it arrives as
/// `md5:...`, bare hex or base64; both [`new`](Self::new) and deserialization
/// normalize it so it compares equal to fetched checksums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub filename: String,
    #[serde(deserialize_with = "canonical_checksum")]
    pub checksum: String,
    pub size: u64,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, checksum: &str, size: u64) -> Self {
        Self { id: id.into(), filename: filename.into(), checksum: normalize_checksum(checksum), size }
    }
}

fn canonical_checksum<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    String::deserialize(deserializer).map(|raw| normalize_checksum(&raw))
}

impl Record for RemoteFile {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Filename => Some(&self.filename),
            Field::Checksum => Some(&self.checksum),
        }
    }
}

impl FileList {
    /// Keeps the entries for which `predicate` holds, in order.
    ///
    /// Use [`FileEntry::get`] inside the predicate to read properties and the
    /// built-in `filename`, `size`, `checksum` and `url` attributes.
    ///
    /// ```
    /// use sheaf_library::{FileList, Values};
    ///
    /// # fn main() -> sheaf_library::error::Result<()> {
    /// let list = FileList::from_template("{var}_{year}.tif")?
    ///     .expand([("var", Values::from(["ndvi", "evi"])), ("year", Values::from(["2000", "2001"]))])?;
    /// let evi = list.filter(|entry| entry.get("var").as_deref() == Some("evi"));
    /// assert_eq!(evi.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter(&self, predicate: impl Fn(&FileEntry) -> bool) -> Self {
        self.with_entries(self.entries.iter().filter(|entry| predicate(entry)).cloned().collect())
    }

    /// Entries whose `field` value occurs in `reference`.
    pub fn filter_matched<R: Record>(&self, reference: impl IntoIterator<Item = R>, field: Field) -> Self {
        self.partition(reference, field).0
    }

    /// Entries whose `field` value is absent, or does not occur in `reference`.
    pub fn filter_unmatched<R: Record>(&self, reference: impl IntoIterator<Item = R>, field: Field) -> Self {
        self.partition(reference, field).1
    }

    /// Splits the list into `(matched, unmatched)` in one pass. Together the
    /// two halves hold every entry exactly once, each in list order.
    pub fn partition<R: Record>(&self, reference: impl IntoIterator<Item = R>, field: Field) -> (Self, Self) {
        let keys: HashSet<String> =
            reference.into_iter().filter_map(|record| record.field(field).map(str::to_string)).collect();
        let (matched, unmatched): (Vec<FileEntry>, Vec<FileEntry>) = self
            .entries
            .iter()
            .cloned()
            .partition(|entry| entry.field(field).is_some_and(|value| keys.contains(value)));
        tracing::debug!(%field, matched = matched.len(), unmatched = unmatched.len(), "reconciled");
        (self.with_entries(matched), self.with_entries(unmatched))
    }

    /// Total size of all entries.
    ///
    /// # Errors
    /// - [`UnresolvedMetadata`](ErrorKind::UnresolvedMetadata) naming the first
    ///   entry that is not `ok`. Unresolved entries are never counted as zero.
    /// - [`SizeOverflow`](ErrorKind::SizeOverflow) if the total exceeds `u64`.
    pub fn data_size(&self) -> Result<u64> {
        self.entries.iter().try_fold(0u64, |total, entry| match entry.size() {
            Some(size) if entry.is_ok() => total.checked_add(size).ok_or_raise(|| ErrorKind::SizeOverflow),
            _ => exn::bail!(ErrorKind::UnresolvedMetadata {
                filename: entry.filename().unwrap_or_default().to_string(),
                status: entry.status().to_string(),
            }),
        })
    }

    /// The location of every entry in order: its URL, or the bare filename
    /// when no directory is bound.
    pub fn path_list(&self) -> Result<Vec<String>> {
        self.ensure_complete()?;
        Ok(self.entries.iter().filter_map(FileEntry::path).map(str::to_string).collect())
    }

    /// Property names across all entries, in first-seen order.
    pub fn property_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .flat_map(|entry| entry.properties.keys())
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect()
    }

    /// `{name}_min` and `{name}_max` over the non-empty values of each
    /// property, compared as strings. `names` defaults to
    /// [`property_names`](Self::property_names); names without any value are
    /// left out.
    pub fn summary(&self, names: Option<&[&str]>) -> Properties {
        let all = self.property_names();
        let names: Vec<&str> = match names {
            Some(names) => names.to_vec(),
            None => all.iter().map(String::as_str).collect(),
        };
        let mut summary = Properties::new();
        for name in names {
            let values = || self.entries.iter().filter_map(|entry| entry.properties.get(name)).filter(|v| !v.is_empty());
            if let (Some(min), Some(max)) = (values().min(), values().max()) {
                summary.insert(format!("{name}_min"), min);
                summary.insert(format!("{name}_max"), max);
            }
        }
        summary
    }

    /// Filenames occurring more than once, in order of first occurrence.
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.entries
            .iter()
            .filter_map(FileEntry::filename)
            .filter(|name| !seen.insert(*name) && reported.insert(*name))
            .collect()
    }

    /// Fails with [`DuplicateFilename`](ErrorKind::DuplicateFilename) on the
    /// first repeated filename.
    pub fn ensure_unique(&self) -> Result<()> {
        match self.duplicates().first() {
            Some(name) => exn::bail!(ErrorKind::DuplicateFilename(name.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Values;
    use rstest::rstest;
    use sheaf_storage::Metadata;

    /// `f0.bin` .. `f{n-1}.bin`, with `f{i}` resolved to size `i` and
    /// checksum `c{i}` unless listed in `failed`.
    fn resolved(n: usize, failed: &[usize]) -> FileList {
        let list = FileList::from_template("f{i}.bin").unwrap().expand([("i", Values::list(0..n))]).unwrap();
        let entries = list
            .iter()
            .enumerate()
            .map(|(i, entry)| FileEntry {
                metadata: if failed.contains(&i) {
                    Metadata::error("HTTP 500")
                } else {
                    Metadata::ok(i as u64, format!("c{i}"))
                },
                ..entry.clone()
            })
            .collect();
        list.with_entries(entries)
    }

    fn remote(filename: &str, checksum: &str) -> RemoteFile {
        RemoteFile { id: format!("id-{filename}"), filename: filename.to_string(), checksum: checksum.to_string(), size: 1 }
    }

    fn filenames(list: &FileList) -> Vec<&str> {
        list.iter().filter_map(FileEntry::filename).collect()
    }

    #[rstest]
    #[case("filename", Field::Filename)]
    #[case("checksum", Field::Checksum)]
    fn test_field_parse(#[case] raw: &str, #[case] field: Field) {
        assert_eq!(raw.parse::<Field>().unwrap(), field);
        assert_eq!(field.to_string(), raw);
    }

    #[test]
    fn test_field_parse_unknown() {
        let err = "size".parse::<Field>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownField(_)));
    }

    #[test]
    fn test_remote_files_from_json() {
        let json = r#"[{"id": "17", "filename": "f1.bin", "checksum": "c1", "size": 1}]"#;
        let reference: Vec<RemoteFile> = serde_json::from_str(json).unwrap();
        let list = resolved(3, &[]);
        assert_eq!(filenames(&list.filter_matched(&reference, Field::default())), ["f1.bin"]);
    }

    #[tokio::test]
    async fn test_local_files_match_deposited_checksums() {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in [("f0.bin", "hello"), ("f1.bin", "hello"), ("f2.bin", "bye")] {
            std::fs::write(dir.path().join(name), data).unwrap();
        }
        let probe: sheaf_storage::ProbeHandle = std::sync::Arc::new(sheaf_storage::LocalProbe::new());
        let local = FileList::from_template("f{i}.bin")
            .unwrap()
            .expand([("i", Values::list(0..3))])
            .unwrap()
            .set_dir(dir.path().to_str().unwrap())
            .fetch(&probe, crate::FetchOptions::default(), |_| {})
            .await
            .unwrap();

        // Deposition records spell MD5 as `md5:<hex>`.
        let json = r#"[{"id": "1", "filename": "a.bin", "checksum": "md5:5D41402ABC4B2A76B9719D911017C592", "size": 5}]"#;
        let deposited: Vec<RemoteFile> = serde_json::from_str(json).unwrap();
        let (matched, unmatched) = local.partition(&deposited, Field::Checksum);
        assert_eq!(filenames(&matched), ["f0.bin", "f1.bin"]);
        assert_eq!(filenames(&unmatched), ["f2.bin"]);

        // Bare hex and RFC 1864 base64 as HTTP servers report them.
        for checksum in ["5d41402abc4b2a76b9719d911017c592", "XUFAKrxLKna5cZ2REBfFkg=="] {
            let reference = [RemoteFile::new("2", "a.bin", checksum, 5)];
            assert_eq!(local.filter_matched(&reference, Field::Checksum), matched);
        }
    }

    #[test]
    fn test_data_size_overflow() {
        let list = resolved(2, &[]);
        let entries = list.iter().map(|entry| FileEntry { metadata: Metadata::ok(u64::MAX, "c"), ..entry.clone() }).collect();
        let err = list.with_entries(entries).data_size().unwrap_err();
        assert!(matches!(&*err, ErrorKind::SizeOverflow));
    }

    #[test]
    fn test_matched_and_unmatched_cover_the_list() {
        let list = resolved(6, &[4]);
        let reference = [remote("f0.bin", "c0"), remote("f2.bin", "c2"), remote("elsewhere.bin", "c5")];
        let (matched, unmatched) = list.partition(&reference, Field::Checksum);
        assert_eq!(filenames(&matched), ["f0.bin", "f2.bin", "f5.bin"]);
        assert_eq!(filenames(&unmatched), ["f1.bin", "f3.bin", "f4.bin"]);
        assert_eq!(list.filter_matched(&reference, Field::Checksum), matched);
        assert_eq!(list.filter_unmatched(&reference, Field::Checksum), unmatched);
    }

    #[test]
    fn test_name_and_checksum_can_disagree() {
        let list = resolved(2, &[]);
        // Same name, different content: a changed file.
        let reference = [remote("f1.bin", "stale")];
        assert_eq!(filenames(&list.filter_matched(&reference, Field::Filename)), ["f1.bin"]);
        assert!(list.filter_matched(&reference, Field::Checksum).is_empty());
    }

    #[test]
    fn test_entries_without_checksum_never_match() {
        let list = resolved(3, &[1]);
        let (matched, unmatched) = list.partition(list.iter(), Field::Checksum);
        assert_eq!(filenames(&matched), ["f0.bin", "f2.bin"]);
        assert_eq!(filenames(&unmatched), ["f1.bin"]);
    }

    #[test]
    fn test_file_list_as_reference() {
        let list = resolved(4, &[]);
        let reference = list.filter(|entry| entry.size().is_some_and(|size| size % 2 == 0));
        assert_eq!(filenames(&list.filter_matched(&reference, Field::Filename)), ["f0.bin", "f2.bin"]);
    }

    #[test]
    fn test_filter_sees_builtins_and_properties() {
        let list = resolved(4, &[]);
        let kept = list.filter(|e| e.get("i").as_deref() != Some("1") && e.get("checksum").as_deref() != Some("c3"));
        assert_eq!(filenames(&kept), ["f0.bin", "f2.bin"]);
    }

    #[test]
    fn test_data_size_requires_resolved_entries() {
        let list = resolved(5, &[2]);
        let err = list.data_size().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnresolvedMetadata { filename, .. } if filename == "f2.bin"));

        let ok = list.filter(FileEntry::is_ok);
        assert_eq!(ok.data_size().unwrap(), 1 + 3 + 4);
    }

    #[test]
    fn test_path_list() {
        let list = resolved(2, &[]);
        assert_eq!(list.path_list().unwrap(), ["f0.bin", "f1.bin"]);
        assert_eq!(list.set_dir("/mnt/d").path_list().unwrap(), ["/mnt/d/f0.bin", "/mnt/d/f1.bin"]);
    }

    #[test]
    fn test_summary_and_property_names() {
        let list = FileList::from_template("{var}_{date}_{tag}.tif")
            .unwrap()
            .expand([("var", Values::from(["wv", "sw"])), ("date", Values::from(["20000301", "20000101"]))])
            .unwrap()
            .expand([("tag", Values::from(""))])
            .unwrap();
        assert_eq!(list.property_names(), ["var", "date", "tag"]);

        let summary = list.summary(None);
        assert_eq!(summary.get("date_min"), Some("20000101"));
        assert_eq!(summary.get("date_max"), Some("20000301"));
        assert_eq!(summary.get("var_min"), Some("sw"));
        assert!(!summary.contains("tag_min"));
        assert_eq!(list.summary(Some(&["var"])).len(), 2);
    }

    #[test]
    fn test_duplicates() {
        let list = FileList::from_template("{a}.txt").unwrap().expand([("a", ["x", "y", "x", "x", "y"])]).unwrap();
        assert_eq!(list.duplicates(), ["x.txt", "y.txt"]);
        let err = list.ensure_unique().unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateFilename(name) if name == "x.txt"));
        assert!(resolved(3, &[]).ensure_unique().is_ok());
    }
}

use crate::Snapshot;
use crate::error::{ErrorKind, Result};
use crate::models::CacheRecord;
use exn::ResultExt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A cache file at a fixed path.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a reader never observes a half-written cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn map_io_error(&self, e: std::io::Error) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(self.path.clone()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Reads and validates the snapshot.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if there is no file.
    /// - [`Corrupt`](ErrorKind::Corrupt) if the JSON is invalid, the template
    ///   does not parse, a filename disagrees with its properties, or a
    ///   resolved entry lacks size or checksum.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Snapshot> {
        let bytes = fs::read(&self.path).map_err(|e| self.map_io_error(e))?;
        let record: CacheRecord =
            serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Corrupt("invalid JSON".to_string()))?;
        let snapshot = Snapshot::try_from(record)?;
        tracing::debug!(entries = snapshot.entries.len(), "loaded cache");
        Ok(snapshot)
    }

    /// Like [`load`](Self::load), but a missing file is `None`.
    pub fn load_if_exists(&self) -> Result<Option<Snapshot>> {
        match self.load() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Atomically replaces the cache file, creating parent directories.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = snapshot.entries.len()))]
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let record = CacheRecord::try_from(snapshot)?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(ErrorKind::Io)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(ErrorKind::Io)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &record).or_raise(|| ErrorKind::Serialize)?;
            writer.write_all(b"\n").map_err(ErrorKind::Io)?;
            writer.flush().map_err(ErrorKind::Io)?;
        }
        temp.as_file().sync_all().map_err(ErrorKind::Io)?;
        temp.persist(&self.path).map_err(|e| ErrorKind::Io(e.error))?;
        tracing::info!("saved cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_storage::{FileEntry, Metadata};
    use sheaf_template::{Properties, Template};

    fn entry(template: &Template, dir: Option<&str>, var: &str, metadata: Metadata) -> FileEntry {
        let properties = Properties::from([("var", var)]);
        let filename = template.format(&properties).unwrap();
        FileEntry {
            url: dir.map(|dir| sheaf_storage::join_location(dir, &filename)),
            filename: Some(filename),
            properties,
            metadata,
        }
    }

    fn snapshot(dir: Option<&str>) -> Snapshot {
        let template: Template = "{var}.tif".parse().unwrap();
        let entries = vec![
            entry(&template, dir, "b", Metadata::ok(3, "md5:b")),
            entry(&template, dir, "a", Metadata::error("HTTP 500")),
            entry(&template, dir, "c", Metadata::default()),
        ];
        Snapshot { template, dir: dir.map(str::to_string), entries }
    }

    #[test]
    fn test_save_then_load_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested/cache.json"));
        assert!(!store.exists());

        let original = snapshot(Some("https://example.org/data/"));
        store.save(&original).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), original);

        // Saving again replaces rather than appends.
        store.save(&original).unwrap();
        assert_eq!(store.load().unwrap().entries.len(), 3);
    }

    #[test]
    fn test_unbound_dir_is_stored_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        store.save(&snapshot(None)).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(json["dir"], "");
        assert_eq!(json["entries"][1]["status"], "error");
        assert_eq!(json["entries"][1]["reason"], "HTTP 500");
        assert!(json["entries"][0].get("reason").is_none());
        assert_eq!(store.load().unwrap().dir, None);
    }

    #[test]
    fn test_rewritten_urls_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        let mut original = snapshot(Some("https://example.org/data"));
        original.entries[0].url = Some("https://example.org/data/b.tif?download=1".to_string());
        store.save(&original).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(json["entries"][0]["url"], "https://example.org/data/b.tif?download=1");
        assert!(json["entries"][1].get("url").is_none());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.entries[1].url(), Some("https://example.org/data/a.tif"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("absent.json"));
        assert!(matches!(&*store.load().unwrap_err(), ErrorKind::NotFound(_)));
        assert!(store.load_if_exists().unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{\"template\": ").unwrap();
        let err = CacheStore::new(&path).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(_)));
        // Corrupt files are reported, not silently treated as absent.
        assert!(CacheStore::new(&path).load_if_exists().is_err());
    }

    #[test]
    fn test_invalid_template_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, br#"{"template": "{a}{b}", "dir": "", "entries": []}"#).unwrap();
        let err = CacheStore::new(&path).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(_)));
    }
}

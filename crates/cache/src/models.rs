use crate::Snapshot;
use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use sheaf_storage::{FileEntry, Metadata, Status, join_location};
use sheaf_template::{Properties, Template};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CacheRecord {
    template: String,
    #[serde(default)]
    dir: String,
    entries: Vec<EntryRow>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryRow {
    properties: Properties,
    filename: String,
    size: Option<u64>,
    checksum: Option<String>,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    /// Only written when the location was rewritten after binding to `dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl TryFrom<&FileEntry> for EntryRow {
    type Error = Error;
    fn try_from(entry: &FileEntry) -> Result<Self, Self::Error> {
        let filename = entry
            .filename()
            .ok_or_raise(|| ErrorKind::Incomplete(entry.properties.keys().collect::<Vec<_>>().join(", ")))?;
        Ok(Self {
            properties: entry.properties.clone(),
            filename: filename.to_string(),
            size: entry.size(),
            checksum: entry.checksum().map(str::to_string),
            status: entry.status().label().to_string(),
            reason: entry.status().reason().map(str::to_string),
            url: None,
        })
    }
}

impl EntryRow {
    fn into_entry(self, position: usize, template: &Template, dir: Option<&str>) -> Result<FileEntry, Error> {
        let corrupt = |reason: String| ErrorKind::Corrupt(format!("entry {position}: {reason}"));
        let expected = template
            .format(&self.properties)
            .or_raise(|| corrupt("properties do not fill the template".to_string()))?;
        if expected != self.filename {
            exn::bail!(corrupt(format!("filename `{}` does not match `{expected}`", self.filename)));
        }
        let metadata = match self.status.as_str() {
            "ok" => match (self.size, self.checksum) {
                (Some(size), Some(checksum)) => Metadata::ok(size, checksum),
                _ => exn::bail!(corrupt("resolved entry without size or checksum".to_string())),
            },
            "error" => Metadata::error(self.reason.unwrap_or_default()),
            "unresolved" => Metadata { size: self.size, checksum: self.checksum, status: Status::Unresolved },
            other => exn::bail!(corrupt(format!("unknown status `{other}`"))),
        };
        Ok(FileEntry {
            url: self.url.or_else(|| dir.map(|dir| join_location(dir, &self.filename))),
            properties: self.properties,
            filename: Some(self.filename),
            metadata,
        })
    }
}

impl TryFrom<&Snapshot> for CacheRecord {
    type Error = Error;
    fn try_from(snapshot: &Snapshot) -> Result<Self, Self::Error> {
        let dir = snapshot.dir.as_deref();
        let entries = snapshot
            .entries
            .iter()
            .map(|entry| {
                let mut row = EntryRow::try_from(entry)?;
                if entry.url() != dir.map(|dir| join_location(dir, &row.filename)).as_deref() {
                    row.url = entry.url().map(str::to_string);
                }
                Ok(row)
            })
            .collect::<Result<_, Error>>()?;
        Ok(Self {
            template: snapshot.template.pattern().to_string(),
            dir: dir.unwrap_or_default().to_string(),
            entries,
        })
    }
}

impl TryFrom<CacheRecord> for Snapshot {
    type Error = Error;
    fn try_from(record: CacheRecord) -> Result<Self, Self::Error> {
        let template = record
            .template
            .parse::<Template>()
            .or_raise(|| ErrorKind::Corrupt(format!("invalid template `{}`", record.template)))?;
        let dir = Some(record.dir).filter(|dir| !dir.is_empty());
        let entries = record
            .entries
            .into_iter()
            .enumerate()
            .map(|(position, row)| row.into_entry(position, &template, dir.as_deref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { template, dir, entries })
    }
}

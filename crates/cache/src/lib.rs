//! On-disk snapshots of templated file lists.
//!
//! A snapshot is the template, the bound directory and every entry with its
//! metadata, stored as pretty-printed JSON:
//!
//! ```json
//! {
//!   "template": "{var}_{date}.tif",
//!   "dir": "https://example.org/data",
//!   "entries": [
//!     {
//!       "properties": { "var": "ndvi", "date": "20000101" },
//!       "filename": "ndvi_20000101.tif",
//!       "size": 1024,
//!       "checksum": "md5:...",
//!       "status": "ok"
//!     }
//!   ]
//! }
//! ```
//!
//! The cache is derived state. Losing it only means probing again.

pub mod error;
mod models;
mod store;

pub use crate::store::CacheStore;
use sheaf_storage::FileEntry;
use sheaf_template::Template;

/// Everything a cache file holds, in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub template: Template,
    /// Bound base directory; `None` is stored as `""`.
    pub dir: Option<String>,
    pub entries: Vec<FileEntry>,
}

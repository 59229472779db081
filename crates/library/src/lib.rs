//! Templated file lists.
//!
//! A [`FileList`] is generated from a filename [`Template`] by expanding its
//! placeholders over sets of values, bound to a directory or base URL,
//! resolved against a [`Probe`] for size and checksum, cached to disk, and
//! reconciled against files that already exist elsewhere.
//!
//! ```
//! use sheaf_library::{Delta, FileList, Values, date_seq};
//!
//! # fn main() -> sheaf_library::error::Result<()> {
//! let list = FileList::from_template("wv_{variable}_{date}.tif")?
//!     .expand([("variable", Values::from(["ndvi", "evi"]))])?
//!     .expand([("date", date_seq("20000101", "20001231", Delta::months(1))?)])?
//!     .set_dir("https://example.org/wv");
//!
//! assert_eq!(list.len(), 24);
//! assert_eq!(list[0].url(), Some("https://example.org/wv/wv_ndvi_20000101.tif"));
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod dates;
pub mod error;
mod expand;
mod fetch;
mod list;
mod reconcile;

pub use crate::dates::{DEFAULT_DATE_FORMAT, DateSeq, Delta, date_seq};
pub use crate::expand::{Step, Values};
pub use crate::fetch::{FetchEvent, FetchOptions, Progress, fetch, fetch_stream};
pub use crate::list::FileList;
pub use crate::reconcile::{Field, Record, RemoteFile};

pub use sheaf_cache::CacheStore;
pub use sheaf_storage::{FileEntry, HttpProbe, LocalProbe, Metadata, Probe, ProbeHandle, Status};
pub use sheaf_template::{Properties, Template};

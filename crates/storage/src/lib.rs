//! Entry models and metadata probes for sheaf.
//!
//! [`FileEntry`] is the unit every other crate passes around; a [`Probe`]
//! fills in its [`Metadata`].

mod checksum;
pub mod error;
mod location;
mod models;
mod probe;

pub use crate::checksum::{format as format_checksum, normalize as normalize_checksum};
pub use crate::location::{is_remote, join as join_location};
pub use crate::models::{BUILTIN_ATTRIBUTES, FileEntry, Metadata, RemoteMeta, Status};
#[cfg(feature = "mock")]
pub use crate::probe::MockProbe;
pub use crate::probe::{ChecksumAlgorithm, HttpProbe, LocalProbe, Probe};
use std::sync::Arc;

pub type ProbeHandle = Arc<dyn Probe + Send + Sync>;

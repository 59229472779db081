//! In-memory probe for testing.

use crate::error::{ErrorKind, Result};
use crate::{Probe, RemoteMeta, checksum};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

/// In-memory probe for testing.
///
/// Locations map to file contents; the reported checksum is the MD5 of the
/// contents in the same `"md5:<hex>"` form as [`LocalProbe`](crate::LocalProbe).
/// Every call is counted per location so tests can assert that nothing was
/// probed twice.
///
/// # Examples
///
/// ```
/// use sheaf_storage::{MockProbe, Probe};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let probe = MockProbe::with_files([("https://h/a.tif", b"aaaa")])
///     .failing("https://h/b.tif", "HTTP 503");
/// assert_eq!(probe.probe("https://h/a.tif").await?.size, 4);
/// assert!(probe.probe("https://h/b.tif").await.is_err());
/// assert_eq!(probe.probes("https://h/a.tif").await, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockProbe {
    name: String,
    files: RwLock<HashMap<String, Vec<u8>>>,
    failures: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockProbe {
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files.into_iter().map(|(location, data)| (location.into(), data.into())).collect()),
            failures: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Change the name of the mock probe.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every probe of `location` fail with a network error carrying
    /// `reason`, whether or not the location has contents.
    pub fn failing(mut self, location: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.insert(location.into(), reason.into());
        self
    }

    pub async fn insert(&self, location: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.write().await.insert(location.into(), data.into());
    }

    /// How many times `location` has been probed.
    pub async fn probes(&self, location: &str) -> usize {
        self.calls.lock().await.get(location).copied().unwrap_or(0)
    }

    pub async fn total_probes(&self) -> usize {
        self.calls.lock().await.values().sum()
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, location: &str) -> Result<RemoteMeta> {
        *self.calls.lock().await.entry(location.to_string()).or_default() += 1;
        // Let other in-flight probes interleave, as a real transport would.
        tokio::task::yield_now().await;
        if let Some(reason) = self.failures.get(location) {
            exn::bail!(ErrorKind::Network(reason.clone()));
        }
        let guard = self.files.read().await;
        let data = guard.get(location).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(location.to_string())))?;
        Ok(RemoteMeta { size: data.len() as u64, checksum: checksum::format("md5", md5::compute(data).0) })
    }
}

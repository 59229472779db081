//! Metadata probes.
//!
//! A [`Probe`] answers one question for one location: how big is the file
//! and what checksum does its provider report. Implementations exist for
//! HTTP(S) servers, the local filesystem and, behind the `mock` feature, an
//! in-memory table for tests.

mod http;
mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::HttpProbe;
pub use self::local::{ChecksumAlgorithm, LocalProbe};
#[cfg(feature = "mock")]
pub use self::mock::MockProbe;
use crate::RemoteMeta;
use crate::error::Result;
use async_trait::async_trait;

/// Retrieves size and checksum for a location without downloading it (where
/// the transport allows).
///
/// # Examples
///
/// ```
/// use sheaf_storage::{Probe, error::Result};
///
/// async fn total_size(probe: &dyn Probe, locations: &[&str]) -> Result<u64> {
///     let mut total = 0;
///     for location in locations {
///         total += probe.probe(location).await?.size;
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait Probe: Send + Sync {
    /// Name of the probe, used for logging only.
    fn name(&self) -> &str;

    /// Probe a single location.
    ///
    /// # Errors
    /// - [`InvalidLocation`](crate::error::ErrorKind::InvalidLocation) if the
    ///   probe cannot handle the location's scheme.
    /// - [`NotFound`](crate::error::ErrorKind::NotFound) if nothing exists there.
    /// - Transport-specific kinds otherwise.
    async fn probe(&self, location: &str) -> Result<RemoteMeta>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use sheaf_config::HttpConfig;

    #[tokio::test]
    async fn test_local_and_http_checksums_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        let local = LocalProbe::new().probe(path.to_str().unwrap()).await.unwrap();

        let checksum_headers = HttpConfig::default().checksum_headers;
        for (name, value) in [("content-md5", "XUFAKrxLKna5cZ2REBfFkg=="), ("x-checksum-md5", "5d41402abc4b2a76b9719d911017c592")] {
            let mut headers = HeaderMap::new();
            headers.insert("content-length", HeaderValue::from_static("5"));
            headers.insert(name, HeaderValue::from_static(value));
            let remote = http::read_headers("https://h/hello.txt", &headers, &checksum_headers).unwrap();
            assert_eq!(remote, local, "{name}");
        }
    }
}

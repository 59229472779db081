//! Filesystem probe.
//!
//! Files are hashed in full on a blocking thread, so this is meant for
//! locally mirrored data rather than large remote mounts.

use crate::error::{ErrorKind, Result};
use crate::{Probe, RemoteMeta, checksum, location};
use async_trait::async_trait;
use exn::ResultExt;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hash used by [`LocalProbe`]. Checksums are reported in the canonical
/// `"<algo>:<hex>"` form of [`normalize_checksum`](crate::normalize_checksum).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Blake3,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "md5",
            Self::Blake3 => "blake3",
        })
    }
}

enum Hasher {
    Md5(md5::Context),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            ChecksumAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(context) => context.consume(data),
            Self::Blake3(hasher) => {
                hasher.update(data);
            },
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Md5(context) => context.compute().0.to_vec(),
            Self::Blake3(hasher) => hasher.finalize().as_bytes().to_vec(),
        }
    }
}

/// Probes files on the local filesystem.
///
/// Accepts plain paths and `file://` locations; `http(s)` locations are an
/// [`InvalidLocation`](ErrorKind::InvalidLocation).
#[derive(Debug, Clone)]
pub struct LocalProbe {
    name: String,
    algorithm: ChecksumAlgorithm,
}

impl Default for LocalProbe {
    fn default() -> Self {
        Self { name: "local".to_string(), algorithm: ChecksumAlgorithm::default() }
    }
}

impl LocalProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn resolve(location: &str) -> Result<PathBuf> {
        if location::is_remote(location) || location.is_empty() {
            exn::bail!(ErrorKind::InvalidLocation(location.to_string()));
        }
        Ok(PathBuf::from(location.strip_prefix("file://").unwrap_or(location)))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.display().to_string()),
            _ => ErrorKind::Io(e),
        }
    }
}

/// Streams the file through the hasher, counting bytes as it goes.
fn hash_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<RemoteMeta> {
    let mut file = File::open(path).map_err(|e| LocalProbe::map_io_error(e, path))?;
    if !file.metadata().map_err(|e| LocalProbe::map_io_error(e, path))?.is_file() {
        exn::bail!(ErrorKind::InvalidLocation(path.display().to_string()));
    }
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut size = 0u64;
    loop {
        let read = file.read(&mut buffer).map_err(|e| LocalProbe::map_io_error(e, path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok(RemoteMeta { size, checksum: checksum::format(&algorithm.to_string(), hasher.finalize()) })
}

#[async_trait]
impl Probe for LocalProbe {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(probe = %self.name, location))]
    async fn probe(&self, location: &str) -> Result<RemoteMeta> {
        let path = Self::resolve(location)?;
        let algorithm = self.algorithm;
        tokio::task::spawn_blocking(move || hash_file(&path, algorithm)).await.or_raise(|| ErrorKind::Interrupted)?
    }
}

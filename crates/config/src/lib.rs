//! Layered configuration for sheaf.
//!
//! Sources are merged in increasing priority:
//!
//! 1. built-in defaults,
//! 2. an optional file (TOML, YAML or JSON, picked by extension),
//! 3. environment variables prefixed `SHEAF_`, with `__` separating nested
//!    keys (`SHEAF_FETCH__CONCURRENCY=4`).
//!
//! Nothing here is read implicitly; callers decide when to load.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SHEAF_";
const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub http: HttpConfig,
}

/// Settings for metadata retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
    /// Abort the whole run on the first failed probe instead of recording it.
    pub stop_on_error: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY, stop_on_error: false }
    }
}

/// Settings for the HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    /// Response headers consulted for a checksum, first present wins.
    pub checksum_headers: Vec<String>,
    /// Sent as a bearer token when set.
    pub token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            checksum_headers: ["content-md5", "x-checksum-md5", "etag"].map(String::from).to_vec(),
            token: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Location of the per-user configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sheaf").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Builds the layered provider without extracting it.
    ///
    /// An explicit `file` must exist; its format is chosen by extension.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `file`, or from [`default_path`](Self::default_path) when
    /// that exists, or from defaults and the environment alone.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let fallback = match file {
            Some(_) => None,
            None => Self::default_path().filter(|path| path.is_file()),
        };
        let file = file.or(fallback.as_deref());
        tracing::debug!(file = ?file, "loading configuration");
        Self::from_figment(&Self::figment(file)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.concurrency must be at least 1".to_string()));
        }
        if self.http.checksum_headers.iter().any(|h| h.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("http.checksum_headers must not contain empty names".to_string()));
        }
        Ok(())
    }
}

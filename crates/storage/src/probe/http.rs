//! HTTP(S) probe using `HEAD` requests.

use crate::error::{ErrorKind, Result};
use crate::{Probe, RemoteMeta, checksum, location};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, Url};
use sheaf_config::HttpConfig;
use std::time::Duration;

/// Probes remote files with a `HEAD` request.
///
/// The size comes from `Content-Length`. The checksum is the value of the
/// first header from `checksum_headers` present in the response, brought into
/// canonical form with [`normalize_checksum`](crate::normalize_checksum) so it
/// compares equal to what [`LocalProbe`](crate::LocalProbe) computes for the
/// same bytes. A response lacking either is a
/// [`MalformedResponse`](ErrorKind::MalformedResponse).
///
/// ```no_run
/// use sheaf_storage::{HttpProbe, Probe};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let probe = HttpProbe::new()?.with_token("s3cr3t");
/// let meta = probe.probe("https://example.org/data/ndvi_20000101.tif").await?;
/// println!("{} bytes, checksum {}", meta.size, meta.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpProbe {
    name: String,
    client: Client,
    timeout: Option<Duration>,
    checksum_headers: Vec<String>,
    token: Option<String>,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        Self::from_config(&HttpConfig::default())
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let timeout = config.timeout();
        Ok(Self {
            name: "http".to_string(),
            client: build_client(timeout)?,
            timeout,
            checksum_headers: config.checksum_headers.iter().map(|h| h.to_ascii_lowercase()).collect(),
            token: config.token.clone(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Rebuilds the client with a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn parse_location(location: &str) -> Result<Url> {
        if !location::is_remote(location) {
            exn::bail!(ErrorKind::InvalidLocation(location.to_string()));
        }
        Url::parse(location).or_raise(|| ErrorKind::InvalidLocation(location.to_string()))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(probe = %self.name, location))]
    async fn probe(&self, location: &str) -> Result<RemoteMeta> {
        let url = Self::parse_location(location)?;
        let mut request = self.client.head(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.or_raise(|| ErrorKind::Network(location.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(code = status.as_u16(), "probe rejected");
            exn::bail!(ErrorKind::Status { location: location.to_string(), code: status.as_u16() });
        }
        read_headers(location, response.headers(), &self.checksum_headers)
    }
}

/// Every client is built here, so settings survive a rebuild.
fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("sheaf/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().or_raise(|| ErrorKind::Network("could not build HTTP client".to_string()))
}

fn malformed(location: &str, reason: impl Into<String>) -> ErrorKind {
    ErrorKind::MalformedResponse { location: location.to_string(), reason: reason.into() }
}

/// Pulls size and checksum out of a successful `HEAD` response.
pub(crate) fn read_headers(location: &str, headers: &HeaderMap, checksum_headers: &[String]) -> Result<RemoteMeta> {
    let size = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(|| exn::Exn::from(malformed(location, "missing or invalid Content-Length")))?;
    let checksum = checksum_headers
        .iter()
        .filter_map(|name| headers.get(name.as_str()))
        .filter_map(|value| value.to_str().ok())
        .map(checksum::normalize)
        .find(|value| !value.is_empty())
        .ok_or_else(|| exn::Exn::from(malformed(location, format!("none of {checksum_headers:?} present"))))?;
    Ok(RemoteMeta { size, checksum })
}

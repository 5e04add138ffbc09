//! Authenticated image download and fingerprint probe
//!
//! Both operations hit the CDN directly with `reqwest`, reusing the cookies
//! snapshotted from the browser session so high-res originals resolve the same
//! way they do inside the logged-in page.

use std::collections::HashMap;
use std::path::Path;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::GrabConfig;
use crate::error::Result;

/// Browser-like identification sent with every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How much of the body the fingerprint probe reads.
const PROBE_PREFIX_BYTES: usize = 8192;

/// Payloads at or below this size are treated as error pages or placeholder
/// pixels, not images.
const MIN_IMAGE_BYTES: usize = 1000;

/// Content fingerprint: hex SHA-256 of the first 8 KB of an image body.
///
/// Identity proxy for images that may be served under multiple CDN URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash a byte prefix into a fingerprint.
    pub fn of(prefix: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prefix);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// Result of one download attempt. Failures are values, not errors: the walk
/// continues past any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Payload accepted and written to disk.
    Saved { bytes: usize },
    /// Response arrived but was not a plausible image.
    Rejected { status: u16, bytes: usize },
    /// Network, timeout, or filesystem error.
    Failed { reason: String },
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Whether a response is a plausible image: success status and a payload
/// strictly larger than [`MIN_IMAGE_BYTES`].
fn plausible_image(status: StatusCode, len: usize) -> bool {
    status.is_success() && len > MIN_IMAGE_BYTES
}

/// Render a cookie jar as a `Cookie` request header value.
fn cookie_header(cookies: &HashMap<String, String>) -> String {
    let mut pairs: Vec<String> = cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    pairs.sort(); // deterministic header across runs
    pairs.join("; ")
}

/// HTTP fetcher for image downloads and fingerprint probes.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    headers: HeaderMap,
    probe_timeout: std::time::Duration,
}

impl ImageFetcher {
    /// Build a fetcher from the run config, the session's cookie snapshot, and
    /// the Referer origin of the source site.
    pub fn new(
        config: &GrabConfig,
        cookies: &HashMap<String, String>,
        referer: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.download_timeout)
            .build()?;

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }
        if !cookies.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&cookie_header(cookies)) {
                headers.insert(COOKIE, value);
            }
        }

        Ok(Self {
            client,
            headers,
            probe_timeout: config.probe_timeout,
        })
    }

    /// Download one image to `dest`, overwriting if present.
    ///
    /// Never errors past this boundary: every failure mode is folded into a
    /// [`DownloadOutcome`] for the caller to report.
    pub async fn download(&self, url: &str, dest: &Path) -> DownloadOutcome {
        let response = match self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if !plausible_image(status, body.len()) {
            return DownloadOutcome::Rejected {
                status: status.as_u16(),
                bytes: body.len(),
            };
        }

        if let Err(e) = tokio::fs::write(dest, &body).await {
            return DownloadOutcome::Failed {
                reason: format!("write {}: {}", dest.display(), e),
            };
        }

        debug!("Wrote {} bytes to {}", body.len(), dest.display());
        DownloadOutcome::Saved { bytes: body.len() }
    }

    /// Read the first 8 KB of the body and hash it.
    ///
    /// A cheap identity probe, separate from the full download: the connection
    /// is dropped as soon as the prefix is in. Any failure yields `None`
    /// ("fingerprint unknown"), never an error.
    pub async fn probe_fingerprint(&self, url: &str) -> Option<Fingerprint> {
        let response = match self
            .client
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Fingerprint probe failed for {}: {}", url, e);
                return None;
            }
        };

        let mut stream = response.bytes_stream();
        let mut prefix = Vec::with_capacity(PROBE_PREFIX_BYTES);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => prefix.extend_from_slice(&chunk),
                Err(e) => {
                    warn!("Fingerprint probe stream error for {}: {}", url, e);
                    return None;
                }
            }
            if prefix.len() >= PROBE_PREFIX_BYTES {
                break;
            }
        }

        prefix.truncate(PROBE_PREFIX_BYTES);
        Some(Fingerprint::of(&prefix))
    }
}

#[async_trait::async_trait]
impl crate::walker::ImageFetch for ImageFetcher {
    async fn probe_fingerprint(&self, url: &str) -> Option<Fingerprint> {
        ImageFetcher::probe_fingerprint(self, url).await
    }

    async fn download(&self, url: &str, dest: &Path) -> DownloadOutcome {
        ImageFetcher::download(self, url, dest).await
    }
}

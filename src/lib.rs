//! Download every distinct image from a social-media photo carousel.
//!
//! Drives a visible, controlled browser through a social-media post's photo
//! carousel and saves each distinct image to disk. Login is manual: the tool
//! opens the post, waits for the operator, snapshots the session cookies, and
//! then walks the carousel sequentially, deduplicating by URL and by a
//! content fingerprint of each image's byte prefix.
//!
//! The loop itself ([`walker::CarouselWalker`]) is independent of the browser
//! and the network: it drives a [`walker::CarouselSource`] and an
//! [`walker::ImageFetch`], implemented for real by
//! [`browser::BrowserSession`] and [`fetch::ImageFetcher`].

pub mod browser;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod walker;

pub use browser::BrowserSession;
pub use config::{GrabConfig, GrabConfigBuilder};
pub use dedup::DedupLedger;
pub use error::{GrabError, Result};
pub use fetch::{DownloadOutcome, Fingerprint, ImageFetcher};
pub use walker::{CarouselWalker, StopReason, WalkSummary};

/// Referer origin for image requests, derived from the target post URL.
///
/// CDN hosts expect a referer from the site the image is embedded in, so
/// `https://www.example.com/post/123?x=1` becomes `https://www.example.com/`.
pub fn referer_origin(target_url: &str) -> Result<String> {
    let parsed = url::Url::parse(target_url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GrabError::InvalidUrl(target_url.to_string()))?;
    Ok(format!("{}://{}/", parsed.scheme(), host))
}

//! Carousel traversal: the main control loop
//!
//! The walker owns no browser and no HTTP client. It drives two trait seams,
//! a [`CarouselSource`] that reports the current main image and advances the
//! carousel, and an [`ImageFetch`] that probes and downloads, so the whole
//! loop runs against scripted fakes in tests.

use std::path::Path;

use async_trait::async_trait;
use colored::Colorize;
use tokio::time::sleep;
use tracing::debug;

use crate::config::GrabConfig;
use crate::dedup::{file_name, infer_extension, DedupLedger, Staleness};
use crate::error::Result;
use crate::fetch::{DownloadOutcome, Fingerprint};

/// The page side of the loop: what image is showing, and move to the next one.
#[async_trait]
pub trait CarouselSource {
    /// URL of the currently displayed main image, or `None` when no
    /// qualifying image could be found within the extraction window.
    async fn main_image_src(&self) -> Option<String>;

    /// Move the carousel to the next image.
    async fn advance(&self) -> Result<()>;
}

/// The network side of the loop: cheap identity probe and full download.
#[async_trait]
pub trait ImageFetch {
    /// Fingerprint of the image's byte prefix, or `None` when the probe
    /// failed (treated as "unknown", never as a duplicate).
    async fn probe_fingerprint(&self, url: &str) -> Option<Fingerprint>;

    /// Download the full image to `dest`.
    async fn download(&self, url: &str, dest: &Path) -> DownloadOutcome;
}

/// Why the walk ended. All reasons exit the process identically; only the
/// message differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Extraction found nothing twice in a row.
    NoImageFound,
    /// Fingerprint unchanged for the configured number of consecutive checks.
    CarouselExhausted,
    /// Hard safety cap on successful downloads reached.
    MaxImagesReached,
}

/// End-of-run report.
#[derive(Debug)]
pub struct WalkSummary {
    pub downloaded: usize,
    pub reason: StopReason,
}

/// Sequential carousel walker. One instance per run.
pub struct CarouselWalker {
    config: GrabConfig,
    ledger: DedupLedger,
}

impl CarouselWalker {
    pub fn new(config: GrabConfig) -> Self {
        let ledger = DedupLedger::new(config.stale_threshold);
        Self { config, ledger }
    }

    /// Walk the carousel until a stop condition fires.
    ///
    /// Per iteration: extract the main image (one retry), probe its
    /// fingerprint, check staleness, download if novel, advance. Download
    /// failures roll the counter back and the walk continues; only a browser
    /// failure on advance propagates.
    pub async fn run<P, F>(&mut self, page: &P, fetcher: &F) -> Result<WalkSummary>
    where
        P: CarouselSource + Sync,
        F: ImageFetch + Sync,
    {
        loop {
            if self.ledger.downloaded() >= self.config.max_images {
                return Ok(self.summary(StopReason::MaxImagesReached));
            }

            let src = match self.extract_with_retry(page).await {
                Some(src) => src,
                None => return Ok(self.summary(StopReason::NoImageFound)),
            };
            debug!("Current main image: {}", src);

            let fingerprint = fetcher.probe_fingerprint(&src).await;

            match self.ledger.observe(fingerprint.as_ref()) {
                Staleness::Exhausted => {
                    println!(
                        "\nImage unchanged for {} consecutive checks — reached end of carousel.",
                        self.config.stale_threshold
                    );
                    return Ok(self.summary(StopReason::CarouselExhausted));
                }
                Staleness::Repeat => debug!("Unchanged fingerprint, not yet stale"),
                Staleness::Fresh => {}
            }

            if self.ledger.is_novel(&src, fingerprint.as_ref()) {
                self.download_candidate(fetcher, &src, fingerprint.as_ref())
                    .await;
            } else {
                debug!("Skipping already-downloaded image: {}", src);
            }

            page.advance().await?;
            sleep(self.config.navigate_delay).await;
        }
    }

    /// Extract the current main image, retrying exactly once after a short
    /// delay.
    async fn extract_with_retry<P: CarouselSource + Sync>(&self, page: &P) -> Option<String> {
        if let Some(src) = page.main_image_src().await {
            return Some(src);
        }
        println!("Could not find an image. Retrying once...");
        sleep(self.config.retry_delay).await;
        let src = page.main_image_src().await;
        if src.is_none() {
            println!("Still no image found — stopping.");
        }
        src
    }

    /// Reserve a file index, attempt the download, and commit or roll back.
    async fn download_candidate<F: ImageFetch + Sync>(
        &mut self,
        fetcher: &F,
        src: &str,
        fingerprint: Option<&Fingerprint>,
    ) {
        let index = self.ledger.reserve();
        let name = file_name(index, infer_extension(src));
        let dest = self.config.output_dir.join(&name);

        println!("[{}] Downloading...", index);
        match fetcher.download(src, &dest).await {
            DownloadOutcome::Saved { bytes } => {
                println!(
                    "  {} Saved: {} ({:.1} KB)",
                    "✓".green(),
                    name,
                    bytes as f64 / 1024.0
                );
                self.ledger.commit(src, fingerprint);
            }
            DownloadOutcome::Rejected { status, bytes } => {
                println!(
                    "  {} Bad response: status={}, size={}",
                    "✗".red(),
                    status,
                    bytes
                );
                self.ledger.rollback();
            }
            DownloadOutcome::Failed { reason } => {
                println!("  {} Download error: {}", "✗".red(), reason);
                self.ledger.rollback();
            }
        }
    }

    fn summary(&self, reason: StopReason) -> WalkSummary {
        WalkSummary {
            downloaded: self.ledger.downloaded(),
            reason,
        }
    }
}

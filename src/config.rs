//! Run configuration

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one carousel run
#[derive(Debug, Clone)]
pub struct GrabConfig {
    /// URL of the post whose carousel is walked
    pub target_url: String,

    /// Directory downloaded images are written to (created if absent)
    pub output_dir: PathBuf,

    /// Hard safety cap on successful downloads
    pub max_images: usize,

    /// Pause after each carousel advance, before the next extraction
    pub navigate_delay: Duration,

    /// How long to keep polling the page for a qualifying image
    pub image_load_timeout: Duration,

    /// Timeout for the full image download
    pub download_timeout: Duration,

    /// Timeout for the fingerprint probe (prefix read)
    pub probe_timeout: Duration,

    /// Consecutive unchanged-fingerprint checks before the carousel is
    /// considered exhausted
    pub stale_threshold: u32,

    /// Delay before the single extraction retry
    pub retry_delay: Duration,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            output_dir: PathBuf::from("./downloaded_images"),
            max_images: 200,
            navigate_delay: Duration::from_secs(2),
            image_load_timeout: Duration::from_secs(8),
            download_timeout: Duration::from_secs(20),
            probe_timeout: Duration::from_secs(10),
            stale_threshold: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl GrabConfig {
    /// Create a new config builder
    pub fn builder() -> GrabConfigBuilder {
        GrabConfigBuilder::default()
    }
}

/// Builder for GrabConfig
#[derive(Default)]
pub struct GrabConfigBuilder {
    config: GrabConfig,
}

impl GrabConfigBuilder {
    /// Set the target post URL
    pub fn target_url(mut self, url: &str) -> Self {
        self.config.target_url = url.to_string();
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the maximum number of images to download
    pub fn max_images(mut self, max: usize) -> Self {
        self.config.max_images = max;
        self
    }

    /// Set the post-advance delay in seconds
    pub fn navigate_delay_secs(mut self, secs: f64) -> Self {
        self.config.navigate_delay = Duration::from_secs_f64(secs);
        self
    }

    /// Set the extraction polling timeout in seconds
    pub fn image_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_load_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the full-download timeout in seconds
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the stale-repeat threshold
    pub fn stale_threshold(mut self, threshold: u32) -> Self {
        self.config.stale_threshold = threshold;
        self
    }

    /// Set the extraction retry delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the post-advance delay
    pub fn navigate_delay(mut self, delay: Duration) -> Self {
        self.config.navigate_delay = delay;
        self
    }

    /// Build the config
    pub fn build(self) -> GrabConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GrabConfig::default();
        assert_eq!(config.max_images, 200);
        assert_eq!(config.navigate_delay, Duration::from_secs(2));
        assert_eq!(config.image_load_timeout, Duration::from_secs(8));
        assert_eq!(config.download_timeout, Duration::from_secs(20));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.stale_threshold, 3);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = GrabConfig::builder()
            .target_url("https://example.com/post/1")
            .output_dir("/tmp/images")
            .max_images(10)
            .navigate_delay_secs(0.5)
            .stale_threshold(5)
            .build();

        assert_eq!(config.target_url, "https://example.com/post/1");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/images"));
        assert_eq!(config.max_images, 10);
        assert_eq!(config.navigate_delay, Duration::from_millis(500));
        assert_eq!(config.stale_threshold, 5);
    }
}

//! Duplicate detection and download accounting
//!
//! The platform serves rotating CDN URLs for the same image, so URL membership
//! alone misses duplicates; the fingerprint probe can transiently fail, so hash
//! membership alone would skip real images. The ledger combines both: a missing
//! fingerprint counts as unknown, never as a duplicate.

use std::collections::HashSet;

use crate::fetch::Fingerprint;

/// Outcome of feeding one iteration's fingerprint into stale detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Fingerprint changed (or is unavailable); keep walking.
    Fresh,
    /// Same fingerprint as the previous iteration, threshold not yet reached.
    Repeat,
    /// Unchanged for the configured number of consecutive checks.
    Exhausted,
}

/// In-memory record of everything downloaded this run.
///
/// All state lives for the duration of one walk and is discarded at exit.
#[derive(Debug)]
pub struct DedupLedger {
    seen_urls: HashSet<String>,
    seen_hashes: HashSet<Fingerprint>,
    last_fingerprint: Option<Fingerprint>,
    stale_count: u32,
    stale_threshold: u32,
    downloaded: usize,
}

impl DedupLedger {
    pub fn new(stale_threshold: u32) -> Self {
        Self {
            seen_urls: HashSet::new(),
            seen_hashes: HashSet::new(),
            last_fingerprint: None,
            stale_count: 0,
            stale_threshold,
            downloaded: 0,
        }
    }

    /// Number of files successfully written so far.
    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    /// Feed this iteration's fingerprint into stale detection.
    ///
    /// The previous fingerprint is updated unconditionally, including to `None`
    /// when the probe failed.
    pub fn observe(&mut self, fingerprint: Option<&Fingerprint>) -> Staleness {
        let repeat = matches!(
            (fingerprint, self.last_fingerprint.as_ref()),
            (Some(current), Some(last)) if current == last
        );

        if repeat {
            self.stale_count += 1;
        } else {
            self.stale_count = 0;
        }
        self.last_fingerprint = fingerprint.cloned();

        if self.stale_count >= self.stale_threshold {
            Staleness::Exhausted
        } else if repeat {
            Staleness::Repeat
        } else {
            Staleness::Fresh
        }
    }

    /// Decide whether a candidate should be downloaded.
    ///
    /// A candidate is novel when its URL is unseen AND its fingerprint is either
    /// unavailable or unseen. Fingerprint order matters: `None` means "unknown,
    /// assume novel", so a failed probe never blocks a download.
    pub fn is_novel(&self, url: &str, fingerprint: Option<&Fingerprint>) -> bool {
        !self.seen_urls.contains(url)
            && fingerprint.map_or(true, |fp| !self.seen_hashes.contains(fp))
    }

    /// Reserve the next sequential file index for a download attempt.
    ///
    /// Must be paired with [`commit`](Self::commit) on success or
    /// [`rollback`](Self::rollback) on failure so the sequence stays contiguous.
    pub fn reserve(&mut self) -> usize {
        self.downloaded += 1;
        self.downloaded
    }

    /// Register a successful download under its URL and fingerprint.
    pub fn commit(&mut self, url: &str, fingerprint: Option<&Fingerprint>) {
        self.seen_urls.insert(url.to_string());
        if let Some(fp) = fingerprint {
            self.seen_hashes.insert(fp.clone());
        }
    }

    /// Undo a [`reserve`](Self::reserve) after a failed download.
    pub fn rollback(&mut self) {
        self.downloaded -= 1;
    }
}

/// Infer the output file extension from the candidate URL.
///
/// Case-insensitive substring match, `.png` checked before `.webp`, anything
/// else falls back to jpg.
pub fn infer_extension(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.contains(".png") {
        "png"
    } else if lower.contains(".webp") {
        "webp"
    } else {
        "jpg"
    }
}

/// Sequential output file name, counter zero-padded to at least 3 digits.
pub fn file_name(index: usize, ext: &str) -> String {
    format!("image_{:03}.{}", index, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::of(s.as_bytes())
    }

    #[test]
    fn seen_url_is_rejected() {
        let mut ledger = DedupLedger::new(3);
        ledger.reserve();
        ledger.commit("https://cdn.example/a.jpg", Some(&fp("a")));

        assert!(!ledger.is_novel("https://cdn.example/a.jpg", Some(&fp("b"))));
    }

    #[test]
    fn seen_fingerprint_is_rejected_under_new_url() {
        let mut ledger = DedupLedger::new(3);
        ledger.reserve();
        ledger.commit("https://cdn.example/a.jpg?tok=1", Some(&fp("a")));

        // Same bytes served under a rotated CDN URL
        assert!(!ledger.is_novel("https://cdn.example/a.jpg?tok=2", Some(&fp("a"))));
    }

    #[test]
    fn unknown_fingerprint_is_novel() {
        let mut ledger = DedupLedger::new(3);
        ledger.reserve();
        ledger.commit("https://cdn.example/a.jpg", Some(&fp("a")));

        // Probe failed for a fresh URL: must be classified novel
        assert!(ledger.is_novel("https://cdn.example/b.jpg", None));
    }

    #[test]
    fn commit_without_fingerprint_registers_url_only() {
        let mut ledger = DedupLedger::new(3);
        ledger.reserve();
        ledger.commit("https://cdn.example/a.jpg", None);

        assert!(!ledger.is_novel("https://cdn.example/a.jpg", None));
        assert!(ledger.is_novel("https://cdn.example/b.jpg", Some(&fp("a"))));
    }

    #[test]
    fn rollback_keeps_sequence_contiguous() {
        let mut ledger = DedupLedger::new(3);
        assert_eq!(ledger.reserve(), 1);
        ledger.commit("u1", None);
        assert_eq!(ledger.reserve(), 2);
        ledger.rollback(); // failed download
        assert_eq!(ledger.reserve(), 2);
        ledger.commit("u2", None);
        assert_eq!(ledger.downloaded(), 2);
    }

    #[test]
    fn stale_counter_trips_on_third_repeat() {
        let mut ledger = DedupLedger::new(3);
        let same = fp("same");

        assert_eq!(ledger.observe(Some(&same)), Staleness::Fresh);
        assert_eq!(ledger.observe(Some(&same)), Staleness::Repeat);
        assert_eq!(ledger.observe(Some(&same)), Staleness::Repeat);
        assert_eq!(ledger.observe(Some(&same)), Staleness::Exhausted);
    }

    #[test]
    fn stale_counter_resets_on_change() {
        let mut ledger = DedupLedger::new(3);
        let a = fp("a");
        let b = fp("b");

        ledger.observe(Some(&a));
        ledger.observe(Some(&a));
        assert_eq!(ledger.observe(Some(&b)), Staleness::Fresh);
        assert_eq!(ledger.observe(Some(&b)), Staleness::Repeat);
    }

    #[test]
    fn missing_fingerprint_resets_stale_counter() {
        let mut ledger = DedupLedger::new(3);
        let a = fp("a");

        ledger.observe(Some(&a));
        ledger.observe(Some(&a));
        assert_eq!(ledger.observe(None), Staleness::Fresh);
        // Previous fingerprint was cleared, so a repeat of `a` is fresh again
        assert_eq!(ledger.observe(Some(&a)), Staleness::Fresh);
    }

    #[test]
    fn five_distinct_then_repeat_downloads_five() {
        let mut ledger = DedupLedger::new(3);
        let urls: Vec<String> = (1..=5).map(|i| format!("https://cdn.example/{i}.jpg")).collect();

        for (i, url) in urls.iter().enumerate() {
            let f = fp(url);
            assert!(ledger.is_novel(url, Some(&f)));
            assert_eq!(ledger.reserve(), i + 1);
            ledger.commit(url, Some(&f));
        }

        // Repeat of URL #3 is rejected and the counter is unchanged
        assert!(!ledger.is_novel(&urls[2], Some(&fp(&urls[2]))));
        assert_eq!(ledger.downloaded(), 5);
    }

    #[test]
    fn extension_inference_checks_png_before_webp() {
        assert_eq!(infer_extension("https://cdn.example/photo.png"), "png");
        assert_eq!(infer_extension("https://cdn.example/photo.webp"), "webp");
        assert_eq!(infer_extension("https://cdn.example/photo.jpeg"), "jpg");
        assert_eq!(infer_extension("https://cdn.example/photo"), "jpg");
        assert_eq!(infer_extension("https://cdn.example/IMG123.PNG?x=1"), "png");
        // First match wins when both patterns are present
        assert_eq!(infer_extension("https://cdn.example/a.webp?from=b.png"), "png");
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(file_name(1, "jpg"), "image_001.jpg");
        assert_eq!(file_name(42, "png"), "image_042.png");
        assert_eq!(file_name(1000, "webp"), "image_1000.webp");
    }
}

//! Main-image selection over the page's `<img>` elements
//!
//! The selection rule is a pure function over (url, width, height) tuples so it
//! can be tested without a browser; the session evaluates
//! [`COLLECT_IMAGES_JS`] to gather the tuples.

use serde::Deserialize;

/// JS evaluated in the page: every `<img>` with its natural (loaded) pixel
/// dimensions, not its display box.
pub const COLLECT_IMAGES_JS: &str = r#"(() => {
    return Array.from(document.querySelectorAll('img')).map((img) => ({
        src: img.src || '',
        width: img.naturalWidth || 0,
        height: img.naturalHeight || 0,
    }));
})()"#;

/// URL substrings that mark non-content images (emoji sprites, resource-bundle
/// assets) regardless of size.
const NON_CONTENT_PATTERNS: &[&str] = &["emoji", "rsrc.php"];

/// One `<img>` element as reported by the page.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageElement {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl ImageElement {
    fn qualifies(&self) -> bool {
        self.src.starts_with("http")
            && !NON_CONTENT_PATTERNS.iter().any(|p| self.src.contains(p))
    }

    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pick the best-candidate main image: the qualifying element with the largest
/// natural pixel area. Ties keep the first-seen element. `None` when nothing
/// qualifies (including zero-area placeholders).
pub fn select_main_image(images: &[ImageElement]) -> Option<&str> {
    let mut best: Option<&ImageElement> = None;
    let mut best_area = 0u64;

    for image in images.iter().filter(|img| img.qualifies()) {
        if image.area() > best_area {
            best_area = image.area();
            best = Some(image);
        }
    }

    best.map(|img| img.src.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(src: &str, width: u32, height: u32) -> ImageElement {
        ImageElement {
            src: src.to_string(),
            width,
            height,
        }
    }

    #[test]
    fn picks_largest_natural_area() {
        let images = vec![
            img("https://cdn.example/thumb.jpg", 120, 120),
            img("https://cdn.example/photo.jpg", 1600, 1200),
            img("https://cdn.example/avatar.jpg", 64, 64),
        ];
        assert_eq!(
            select_main_image(&images),
            Some("https://cdn.example/photo.jpg")
        );
    }

    #[test]
    fn ties_keep_first_seen() {
        let images = vec![
            img("https://cdn.example/first.jpg", 800, 600),
            img("https://cdn.example/second.jpg", 600, 800),
        ];
        assert_eq!(
            select_main_image(&images),
            Some("https://cdn.example/first.jpg")
        );
    }

    #[test]
    fn skips_non_http_sources() {
        let images = vec![
            img("data:image/png;base64,AAAA", 2000, 2000),
            img("/relative/path.jpg", 2000, 2000),
            img("https://cdn.example/photo.jpg", 100, 100),
        ];
        assert_eq!(
            select_main_image(&images),
            Some("https://cdn.example/photo.jpg")
        );
    }

    #[test]
    fn skips_known_non_content_assets() {
        let images = vec![
            img("https://static.example/emoji/1f600.png", 3000, 3000),
            img("https://static.example/rsrc.php/sprite.png", 3000, 3000),
            img("https://cdn.example/photo.jpg", 640, 480),
        ];
        assert_eq!(
            select_main_image(&images),
            Some("https://cdn.example/photo.jpg")
        );
    }

    #[test]
    fn zero_area_images_never_win() {
        let images = vec![
            img("https://cdn.example/unloaded.jpg", 0, 0),
            img("https://cdn.example/half-loaded.jpg", 640, 0),
        ];
        assert_eq!(select_main_image(&images), None);
    }

    #[test]
    fn empty_page_yields_none() {
        assert_eq!(select_main_image(&[]), None);
    }
}

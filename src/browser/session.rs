//! Visible Chrome session driven over CDP
//!
//! The session is created once, pointed at the target post, and left alone
//! while the operator logs in by hand. After that it only answers two
//! questions for the walker: "what is the main image right now" and
//! "advance the carousel".

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::browser::extract::{select_main_image, ImageElement, COLLECT_IMAGES_JS};
use crate::config::GrabConfig;
use crate::error::{GrabError, Result};
use crate::fetch::BROWSER_USER_AGENT;
use crate::walker::CarouselSource;

/// Pause before each enumeration so lazy-loaded images can appear.
const LAZY_LOAD_WAIT: Duration = Duration::from_millis(500);

/// One visible browser page plus the CDP plumbing behind it.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    image_load_timeout: Duration,
}

impl BrowserSession {
    /// Launch a visible Chrome with a fixed window and a realistic user agent,
    /// then open the target post.
    pub async fn launch(config: &GrabConfig) -> Result<Self> {
        let browser_config = BrowserConfig::builder()
            .with_head()
            .viewport(None)
            .arg("--window-size=1280,900")
            .arg(format!("--user-agent={}", BROWSER_USER_AGENT))
            .build()
            .map_err(GrabError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
        });

        info!("Navigating to: {}", config.target_url);
        let page = browser.new_page(config.target_url.as_str()).await?;
        page.wait_for_navigation().await?;

        Ok(Self {
            browser,
            page,
            handler_task,
            image_load_timeout: config.image_load_timeout,
        })
    }

    /// Snapshot the browser context's cookies into a name → value map for the
    /// HTTP fetchers. Taken once after manual login; never refreshed.
    pub async fn cookie_jar(&self) -> Result<HashMap<String, String>> {
        let cookies = self.page.get_cookies().await?;
        let jar: HashMap<String, String> = cookies
            .into_iter()
            .map(|c| (c.name, c.value))
            .collect();
        info!("Captured {} session cookies", jar.len());
        Ok(jar)
    }

    /// Enumerate every `<img>` currently in the page with its natural
    /// dimensions.
    async fn collect_images(&self) -> Result<Vec<ImageElement>> {
        let result = self.page.evaluate(COLLECT_IMAGES_JS).await?;
        result
            .into_value()
            .map_err(|e| GrabError::BrowserOperation(format!("image enumeration: {}", e)))
    }

    /// Close the page and shut the browser process down.
    ///
    /// Called on every exit path so no live Chrome is left behind.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser did not exit cleanly: {}", e);
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl CarouselSource for BrowserSession {
    /// Best-candidate image URL of the currently displayed carousel position.
    ///
    /// Polls the page (with a lazy-load pause between rounds) until a
    /// qualifying image appears or the extraction timeout elapses. CDP errors
    /// are logged and treated as "no image": the walker decides whether that
    /// ends the run.
    async fn main_image_src(&self) -> Option<String> {
        let deadline = Instant::now() + self.image_load_timeout;
        loop {
            sleep(LAZY_LOAD_WAIT).await;
            match self.collect_images().await {
                Ok(images) => {
                    if let Some(src) = select_main_image(&images) {
                        return Some(src.to_string());
                    }
                    debug!("No qualifying image among {} elements", images.len());
                }
                Err(e) => warn!("Could not extract image src: {}", e),
            }
            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    /// Send a Right-arrow key press to move the carousel to the next image.
    async fn advance(&self) -> Result<()> {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key("ArrowRight")
            .build()
            .map_err(GrabError::BrowserOperation)?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key("ArrowRight")
            .build()
            .map_err(GrabError::BrowserOperation)?;

        self.page.execute(down).await?;
        self.page.execute(up).await?;
        Ok(())
    }
}

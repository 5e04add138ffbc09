//! Controlled-browser session and main-image extraction

pub mod extract;
pub mod session;

pub use extract::{select_main_image, ImageElement};
pub use session::BrowserSession;

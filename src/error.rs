//! Error types for carousel-dl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Browser operation failed: {0}")]
    BrowserOperation(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("File system error")]
    FsError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GrabError>;

//! Error types for metascrape-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

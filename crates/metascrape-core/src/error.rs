//! Error types for metascrape-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The apex response did not identify the expected service. Fatal for
    /// the whole crawl; scraping the wrong service produces meaningless data.
    #[error("expected metadata service with Server: {expected}, instead got Server: {actual}")]
    WrongService { expected: String, actual: String },

    /// A hostname-bearing entry did not match the compute-hostname
    /// convention. Fatal for that route; silent pass-through would leak the
    /// real address.
    #[error("unable to sanitize hostname: {0}")]
    MalformedHostname(String),

    /// The credential endpoint did not parse as the expected JSON document.
    /// Fatal for that route; it must not be emitted unsanitized.
    #[error("credential document at {path} did not parse: {reason}")]
    MalformedCredentialDocument { path: String, reason: String },

    /// Transport or status failure for one path. Recoverable; the path is
    /// skipped and sibling branches continue.
    #[error("fetch failed for {path}: {reason}")]
    Fetch { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

/// The `Server` header value the EC2 metadata service responds with.
pub const EC2_SERVER_MARKER: &str = "EC2ws";

/// Process-wide crawl settings, passed to the engine at construction.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Cap on parallel in-flight fetches. The metadata service is a
    /// low-throughput local responder; keep this modest.
    pub max_concurrency: usize,

    /// Expected `Server` header value at the apex.
    pub identity_header_value: String,

    /// Final artifact location. Consumed by the binary, not the engine.
    pub output_path: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            identity_header_value: EC2_SERVER_MARKER.to_string(),
            output_path: PathBuf::from("metadata.json"),
        }
    }
}

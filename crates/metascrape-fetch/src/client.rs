use std::future::Future;

use bytes::Bytes;

use crate::error::{FetchError, Result};

/// A fully buffered HTTP response.
///
/// Header names are kept as returned by the transport. Hyper-based clients
/// normalize names to lowercase, so consumers must compare names
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchResponse {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Reject non-2xx responses.
    ///
    /// Kept separate from the transport so callers can inspect headers of an
    /// error response first (the crawler verifies service identity before
    /// caring about status).
    pub fn check_status(&self, url: &str) -> Result<&Self> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

/// Asynchronous HTTP client abstraction.
///
/// The minimal interface the crawler needs: one buffered GET. Implementations
/// handle their own redirect following and timeout configuration.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - In-memory implementations for testing
pub trait HttpClient: Send + Sync {
    /// Fetch a URL and buffer the entire response.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures (DNS, connection, timeout).
    /// Non-2xx statuses are not errors at this layer; use
    /// [`FetchResponse::check_status`].
    fn get(&self, url: &str) -> impl Future<Output = Result<FetchResponse>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use tracing::debug;

    use super::*;

    /// Production HTTP client implementation using reqwest.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a new ReqwestClient with default configuration.
        pub fn new() -> Result<Self> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        async fn get(&self, url: &str) -> Result<FetchResponse> {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_builder() {
                    FetchError::InvalidUrl(url.to_string())
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();

            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            debug!(url, status, len = body.len(), "fetched");

            Ok(FetchResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> FetchResponse {
        FetchResponse {
            status,
            headers: vec![("Server".to_string(), "EC2ws".to_string())],
            body: Bytes::from_static(b"latest\n"),
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let res = response(200);
        assert_eq!(res.header("server"), Some("EC2ws"));
        assert_eq!(res.header("SERVER"), Some("EC2ws"));
        assert_eq!(res.header("content-type"), None);
    }

    #[test]
    fn check_status_accepts_2xx() {
        assert!(response(200).check_status("http://x/").is_ok());
        assert!(response(204).check_status("http://x/").is_ok());
    }

    #[test]
    fn check_status_rejects_errors() {
        let err = response(404).check_status("http://x/a").unwrap_err();
        match err {
            FetchError::Status { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "http://x/a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

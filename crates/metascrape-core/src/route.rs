//! Data model: one [`Route`] per visited path, aggregated into a
//! [`ScrapeResult`] keyed by path.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use metascrape_fetch::FetchResponse;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Headers that vary between fetches without changing the tree's logical
/// content.
const VOLATILE_HEADERS: &[&str] = &["Date", "Content-Length", "Etag", "Last-Modified"];

/// Content type of the raw byte-array leaf (`user-data`).
const OCTET_STREAM: &str = "application/octet-stream";

/// How a route's response body is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    Text,
    Base64,
}

/// One observed endpoint in the metadata tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Normalized absolute path, always starting with `/`.
    pub path: String,

    /// Response headers, with the volatile set filtered out.
    pub headers: BTreeMap<String, String>,

    /// The body, as text or as a base64-encoded byte string.
    pub response: String,

    /// `Base64` exactly when the content type was `application/octet-stream`.
    pub response_encoding: ResponseEncoding,
}

impl Route {
    /// Build a route from a buffered response.
    ///
    /// Filters volatile headers, normalizes the path to start with `/`, and
    /// base64-encodes octet-stream bodies. Text bodies are decoded lossily;
    /// the service's listings are plain ASCII.
    pub fn from_response(path: impl Into<String>, response: &FetchResponse) -> Self {
        let mut path = path.into();
        if path.is_empty() {
            path.push('/');
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let headers = response
            .headers
            .iter()
            .filter(|(name, _)| !VOLATILE_HEADERS.iter().any(|v| v.eq_ignore_ascii_case(name)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let octet_stream = response
            .header("Content-Type")
            .is_some_and(|ct| ct == OCTET_STREAM);

        let (body, response_encoding) = if octet_stream {
            (STANDARD.encode(&response.body), ResponseEncoding::Base64)
        } else {
            (
                String::from_utf8_lossy(&response.body).into_owned(),
                ResponseEncoding::Text,
            )
        };

        Route {
            path,
            headers,
            response: body,
            response_encoding,
        }
    }

    /// The path with its first segment (the API version) stripped.
    ///
    /// Trailing slash is preserved iff the path ended in one. Display and
    /// debug only; traversal never consults this.
    pub fn path_postfix(&self) -> String {
        let components: Vec<&str> = self.path.split('/').filter(|c| !c.is_empty()).collect();
        let trailing = if self.path.ends_with('/') { "/" } else { "" };

        format!(
            "{}{}",
            components.get(1..).unwrap_or_default().join("/"),
            trailing
        )
    }
}

/// Aggregate of every sanitized route, keyed by path.
///
/// BTreeMap keys give the sorted serialization the output artifact wants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub routes: BTreeMap<String, Route>,
}

impl ScrapeResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, keyed by its path. Last write wins.
    ///
    /// Each path is visited exactly once by construction, so a duplicate is
    /// an anomaly worth surfacing rather than a guarantee to rely on.
    pub fn insert(&mut self, route: Route) {
        if self.routes.contains_key(&route.path) {
            warn!(path = %route.path, "duplicate route path, overwriting");
        }
        self.routes.insert(route.path.clone(), route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn text_route(path: &str) -> Route {
        Route {
            path: path.to_string(),
            headers: BTreeMap::new(),
            response: String::new(),
            response_encoding: ResponseEncoding::Text,
        }
    }

    #[test]
    fn path_postfix_strips_version() {
        assert_eq!(
            text_route("/latest/meta-data/local-hostname").path_postfix(),
            "meta-data/local-hostname"
        );
    }

    #[test]
    fn path_postfix_keeps_trailing_slash() {
        assert_eq!(
            text_route("/latest/meta-data/public-keys/").path_postfix(),
            "meta-data/public-keys/"
        );
    }

    #[test]
    fn from_response_filters_volatile_headers() {
        let response = FetchResponse {
            status: 200,
            headers: vec![
                ("Accept-Ranges".to_string(), "none".to_string()),
                ("Content-Length".to_string(), "230".to_string()),
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Date".to_string(), "Mon, 15 Jul 2019 19:43:30 GMT".to_string()),
                ("Etag".to_string(), "abcdefg".to_string()),
                (
                    "Last-Modified".to_string(),
                    "Thu, 11 Jul 2019 23:18:47 GMT".to_string(),
                ),
                ("Server".to_string(), "EC2ws".to_string()),
            ],
            body: Bytes::from_static(b"latest\n"),
        };

        let route = Route::from_response("/", &response);

        assert!(!route.headers.contains_key("Content-Length"));
        assert!(!route.headers.contains_key("Date"));
        assert!(!route.headers.contains_key("Etag"));
        assert!(!route.headers.contains_key("Last-Modified"));
        assert!(route.headers.contains_key("Server"));
        assert!(route.headers.contains_key("Accept-Ranges"));
    }

    #[test]
    fn from_response_encodes_octet_stream_as_base64() {
        let response = FetchResponse {
            status: 200,
            headers: vec![(
                "Content-Type".to_string(),
                "application/octet-stream".to_string(),
            )],
            body: Bytes::from_static(b"hello"),
        };

        let route = Route::from_response("/latest/user-data", &response);

        assert_eq!(route.response_encoding, ResponseEncoding::Base64);
        assert_eq!(route.response, "aGVsbG8=");
    }

    #[test]
    fn from_response_normalizes_path() {
        let response = FetchResponse {
            status: 200,
            headers: vec![],
            body: Bytes::from_static(b""),
        };

        assert_eq!(Route::from_response("", &response).path, "/");
        assert_eq!(Route::from_response("latest", &response).path, "/latest");
    }

    #[test]
    fn result_serializes_with_routes_container() {
        let mut result = ScrapeResult::new();
        result.insert(text_route("/latest"));
        result.insert(text_route("/"));

        let json = serde_json::to_value(&result).unwrap();
        let routes = json.get("routes").unwrap().as_object().unwrap();

        // object keys come out sorted
        let keys: Vec<&String> = routes.keys().collect();
        assert_eq!(keys, ["/", "/latest"]);
        assert_eq!(
            routes["/latest"]["response_encoding"],
            serde_json::json!("text")
        );
    }

    #[test]
    fn duplicate_insert_is_last_write_wins() {
        let mut result = ScrapeResult::new();
        let mut first = text_route("/latest");
        first.response = "one".to_string();
        let mut second = text_route("/latest");
        second.response = "two".to_string();

        result.insert(first);
        result.insert(second);

        assert_eq!(result.len(), 1);
        assert_eq!(result.routes["/latest"].response, "two");
    }
}

//! Crawling and sanitizing of EC2-style instance metadata trees.
//!
//! # Architecture
//!
//! - [`route`] - Data model and path-keyed aggregation
//! - [`classify`] - Pure classification of directory-listing entries
//! - [`crawl`] - The traversal engine, generic over an HTTP client
//! - [`sanitize`] - Ordered rewrite pipeline for sensitive values
//!
//! The metadata tree has no declared schema; structure is inferred from the
//! trailing-slash convention in listings plus a small set of fixed-name
//! special cases. The engine centralizes those cases as node kinds so every
//! visited path emits exactly one [`Route`].

pub mod classify;
mod config;
mod crawl;
mod error;
pub mod route;
pub mod sanitize;

pub use config::{EC2_SERVER_MARKER, ScrapeConfig};
pub use crawl::{CrawlFailure, CrawlOutcome, Crawler};
pub use error::{Error, Result};
pub use route::{ResponseEncoding, Route, ScrapeResult};

//! Buffered HTTP fetching for metadata-service crawling.
//!
//! The metadata service is a low-throughput local responder serving small
//! text bodies, so this crate deliberately buffers whole responses instead
//! of streaming. The [`HttpClient`] trait is the seam: the crawler is
//! generic over it, and tests substitute an in-memory implementation.

mod client;
mod error;

pub use client::{FetchResponse, HttpClient};
pub use error::{FetchError, Result};

#[cfg(feature = "reqwest")]
pub use client::ReqwestClient;

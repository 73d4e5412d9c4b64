//! Resilient HTTP core shared by every feature module.

mod client;
mod url;

pub use client::{
    exponential_backoff, ApiError, ClientConfig, PollinationsClient, RequestBody, RequestOptions,
    Timeout, DEFAULT_MAX_RETRIES, DEFAULT_REFERRER, DEFAULT_TIMEOUT, IMAGE_API, TEXT_API,
};
pub use url::UrlBuilder;

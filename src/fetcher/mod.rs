//! Transport abstraction.
//!
//! A [`Fetcher`] performs exactly one request and reports what came back.
//! It knows nothing about resources, caching or JSON; the
//! [`Client`](crate::Client) interprets the bytes. Swapping the fetcher
//! (network, fixtures on disk, an in-memory map, or any of those wrapped in
//! a [`LoggingFetcher`]) changes nothing else.

mod filesystem;
mod logging;
mod memory;
mod network;

pub use filesystem::FilesystemFetcher;
pub use logging::LoggingFetcher;
pub use memory::MemoryFetcher;
pub use network::NetworkFetcher;

use crate::{metadata::RequestMetadata, response::FetchResponse, Result};
use async_trait::async_trait;

/// Body served by the test fetchers when nothing matches a request.
pub(crate) const NOT_FOUND_BODY: &[u8] = br#"{"message": "Resource not found."}"#;

/// Performs a single request.
///
/// Implementations must not retry, must not interpret the status code and
/// must return non-2xx responses as `Ok`. Only failures to obtain *any*
/// response (connection refused, unreadable fixture, timeout) are errors.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use spindle::{fetcher::Fetcher, FetchResponse, RequestMetadata, Result};
/// use http::StatusCode;
///
/// struct AlwaysEmpty;
///
/// #[async_trait]
/// impl Fetcher for AlwaysEmpty {
///     async fn fetch(&self, _request: &RequestMetadata) -> Result<FetchResponse> {
///         Ok(FetchResponse::new(StatusCode::NO_CONTENT, Vec::new()))
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs `request` and returns the status, body and headers.
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}

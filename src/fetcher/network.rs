use super::Fetcher;
use crate::{metadata::RequestMetadata, response::FetchResponse, Error, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use url::Url;

/// Fetches over HTTP with `reqwest`.
///
/// Paths are resolved against `base_url`; headers (including the
/// `User-Agent` the client adds) are sent as given.
pub struct NetworkFetcher {
    http_client: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl NetworkFetcher {
    /// Creates a fetcher rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            base_url,
            timeout: None,
        })
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &RequestMetadata) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", prefix, request.path));

        if !request.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_params.iter());
        }
        url
    }
}

#[async_trait]
impl Fetcher for NetworkFetcher {
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse> {
        let url = self.url_for(request);

        tracing::debug!(
            method = %request.method,
            url = %url,
            "Executing HTTP request"
        );

        let mut builder = self.http_client.request(request.method.clone(), url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let start_time = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        tracing::trace!(
            status = status.as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            bytes = body.len(),
            "Transport round trip complete"
        );

        Ok(FetchResponse {
            status,
            body,
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_url_for_joins_path_and_query() {
        let fetcher = NetworkFetcher::new("https://api.example.com").unwrap();
        let request = RequestMetadata::new(Method::GET, "/artists/1/releases")
            .with_query_param("page", "2")
            .with_query_param("per_page", "50");

        assert_eq!(
            fetcher.url_for(&request).as_str(),
            "https://api.example.com/artists/1/releases?page=2&per_page=50"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_prefix() {
        let fetcher = NetworkFetcher::new("https://example.com/api/").unwrap();
        let request = RequestMetadata::new(Method::GET, "/users/example");

        assert_eq!(
            fetcher.url_for(&request).as_str(),
            "https://example.com/api/users/example"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            NetworkFetcher::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}

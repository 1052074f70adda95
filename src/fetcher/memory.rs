use super::{Fetcher, NOT_FOUND_BODY};
use crate::{metadata::RequestMetadata, response::FetchResponse, Result};
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned responses from a map, for tests.
///
/// Keys are the request path, followed by `?` and the sorted query string
/// when there are query parameters. The method is not part of the key.
/// The map can be replaced while the fetcher is in use.
///
/// # Examples
///
/// ```
/// use spindle::fetcher::MemoryFetcher;
/// use http::StatusCode;
///
/// let fetcher = MemoryFetcher::new();
/// fetcher.insert("/artists/1", r#"{"id": 1, "name": "Badger"}"#, StatusCode::OK);
/// fetcher.insert("/204", "", StatusCode::NO_CONTENT);
/// ```
#[derive(Default)]
pub struct MemoryFetcher {
    responses: Mutex<HashMap<String, (Vec<u8>, StatusCode)>>,
}

impl MemoryFetcher {
    /// Creates an empty fetcher; every request answers 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher serving `responses`.
    pub fn with_responses<K, B>(responses: impl IntoIterator<Item = (K, (B, StatusCode))>) -> Self
    where
        K: Into<String>,
        B: Into<Vec<u8>>,
    {
        let fetcher = Self::new();
        fetcher.set_responses(responses);
        fetcher
    }

    /// Adds or replaces one canned response.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>, status: StatusCode) {
        self.lock().insert(key.into(), (body.into(), status));
    }

    /// Replaces every canned response.
    pub fn set_responses<K, B>(&self, responses: impl IntoIterator<Item = (K, (B, StatusCode))>)
    where
        K: Into<String>,
        B: Into<Vec<u8>>,
    {
        let mut map = self.lock();
        map.clear();
        map.extend(
            responses
                .into_iter()
                .map(|(key, (body, status))| (key.into(), (body.into(), status))),
        );
    }

    /// The lookup key for a request.
    pub fn key_for(request: &RequestMetadata) -> String {
        let query = request.query_string();
        if query.is_empty() {
            request.path.clone()
        } else {
            format!("{}?{}", request.path, query)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, StatusCode)>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse> {
        let key = Self::key_for(request);
        let response = match self.lock().get(&key) {
            Some((body, status)) => FetchResponse::new(*status, body.clone()),
            None => {
                tracing::debug!(key = %key, "No canned response for request");
                FetchResponse::new(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
            }
        };
        Ok(response)
    }
}

use super::Fetcher;
use crate::{metadata::RequestMetadata, response::FetchResponse, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Records every request before handing it to the wrapped fetcher.
///
/// Results are passed through untouched. History is unbounded unless
/// created with [`LoggingFetcher::with_capacity`], in which case only the
/// most recent requests are kept.
///
/// # Examples
///
/// ```
/// use spindle::fetcher::{LoggingFetcher, MemoryFetcher};
///
/// let fetcher = LoggingFetcher::new(MemoryFetcher::new());
/// assert!(fetcher.last_request().is_none());
/// assert!(fetcher.requests().is_empty());
/// ```
pub struct LoggingFetcher<F> {
    inner: F,
    capacity: Option<usize>,
    history: Mutex<VecDeque<RequestMetadata>>,
}

impl<F: Fetcher> LoggingFetcher<F> {
    /// Wraps `inner`, keeping every request.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            capacity: None,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Wraps `inner`, keeping at most `capacity` recent requests.
    pub fn with_capacity(inner: F, capacity: usize) -> Self {
        Self {
            inner,
            capacity: Some(capacity),
            history: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<RequestMetadata> {
        self.lock().back().cloned()
    }

    /// Recorded requests, oldest first.
    pub fn requests(&self) -> Vec<RequestMetadata> {
        self.lock().iter().cloned().collect()
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets every recorded request.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, request: &RequestMetadata) {
        let mut history = self.lock();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while history.len() >= capacity {
                history.pop_front();
            }
        }
        history.push_back(request.clone());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RequestMetadata>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for LoggingFetcher<F> {
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse> {
        tracing::trace!(
            method = %request.method,
            path = %request.path,
            query = %request.query_string(),
            "Recording request"
        );
        self.record(request);
        self.inner.fetch(request).await
    }
}

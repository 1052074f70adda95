//! Request description handed to a [`Fetcher`](crate::fetcher::Fetcher).

use http::{HeaderMap, Method};
use std::collections::BTreeMap;

/// Everything a fetcher needs to perform one request.
///
/// Query parameters are kept ordered by key so that the same logical
/// request always renders to the same query string. Recorded verbatim by
/// [`LoggingFetcher`](crate::fetcher::LoggingFetcher).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path (relative to the API root).
    pub path: String,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// Query parameters for this request.
    pub query_params: BTreeMap<String, String>,

    /// Serialized JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: BTreeMap::new(),
            body: None,
        }
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Attaches a raw body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Renders the query parameters as `k=v&k=v`, form-encoded.
    ///
    /// Returns an empty string when there are no parameters.
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_params.iter())
            .finish()
    }

    /// The decoded JSON body, if the body is present and valid JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

//! Client owning the transport and handing out resource proxies.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure and create clients.

use crate::{
    fetcher::{Fetcher, NetworkFetcher},
    kind::{Identifier, ItemKind, ResourceKind},
    metadata::RequestMetadata,
    object::ApiObject,
    paginated::PaginatedList,
    response::{FetchResponse, Payload},
    Error, Result,
};
use http::{
    header::{CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// The public Discogs API.
pub const DEFAULT_BASE_URL: &str = "https://api.discogs.com";

/// Environment variable read by [`ClientBuilder::from_env`] for the user-agent.
pub const USER_AGENT_ENV: &str = "SPINDLE_USER_AGENT";

/// Environment variable read by [`ClientBuilder::from_env`] for the base URL.
pub const BASE_URL_ENV: &str = "SPINDLE_BASE_URL";

/// A client for the resource API.
///
/// Cheap to clone; clones share the fetcher and configuration. Building
/// proxies never touches the network. Requests fail with
/// [`Error::Configuration`] until a non-empty user-agent is set.
///
/// # Examples
///
/// ```no_run
/// use spindle::Client;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), spindle::Error> {
/// let client = Client::builder()
///     .user_agent("my-app/1.0 +https://example.org")
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let mut release = client.release(1);
/// println!("{:?}", release.get("title").await?.as_str());
///
/// let mut results = client.search("trash80", [("type", "artist")]);
/// println!("{} artists", results.len().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
    user_agent: Option<String>,
    default_headers: HeaderMap,
}

/// A price, as returned by the marketplace fee endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub value: f64,
    pub currency: String,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a network-backed client with the given user-agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built. An empty
    /// user-agent is not reported here but on the first request.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        Self::builder().user_agent(user_agent).build()
    }

    /// The configured user-agent, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.inner.user_agent.as_deref()
    }

    /// The base URL of the default network fetcher.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Performs one request and decodes the response.
    ///
    /// - 204, or any 2xx with an empty body, yields [`Payload::NoContent`].
    /// - Other 2xx bodies are decoded as JSON.
    /// - Non-2xx fails with [`Error::Http`], never retried.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if no usable user-agent is set; this is
    /// checked before anything is sent.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &BTreeMap<String, String>,
        data: Option<&Value>,
    ) -> Result<Payload> {
        let user_agent = self.user_agent_header()?;

        let mut metadata = RequestMetadata::new(method, path).with_query_params(params.clone());
        metadata.headers = self.inner.default_headers.clone();
        metadata.headers.insert(USER_AGENT, user_agent);

        if let Some(data) = data {
            let body =
                serde_json::to_vec(data).map_err(|e| Error::SerializationFailed(e.to_string()))?;
            metadata
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            metadata.body = Some(body);
        }

        tracing::debug!(
            method = %metadata.method,
            path = %metadata.path,
            query = %metadata.query_string(),
            "Sending request"
        );

        let start_time = Instant::now();
        let response = self.inner.fetcher.fetch(&metadata).await?;
        let latency = start_time.elapsed();

        tracing::info!(
            method = %metadata.method,
            path = %metadata.path,
            status = response.status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received response"
        );

        parse_response(response)
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<Payload> {
        self.request(Method::GET, path, &BTreeMap::new(), None).await
    }

    /// POST `body` to `path`.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Payload> {
        self.request(Method::POST, path, &BTreeMap::new(), Some(body))
            .await
    }

    /// PUT `body` to `path`.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Payload> {
        self.request(Method::PUT, path, &BTreeMap::new(), Some(body))
            .await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> Result<Payload> {
        self.request(Method::DELETE, path, &BTreeMap::new(), None)
            .await
    }

    /// A proxy for any kind. No request is made.
    pub fn object(&self, kind: ResourceKind, id: impl Into<Identifier>) -> ApiObject {
        ApiObject::new(self.clone(), kind, id)
    }

    /// The artist `id`. No request is made.
    pub fn artist(&self, id: u64) -> ApiObject {
        self.object(ResourceKind::Artist, id)
    }

    /// The release `id`. No request is made.
    pub fn release(&self, id: u64) -> ApiObject {
        self.object(ResourceKind::Release, id)
    }

    /// The master release `id`. No request is made.
    pub fn master(&self, id: u64) -> ApiObject {
        self.object(ResourceKind::Master, id)
    }

    /// The label `id`. No request is made.
    pub fn label(&self, id: u64) -> ApiObject {
        self.object(ResourceKind::Label, id)
    }

    /// The user `username`. No request is made.
    pub fn user(&self, username: impl Into<String>) -> ApiObject {
        self.object(ResourceKind::User, Identifier::Name(username.into()))
    }

    /// The user the client is authenticated as.
    ///
    /// Unlike the other constructors this performs one request: the
    /// username is not known until the server says so. The returned proxy
    /// is seeded with the identity response and equals
    /// `client.user(<username>)`.
    pub async fn identity(&self) -> Result<ApiObject> {
        let data = self.get("/oauth/identity").await?.into_object()?;
        let user = ApiObject::from_data(self.clone(), ResourceKind::User, data);

        if user.id().is_none() {
            return Err(Error::UnexpectedResponse(
                "identity response carries no username".to_string(),
            ));
        }
        Ok(user)
    }

    /// Searches the database. No request is made until the results are read.
    ///
    /// Each result is resolved to its own kind from its `type` field.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use spindle::Client;
    /// # async fn example(client: Client) -> spindle::Result<()> {
    /// let mut results = client.search("Persuader", [("type", "artist"), ("country", "Sweden")]);
    /// let first = results.get(0).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn search<K, V>(
        &self,
        query: impl Into<String>,
        filters: impl IntoIterator<Item = (K, V)>,
    ) -> PaginatedList
    where
        K: Into<String>,
        V: Into<String>,
    {
        PaginatedList::new(self.clone(), "/database/search", "results", ItemKind::Mixed)
            .with_params(filters)
            .with_params([("q", query.into())])
    }

    /// The marketplace fee for selling at `amount` in `currency`.
    pub async fn fee_for(&self, amount: f64, currency: &str) -> Result<Money> {
        let path = format!("/marketplace/fee/{:.4}/{}", amount, currency);
        let value = match self.get(&path).await? {
            Payload::Json(value) => value,
            Payload::NoContent => {
                return Err(Error::UnexpectedResponse(format!("{} returned no content", path)))
            }
        };

        serde_json::from_value(value).map_err(|e| {
            Error::UnexpectedResponse(format!("{} returned an invalid price: {}", path, e))
        })
    }

    fn user_agent_header(&self) -> Result<HeaderValue> {
        let user_agent = self
            .inner
            .user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "Invalid User-Agent: every request needs a non-empty User-Agent; \
                     set one with ClientBuilder::user_agent"
                        .to_string(),
                )
            })?;

        HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Configuration(format!("Invalid User-Agent: {}", e)))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("user_agent", &self.inner.user_agent)
            .finish_non_exhaustive()
    }
}

/// Turns a fetch result into a payload or an [`Error::Http`].
fn parse_response(response: FetchResponse) -> Result<Payload> {
    let status = response.status;

    if !status.is_success() {
        let raw_response = response.text();
        let message = error_message(status, &raw_response);

        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                response = %raw_response,
                "Client error (4xx)"
            );
        } else {
            tracing::warn!(
                status = status.as_u16(),
                response = %raw_response,
                "Server error"
            );
        }

        return Err(Error::Http {
            status,
            message,
            raw_response,
        });
    }

    if status == StatusCode::NO_CONTENT || response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::NoContent);
    }

    match serde_json::from_slice(&response.body) {
        Ok(value) => Ok(Payload::Json(value)),
        Err(e) => {
            let raw_response = response.text();
            tracing::error!(
                error = %e,
                raw_response = %raw_response,
                "Failed to deserialize response"
            );

            Err(Error::DeserializationFailed {
                raw_response,
                serde_error: e.to_string(),
                status,
            })
        }
    }
}

/// The message carried by an error body, or a fallback keyed by status.
fn error_message(status: StatusCode, raw_response: &str) -> String {
    if let Ok(body) = serde_json::from_str::<Value>(raw_response) {
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    let trimmed = raw_response.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    match status {
        StatusCode::NOT_FOUND => "Resource not found.".to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use spindle::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), spindle::Error> {
/// let client = ClientBuilder::new()
///     .user_agent("my-app/1.0 +https://example.org")
///     .base_url("https://api.discogs.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("Authorization", "Discogs token=abcxyz123456")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    user_agent: Option<String>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            user_agent: None,
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            fetcher: None,
        }
    }

    /// Creates a builder from `SPINDLE_USER_AGENT` and `SPINDLE_BASE_URL`.
    ///
    /// Unset variables leave the defaults in place.
    ///
    /// # Errors
    ///
    /// Returns an error if `SPINDLE_BASE_URL` is set but invalid.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            builder = builder.user_agent(user_agent);
        }
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            builder = builder.base_url(base_url)?;
        }
        Ok(builder)
    }

    /// Sets the user-agent sent with every request.
    ///
    /// Not validated here; a missing or malformed user-agent surfaces as
    /// [`Error::Configuration`] on the first request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the base URL of the default network fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout of the default network fetcher.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the default network fetcher.
    ///
    /// The base URL and timeout only configure the default fetcher and are
    /// ignored once a fetcher is given.
    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default network fetcher cannot be built.
    pub fn build(self) -> Result<Client> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let mut network = NetworkFetcher::new(base_url.as_str())?;
                if let Some(timeout) = self.timeout {
                    network = network.with_timeout(timeout);
                }
                Arc::new(network)
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                fetcher,
                base_url,
                user_agent: self.user_agent,
                default_headers: self.default_headers,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{LoggingFetcher, MemoryFetcher};

    fn memory_client(user_agent: &str) -> (Client, Arc<LoggingFetcher<MemoryFetcher>>) {
        let memory = MemoryFetcher::new();
        memory.insert("/artists/1", r#"{"id": 1, "name": "Badger"}"#, StatusCode::OK);
        memory.insert("/500", r#"{"message": "mushroom"}"#, StatusCode::INTERNAL_SERVER_ERROR);
        memory.insert("/204", "", StatusCode::NO_CONTENT);
        memory.insert("/null", "null", StatusCode::OK);
        memory.insert("/teapot", "", StatusCode::IM_A_TEAPOT);
        let fetcher = Arc::new(LoggingFetcher::new(memory));

        let client = Client::builder()
            .user_agent(user_agent)
            .fetcher(fetcher.clone())
            .build()
            .unwrap();
        (client, fetcher)
    }

    #[tokio::test]
    async fn test_missing_user_agent_fails_lazily() {
        let (client, fetcher) = memory_client("");

        // Building proxies is fine.
        let mut artist = client.artist(1);
        assert!(fetcher.is_empty());

        let err = artist.get("name").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("User-Agent"));
        assert!(fetcher.is_empty());
    }

    #[tokio::test]
    async fn test_user_agent_header_is_sent() {
        let (client, fetcher) = memory_client("spindle-tests/0.1");
        client.get("/artists/1").await.unwrap();

        let request = fetcher.last_request().unwrap();
        assert_eq!(
            request.headers.get(USER_AGENT).unwrap(),
            "spindle-tests/0.1"
        );
    }

    #[tokio::test]
    async fn test_http_error_uses_body_message() {
        let (client, _) = memory_client("ua");

        match client.get("/500").await {
            Err(Error::Http {
                status, message, ..
            }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "mushroom");
            }
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_falls_back_to_status() {
        let (client, _) = memory_client("ua");

        let err = client.get("/teapot").await.unwrap_err();
        assert_eq!(err.to_string(), "418: I'm a teapot");
    }

    #[tokio::test]
    async fn test_no_content_is_distinct_from_null() {
        let (client, _) = memory_client("ua");

        assert_eq!(client.get("/204").await.unwrap(), Payload::NoContent);
        assert_eq!(client.get("/null").await.unwrap(), Payload::Json(Value::Null));
    }

    #[tokio::test]
    async fn test_post_serializes_body() {
        let (client, fetcher) = memory_client("ua");
        let _ = client
            .post("/artists/1", &serde_json::json!({"name": "Honey Badger"}))
            .await;

        let request = fetcher.last_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.json_body(),
            Some(serde_json::json!({"name": "Honey Badger"}))
        );
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_constructors_do_not_fetch() {
        let (client, fetcher) = memory_client("ua");

        let user = client.user("example");
        let master = client.master(4242);

        assert_eq!(user.path(), Some("/users/example"));
        assert_eq!(master.path(), Some("/masters/4242"));
        assert!(fetcher.is_empty());
    }

    #[test]
    fn test_search_query_params() {
        let (client, _) = memory_client("ua");
        let results = client.search("trash80", [("type", "artist")]);

        assert_eq!(results.path(), "/database/search");
        assert_eq!(results.known_count(), None);
    }

    #[test]
    fn test_error_message_prefers_raw_text() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, "plain failure"),
            "plain failure"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, ""),
            "Resource not found."
        );
    }

    #[test]
    fn test_invalid_default_header_is_configuration_error() {
        assert!(matches!(
            ClientBuilder::new().default_header("bad header", "x"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            ClientBuilder::new().default_header("Authorization", "line\nbreak"),
            Err(Error::Configuration(_))
        ));
    }
}

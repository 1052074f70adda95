//! Lazy, cached proxies for remote resources.
//!
//! An [`ApiObject`] starts out knowing little more than its kind and
//! identifier. The first read of a field it does not have triggers one
//! fetch of the full representation; everything after that is served from
//! memory. Writes are staged and only reach the server on [`ApiObject::save`].

use crate::{
    field::{FieldKind, FieldValue, Lookup},
    kind::{Identifier, ResourceKind},
    paginated::PaginatedList,
    wantlist::Wantlist,
    Client, Error, Result,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A handle to one remote resource.
///
/// Reading takes `&mut self` because a read may fetch and fill the cache;
/// the check-miss-fetch-merge sequence therefore cannot race. To share a
/// proxy between tasks, wrap it in a mutex.
///
/// Two proxies are equal when they have the same kind and identifier,
/// regardless of how much of either is cached.
///
/// # Examples
///
/// ```no_run
/// use spindle::Client;
///
/// # async fn example() -> spindle::Result<()> {
/// let client = Client::new("my-app/1.0 +https://example.org")?;
///
/// let mut artist = client.artist(1); // no request yet
/// let name = artist.get("name").await?; // one GET /artists/1
/// let real_name = artist.get("real_name").await?; // served from cache
/// println!("{:?} / {:?}", name.as_str(), real_name.as_str());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiObject {
    client: Client,
    kind: ResourceKind,
    id: Option<Identifier>,
    path: Option<String>,
    data: Map<String, Value>,
    changes: Map<String, Value>,
    known_invalid_keys: HashSet<String>,
    known_data_complete: bool,
}

impl ApiObject {
    /// Creates a proxy knowing only its identifier. No request is made.
    pub fn new(client: Client, kind: ResourceKind, id: impl Into<Identifier>) -> Self {
        let id = id.into();
        let mut data = Map::new();
        data.insert(kind.id_key().to_string(), id.to_value());
        Self::from_data(client, kind, data)
    }

    /// Creates a proxy seeded with partial data, e.g. a listing item or an
    /// embedded object. No request is made.
    pub fn from_data(client: Client, kind: ResourceKind, data: Map<String, Value>) -> Self {
        let id = data.get(kind.id_key()).and_then(Identifier::from_value);
        let path = id.as_ref().and_then(|id| kind.path_for(id));

        Self {
            client,
            kind,
            id,
            path,
            data,
            changes: Map::new(),
            known_invalid_keys: HashSet::new(),
            known_data_complete: false,
        }
    }

    /// Overrides the path of the full representation.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> Option<&Identifier> {
        self.id.as_ref()
    }

    /// Where the full representation lives, if the object is addressable.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns `true` if the object can fetch its own representation.
    pub fn is_addressable(&self) -> bool {
        self.path.is_some()
    }

    /// The cached raw data.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Staged writes, keyed by raw key.
    pub fn changes(&self) -> &Map<String, Value> {
        &self.changes
    }

    /// Returns `true` once a full representation has been fetched.
    pub fn is_complete(&self) -> bool {
        self.known_data_complete
    }

    /// Returns `true` if `key` is confirmed absent on the server.
    pub fn is_known_invalid(&self, key: &str) -> bool {
        self.known_invalid_keys.contains(key)
    }

    /// The client used for fetches.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Rebinds the object to another client. Cached state is kept.
    pub fn set_client(&mut self, client: Client) {
        self.client = client;
    }

    /// Reads a field, fetching the full representation if needed.
    ///
    /// Names the kind does not declare are read as raw simple fields.
    /// Returns [`Lookup::NotPresent`] for fields the server's full
    /// representation does not carry; asking again does not fetch again.
    ///
    /// # Errors
    ///
    /// Fetch errors propagate unchanged. A failed fetch leaves the cache
    /// state as it was.
    pub async fn get(&mut self, name: &str) -> Result<Lookup> {
        let Some(field) = self.kind.field(name) else {
            return Ok(match self.lookup_raw(name).await? {
                Some(raw) => Lookup::Present(FieldValue::Raw(raw)),
                None => Lookup::NotPresent,
            });
        };

        if field.is_computed() {
            return Ok(self.computed(field.kind));
        }

        match self.lookup_raw(field.key).await? {
            Some(raw) => Ok(field
                .coerce(&raw, &self.client)?
                .map_or(Lookup::NotPresent, Lookup::Present)),
            None => Ok(Lookup::NotPresent),
        }
    }

    /// Reads a field from the cache only. Never fetches.
    ///
    /// Returns [`Lookup::Unfetched`] where [`ApiObject::get`] would fetch.
    pub fn peek(&self, name: &str) -> Result<Lookup> {
        let field = self.kind.field(name);
        if let Some(field) = field.filter(|field| field.is_computed()) {
            return Ok(self.computed(field.kind));
        }

        let key = field.map_or(name, |field| field.key);
        match self.data.get(key) {
            Some(raw) => match field {
                Some(field) => Ok(field
                    .coerce(raw, &self.client)?
                    .map_or(Lookup::NotPresent, Lookup::Present)),
                None => Ok(Lookup::Present(FieldValue::Raw(raw.clone()))),
            },
            None if self.known_invalid_keys.contains(key) || self.known_data_complete => {
                Ok(Lookup::NotPresent)
            }
            None if !self.is_addressable() => {
                self.require_endpointless()?;
                Ok(Lookup::NotPresent)
            }
            None => Ok(Lookup::Unfetched),
        }
    }

    /// Stages a write to a writable field. No request is made.
    ///
    /// The new value is not visible to reads until it has been saved and
    /// re-fetched.
    ///
    /// # Errors
    ///
    /// [`Error::ImmutableField`] for read-only fields and
    /// [`Error::UnknownField`] for names the kind does not declare.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.kind.field(name).ok_or_else(|| Error::UnknownField {
            kind: self.kind,
            field: name.to_string(),
        })?;

        if !field.is_writable() {
            return Err(Error::ImmutableField {
                kind: self.kind,
                field: name.to_string(),
            });
        }

        tracing::debug!(kind = %self.kind, field = name, "Staging change");
        self.changes.insert(field.key.to_string(), value.into());
        Ok(())
    }

    /// Flushes staged changes, then re-fetches the confirmed state.
    ///
    /// Does nothing when there are no changes. Otherwise sends one POST
    /// with the changed fields followed by one GET.
    pub async fn save(&mut self) -> Result<()> {
        if self.changes.is_empty() {
            tracing::debug!(kind = %self.kind, "No changes to save");
            return Ok(());
        }

        let path = self.require_path()?.to_string();
        let body = Value::Object(self.changes.clone());
        self.client.post(&path, &body).await?;

        tracing::info!(
            kind = %self.kind,
            path = %path,
            fields = self.changes.len(),
            "Saved changes"
        );
        self.changes.clear();
        self.refresh().await
    }

    /// Deletes the resource on the server.
    ///
    /// The local proxy is left as is.
    pub async fn delete(&mut self) -> Result<()> {
        let path = self.require_path()?.to_string();
        self.client.delete(&path).await?;
        Ok(())
    }

    /// Fetches the full representation again and replaces the cache with
    /// it.
    ///
    /// Fields the server no longer returns become absent; only the
    /// identifier survives from the old cache. Keys previously confirmed
    /// absent are forgotten. Staged changes are kept. A failed refresh
    /// leaves the cache as it was.
    pub async fn refresh(&mut self) -> Result<()> {
        let fetched = self.fetch_representation().await?;

        let id_key = self.kind.id_key();
        let seed = self.data.remove(id_key);
        self.data = fetched;
        if let Some(seed) = seed {
            self.data.entry(id_key).or_insert(seed);
        }

        self.absorb_id();
        self.known_invalid_keys.clear();
        self.known_data_complete = true;
        Ok(())
    }

    async fn lookup_raw(&mut self, key: &str) -> Result<Option<Value>> {
        if let Some(raw) = self.data.get(key) {
            return Ok(Some(raw.clone()));
        }

        if self.known_invalid_keys.contains(key) {
            tracing::trace!(kind = %self.kind, key = key, "Known absent");
            return Ok(None);
        }

        if !self.is_addressable() {
            self.require_endpointless()?;
            return Ok(None);
        }

        if !self.known_data_complete {
            tracing::debug!(kind = %self.kind, key = key, "Cache miss");
            self.full_fetch().await?;

            if let Some(raw) = self.data.get(key) {
                return Ok(Some(raw.clone()));
            }
        }

        tracing::debug!(kind = %self.kind, key = key, "Marking key absent");
        self.known_invalid_keys.insert(key.to_string());
        Ok(None)
    }

    async fn full_fetch(&mut self) -> Result<()> {
        let fetched = self.fetch_representation().await?;
        self.data.extend(fetched);
        self.absorb_id();
        self.known_data_complete = true;
        Ok(())
    }

    async fn fetch_representation(&self) -> Result<Map<String, Value>> {
        let path = self.require_path()?;
        let fetched = self.client.get(path).await?.into_object()?;

        tracing::debug!(
            kind = %self.kind,
            path = %path,
            fields = fetched.len(),
            "Fetched full representation"
        );
        Ok(fetched)
    }

    fn absorb_id(&mut self) {
        if self.id.is_none() {
            self.id = self.data.get(self.kind.id_key()).and_then(Identifier::from_value);
        }
    }

    fn computed(&self, kind: FieldKind) -> Lookup {
        let Some(path) = self.path.as_deref() else {
            return Lookup::NotPresent;
        };

        match kind {
            FieldKind::Listing {
                suffix,
                list_key,
                items,
            } => Lookup::Present(FieldValue::List(PaginatedList::new(
                self.client.clone(),
                format!("{}/{}", path, suffix),
                list_key,
                items,
            ))),
            FieldKind::Wantlist => {
                Lookup::Present(FieldValue::Wantlist(Wantlist::new(self.client.clone(), path)))
            }
            _ => Lookup::NotPresent,
        }
    }

    /// Kinds with an endpoint of their own must carry an identifier;
    /// missing fields of an unidentified one cannot be told apart from
    /// absent ones.
    fn require_endpointless(&self) -> Result<()> {
        match self.kind.collection() {
            Some(_) => Err(Error::NotAddressable { kind: self.kind }),
            None => Ok(()),
        }
    }

    fn require_path(&self) -> Result<&str> {
        self.path.as_deref().ok_or(Error::NotAddressable { kind: self.kind })
    }
}

impl PartialEq for ApiObject {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.data == other.data,
            _ => false,
        }
    }
}

impl Eq for ApiObject {}

impl Hash for ApiObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

impl PartialEq<FieldValue> for ApiObject {
    fn eq(&self, other: &FieldValue) -> bool {
        match other {
            FieldValue::Object(object) => self == object,
            _ => false,
        }
    }
}

impl fmt::Debug for ApiObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiObject")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("path", &self.path)
            .field("complete", &self.known_data_complete)
            .field("cached_keys", &self.data.len())
            .field("changes", &self.changes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{LoggingFetcher, MemoryFetcher};
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn client_with(fetcher: Arc<LoggingFetcher<MemoryFetcher>>) -> Client {
        Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(fetcher)
            .build()
            .unwrap()
    }

    fn badger() -> Arc<LoggingFetcher<MemoryFetcher>> {
        let memory = MemoryFetcher::new();
        memory.insert(
            "/artists/1",
            r#"{"id": 1, "name": "Badger", "realname": "Mr. Badger"}"#,
            StatusCode::OK,
        );
        Arc::new(LoggingFetcher::new(memory))
    }

    #[tokio::test]
    async fn test_id_is_known_without_fetch() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);

        assert_eq!(artist.id(), Some(&Identifier::Id(1)));
        assert_eq!(artist.get("id").await.unwrap().as_u64(), Some(1));
        assert!(fetcher.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_fetches_once() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);

        assert!(artist.get("blorf").await.unwrap().is_not_present());
        assert_eq!(fetcher.len(), 1);
        assert!(artist.is_known_invalid("blorf"));

        assert!(artist.get("blorf").await.unwrap().is_not_present());
        assert_eq!(fetcher.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_object_marks_absent_without_fetch() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);

        artist.get("name").await.unwrap();
        assert!(artist.is_complete());
        assert!(artist.get("profile").await.unwrap().is_not_present());
        assert_eq!(fetcher.len(), 1);
        assert!(artist.is_known_invalid("profile"));
    }

    #[tokio::test]
    async fn test_peek_distinguishes_unfetched() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);

        assert!(matches!(artist.peek("name").unwrap(), Lookup::Unfetched));
        artist.get("name").await.unwrap();
        assert_eq!(artist.peek("real_name").unwrap().as_str(), Some("Mr. Badger"));
        assert!(artist.peek("profile").unwrap().is_not_present());
        assert_eq!(fetcher.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        let fetcher = Arc::new(LoggingFetcher::new(MemoryFetcher::new()));
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(2);

        let err = artist.get("name").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!artist.is_complete());
        assert!(!artist.is_known_invalid("name"));

        let _ = artist.get("name").await;
        assert_eq!(fetcher.len(), 2);
    }

    #[tokio::test]
    async fn test_set_rejects_read_only_before_any_request() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);

        let err = artist.set("name", "New Name").unwrap_err();
        assert!(matches!(err, Error::ImmutableField { ref field, .. } if field == "name"));

        let err = artist.set("nonsense", 1).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));

        assert!(artist.changes().is_empty());
        assert!(fetcher.is_empty());
    }

    #[tokio::test]
    async fn test_staged_change_is_not_read_back() {
        let memory = MemoryFetcher::new();
        memory.insert(
            "/users/example",
            r#"{"username": "example", "location": "Here"}"#,
            StatusCode::OK,
        );
        let fetcher = Arc::new(LoggingFetcher::new(memory));
        let client = client_with(fetcher.clone());
        let mut user = client.user("example");

        user.set("location", "There").unwrap();
        assert_eq!(user.get("location").await.unwrap().as_str(), Some("Here"));
        assert_eq!(user.changes().get("location"), Some(&json!("There")));
    }

    #[tokio::test]
    async fn test_save_without_changes_is_silent() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut user = client.user("example");

        user.save().await.unwrap();
        assert!(fetcher.is_empty());
    }

    #[tokio::test]
    async fn test_save_posts_then_refreshes() {
        let memory = MemoryFetcher::new();
        memory.insert(
            "/users/example",
            r#"{"username": "example", "home_page": "http://old.example.org"}"#,
            StatusCode::OK,
        );
        let fetcher = Arc::new(LoggingFetcher::new(memory));
        let client = client_with(fetcher.clone());
        let mut user = client.user("example");

        user.set("home_page", "http://new.example.org").unwrap();
        user.save().await.unwrap();

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(
            requests[0].json_body(),
            Some(json!({"home_page": "http://new.example.org"}))
        );
        assert_eq!(requests[1].method, Method::GET);
        assert!(user.changes().is_empty());
        assert!(user.is_complete());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_changes() {
        let fetcher = Arc::new(LoggingFetcher::new(MemoryFetcher::new()));
        let client = client_with(fetcher.clone());
        let mut user = client.user("nobody");

        user.set("profile", "hello").unwrap();
        assert!(user.save().await.is_err());
        assert_eq!(user.changes().get("profile"), Some(&json!("hello")));
        assert_eq!(fetcher.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_stale_entries() {
        let memory = Arc::new(MemoryFetcher::new());
        memory.insert("/artists/1", r#"{"id": 1, "name": "Old"}"#, StatusCode::OK);
        let client = Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(memory.clone())
            .build()
            .unwrap();
        let mut artist = client.artist(1);

        assert_eq!(artist.get("name").await.unwrap().as_str(), Some("Old"));
        assert!(artist.get("profile").await.unwrap().is_not_present());

        memory.insert(
            "/artists/1",
            r#"{"id": 1, "name": "New", "profile": "Now with profile"}"#,
            StatusCode::OK,
        );
        artist.refresh().await.unwrap();

        assert_eq!(artist.get("name").await.unwrap().as_str(), Some("New"));
        assert_eq!(
            artist.get("profile").await.unwrap().as_str(),
            Some("Now with profile")
        );
    }

    #[tokio::test]
    async fn test_refresh_drops_fields_no_longer_served() {
        let memory = Arc::new(MemoryFetcher::new());
        memory.insert(
            "/artists/1",
            r#"{"id": 1, "name": "Badger", "profile": "gone soon"}"#,
            StatusCode::OK,
        );
        let client = Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(memory.clone())
            .build()
            .unwrap();
        let mut artist = client.artist(1);
        assert_eq!(artist.get("profile").await.unwrap().as_str(), Some("gone soon"));

        memory.insert("/artists/1", r#"{"name": "Badger"}"#, StatusCode::OK);
        artist.refresh().await.unwrap();

        assert!(artist.get("profile").await.unwrap().is_not_present());
        assert_eq!(artist.get("id").await.unwrap().as_u64(), Some(1));
        assert_eq!(artist.id(), Some(&Identifier::Id(1)));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut artist = client.artist(1);
        artist.get("name").await.unwrap();

        fetcher
            .inner()
            .insert("/artists/1", "", StatusCode::INTERNAL_SERVER_ERROR);
        assert!(artist.refresh().await.is_err());

        assert!(artist.is_complete());
        assert_eq!(artist.peek("name").unwrap().as_str(), Some("Badger"));
    }

    #[test]
    fn test_usernames_are_escaped_in_paths() {
        let client = client_with(badger());

        assert_eq!(client.user("a/b").path(), Some("/users/a%2Fb"));
        assert_eq!(client.user("example").path(), Some("/users/example"));
    }

    #[tokio::test]
    async fn test_empty_username_fails_without_request() {
        let fetcher = badger();
        let client = client_with(fetcher.clone());
        let mut user = client.user("");

        assert!(!user.is_addressable());
        assert!(matches!(
            user.get("location").await,
            Err(Error::NotAddressable { kind: ResourceKind::User })
        ));
        assert!(matches!(
            user.peek("location"),
            Err(Error::NotAddressable { .. })
        ));
        assert!(fetcher.is_empty());
    }

    #[test]
    fn test_equality_and_hash() {
        let client = client_with(badger());
        let a1 = client.artist(1);
        let a1_again = client.artist(1);
        let a2 = client.artist(2);
        let r1 = client.release(1);

        assert_eq!(a1, a1_again);
        assert_ne!(a1, a2);
        assert_ne!(a1, r1);
        assert!(a1 != FieldValue::Raw(json!(":D")));
        assert!(a1 == FieldValue::Object(a1_again.clone()));

        let set: HashSet<_> = [a1, a1_again, a2, r1].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_secondary_objects_are_not_addressable() {
        let client = client_with(badger());
        let mut data = Map::new();
        data.insert("title".to_string(), json!("Intro"));
        let track = ApiObject::from_data(client, ResourceKind::Track, data);

        assert!(!track.is_addressable());
        assert!(track.peek("duration").unwrap().is_not_present());
        assert_eq!(track.peek("title").unwrap().as_str(), Some("Intro"));
    }

    #[tokio::test]
    async fn test_delete_on_unaddressable_object() {
        let client = client_with(badger());
        let mut track = ApiObject::from_data(client, ResourceKind::Track, Map::new());

        assert!(matches!(
            track.delete().await,
            Err(Error::NotAddressable { kind: ResourceKind::Track })
        ));
    }
}

//! Lazily fetched, page-cached collections.

use crate::{
    kind::{ItemKind, ResourceKind},
    object::ApiObject,
    Client, Error, Result,
};
use http::Method;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Page size used until changed with [`PaginatedList::set_per_page`].
pub const DEFAULT_PER_PAGE: usize = 50;

/// Sort direction for listings that support sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// A collection endpoint's results, fetched one page at a time.
///
/// Nothing is requested until a page, the length, or an item is asked
/// for. Fetched pages are cached; changing the page size, sort or filters
/// drops the cache and the pagination metadata.
///
/// Pages are numbered from 1. Items are positioned from 0 across pages.
///
/// # Examples
///
/// ```no_run
/// use spindle::Client;
///
/// # async fn example() -> spindle::Result<()> {
/// let client = Client::new("my-app/1.0 +https://example.org")?;
/// let mut results = client.search("trash80", [("type", "release")]);
///
/// println!("{} results over {} pages", results.len().await?, results.pages().await?);
/// let first = results.get(0).await?;
/// println!("first: {:?}", first.id());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PaginatedList {
    client: Client,
    path: String,
    list_key: String,
    items: ItemKind,
    filters: BTreeMap<String, String>,
    sort: Option<(String, SortOrder)>,
    per_page: usize,
    served_per_page: Option<usize>,
    count: Option<usize>,
    pages: Option<usize>,
    cache: HashMap<usize, Vec<ApiObject>>,
}

impl PaginatedList {
    /// Creates a listing over `path`, reading items from `list_key`.
    /// No request is made.
    pub fn new(
        client: Client,
        path: impl Into<String>,
        list_key: impl Into<String>,
        items: ItemKind,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            list_key: list_key.into(),
            items,
            filters: BTreeMap::new(),
            sort: None,
            per_page: DEFAULT_PER_PAGE,
            served_per_page: None,
            count: None,
            pages: None,
            cache: HashMap::new(),
        }
    }

    /// Adds query parameters sent with every page request.
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.filters
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The requested page size.
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// The page size the server reports using, which may be smaller than
    /// the requested one. Never fetches.
    pub fn served_per_page(&self) -> Option<usize> {
        self.served_per_page
    }

    /// Changes the page size. Invalidates every cached page and the
    /// pagination metadata. A size of 0 is treated as 1.
    pub fn set_per_page(&mut self, per_page: usize) {
        self.per_page = per_page.max(1);
        self.invalidate();
    }

    /// Sorts by `key`. Invalidates like [`PaginatedList::set_per_page`].
    pub fn sort(&mut self, key: impl Into<String>, order: SortOrder) {
        self.sort = Some((key.into(), order));
        self.invalidate();
    }

    /// Adds a filter. Invalidates like [`PaginatedList::set_per_page`].
    pub fn filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
        self.invalidate();
    }

    /// The total item count, if already known. Never fetches.
    pub fn known_count(&self) -> Option<usize> {
        self.count
    }

    /// The page count, if already known. Never fetches.
    pub fn known_pages(&self) -> Option<usize> {
        self.pages
    }

    /// Returns `true` if page `number` is cached.
    pub fn is_page_cached(&self, number: usize) -> bool {
        self.cache.contains_key(&number)
    }

    /// Drops every cached page and the pagination metadata.
    pub fn invalidate(&mut self) {
        tracing::debug!(path = %self.path, pages = self.cache.len(), "Invalidating listing");
        self.cache.clear();
        self.served_per_page = None;
        self.count = None;
        self.pages = None;
    }

    /// The total number of items. Fetches page 1 if unknown.
    pub async fn len(&mut self) -> Result<usize> {
        if self.count.is_none() {
            self.page(1).await?;
        }
        self.count.ok_or_else(|| self.missing_pagination())
    }

    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// The number of pages. Fetches page 1 if unknown.
    pub async fn pages(&mut self) -> Result<usize> {
        if self.pages.is_none() {
            self.page(1).await?;
        }
        self.pages.ok_or_else(|| self.missing_pagination())
    }

    /// Returns page `number` (1-indexed), fetching it if not cached.
    ///
    /// # Errors
    ///
    /// Pages beyond the server's range fail with the server's error
    /// (`404` for the Discogs API). Page 0 fails with
    /// [`Error::IndexOutOfRange`] without a request.
    pub async fn page(&mut self, number: usize) -> Result<&[ApiObject]> {
        if number == 0 {
            return Err(Error::IndexOutOfRange {
                index: 0,
                len: self.pages.unwrap_or(0),
            });
        }

        if !self.cache.contains_key(&number) {
            let items = self.fetch_page(number).await?;
            self.cache.insert(number, items);
        }

        Ok(self
            .cache
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Returns the item at `position` across all pages.
    ///
    /// Positions map onto pages by the page size the server reports, so a
    /// capped page size still agrees with [`PaginatedList::collect_all`].
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] unless `position < len()`.
    pub async fn get(&mut self, position: usize) -> Result<ApiObject> {
        let count = self.len().await?;
        if position >= count {
            return Err(Error::IndexOutOfRange {
                index: position,
                len: count,
            });
        }

        let per_page = self.served_per_page.unwrap_or(self.per_page).max(1);
        let page_number = position / per_page + 1;
        let offset = position % per_page;

        self.page(page_number)
            .await?
            .get(offset)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index: position,
                len: count,
            })
    }

    /// Returns `true` if any item equals `target`.
    ///
    /// Cached pages are checked first; remaining pages are fetched in order
    /// until a match is found.
    pub async fn contains(&mut self, target: &ApiObject) -> Result<bool> {
        let pages = self.pages().await?;

        if self
            .cache
            .values()
            .any(|page| page.iter().any(|item| item == target))
        {
            return Ok(true);
        }

        for number in 1..=pages {
            if self.cache.contains_key(&number) {
                continue;
            }
            if self.page(number).await?.iter().any(|item| item == target) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every item, in order, fetching pages as needed.
    pub async fn collect_all(&mut self) -> Result<Vec<ApiObject>> {
        let pages = self.pages().await?;
        let mut items = Vec::with_capacity(self.count.unwrap_or(0));
        for number in 1..=pages {
            items.extend_from_slice(self.page(number).await?);
        }
        Ok(items)
    }

    async fn fetch_page(&mut self, number: usize) -> Result<Vec<ApiObject>> {
        let mut params = self.filters.clone();
        params.insert("page".to_string(), number.to_string());
        params.insert("per_page".to_string(), self.per_page.to_string());
        if let Some((key, order)) = &self.sort {
            params.insert("sort".to_string(), key.clone());
            params.insert("sort_order".to_string(), order.as_str().to_string());
        }

        let body = self
            .client
            .request(Method::GET, &self.path, &params, None)
            .await?
            .into_object()?;

        if let Some(pagination) = body.get("pagination") {
            let read = |key: &str| {
                pagination
                    .get(key)
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
            };
            if let Some(count) = read("items") {
                self.count = Some(count);
            }
            if let Some(pages) = read("pages") {
                self.pages = Some(pages);
            }
            if let Some(per_page) = read("per_page") {
                self.served_per_page = Some(per_page);
            }
        }

        let raw_items = match body.get(&self.list_key) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::UnexpectedResponse(format!(
                    "listing {} has no `{}` array",
                    self.path, self.list_key
                )))
            }
        };

        tracing::debug!(
            path = %self.path,
            page = number,
            items = raw_items.len(),
            "Fetched page"
        );

        raw_items.iter().map(|item| self.resolve_item(item)).collect()
    }

    fn resolve_item(&self, item: &Value) -> Result<ApiObject> {
        let data: Map<String, Value> = item.as_object().cloned().ok_or_else(|| {
            Error::UnexpectedResponse(format!("listing item is not an object: {}", item))
        })?;

        match self.items {
            ItemKind::Fixed(kind) => Ok(ApiObject::from_data(self.client.clone(), kind, data)),
            ItemKind::Mixed => {
                let tag = data.get("type").and_then(Value::as_str).unwrap_or_default();
                let kind = ResourceKind::from_type_tag(tag)
                    .ok_or_else(|| Error::UnknownResourceType(tag.to_string()))?;
                Ok(ApiObject::from_data(self.client.clone(), kind, data))
            }
            ItemKind::Nested(kind) => {
                let object = ApiObject::from_data(self.client.clone(), kind, data);
                let path = object.id().map(|id| format!("{}/{}", self.path, id));
                Ok(match path {
                    Some(path) => object.with_path(path),
                    None => object,
                })
            }
        }
    }

    fn missing_pagination(&self) -> Error {
        Error::UnexpectedResponse(format!("listing {} carries no pagination", self.path))
    }
}

impl fmt::Debug for PaginatedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedList")
            .field("path", &self.path)
            .field("items", &self.items)
            .field("filters", &self.filters)
            .field("sort", &self.sort)
            .field("per_page", &self.per_page)
            .field("served_per_page", &self.served_per_page)
            .field("count", &self.count)
            .field("pages", &self.pages)
            .field("cached_pages", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{LoggingFetcher, MemoryFetcher};
    use http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn page_body(page: usize, pages: usize, total: usize, ids: std::ops::Range<u64>) -> String {
        let items: Vec<_> = ids.map(|id| json!({"id": id, "title": format!("R{}", id)})).collect();
        json!({
            "pagination": {"page": page, "pages": pages, "per_page": 2, "items": total},
            "things": items,
        })
        .to_string()
    }

    fn listing() -> (PaginatedList, Arc<LoggingFetcher<MemoryFetcher>>) {
        let memory = MemoryFetcher::new();
        memory.insert("/things?page=1&per_page=2", page_body(1, 3, 5, 10..12), StatusCode::OK);
        memory.insert("/things?page=2&per_page=2", page_body(2, 3, 5, 12..14), StatusCode::OK);
        memory.insert("/things?page=3&per_page=2", page_body(3, 3, 5, 14..15), StatusCode::OK);
        let fetcher = Arc::new(LoggingFetcher::new(memory));

        let client = Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(fetcher.clone())
            .build()
            .unwrap();
        let mut list = PaginatedList::new(
            client,
            "/things",
            "things",
            ItemKind::Fixed(ResourceKind::Release),
        );
        list.set_per_page(2);
        (list, fetcher)
    }

    #[tokio::test]
    async fn test_construction_does_not_fetch() {
        let (list, fetcher) = listing();
        assert!(fetcher.is_empty());
        assert_eq!(list.known_count(), None);
        assert_eq!(list.known_pages(), None);
    }

    #[tokio::test]
    async fn test_len_fetches_first_page_once() {
        let (mut list, fetcher) = listing();

        assert_eq!(list.len().await.unwrap(), 5);
        assert_eq!(list.pages().await.unwrap(), 3);
        assert_eq!(list.page(1).await.unwrap().len(), 2);
        assert_eq!(fetcher.len(), 1);
    }

    #[tokio::test]
    async fn test_get_maps_position_to_page_and_offset() {
        let (mut list, fetcher) = listing();

        let item = list.get(3).await.unwrap();
        assert_eq!(item.id(), Some(&crate::Identifier::Id(13)));
        assert!(list.is_page_cached(2));
        assert!(!list.is_page_cached(3));
        assert_eq!(fetcher.len(), 2);
    }

    #[tokio::test]
    async fn test_get_out_of_range() {
        let (mut list, _) = listing();

        assert!(matches!(
            list.get(5).await,
            Err(Error::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected_without_request() {
        let (mut list, fetcher) = listing();

        assert!(matches!(
            list.page(0).await,
            Err(Error::IndexOutOfRange { index: 0, .. })
        ));
        assert!(fetcher.is_empty());
    }

    #[tokio::test]
    async fn test_collect_all_agrees_with_get() {
        let (mut list, _) = listing();

        let all = list.collect_all().await.unwrap();
        assert_eq!(all.len(), 5);
        for (position, item) in all.iter().enumerate() {
            assert_eq!(&list.get(position).await.unwrap(), item);
        }
    }

    #[tokio::test]
    async fn test_set_per_page_invalidates() {
        let (mut list, _) = listing();

        list.len().await.unwrap();
        assert_eq!(list.known_pages(), Some(3));

        list.set_per_page(10);
        assert_eq!(list.known_pages(), None);
        assert_eq!(list.known_count(), None);
        assert!(!list.is_page_cached(1));
    }

    #[tokio::test]
    async fn test_sort_is_sent_as_query() {
        let (mut list, fetcher) = listing();
        list.sort("year", SortOrder::Descending);

        // No fixture for the sorted query, so the fetch fails with 404.
        let err = list.page(1).await.unwrap_err();
        assert!(err.is_not_found());

        let request = fetcher.last_request().unwrap();
        assert_eq!(request.query_params.get("sort").map(String::as_str), Some("year"));
        assert_eq!(
            request.query_params.get("sort_order").map(String::as_str),
            Some("desc")
        );
    }

    #[tokio::test]
    async fn test_contains_scans_only_uncached_pages() {
        let (mut list, fetcher) = listing();

        list.page(1).await.unwrap();
        assert_eq!(fetcher.len(), 1);

        let target = ApiObject::new(list.client().clone(), ResourceKind::Release, 14);
        assert!(list.contains(&target).await.unwrap());

        let pages: Vec<_> = fetcher
            .requests()
            .iter()
            .map(|request| request.query_params["page"].clone())
            .collect();
        assert_eq!(pages, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_contains_miss_fetches_every_page() {
        let (mut list, fetcher) = listing();

        let stranger = ApiObject::new(list.client().clone(), ResourceKind::Release, 99);
        assert!(!list.contains(&stranger).await.unwrap());
        assert_eq!(fetcher.len(), 3);
        assert!((1..=3).all(|number| list.is_page_cached(number)));

        // Everything is cached now.
        assert!(!list.contains(&stranger).await.unwrap());
        assert_eq!(fetcher.len(), 3);
    }

    #[tokio::test]
    async fn test_get_follows_capped_page_size() {
        let body = |page: usize, ids: std::ops::Range<u64>| {
            let items: Vec<_> = ids.map(|id| json!({"id": id})).collect();
            json!({
                "pagination": {"page": page, "pages": 2, "per_page": 100, "items": 150},
                "things": items,
            })
            .to_string()
        };
        let memory = MemoryFetcher::new();
        memory.insert("/things?page=1&per_page=200", body(1, 0..100), StatusCode::OK);
        memory.insert("/things?page=2&per_page=200", body(2, 100..150), StatusCode::OK);
        let client = Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(memory)
            .build()
            .unwrap();
        let mut list = PaginatedList::new(
            client,
            "/things",
            "things",
            ItemKind::Fixed(ResourceKind::Release),
        );
        list.set_per_page(200);

        let all = list.collect_all().await.unwrap();
        assert_eq!(all.len(), 150);
        assert_eq!(list.served_per_page(), Some(100));

        let item = list.get(120).await.unwrap();
        assert_eq!(item.id(), Some(&crate::Identifier::Id(120)));
        assert_eq!(item, all[120]);
        assert_eq!(list.get(99).await.unwrap(), all[99]);
    }

    #[tokio::test]
    async fn test_unknown_type_tag() {
        let memory = MemoryFetcher::new();
        memory.insert(
            "/mixed?page=1&per_page=50",
            json!({
                "pagination": {"page": 1, "pages": 1, "per_page": 50, "items": 1},
                "results": [{"id": 1, "type": "podcast"}],
            })
            .to_string(),
            StatusCode::OK,
        );
        let client = Client::builder()
            .user_agent("spindle-tests/0.1")
            .fetcher(memory)
            .build()
            .unwrap();
        let mut list = PaginatedList::new(client, "/mixed", "results", ItemKind::Mixed);

        assert!(matches!(
            list.page(1).await,
            Err(Error::UnknownResourceType(tag)) if tag == "podcast"
        ));
    }
}

use super::{Fetcher, NOT_FOUND_BODY};
use crate::{metadata::RequestMetadata, response::FetchResponse, Error, Result};
use async_trait::async_trait;
use http::StatusCode;
use std::path::{Path, PathBuf};

/// Serves JSON fixtures from a directory tree, for deterministic tests.
///
/// A request for `/artists/1` is answered with `<root>/artists/1.json`.
/// Query parameters are appended after an underscore, sorted by key:
/// `/artists/1/releases?page=2&per_page=50` maps to
/// `<root>/artists/1/releases_page=2&per_page=50.json`. The method is not
/// part of the lookup. A missing fixture answers 404.
pub struct FilesystemFetcher {
    root: PathBuf,
}

impl FilesystemFetcher {
    /// Creates a fetcher serving fixtures under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The fixture directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a request is answered from.
    pub fn fixture_path(&self, request: &RequestMetadata) -> PathBuf {
        let mut name = request.path.trim_start_matches('/').to_string();
        let query = request.query_string();
        if !query.is_empty() {
            name.push('_');
            name.push_str(&query);
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

#[async_trait]
impl Fetcher for FilesystemFetcher {
    async fn fetch(&self, request: &RequestMetadata) -> Result<FetchResponse> {
        let path = self.fixture_path(request);

        match tokio::fs::read(&path).await {
            Ok(body) => {
                tracing::trace!(fixture = %path.display(), "Serving fixture");
                Ok(FetchResponse::new(StatusCode::OK, body))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(fixture = %path.display(), "No fixture for request");
                Ok(FetchResponse::new(StatusCode::NOT_FOUND, NOT_FOUND_BODY))
            }
            Err(source) => Err(Error::Fixture { path, source }),
        }
    }
}

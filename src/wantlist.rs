//! A user's wantlist: a listing that can also be added to and removed from.

use crate::{
    kind::{Identifier, ItemKind, ResourceKind},
    object::ApiObject,
    paginated::PaginatedList,
    response::Payload,
    Client, Error, Result,
};
use serde::Serialize;
use std::ops::{Deref, DerefMut};

/// Optional attributes of a new wantlist entry. `None`s are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WantOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// The wantlist at `/users/<username>/wants`.
///
/// Derefs to the underlying [`PaginatedList`] for reading. Entries are
/// [`ResourceKind::WantlistItem`] proxies addressed at
/// `/users/<username>/wants/<release id>`.
///
/// # Examples
///
/// ```no_run
/// use spindle::{Client, WantOptions};
///
/// # async fn example() -> spindle::Result<()> {
/// let client = Client::new("my-app/1.0 +https://example.org")?;
/// let mut user = client.user("example");
/// let mut wantlist = user.get("wantlist").await?.into_wantlist().unwrap();
///
/// println!("{} wants", wantlist.len().await?);
/// wantlist.add(5, WantOptions::default()).await?;
/// wantlist.remove(1).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Wantlist {
    list: PaginatedList,
}

impl Wantlist {
    /// Creates the wantlist of the user at `user_path`. No request is made.
    pub fn new(client: Client, user_path: &str) -> Self {
        Self {
            list: PaginatedList::new(
                client,
                format!("{}/wants", user_path.trim_end_matches('/')),
                "wants",
                ItemKind::Nested(ResourceKind::WantlistItem),
            ),
        }
    }

    /// Adds a release. Idempotent on the server.
    ///
    /// Returns the created entry when the server answers with one (201), or
    /// `None` for an empty success (204). Cached pages are dropped.
    pub async fn add(
        &mut self,
        release: impl Into<Identifier>,
        options: WantOptions,
    ) -> Result<Option<ApiObject>> {
        let path = self.entry_path(&release.into());
        let body = serde_json::to_value(&options)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;

        let payload = self.list.client().put(&path, &body).await?;
        self.list.invalidate();

        tracing::info!(path = %path, "Added wantlist entry");
        match payload {
            Payload::NoContent => Ok(None),
            Payload::Json(_) => {
                let data = payload.into_object()?;
                let entry = ApiObject::from_data(
                    self.list.client().clone(),
                    ResourceKind::WantlistItem,
                    data,
                );
                Ok(Some(entry.with_path(path)))
            }
        }
    }

    /// Removes a release. Cached pages are dropped.
    pub async fn remove(&mut self, release: impl Into<Identifier>) -> Result<()> {
        let path = self.entry_path(&release.into());
        self.list.client().delete(&path).await?;
        self.list.invalidate();

        tracing::info!(path = %path, "Removed wantlist entry");
        Ok(())
    }

    fn entry_path(&self, release: &Identifier) -> String {
        format!("{}/{}", self.list.path(), release)
    }
}

impl Deref for Wantlist {
    type Target = PaginatedList;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl DerefMut for Wantlist {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}

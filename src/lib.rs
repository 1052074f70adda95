//! # Spindle - a lazy object model for the Discogs API
//!
//! Spindle hands out lightweight proxies for remote resources (artists,
//! releases, masters, labels, users). A proxy fetches its full
//! representation the first time a field it does not have is read, caches
//! it, and serves every later read from memory. Writes are staged and only
//! sent on an explicit save. Collections (search results, an artist's
//! releases, a master's versions, a user's wantlist) are paginated,
//! indexable and fetched one page at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use spindle::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), spindle::Error> {
//!     let client = Client::new("my-app/1.0 +https://example.org")?;
//!
//!     // No request yet
//!     let mut artist = client.artist(1);
//!
//!     // One GET /artists/1, then everything comes from the cache
//!     println!("{:?}", artist.get("name").await?.as_str());
//!     println!("{:?}", artist.get("real_name").await?.as_str());
//!
//!     // Paged listing, one page at a time
//!     let mut releases = artist.get("releases").await?.into_list().unwrap();
//!     println!("{} releases", releases.len().await?);
//!     let first = releases.get(0).await?;
//!     println!("first release: {:?}", first.id());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Fields
//!
//! Each [`ResourceKind`] declares its fields. [`ApiObject::get`] answers
//! with a [`Lookup`]: a present value, or [`Lookup::NotPresent`] when the
//! server's full representation does not carry the field. Asking for an
//! absent field twice costs one request, not two.
//!
//! ## Writing
//!
//! ```no_run
//! # async fn example(client: spindle::Client) -> spindle::Result<()> {
//! let mut me = client.identity().await?;
//! me.set("location", "Stockholm")?;  // staged, no request
//! me.save().await?;                  // one POST, then one GET
//! # Ok(())
//! # }
//! ```
//!
//! ## Transports
//!
//! All I/O goes through a [`fetcher::Fetcher`]. The default is
//! [`fetcher::NetworkFetcher`]; tests use [`fetcher::FilesystemFetcher`]
//! or [`fetcher::MemoryFetcher`], optionally wrapped in
//! [`fetcher::LoggingFetcher`] to inspect what was sent.

mod client;
mod error;
pub mod fetcher;
mod field;
mod kind;
pub mod metadata;
mod object;
mod paginated;
mod response;
mod wantlist;

pub use client::{Client, ClientBuilder, Money, BASE_URL_ENV, DEFAULT_BASE_URL, USER_AGENT_ENV};
pub use error::{Error, Result};
pub use field::{parse_timestamp, Field, FieldKind, FieldValue, Lookup};
pub use kind::{Identifier, ItemKind, ResourceKind};
pub use metadata::RequestMetadata;
pub use object::ApiObject;
pub use paginated::{PaginatedList, SortOrder, DEFAULT_PER_PAGE};
pub use response::{FetchResponse, Payload};
pub use wantlist::{WantOptions, Wantlist};

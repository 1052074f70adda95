//! Error types for resource access.
//!
//! Every failure that can happen while reading, writing or paging through
//! remote resources is reported through [`Error`]. A field that the server
//! confirmed as absent is *not* an error; see [`crate::Lookup::NotPresent`].

use crate::kind::ResourceKind;
use http::StatusCode;
use std::path::PathBuf;

/// The main error type for resource access.
///
/// # Examples
///
/// ```no_run
/// use spindle::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("my-app/1.0 +https://example.org")?;
/// let mut artist = client.artist(0);
///
/// match artist.get("name").await {
///     Ok(name) => println!("Name: {:?}", name),
///     Err(Error::Http { status, message, .. }) => {
///         eprintln!("HTTP error {}: {}", status, message);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Required setup is missing or malformed.
    ///
    /// Raised at the first network-dependent use (not at construction),
    /// most commonly for a missing `User-Agent`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The server answered with a non-2xx status.
    ///
    /// Displays as `"<code>: <message>"`, e.g. `404: Resource not found.`
    #[error("{}: {message}", .status.as_u16())]
    Http {
        /// The HTTP status code
        status: StatusCode,
        /// Message taken from the response, or a fallback keyed by status
        message: String,
        /// The raw response body
        raw_response: String,
    },

    /// A write was attempted on a read-only field.
    #[error("Field `{field}` of {kind} is read-only")]
    ImmutableField {
        /// The kind owning the field
        kind: ResourceKind,
        /// The field name
        field: String,
    },

    /// A write was attempted on a field the kind does not declare.
    #[error("{kind} has no field named `{field}`")]
    UnknownField {
        /// The kind that was written to
        kind: ResourceKind,
        /// The field name
        field: String,
    },

    /// The object has no endpoint of its own to fetch, save or delete.
    #[error("{kind} object is not addressable")]
    NotAddressable {
        /// The kind of the object
        kind: ResourceKind,
    },

    /// Positional access beyond a collection's known size.
    #[error("Index {index} out of range for collection of length {len}")]
    IndexOutOfRange {
        /// The requested position (or page number)
        index: usize,
        /// The collection length (or page count)
        len: usize,
    },

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// A successful response body was not valid JSON.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A cached raw value could not be coerced by its field descriptor.
    #[error("Invalid value for field `{field}`: {message}")]
    InvalidField {
        /// The field name
        field: String,
        /// What went wrong
        message: String,
    },

    /// The server returned a payload of an unexpected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A listing item carried a `type` tag no resource kind answers to.
    #[error("Unknown resource type `{0}`")]
    UnknownResourceType(String),

    /// A response fixture exists but could not be read.
    #[error("Failed to read fixture {}: {source}", .path.display())]
    Fixture {
        /// The fixture path
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    ///
    /// Returns `Some(status)` for `Http` and `DeserializationFailed` errors,
    /// `None` for other error types.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Http { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for resource access.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

//! What comes back from a fetch, before and after JSON decoding.

use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// The raw result of one [`Fetcher`](crate::fetcher::Fetcher) call.
///
/// A non-2xx status is still an `Ok` fetch at this layer; the
/// [`Client`](crate::Client) decides what it means.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The raw response body.
    pub body: Vec<u8>,

    /// The response headers.
    pub headers: HeaderMap,
}

impl FetchResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    /// The body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns a reference to a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spindle::FetchResponse;
    /// # use http::{HeaderValue, StatusCode};
    /// let mut response = FetchResponse::new(StatusCode::OK, "{}");
    /// response
    ///     .headers
    ///     .insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// A decoded successful response.
///
/// `NoContent` (a 204, or an empty 2xx body) is distinct from
/// `Json(Value::Null)`, which is a body that literally said `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The body decoded as JSON.
    Json(Value),
    /// The server sent nothing back.
    NoContent,
}

impl Payload {
    /// Returns `true` for [`Payload::NoContent`].
    pub fn is_no_content(&self) -> bool {
        matches!(self, Payload::NoContent)
    }

    /// The decoded JSON, if there was a body.
    pub fn json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::NoContent => None,
        }
    }

    /// Consumes the payload, requiring a JSON object.
    pub fn into_object(self) -> crate::Result<serde_json::Map<String, Value>> {
        match self {
            Payload::Json(Value::Object(map)) => Ok(map),
            Payload::Json(other) => Err(crate::Error::UnexpectedResponse(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Payload::NoContent => Err(crate::Error::UnexpectedResponse(
                "expected a JSON object, got no content".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_content_is_not_null() {
        assert_ne!(Payload::NoContent, Payload::Json(Value::Null));
        assert!(Payload::NoContent.is_no_content());
        assert_eq!(Payload::NoContent.json(), None);
    }

    #[test]
    fn test_into_object() {
        let map = Payload::Json(json!({"id": 1})).into_object().unwrap();
        assert_eq!(map.get("id"), Some(&json!(1)));

        assert!(Payload::Json(json!([1, 2])).into_object().is_err());
        assert!(Payload::NoContent.into_object().is_err());
    }
}

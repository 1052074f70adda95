//! Field descriptors and the values they produce.
//!
//! Each [`ResourceKind`] carries a static table of [`Field`]s. A field names
//! the raw key it reads (which may differ from its own name), whether it
//! accepts writes, and how the raw JSON is coerced into a [`FieldValue`].

use crate::{
    kind::{Identifier, ItemKind, ResourceKind},
    object::ApiObject,
    paginated::PaginatedList,
    wantlist::Wantlist,
    Client, Error, Result,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;

/// One named attribute's contract on a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// The attribute name callers use.
    pub name: &'static str,
    /// The key in the raw data. Unused by computed fields.
    pub key: &'static str,
    /// How the raw value is read and coerced.
    pub kind: FieldKind,
}

/// The descriptor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Raw JSON passed through as is.
    Simple { writable: bool },
    /// A timestamp string parsed into a date-time.
    Timestamp,
    /// An id or an embedded object resolving to a proxy of the given kind.
    Object(ResourceKind),
    /// An array of embedded objects resolving to proxies of the given kind.
    ObjectList(ResourceKind),
    /// A paginated listing at `<object path>/<suffix>`, computed without a
    /// raw key.
    Listing {
        suffix: &'static str,
        list_key: &'static str,
        items: ItemKind,
    },
    /// The user's wantlist, computed without a raw key.
    Wantlist,
}

impl Field {
    pub const fn simple(name: &'static str) -> Self {
        Self::keyed(name, name)
    }

    pub const fn keyed(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Simple { writable: false },
        }
    }

    pub const fn writable(name: &'static str) -> Self {
        Self {
            name,
            key: name,
            kind: FieldKind::Simple { writable: true },
        }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            key: name,
            kind: FieldKind::Timestamp,
        }
    }

    pub const fn object(name: &'static str, key: &'static str, kind: ResourceKind) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Object(kind),
        }
    }

    pub const fn objects(name: &'static str, key: &'static str, kind: ResourceKind) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::ObjectList(kind),
        }
    }

    pub const fn listing(
        name: &'static str,
        suffix: &'static str,
        list_key: &'static str,
        items: ItemKind,
    ) -> Self {
        Self {
            name,
            key: name,
            kind: FieldKind::Listing {
                suffix,
                list_key,
                items,
            },
        }
    }

    pub const fn wantlist(name: &'static str) -> Self {
        Self {
            name,
            key: name,
            kind: FieldKind::Wantlist,
        }
    }

    /// Returns `true` if writes to this field are staged rather than rejected.
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, FieldKind::Simple { writable: true })
    }

    /// Returns `true` for fields derived without a raw key.
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, FieldKind::Listing { .. } | FieldKind::Wantlist)
    }

    /// Coerces a cached raw value.
    ///
    /// Returns `Ok(None)` when the raw value stands for "nothing here", i.e.
    /// a `null` where an object reference was expected.
    pub(crate) fn coerce(&self, raw: &Value, client: &Client) -> Result<Option<FieldValue>> {
        match self.kind {
            FieldKind::Simple { .. } => Ok(Some(FieldValue::Raw(raw.clone()))),
            FieldKind::Timestamp => match raw {
                Value::Null => Ok(None),
                Value::String(text) => parse_timestamp(text)
                    .map(|ts| Some(FieldValue::Timestamp(ts)))
                    .ok_or_else(|| self.invalid(format!("unrecognized timestamp `{}`", text))),
                other => Err(self.invalid(format!("expected a timestamp string, got {}", other))),
            },
            FieldKind::Object(kind) => match raw {
                Value::Null => Ok(None),
                value => self.resolve(kind, value, client).map(|o| Some(FieldValue::Object(o))),
            },
            FieldKind::ObjectList(kind) => match raw {
                Value::Null => Ok(Some(FieldValue::Objects(Vec::new()))),
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.resolve(kind, item, client))
                    .collect::<Result<Vec<_>>>()
                    .map(|objects| Some(FieldValue::Objects(objects))),
                other => Err(self.invalid(format!("expected a list, got {}", other))),
            },
            FieldKind::Listing { .. } | FieldKind::Wantlist => Err(self.invalid(
                "computed fields have no raw value".to_string(),
            )),
        }
    }

    fn resolve(&self, kind: ResourceKind, value: &Value, client: &Client) -> Result<ApiObject> {
        match value {
            Value::Object(data) => Ok(ApiObject::from_data(client.clone(), kind, data.clone())),
            scalar => Identifier::from_value(scalar)
                .map(|id| client.object(kind, id))
                .ok_or_else(|| self.invalid(format!("expected an id or an object, got {}", scalar))),
        }
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidField {
            field: self.name.to_string(),
            message,
        }
    }
}

/// Parses the timestamp formats the API emits.
///
/// RFC 3339 with an offset is taken as is; a naive `YYYY-MM-DDTHH:MM:SS`
/// is taken as UTC.
///
/// ```
/// use spindle::parse_timestamp;
///
/// let ts = parse_timestamp("2012-01-01T00:00:00").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2012-01-01T00:00:00+00:00");
///
/// let ts = parse_timestamp("2012-08-15T21:13:36-07:00").unwrap();
/// assert_eq!(ts.offset().local_minus_utc(), -7 * 3600);
/// ```
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// A coerced field value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Raw JSON, from a simple field.
    Raw(Value),
    /// A parsed timestamp.
    Timestamp(DateTime<FixedOffset>),
    /// A reference to another resource.
    Object(ApiObject),
    /// References to other resources.
    Objects(Vec<ApiObject>),
    /// A lazily paged listing.
    List(PaginatedList),
    /// A user's wantlist.
    Wantlist(Wantlist),
}

impl FieldValue {
    /// The raw JSON, for simple fields.
    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            FieldValue::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_raw().and_then(Value::as_str)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_raw().and_then(Value::as_u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_raw().and_then(Value::as_f64)
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            FieldValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ApiObject> {
        match self {
            FieldValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_objects(self) -> Option<Vec<ApiObject>> {
        match self {
            FieldValue::Objects(objects) => Some(objects),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<PaginatedList> {
        match self {
            FieldValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_wantlist(self) -> Option<Wantlist> {
        match self {
            FieldValue::Wantlist(wantlist) => Some(wantlist),
            _ => None,
        }
    }
}

/// The outcome of reading a field.
///
/// Absent and unknown are separate answers, and neither is an error.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The field has a value.
    Present(FieldValue),
    /// The server's full representation does not carry this field.
    NotPresent,
    /// Not cached, and answering would need a fetch. Only returned by
    /// [`ApiObject::peek`].
    Unfetched,
}

impl Lookup {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    pub fn is_not_present(&self) -> bool {
        matches!(self, Lookup::NotPresent)
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<FieldValue> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(FieldValue::as_str)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value().and_then(FieldValue::as_u64)
    }

    pub fn as_raw(&self) -> Option<&Value> {
        self.value().and_then(FieldValue::as_raw)
    }

    pub fn into_object(self) -> Option<ApiObject> {
        self.into_value().and_then(FieldValue::into_object)
    }

    pub fn into_objects(self) -> Option<Vec<ApiObject>> {
        self.into_value().and_then(FieldValue::into_objects)
    }

    pub fn into_list(self) -> Option<PaginatedList> {
        self.into_value().and_then(FieldValue::into_list)
    }

    pub fn into_wantlist(self) -> Option<Wantlist> {
        self.into_value().and_then(FieldValue::into_wantlist)
    }
}

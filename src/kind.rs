//! Resource kinds and their schemas.
//!
//! A [`ResourceKind`] decides three things about a proxy: which field
//! descriptors apply, which raw key identifies it, and which endpoint its
//! full representation lives at.

use crate::field::Field;
use serde_json::Value;
use std::fmt;

/// The category of a remote entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Artist,
    Release,
    Master,
    Label,
    User,
    /// An entry of a user's wantlist, addressed through the wantlist.
    WantlistItem,
    /// A tracklist entry. Has no endpoint of its own.
    Track,
    /// A video attached to a release or master. Has no endpoint of its own.
    Video,
}

impl ResourceKind {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Artist => "Artist",
            ResourceKind::Release => "Release",
            ResourceKind::Master => "Master",
            ResourceKind::Label => "Label",
            ResourceKind::User => "User",
            ResourceKind::WantlistItem => "WantlistItem",
            ResourceKind::Track => "Track",
            ResourceKind::Video => "Video",
        }
    }

    /// Resolves the `type` discriminator carried by mixed listing items.
    ///
    /// # Examples
    ///
    /// ```
    /// use spindle::ResourceKind;
    ///
    /// assert_eq!(ResourceKind::from_type_tag("artist"), Some(ResourceKind::Artist));
    /// assert_eq!(ResourceKind::from_type_tag("release"), Some(ResourceKind::Release));
    /// assert_eq!(ResourceKind::from_type_tag("playlist"), None);
    /// ```
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "artist" => Some(ResourceKind::Artist),
            "release" => Some(ResourceKind::Release),
            "master" => Some(ResourceKind::Master),
            "label" => Some(ResourceKind::Label),
            "user" => Some(ResourceKind::User),
            _ => None,
        }
    }

    /// The raw key holding this kind's identifier.
    pub fn id_key(self) -> &'static str {
        match self {
            ResourceKind::User => "username",
            _ => "id",
        }
    }

    /// The endpoint collection, for kinds that have their own endpoint.
    pub fn collection(self) -> Option<&'static str> {
        match self {
            ResourceKind::Artist => Some("artists"),
            ResourceKind::Release => Some("releases"),
            ResourceKind::Master => Some("masters"),
            ResourceKind::Label => Some("labels"),
            ResourceKind::User => Some("users"),
            ResourceKind::WantlistItem | ResourceKind::Track | ResourceKind::Video => None,
        }
    }

    /// The path of the full representation of the resource `id`.
    ///
    /// The identifier is percent-encoded as a single path segment. An empty
    /// name has no path.
    ///
    /// ```
    /// use spindle::{Identifier, ResourceKind};
    ///
    /// assert_eq!(
    ///     ResourceKind::Artist.path_for(&Identifier::Id(1)).as_deref(),
    ///     Some("/artists/1")
    /// );
    /// assert_eq!(
    ///     ResourceKind::User.path_for(&Identifier::from("a/b c")).as_deref(),
    ///     Some("/users/a%2Fb%20c")
    /// );
    /// assert_eq!(ResourceKind::Track.path_for(&Identifier::Id(1)), None);
    /// ```
    pub fn path_for(self, id: &Identifier) -> Option<String> {
        if matches!(id, Identifier::Name(name) if name.is_empty()) {
            return None;
        }
        self.collection().map(|collection| {
            format!("/{}/{}", collection, urlencoding::encode(&id.to_string()))
        })
    }

    /// The field descriptors of this kind.
    pub fn fields(self) -> &'static [Field] {
        match self {
            ResourceKind::Artist => schema::ARTIST,
            ResourceKind::Release => schema::RELEASE,
            ResourceKind::Master => schema::MASTER,
            ResourceKind::Label => schema::LABEL,
            ResourceKind::User => schema::USER,
            ResourceKind::WantlistItem => schema::WANTLIST_ITEM,
            ResourceKind::Track => schema::TRACK,
            ResourceKind::Video => schema::VIDEO,
        }
    }

    /// Looks up a declared field by name.
    pub fn field(self, name: &str) -> Option<&'static Field> {
        self.fields().iter().find(|field| field.name == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the items of a listing become proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Every item is of one kind.
    Fixed(ResourceKind),
    /// Each item names its kind in a `type` field.
    Mixed,
    /// Every item is of one kind and is addressed under the listing path
    /// (`<listing>/<id>`), like wantlist entries.
    Nested(ResourceKind),
}

/// The stable identifier of a resource: a numeric id, or a name for
/// resources addressed by name (users).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Id(u64),
    Name(String),
}

impl Identifier {
    /// Reads an identifier out of a raw JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Identifier::Id),
            Value::String(s) if !s.is_empty() => Some(Identifier::Name(s.clone())),
            _ => None,
        }
    }

    /// The identifier as a raw JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Identifier::Id(id) => Value::from(*id),
            Identifier::Name(name) => Value::from(name.as_str()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

mod schema {
    use super::{ItemKind, ResourceKind};
    use crate::field::Field;

    pub(super) const ARTIST: &[Field] = &[
        Field::simple("id"),
        Field::simple("name"),
        Field::keyed("real_name", "realname"),
        Field::simple("images"),
        Field::simple("profile"),
        Field::simple("data_quality"),
        Field::keyed("name_variations", "namevariations"),
        Field::keyed("url", "uri"),
        Field::simple("urls"),
        Field::objects("aliases", "aliases", ResourceKind::Artist),
        Field::objects("members", "members", ResourceKind::Artist),
        Field::objects("groups", "groups", ResourceKind::Artist),
        Field::listing("releases", "releases", "releases", ItemKind::Mixed),
    ];

    pub(super) const RELEASE: &[Field] = &[
        Field::simple("id"),
        Field::simple("title"),
        Field::simple("year"),
        Field::simple("thumb"),
        Field::simple("data_quality"),
        Field::simple("status"),
        Field::simple("genres"),
        Field::simple("styles"),
        Field::simple("country"),
        Field::simple("notes"),
        Field::simple("formats"),
        Field::keyed("url", "uri"),
        Field::objects("videos", "videos", ResourceKind::Video),
        Field::objects("tracklist", "tracklist", ResourceKind::Track),
        Field::objects("artists", "artists", ResourceKind::Artist),
        Field::objects("credits", "extraartists", ResourceKind::Artist),
        Field::objects("labels", "labels", ResourceKind::Label),
        Field::objects("companies", "companies", ResourceKind::Label),
        Field::object("master", "master_id", ResourceKind::Master),
    ];

    pub(super) const MASTER: &[Field] = &[
        Field::simple("id"),
        Field::simple("title"),
        Field::simple("data_quality"),
        Field::simple("styles"),
        Field::simple("genres"),
        Field::simple("images"),
        Field::keyed("url", "uri"),
        Field::objects("videos", "videos", ResourceKind::Video),
        Field::objects("tracklist", "tracklist", ResourceKind::Track),
        Field::object("main_release", "main_release", ResourceKind::Release),
        Field::listing(
            "versions",
            "versions",
            "versions",
            ItemKind::Fixed(ResourceKind::Release),
        ),
    ];

    pub(super) const LABEL: &[Field] = &[
        Field::simple("id"),
        Field::simple("name"),
        Field::simple("profile"),
        Field::simple("urls"),
        Field::simple("images"),
        Field::simple("contact_info"),
        Field::simple("data_quality"),
        Field::keyed("url", "uri"),
        Field::objects("sublabels", "sublabels", ResourceKind::Label),
        Field::object("parent_label", "parent_label", ResourceKind::Label),
        Field::listing(
            "releases",
            "releases",
            "releases",
            ItemKind::Fixed(ResourceKind::Release),
        ),
    ];

    pub(super) const USER: &[Field] = &[
        Field::simple("id"),
        Field::simple("username"),
        Field::simple("releases_contributed"),
        Field::simple("num_collection"),
        Field::simple("num_wantlist"),
        Field::simple("num_lists"),
        Field::simple("rank"),
        Field::simple("rating_avg"),
        Field::keyed("url", "uri"),
        Field::writable("name"),
        Field::writable("profile"),
        Field::writable("location"),
        Field::writable("home_page"),
        Field::timestamp("registered"),
        Field::wantlist("wantlist"),
    ];

    pub(super) const WANTLIST_ITEM: &[Field] = &[
        Field::simple("id"),
        Field::writable("rating"),
        Field::writable("notes"),
        Field::writable("notes_public"),
        Field::object("release", "basic_information", ResourceKind::Release),
    ];

    pub(super) const TRACK: &[Field] = &[
        Field::simple("duration"),
        Field::simple("position"),
        Field::simple("title"),
        Field::objects("artists", "artists", ResourceKind::Artist),
        Field::objects("credits", "extraartists", ResourceKind::Artist),
    ];

    pub(super) const VIDEO: &[Field] = &[
        Field::simple("duration"),
        Field::simple("embed"),
        Field::simple("title"),
        Field::simple("description"),
        Field::keyed("url", "uri"),
    ];
}

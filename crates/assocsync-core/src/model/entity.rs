use crate::{error::Error, remote::Direction};
use derive_more::{AsRef, Deref, Display, From};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

///
/// EntityId
///
/// Opaque identifier assigned by the remote store on creation.
///

#[derive(
    AsRef,
    Clone,
    Debug,
    Deref,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

///
/// OrderKey
///
/// Default ordering key, named in application convention.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OrderKey {
    pub field: &'static str,
    pub direction: Direction,
}

impl OrderKey {
    #[must_use]
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    #[must_use]
    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

///
/// EntityKind
///
/// One remote collection. Field names are in application convention; the
/// store encodes them at the boundary.
///

pub trait EntityKind: Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Create payload: the entity minus its server-assigned fields.
    type Draft: Serialize + Send + Sync;

    const TABLE: &'static str;

    /// Human-readable singular noun, used in action labels.
    const NOUN: &'static str;

    /// Fields matched by the free-text search option.
    const SEARCH_FIELDS: &'static [&'static str];

    /// Field matched by the status option, if the family has one.
    const STATUS_FIELD: Option<&'static str> = None;

    const DEFAULT_ORDER: &'static [OrderKey];

    fn id(&self) -> &EntityId;

    /// Reject drafts the generic store cannot write faithfully.
    fn check_draft(_draft: &Self::Draft) -> Result<(), Error> {
        Ok(())
    }
}

///
/// MutableEntity
///
/// Families whose rows may be patched and deleted after creation.
/// Append-only logs do not implement it.
///

pub trait MutableEntity: EntityKind {
    /// Partial update; absent fields must not serialize.
    type Patch: Serialize + Send + Sync;

    /// Reject patches the generic store cannot write faithfully.
    fn check_patch(_patch: &Self::Patch) -> Result<(), Error> {
        Ok(())
    }
}

///
/// Named
///
/// Families that carry a display name other rows may denormalize.
///

pub trait Named: EntityKind {
    fn display_name(&self) -> &str;
}

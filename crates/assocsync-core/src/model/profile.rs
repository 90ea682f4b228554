use crate::model::{EntityId, EntityKind, MutableEntity, Named, OrderKey};
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Role
///
/// Drives client-side gating only; the remote policy layer enforces.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Role {
    SuperAdmin,
    Finance,
    Member,
}

impl Role {
    #[must_use]
    pub const fn is_super_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    #[must_use]
    pub const fn can_manage_finance(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Finance)
    }
}

///
/// Profile
///
/// Application-level identity; one per authenticated principal.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    /// Same as the principal id of the auth account.
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl EntityKind for Profile {
    type Draft = ProfileDraft;

    const TABLE: &'static str = "profiles";
    const NOUN: &'static str = "profile";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email"];
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("name")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for Profile {
    type Patch = ProfilePatch;
}

impl Named for Profile {
    fn display_name(&self) -> &str {
        &self.name
    }
}

use crate::model::{EntityId, EntityKind, MutableEntity, Named, OrderKey};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// MemberStatus
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
}

///
/// AssociationRole
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum AssociationRole {
    Board,
    FoundingMember,
    Associate,
}

///
/// Member
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub status: MemberStatus,
    pub role: AssociationRole,
    pub admission_date: NaiveDate,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub status: MemberStatus,
    pub role: AssociationRole,
    pub admission_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl MemberDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>, admission_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            address: None,
            city: None,
            postal_code: None,
            status: MemberStatus::Active,
            role: AssociationRole::Associate,
            admission_date,
            birth_date: None,
            avatar_url: None,
        }
    }

    #[must_use]
    pub const fn status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: AssociationRole) -> Self {
        self.role = role;
        self
    }
}

/// `Some(None)` on a nullable field clears the remote column; `None` leaves it.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AssociationRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl EntityKind for Member {
    type Draft = MemberDraft;

    const TABLE: &'static str = "members";
    const NOUN: &'static str = "member";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email"];
    const STATUS_FIELD: Option<&'static str> = Some("status");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("name")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for Member {
    type Patch = MemberPatch;
}

impl Named for Member {
    fn display_name(&self) -> &str {
        &self.name
    }
}

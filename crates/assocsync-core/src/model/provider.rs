use crate::model::{EntityId, EntityKind, MutableEntity, Named, OrderKey};
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// ProviderStatus
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ProviderStatus {
    Active,
    Inactive,
}

///
/// ServiceProvider
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    pub id: EntityId,
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: ProviderStatus,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderDraft {
    pub name: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: ProviderStatus,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProviderStatus>,
}

impl EntityKind for ServiceProvider {
    type Draft = ServiceProviderDraft;

    const TABLE: &'static str = "service_providers";
    const NOUN: &'static str = "service provider";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "service"];
    const STATUS_FIELD: Option<&'static str> = Some("status");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("name")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for ServiceProvider {
    type Patch = ServiceProviderPatch;
}

impl Named for ServiceProvider {
    fn display_name(&self) -> &str {
        &self.name
    }
}

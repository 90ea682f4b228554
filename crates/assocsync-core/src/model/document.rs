use crate::model::{EntityId, EntityKind, MutableEntity, OrderKey};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// DocumentCategory
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum DocumentCategory {
    Statute,
    Minutes,
    Financial,
    Contract,
    Report,
    Other,
}

///
/// Document
///
/// Metadata row for a stored blob. The row and the blob behind `url` are
/// created and destroyed together by the document vault.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: EntityId,
    pub name: String,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
    pub url: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub name: String,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
    pub url: String,
}

/// Locator and size are owned by the vault and cannot be patched.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<DocumentCategory>,
}

impl EntityKind for Document {
    type Draft = DocumentDraft;

    const TABLE: &'static str = "documents";
    const NOUN: &'static str = "document";
    const SEARCH_FIELDS: &'static [&'static str] = &["name"];
    const STATUS_FIELD: Option<&'static str> = Some("category");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::desc("uploadedAt")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for Document {
    type Patch = DocumentPatch;
}

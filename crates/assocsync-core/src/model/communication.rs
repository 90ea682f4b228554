use crate::model::{EntityId, EntityKind, OrderKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

///
/// Communication
///
/// Append-only record of a sent message. Deliberately not a
/// `MutableEntity`: there is no update or delete surface.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: EntityId,
    pub subject: String,
    pub body: String,
    /// Human-readable description of the resolved audience.
    pub recipients: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationDraft {
    pub subject: String,
    pub body: String,
    pub recipients: String,
    pub sent_at: DateTime<Utc>,
}

impl EntityKind for Communication {
    type Draft = CommunicationDraft;

    const TABLE: &'static str = "communications";
    const NOUN: &'static str = "communication";
    const SEARCH_FIELDS: &'static [&'static str] = &["subject"];
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::desc("sentAt")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

use crate::model::{EntityId, EntityKind, MutableEntity, OrderKey};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// EventCategory
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum EventCategory {
    Meeting,
    Assembly,
    Workshop,
    Fundraiser,
    Social,
    Other,
}

///
/// Event
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EntityId,
    pub title: String,
    pub date: NaiveDate,
    /// Wall-clock start as entered (`HH:MM`).
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub category: EventCategory,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: EventCategory,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
}

impl EntityKind for Event {
    type Draft = EventDraft;

    const TABLE: &'static str = "events";
    const NOUN: &'static str = "event";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "location"];
    const STATUS_FIELD: Option<&'static str> = Some("category");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("date"), OrderKey::asc("time")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for Event {
    type Patch = EventPatch;
}

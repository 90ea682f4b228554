use crate::model::{EntityId, EntityKind, MutableEntity, Named, OrderKey};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// ProjectStatus
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ProjectStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

///
/// Project
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Option<f64>>,
}

impl EntityKind for Project {
    type Draft = ProjectDraft;

    const TABLE: &'static str = "projects";
    const NOUN: &'static str = "project";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
    const STATUS_FIELD: Option<&'static str> = Some("status");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("name")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for Project {
    type Patch = ProjectPatch;
}

impl Named for Project {
    fn display_name(&self) -> &str {
        &self.name
    }
}

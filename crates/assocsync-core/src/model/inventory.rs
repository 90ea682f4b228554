use crate::model::{EntityId, EntityKind, MutableEntity, OrderKey};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// ItemCondition
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ItemCondition {
    New,
    Good,
    Fair,
    Poor,
    Broken,
}

///
/// InventoryItem
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub location: Option<String>,
    pub condition: ItemCondition,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDraft {
    pub name: String,
    pub category: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub condition: ItemCondition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ItemCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_on: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Option<f64>>,
}

impl EntityKind for InventoryItem {
    type Draft = InventoryItemDraft;

    const TABLE: &'static str = "inventory_items";
    const NOUN: &'static str = "inventory item";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "category", "location"];
    const STATUS_FIELD: Option<&'static str> = Some("condition");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::asc("name")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl MutableEntity for InventoryItem {
    type Patch = InventoryItemPatch;
}

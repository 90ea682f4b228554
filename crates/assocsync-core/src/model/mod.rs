//! Entity families mirrored from the remote store.
//!
//! Structs are in application convention (camelCase on the wire); the codec
//! maps them to storage convention at the store boundary.

mod communication;
mod document;
mod entity;
mod event;
mod inventory;
mod member;
mod profile;
mod project;
mod provider;
mod transaction;

#[cfg(test)]
mod tests;

pub use communication::{Communication, CommunicationDraft};
pub use document::{Document, DocumentCategory, DocumentDraft, DocumentPatch};
pub use entity::{EntityId, EntityKind, MutableEntity, Named, OrderKey};
pub use event::{Event, EventCategory, EventDraft, EventPatch};
pub use inventory::{InventoryItem, InventoryItemDraft, InventoryItemPatch, ItemCondition};
pub use member::{AssociationRole, Member, MemberDraft, MemberPatch, MemberStatus};
pub use profile::{Profile, ProfileDraft, ProfilePatch, Role};
pub use project::{Project, ProjectDraft, ProjectPatch, ProjectStatus};
pub use provider::{ProviderStatus, ServiceProvider, ServiceProviderDraft, ServiceProviderPatch};
pub use transaction::{
    LinkColumns, LinkKind, LinkRef, Transaction, TransactionDraft, TransactionKind,
    TransactionPatch,
};

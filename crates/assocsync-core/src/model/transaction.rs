use crate::{
    error::Error,
    model::{EntityId, EntityKind, MutableEntity, OrderKey},
};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// TransactionKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum TransactionKind {
    Income,
    Expense,
}

///
/// LinkKind
///
/// Family a transaction may point back to.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum LinkKind {
    Member,
    Project,
    Provider,
}

impl LinkKind {
    pub const ALL: [Self; 3] = [Self::Member, Self::Project, Self::Provider];

    /// Application-convention id field on the transaction.
    #[must_use]
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Member => "memberId",
            Self::Project => "projectId",
            Self::Provider => "providerId",
        }
    }
}

///
/// LinkRef
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LinkRef {
    pub kind: LinkKind,
    pub id: EntityId,
}

impl LinkRef {
    pub fn member(id: impl Into<EntityId>) -> Self {
        Self {
            kind: LinkKind::Member,
            id: id.into(),
        }
    }

    pub fn project(id: impl Into<EntityId>) -> Self {
        Self {
            kind: LinkKind::Project,
            id: id.into(),
        }
    }

    pub fn provider(id: impl Into<EntityId>) -> Self {
        Self {
            kind: LinkKind::Provider,
            id: id.into(),
        }
    }
}

///
/// LinkColumns
///
/// Denormalized back-reference columns. At most one pair is set in
/// practice; the storage schema does not enforce it.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkColumns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl LinkColumns {
    /// Columns for a single resolved link.
    #[must_use]
    pub fn resolved(link: &LinkRef, name: impl Into<String>) -> Self {
        let mut columns = Self::default();
        let (id, display) = match link.kind {
            LinkKind::Member => (&mut columns.member_id, &mut columns.member_name),
            LinkKind::Project => (&mut columns.project_id, &mut columns.project_name),
            LinkKind::Provider => (&mut columns.provider_id, &mut columns.provider_name),
        };
        *id = Some(link.id.clone());
        *display = Some(name.into());

        columns
    }

    /// First link present, checked in member, project, provider order.
    #[must_use]
    pub fn link(&self) -> Option<LinkRef> {
        if let Some(id) = &self.member_id {
            return Some(LinkRef::member(id.clone()));
        }
        if let Some(id) = &self.project_id {
            return Some(LinkRef::project(id.clone()));
        }
        self.provider_id.clone().map(LinkRef::provider)
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .or(self.project_name.as_deref())
            .or(self.provider_name.as_deref())
    }
}

///
/// Transaction
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: EntityId,
    pub description: String,
    /// Magnitude; the sign comes from `kind`.
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub links: LinkColumns,
}

impl Transaction {
    #[must_use]
    pub fn link(&self) -> Option<LinkRef> {
        self.links.link()
    }

    /// Amount with income positive and expense negative.
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount.abs(),
            TransactionKind::Expense => -self.amount.abs(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    #[serde(skip)]
    pub link: Option<LinkRef>,
    #[serde(flatten)]
    pub links: LinkColumns,
}

impl TransactionDraft {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
        date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            kind,
            date,
            link: None,
            links: LinkColumns::default(),
        }
    }

    /// Link to one member, project or provider; the display name is
    /// resolved by the ledger at write time.
    #[must_use]
    pub fn linked(mut self, link: LinkRef) -> Self {
        self.link = Some(link);
        self
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// `Some(None)` unlinks; `Some(Some(_))` relinks and re-resolves names.
    #[serde(skip)]
    pub link: Option<Option<LinkRef>>,

    // every link column, written explicitly when the link changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<Option<String>>,
}

impl TransactionPatch {
    /// Overwrite every link column from `columns`, nulling the unset ones.
    pub fn set_link_columns(&mut self, columns: LinkColumns) {
        self.member_id = Some(columns.member_id);
        self.member_name = Some(columns.member_name);
        self.project_id = Some(columns.project_id);
        self.project_name = Some(columns.project_name);
        self.provider_id = Some(columns.provider_id);
        self.provider_name = Some(columns.provider_name);
    }
}

impl EntityKind for Transaction {
    type Draft = TransactionDraft;

    const TABLE: &'static str = "transactions";
    const NOUN: &'static str = "transaction";
    const SEARCH_FIELDS: &'static [&'static str] = &["description"];
    const STATUS_FIELD: Option<&'static str> = Some("kind");
    const DEFAULT_ORDER: &'static [OrderKey] = &[OrderKey::desc("date")];

    fn id(&self) -> &EntityId {
        &self.id
    }

    // a link is only written once the ledger has resolved its name
    fn check_draft(draft: &Self::Draft) -> Result<(), Error> {
        if draft.link.is_some() && draft.links.link() != draft.link {
            return Err(Error::validation(
                "linked transactions must be recorded through the ledger",
            ));
        }

        Ok(())
    }
}

impl MutableEntity for Transaction {
    type Patch = TransactionPatch;

    fn check_patch(patch: &Self::Patch) -> Result<(), Error> {
        if patch.link.is_some() && patch.member_id.is_none() {
            return Err(Error::validation(
                "transaction links must be changed through the ledger",
            ));
        }

        Ok(())
    }
}

use crate::{
    codec,
    error::{Error, WriteFailureReason},
    model::{
        EntityId, EntityKind, LinkColumns, LinkKind, LinkRef, Member, Named, Project, ServiceProvider,
        Transaction, TransactionDraft, TransactionPatch,
    },
    remote::{RemoteTables, Select},
    report::ActionLabel,
    store::{EntityStore, ListOptions},
};
use std::sync::Arc;

///
/// Ledger
///
/// The transaction store. Link display names are denormalized onto each
/// transaction, so every write re-reads the linked row to pick up its
/// current name instead of trusting a cached one.
///

pub struct Ledger {
    store: EntityStore<Transaction>,
    tables: Arc<dyn RemoteTables>,
}

impl Ledger {
    #[must_use]
    pub const fn new(store: EntityStore<Transaction>, tables: Arc<dyn RemoteTables>) -> Self {
        Self { store, tables }
    }

    /// The underlying store, for reads and deletes. Writes go through
    /// `record` and `amend` so link names stay resolved.
    #[must_use]
    pub const fn store(&self) -> &EntityStore<Transaction> {
        &self.store
    }

    pub async fn record(&self, draft: TransactionDraft) -> Result<Transaction, Error> {
        let result = self.try_record(draft).await;
        if let Err(err) = &result {
            self.store
                .reporter
                .report(err, &ActionLabel::general("Record transaction"));
        }

        result
    }

    pub async fn try_record(&self, mut draft: TransactionDraft) -> Result<Transaction, Error> {
        draft.links = match &draft.link {
            Some(link) => LinkColumns::resolved(link, self.resolve_name(link).await?),
            None => LinkColumns::default(),
        };

        self.store.try_create(&draft).await
    }

    pub async fn amend(
        &self,
        id: &EntityId,
        mut patch: TransactionPatch,
    ) -> Result<Transaction, Error> {
        let result = async {
            match patch.link.clone() {
                Some(Some(link)) => {
                    let name = self.resolve_name(&link).await?;
                    patch.set_link_columns(LinkColumns::resolved(&link, name));
                }
                Some(None) => patch.set_link_columns(LinkColumns::default()),
                None => self.refresh_link_columns(id, &mut patch).await?,
            }

            self.store.try_update(id, &patch).await
        }
        .await;

        if let Err(err) = &result {
            self.store
                .reporter
                .report(err, &ActionLabel::general("Update transaction"));
        }

        result
    }

    /// Transactions linked to one member, project or provider, newest
    /// first. Does not replace the published collection.
    pub async fn history_for(&self, link: &LinkRef) -> Result<Vec<Transaction>, Error> {
        let options = ListOptions::new().eq(link.kind.id_field(), link.id.as_str());
        let result = self.store.fetch(&options).await;
        if let Err(err) = &result {
            self.store
                .reporter
                .report(err, &ActionLabel::general("Load transaction history"));
        }

        result
    }

    /// Income minus expense over the published collection.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.store
            .snapshot()
            .iter()
            .map(Transaction::signed_amount)
            .sum()
    }

    /// Current display name of the linked row.
    pub async fn resolve_name(&self, link: &LinkRef) -> Result<String, Error> {
        self.current_name(link).await?.ok_or_else(|| {
            let noun = match link.kind {
                LinkKind::Member => Member::NOUN,
                LinkKind::Project => Project::NOUN,
                LinkKind::Provider => ServiceProvider::NOUN,
            };
            Error::validation(format!("linked {noun} {} does not exist", link.id))
        })
    }

    async fn current_name(&self, link: &LinkRef) -> Result<Option<String>, Error> {
        let name = match link.kind {
            LinkKind::Member => self.fetch_name::<Member>(&link.id).await?,
            LinkKind::Project => self.fetch_name::<Project>(&link.id).await?,
            LinkKind::Provider => self.fetch_name::<ServiceProvider>(&link.id).await?,
        };

        Ok(name)
    }

    // A patch that leaves the link alone still rewrites the stored link
    // name, so a renamed member shows up on the next edit. A link whose
    // target has been deleted keeps its last known name.
    async fn refresh_link_columns(
        &self,
        id: &EntityId,
        patch: &mut TransactionPatch,
    ) -> Result<(), Error> {
        let Some(link) = self
            .fetch_one::<Transaction>(id)
            .await?
            .and_then(|stored| stored.link())
        else {
            return Ok(());
        };

        match self.current_name(&link).await? {
            Some(name) => patch.set_link_columns(LinkColumns::resolved(&link, name)),
            None => tracing::warn!(%id, linked = %link.id, "linked row is gone, name kept"),
        }

        Ok(())
    }

    async fn fetch_name<E: Named>(&self, id: &EntityId) -> Result<Option<String>, Error> {
        let linked = self.fetch_one::<E>(id).await?;

        Ok(linked.map(|entity| entity.display_name().to_string()))
    }

    async fn fetch_one<E: EntityKind>(&self, id: &EntityId) -> Result<Option<E>, Error> {
        let query = Select::new().eq("id", id.as_str()).limit(1);
        let rows = self
            .tables
            .select(E::TABLE, &query)
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;

        Ok(codec::decode_rows(rows)?.into_iter().next())
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

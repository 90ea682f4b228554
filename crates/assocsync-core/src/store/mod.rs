//! Per-family in-memory mirrors of remote tables.
//!
//! Writes go through to the remote store and are followed by a resync of
//! the collection; deletes splice the local collection. Every published
//! collection is the result of the newest read, never of a stale one.

mod filter;
mod ledger;
mod outbox;
mod resync;


use crate::{
    codec,
    error::{Error, WriteFailureReason},
    model::{EntityId, EntityKind, MutableEntity},
    obs::{EventSink, SyncEvent, SyncOp, global_sink},
    remote::{RemoteTables, Row},
    report::{ActionLabel, Reporter},
};
use resync::ResyncTickets;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

// re-exports
pub use filter::ListOptions;
pub use ledger::Ledger;
pub use outbox::{Audience, CommunicationLog, Message};

///
/// EntityStore
///

pub struct EntityStore<E: EntityKind> {
    tables: Arc<dyn RemoteTables>,
    reporter: Arc<Reporter>,
    sink: Arc<dyn EventSink>,
    collection: watch::Sender<Arc<Vec<E>>>,
    tickets: ResyncTickets,
    last_options: Mutex<ListOptions>,
    default_limit: usize,
}

impl<E: EntityKind> EntityStore<E> {
    #[must_use]
    pub fn new(tables: Arc<dyn RemoteTables>, reporter: Arc<Reporter>) -> Self {
        Self {
            tables,
            reporter,
            sink: global_sink(),
            collection: watch::Sender::new(Arc::new(Vec::new())),
            tickets: ResyncTickets::default(),
            last_options: Mutex::new(ListOptions::default()),
            default_limit: crate::DEFAULT_LIST_LIMIT,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Read the collection with `options`, publish it, and remember the
    /// options for later resyncs. Failures are reported.
    ///
    /// Options are remembered together with the rows they produced, so a
    /// read that lost the race never steers the next resync.
    pub async fn list(&self, options: ListOptions) -> Result<Arc<Vec<E>>, Error> {
        let result = self.try_list(options).await;
        if let Err(err) = &result {
            self.reporter
                .report(err, &ActionLabel::general(format!("Load {}s", E::NOUN)));
        }

        result
    }

    /// As `list`, without reporting.
    ///
    /// The fetched rows are always returned; they are published only if no
    /// newer read has been published in the meantime.
    pub async fn try_list(&self, options: ListOptions) -> Result<Arc<Vec<E>>, Error> {
        let ticket = self.tickets.issue();
        let rows = Arc::new(self.fetch(&options).await?);
        self.publish(ticket, Arc::clone(&rows), options);

        Ok(rows)
    }

    /// Re-run the most recent list options.
    pub async fn refresh(&self) -> Result<Arc<Vec<E>>, Error> {
        let options = self.current_options();
        self.list(options).await
    }

    /// Read rows without touching the published collection.
    pub async fn fetch(&self, options: &ListOptions) -> Result<Vec<E>, Error> {
        let select = options.to_select::<E>(self.default_limit);
        let result = self.tables.select(E::TABLE, &select).await;

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                self.record(SyncOp::List, 0, false);
                return Err(Error::from_remote(err, WriteFailureReason::Database));
            }
        };

        tracing::debug!(table = E::TABLE, rows = rows.len(), "list");
        self.record(SyncOp::List, rows.len() as u64, true);

        codec::decode_rows(rows)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<E>>> {
        self.collection.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<E>> {
        Arc::clone(&self.collection.borrow())
    }

    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.collection
            .borrow()
            .iter()
            .find(|entity| entity.id() == id)
            .cloned()
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Insert a row and resync. Failures are reported and returned; the
    /// collection is left unchanged.
    pub async fn create(&self, draft: &E::Draft) -> Result<E, Error> {
        let result = self.try_create(draft).await;
        if let Err(err) = &result {
            self.reporter
                .report(err, &ActionLabel::general(format!("Create {}", E::NOUN)));
        }

        result
    }

    /// As `create`, without reporting the write failure.
    ///
    /// A failing resync after a successful insert is reported on its own
    /// and does not fail the create.
    pub async fn try_create(&self, draft: &E::Draft) -> Result<E, Error> {
        let stored = self.insert_row(draft).await?;

        self.accept_inserted(stored).await
    }

    /// Validate, encode and insert `draft`. An `Ok` means the row exists
    /// remotely, whatever happens to the echoed copy afterwards.
    pub(crate) async fn insert_row(&self, draft: &E::Draft) -> Result<Row, Error> {
        E::check_draft(draft)?;
        let row = codec::encode_row(draft)?;

        match self.tables.insert(E::TABLE, row).await {
            Ok(stored) => {
                self.record(SyncOp::Create, 1, true);
                Ok(stored)
            }
            Err(err) => {
                self.record(SyncOp::Create, 0, false);
                Err(Error::from_remote(err, WriteFailureReason::Database))
            }
        }
    }

    /// Decode the echoed row of a committed insert and resync. The resync
    /// runs even when decoding fails, so the collection shows the new row.
    pub(crate) async fn accept_inserted(&self, stored: Row) -> Result<E, Error> {
        let decoded = codec::decode_row::<E>(stored);
        match &decoded {
            Ok(entity) => tracing::info!(table = E::TABLE, id = %entity.id(), "created"),
            Err(err) => tracing::warn!(table = E::TABLE, error = %err, "created row unreadable"),
        }

        self.resync().await;

        decoded
    }

    /// Write-then-resync after a mutation this store did not make itself.
    pub async fn resync(&self) {
        let options = self.current_options();
        if let Err(err) = self.try_list(options).await {
            self.reporter
                .report(&err, &ActionLabel::general(format!("Refresh {}s", E::NOUN)));
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn current_options(&self) -> ListOptions {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, ticket: u64, rows: Arc<Vec<E>>, options: ListOptions) {
        // the ticket is claimed under the channel's write lock, so a claim
        // and its publish are never interleaved with another publish
        let applied = self.collection.send_if_modified(|current| {
            if !self.tickets.try_apply(ticket) {
                return false;
            }
            *self
                .last_options
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = options;
            *current = rows;
            true
        });

        if !applied {
            tracing::debug!(table = E::TABLE, ticket, "stale resync discarded");
            self.sink
                .record(SyncEvent::ResyncDiscarded { table: E::TABLE });
        }
    }

    fn record(&self, op: SyncOp, rows: u64, ok: bool) {
        self.sink.record(SyncEvent::OpFinish {
            op,
            table: E::TABLE,
            rows,
            ok,
        });
    }
}

impl<E: MutableEntity> EntityStore<E> {
    /// Apply a partial update and resync. Failures are reported and
    /// returned.
    pub async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, Error> {
        let result = self.try_update(id, patch).await;
        if let Err(err) = &result {
            self.reporter
                .report(err, &ActionLabel::general(format!("Update {}", E::NOUN)));
        }

        result
    }

    /// As `update`, without reporting. Fields absent from the patch are
    /// omitted from the payload and keep their remote value.
    pub async fn try_update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, Error> {
        E::check_patch(patch)?;
        let row = codec::encode_row(patch)?;
        if row.is_empty() {
            return Err(Error::validation(format!("empty {} update", E::NOUN)));
        }

        let stored = match self.tables.update(E::TABLE, id.as_str(), row).await {
            Ok(stored) => stored,
            Err(err) => {
                self.record(SyncOp::Update, 0, false);
                return Err(Error::from_remote(err, WriteFailureReason::Database));
            }
        };
        self.record(SyncOp::Update, 1, true);
        tracing::info!(table = E::TABLE, %id, "updated");

        let entity = codec::decode_row(stored)?;
        self.resync().await;

        Ok(entity)
    }

    /// Delete by id. Failures are reported, not returned; the result says
    /// whether the row is gone.
    pub async fn delete(&self, id: &EntityId) -> bool {
        match self.try_delete(id).await {
            Ok(()) => true,
            Err(err) => {
                self.reporter
                    .report(&err, &ActionLabel::general(format!("Delete {}", E::NOUN)));
                false
            }
        }
    }

    /// Delete by id and splice the local collection. In-flight reads that
    /// started before the delete can no longer publish.
    pub async fn try_delete(&self, id: &EntityId) -> Result<(), Error> {
        if let Err(err) = self.tables.delete(E::TABLE, id.as_str()).await {
            self.record(SyncOp::Delete, 0, false);
            return Err(Error::from_remote(err, WriteFailureReason::Database));
        }
        self.record(SyncOp::Delete, 1, true);
        tracing::info!(table = E::TABLE, %id, "deleted");

        self.collection.send_modify(|current| {
            self.tickets.invalidate();
            if current.iter().any(|entity| entity.id() == id) {
                *current = Arc::new(
                    current
                        .iter()
                        .filter(|entity| entity.id() != id)
                        .cloned()
                        .collect(),
                );
            }
        });

        Ok(())
    }
}

impl<E: EntityKind> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("table", &E::TABLE)
            .field("rows", &self.collection.borrow().len())
            .finish_non_exhaustive()
    }
}

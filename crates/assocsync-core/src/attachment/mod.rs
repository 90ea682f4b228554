//! Blob-plus-row writes with compensating rollback.
//!
//! Adding a document uploads the blob, resolves its public locator and
//! inserts the metadata row. A failure after the upload removes the blob
//! again, so neither an orphaned blob nor a row with a dangling locator
//! survives a failed add.

mod locator;

#[cfg(test)]
mod tests;

use crate::{
    config::BucketConfig,
    error::{Error, WriteFailureReason},
    model::{Document, DocumentCategory, DocumentDraft, EntityId},
    obs::{EventSink, SyncEvent, global_sink},
    remote::RemoteStorage,
    report::{ActionLabel, Reporter},
    session::SessionKeeper,
    store::EntityStore,
};
use chrono::Utc;
use std::sync::Arc;

// re-exports
pub use locator::{locator_to_path, object_path, sanitize_filename};

///
/// Upload
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            content_type: None,
        }
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

///
/// NewDocument
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewDocument {
    pub name: String,
    pub category: DocumentCategory,
    pub upload: Upload,
}

///
/// DocumentVault
///

pub struct DocumentVault {
    documents: EntityStore<Document>,
    storage: Arc<dyn RemoteStorage>,
    session: Arc<SessionKeeper>,
    reporter: Arc<Reporter>,
    sink: Arc<dyn EventSink>,
    buckets: BucketConfig,
}

impl DocumentVault {
    #[must_use]
    pub fn new(
        documents: EntityStore<Document>,
        storage: Arc<dyn RemoteStorage>,
        session: Arc<SessionKeeper>,
        reporter: Arc<Reporter>,
        buckets: BucketConfig,
    ) -> Self {
        Self {
            documents,
            storage,
            session,
            reporter,
            sink: global_sink(),
            buckets,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The document store, for reads and metadata edits.
    #[must_use]
    pub const fn documents(&self) -> &EntityStore<Document> {
        &self.documents
    }

    pub async fn add(&self, document: NewDocument) -> Result<Document, Error> {
        let result = self.try_add(document).await;
        if let Err(err) = &result {
            self.reporter
                .report(err, &ActionLabel::storage("Upload document"));
        }

        result
    }

    pub async fn try_add(&self, document: NewDocument) -> Result<Document, Error> {
        let identity = self.session.require_identity()?;
        let bucket = self.buckets.documents.as_str();
        let NewDocument {
            name,
            category,
            upload,
        } = document;
        let size = upload.bytes.len() as u64;

        // 1. blob
        let path = self.upload(bucket, identity.id.as_str(), upload).await?;

        // 2. locator
        let Some(url) = self.storage.public_locator(bucket, &path) else {
            self.compensate(bucket, &path).await;
            return Err(Error::domain(
                WriteFailureReason::Locator,
                format!("no public locator for '{path}'"),
            ));
        };

        // 3. row
        let draft = DocumentDraft {
            name,
            category,
            uploaded_at: Utc::now(),
            size,
            url,
        };

        // 4. only a rejected insert undoes the blob; once the row exists
        // the blob stays with it, even if the echoed row cannot be read
        let stored = match self.documents.insert_row(&draft).await {
            Ok(stored) => stored,
            Err(err) => {
                self.compensate(bucket, &path).await;
                return Err(err.with_reason(WriteFailureReason::Database));
            }
        };

        let document = self.documents.accept_inserted(stored).await?;
        tracing::info!(id = %document.id, %path, size, "document added");

        Ok(document)
    }

    /// Delete the row, then the blob behind it.
    ///
    /// The row is authoritative: an unparseable locator or a failed blob
    /// removal only leaks the blob and is logged.
    pub async fn remove(&self, document: &Document) -> bool {
        let bucket = self.buckets.documents.as_str();
        let path = locator_to_path(&document.url, bucket);
        if path.is_none() {
            tracing::warn!(id = %document.id, url = %document.url, "locator not parseable; blob will be orphaned");
        }

        if let Err(err) = self.documents.try_delete(&document.id).await {
            self.reporter
                .report(&err, &ActionLabel::storage("Delete document"));
            return false;
        }

        if let Some(path) = path
            && let Err(err) = self.storage.remove(bucket, &[path.clone()]).await
        {
            tracing::warn!(%path, error = %err, "blob removal failed; blob orphaned");
        }

        true
    }

    /// Upload an avatar for `owner` and return its public locator.
    pub async fn upload_avatar(&self, owner: &EntityId, upload: Upload) -> Result<String, Error> {
        let result = self.try_upload_avatar(owner, upload).await;
        if let Err(err) = &result {
            self.reporter
                .report(err, &ActionLabel::storage("Upload avatar"));
        }

        result
    }

    pub async fn try_upload_avatar(&self, owner: &EntityId, upload: Upload) -> Result<String, Error> {
        let bucket = self.buckets.avatars.as_str();
        let path = self.upload(bucket, owner.as_str(), upload).await?;

        match self.storage.public_locator(bucket, &path) {
            Some(url) => Ok(url),
            None => {
                self.compensate(bucket, &path).await;
                Err(Error::domain(
                    WriteFailureReason::Locator,
                    format!("no public locator for '{path}'"),
                ))
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn upload(&self, bucket: &str, owner: &str, upload: Upload) -> Result<String, Error> {
        let path = object_path(owner, Utc::now().timestamp_millis(), &upload.filename);

        self.storage
            .upload(bucket, &path, upload.bytes, upload.content_type.as_deref())
            .await
            .map_err(|err| {
                Error::from_remote(err, WriteFailureReason::Storage)
                    .with_reason(WriteFailureReason::Storage)
            })?;
        tracing::debug!(%bucket, %path, "uploaded");

        Ok(path)
    }

    async fn compensate(&self, bucket: &str, path: &str) {
        let result = self.storage.remove(bucket, &[path.to_string()]).await;
        let ok = result.is_ok();

        match result {
            Ok(()) => tracing::warn!(%bucket, %path, "removed upload after failed write"),
            Err(err) => {
                tracing::warn!(%bucket, %path, error = %err, "could not remove upload; blob orphaned");
            }
        }

        self.sink.record(SyncEvent::Compensation {
            bucket: bucket.to_string(),
            ok,
        });
    }
}

impl std::fmt::Debug for DocumentVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentVault")
            .field("documents", &self.documents)
            .field("buckets", &self.buckets)
            .finish_non_exhaustive()
    }
}

use super::*;
use crate::{
    error::ErrorClass,
    model::Role,
    obs::SyncEvent,
    remote::{FaultPoint, MemoryRemote, RemoteError, RemoteTables, Row, Select},
    report::{STORAGE_HINT, SESSION_EXPIRED_MESSAGE},
    test_support::Fixture,
};
use async_trait::async_trait;

fn vault(fx: &Fixture) -> DocumentVault {
    DocumentVault::new(
        fx.store(),
        fx.remote.clone(),
        Arc::clone(&fx.session),
        Arc::clone(&fx.reporter),
        BucketConfig::default(),
    )
    .with_sink(fx.sink.clone())
}

fn minutes() -> NewDocument {
    NewDocument {
        name: "Minutes March".into(),
        category: DocumentCategory::Minutes,
        upload: Upload::new("minutes march.pdf", vec![0x25, 0x50, 0x44, 0x46])
            .content_type("application/pdf"),
    }
}

#[tokio::test]
async fn add_uploads_links_and_resyncs() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let owner = fx.session.identity().unwrap().id;
    let vault = vault(&fx);

    let document = vault.add(minutes()).await.unwrap();

    let paths = fx.remote.object_paths("documents");
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with(&format!("{owner}/")));
    assert!(paths[0].ends_with("_minutes_march.pdf"));
    assert_eq!(document.size, 4);
    assert_eq!(
        locator_to_path(&document.url, "documents").as_deref(),
        Some(paths[0].as_str())
    );
    assert_eq!(vault.documents().snapshot().as_slice(), [document]);
}

#[tokio::test]
async fn missing_locator_removes_the_blob() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote.refuse_locators(true);
    let vault = vault(&fx);

    let err = vault.add(minutes()).await.unwrap_err();

    assert_eq!(err.reason(), Some(WriteFailureReason::Locator));
    assert!(fx.remote.list("documents", "").await.unwrap().is_empty());
    assert!(fx.remote.rows("documents").is_empty());
    assert!(
        fx.sink.events().contains(&SyncEvent::Compensation {
            bucket: "documents".into(),
            ok: true,
        })
    );
    assert!(fx.reporter.current().unwrap().message.ends_with(STORAGE_HINT));
}

#[tokio::test]
async fn failed_insert_removes_the_blob() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote.fail_next(
        FaultPoint::Insert("documents".into()),
        RemoteError::response(400, "null value in column \"category\"").with_code("23502"),
    );
    let vault = vault(&fx);

    let err = vault.add(minutes()).await.unwrap_err();

    assert_eq!(err.reason(), Some(WriteFailureReason::Database));
    assert!(fx.remote.object_paths("documents").is_empty());
    assert!(fx.remote.rows("documents").is_empty());
    assert!(vault.documents().snapshot().is_empty());
}

///
/// GarbledEcho
///
/// Stores rows faithfully but echoes inserts back with a mistyped size.
///

struct GarbledEcho {
    inner: Arc<MemoryRemote>,
}

#[async_trait]
impl RemoteTables for GarbledEcho {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, RemoteError> {
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError> {
        let mut stored = self.inner.insert(table, row).await?;
        stored.insert("size".into(), serde_json::Value::String("11".into()));
        Ok(stored)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, RemoteError> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        self.inner.delete(table, id).await
    }
}

#[tokio::test]
async fn unreadable_echo_keeps_the_blob_of_the_stored_row() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let tables = Arc::new(GarbledEcho {
        inner: fx.remote.clone(),
    });
    let documents = EntityStore::new(tables, Arc::clone(&fx.reporter)).with_sink(fx.sink.clone());
    let vault = DocumentVault::new(
        documents,
        fx.remote.clone(),
        Arc::clone(&fx.session),
        Arc::clone(&fx.reporter),
        BucketConfig::default(),
    )
    .with_sink(fx.sink.clone());

    let err = vault.add(minutes()).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(fx.remote.rows("documents").len(), 1);
    assert_eq!(fx.remote.object_paths("documents").len(), 1);
    assert!(
        !fx.sink
            .events()
            .iter()
            .any(|e| matches!(e, SyncEvent::Compensation { .. }))
    );
    // the resync reads the stored row, which decodes fine
    let listed = vault.documents().snapshot();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        locator_to_path(&listed[0].url, "documents").as_deref(),
        Some(fx.remote.object_paths("documents")[0].as_str())
    );
}

#[tokio::test]
async fn failed_upload_writes_nothing() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote.fail_next(
        FaultPoint::Upload("documents".into()),
        RemoteError::response(404, "Bucket not found"),
    );
    let vault = vault(&fx);

    let err = vault.add(minutes()).await.unwrap_err();

    assert_eq!(err.reason(), Some(WriteFailureReason::Storage));
    assert!(fx.remote.rows("documents").is_empty());
    assert!(
        !fx.sink
            .events()
            .iter()
            .any(|e| matches!(e, SyncEvent::Compensation { .. }))
    );
}

#[tokio::test]
async fn expired_credential_on_upload_forces_logout() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote.fail_next(
        FaultPoint::Upload("documents".into()),
        RemoteError::response(400, "JWT expired"),
    );
    let vault = vault(&fx);

    let err = vault.add(minutes()).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Authorization);
    assert_eq!(fx.reporter.current().unwrap().message, SESSION_EXPIRED_MESSAGE);
    assert!(fx.reporter.logout_pending());
}

#[tokio::test]
async fn add_requires_a_session() {
    let fx = Fixture::new().await;
    let vault = vault(&fx);

    let err = vault.try_add(minutes()).await.unwrap_err();

    assert_eq!(err, Error::NotAuthenticated);
    assert!(fx.remote.object_paths("documents").is_empty());
}

#[tokio::test]
async fn remove_deletes_row_and_blob() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let vault = vault(&fx);
    let document = vault.add(minutes()).await.unwrap();

    assert!(vault.remove(&document).await);

    assert!(fx.remote.object_paths("documents").is_empty());
    assert!(fx.remote.rows("documents").is_empty());
    assert!(vault.documents().snapshot().is_empty());
}

#[tokio::test]
async fn unparseable_locator_still_deletes_the_row() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let vault = vault(&fx);
    let mut document = vault.add(minutes()).await.unwrap();
    document.url = "not a locator".into();

    assert!(vault.remove(&document).await);

    assert!(fx.remote.rows("documents").is_empty());
    // the blob is leaked, not an error
    assert_eq!(fx.remote.object_paths("documents").len(), 1);
}

#[tokio::test]
async fn failed_blob_removal_is_not_fatal() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let vault = vault(&fx);
    let document = vault.add(minutes()).await.unwrap();
    fx.remote.fail_next(
        FaultPoint::Remove("documents".into()),
        RemoteError::network("offline"),
    );

    assert!(vault.remove(&document).await);
    assert!(
        fx.remote
            .select("documents", &Select::new())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn failed_row_delete_keeps_everything() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let vault = vault(&fx);
    let document = vault.add(minutes()).await.unwrap();
    fx.remote.fail_next(
        FaultPoint::Delete("documents".into()),
        RemoteError::response(403, "permission denied").with_code("42501"),
    );

    assert!(!vault.remove(&document).await);
    assert_eq!(fx.remote.object_paths("documents").len(), 1);
    assert_eq!(vault.documents().snapshot().len(), 1);
}

#[tokio::test]
async fn avatar_upload_returns_public_locator() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let vault = vault(&fx);

    let url = vault
        .upload_avatar(&"m1".into(), Upload::new("me.png", vec![1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(
        locator_to_path(&url, "avatars").as_deref(),
        fx.remote.object_paths("avatars").first().map(String::as_str)
    );
    assert!(url.contains("/avatars/m1/"));
}

#[tokio::test]
async fn avatar_without_locator_is_rolled_back() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote.refuse_locators(true);
    let vault = vault(&fx);

    let err = vault
        .upload_avatar(&"m1".into(), Upload::new("me.png", vec![1]))
        .await
        .unwrap_err();

    assert_eq!(err.reason(), Some(WriteFailureReason::Locator));
    assert!(fx.remote.object_paths("avatars").is_empty());
}

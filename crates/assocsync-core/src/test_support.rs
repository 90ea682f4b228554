//! Shared fixtures for unit tests.

use crate::{
    model::{EntityKind, Role},
    obs::{EventSink, SyncEvent},
    remote::{MemoryRemote, Row},
    report::Reporter,
    session::SessionKeeper,
    store::EntityStore,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub(crate) const LOGOUT_DELAY: Duration = Duration::from_millis(1500);
pub(crate) const SECRET: &str = "correct horse";

/// Unwrap a JSON object literal into a storage row.
pub(crate) fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(row) => row,
        other => panic!("expected object literal, got {other}"),
    }
}

///
/// RecordingSink
///

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

///
/// Fixture
///
/// A memory remote with a started session keeper and a reporter wired to it.
///

pub(crate) struct Fixture {
    pub(crate) remote: Arc<MemoryRemote>,
    pub(crate) session: Arc<SessionKeeper>,
    pub(crate) reporter: Arc<Reporter>,
    pub(crate) sink: Arc<RecordingSink>,
}

impl Fixture {
    pub(crate) async fn new() -> Self {
        Self::with_remote(MemoryRemote::new()).await
    }

    pub(crate) async fn with_remote(remote: Arc<MemoryRemote>) -> Self {
        let session = SessionKeeper::start(remote.clone(), remote.clone()).await;
        let sink = Arc::new(RecordingSink::default());
        let reporter = Arc::new(
            Reporter::new(Arc::clone(&session), LOGOUT_DELAY).with_sink(sink.clone()),
        );

        Self {
            remote,
            session,
            reporter,
            sink,
        }
    }

    /// Account plus readable profile row; returns the principal id.
    pub(crate) fn account(&self, email: &str, name: &str, role: Role) -> String {
        let principal = self.remote.add_account(email, SECRET);
        self.remote.seed(
            "profiles",
            row(serde_json::json!({
                "id": principal,
                "name": name,
                "email": email,
                "role": role,
            })),
        );

        principal
    }

    /// Fixture already signed in with the given role.
    pub(crate) async fn signed_in(role: Role) -> Self {
        let fixture = Self::new().await;
        fixture.account("admin@example.org", "Admin", role);
        fixture
            .session
            .login("admin@example.org", SECRET)
            .await
            .unwrap();

        fixture
    }

    pub(crate) fn store<E: EntityKind>(&self) -> EntityStore<E> {
        EntityStore::new(self.remote.clone(), Arc::clone(&self.reporter))
            .with_sink(self.sink.clone())
    }
}

//! In-process backend implementing every remote contract.
//!
//! Equal ordering keys fall back to the row id, so reads are deterministic.
//! Read denial emulates an authorization policy that hides rows, and faults
//! can be queued per operation to exercise failure paths.

use super::{
    AuthEvent, AuthListener, AuthSession, AuthSubscription, RemoteAuth, RemoteError,
    RemoteFunctions, RemoteStorage, RemoteTables, Row, Select,
};
use crate::value::Value;
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;
use ulid::Ulid;

const LOCATOR_BASE: &str = "memory://assocsync/storage/v1/object/public";

pub type FunctionHandler =
    Arc<dyn Fn(serde_json::Value) -> Result<serde_json::Value, RemoteError> + Send + Sync>;

///
/// FaultPoint
///
/// Operation a queued fault fires on.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum FaultPoint {
    Select(String),
    Insert(String),
    Update(String),
    Delete(String),
    Upload(String),
    Remove(String),
    SignIn,
    SignOut,
    Invoke(String),
}

///
/// ReadDenial
///
/// `None` hides every row; `Some` fails the read outright.
///

type ReadDenial = Option<RemoteError>;

struct Account {
    principal_id: String,
    secret: String,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, Vec<Row>>,
    defaults: BTreeMap<String, Row>,
    required: BTreeMap<String, Vec<String>>,
    denied_reads: BTreeMap<String, ReadDenial>,

    objects: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    refuse_locators: bool,

    accounts: BTreeMap<String, Account>,
    session: Option<AuthSession>,
    issued_tokens: u64,

    functions: BTreeMap<String, FunctionHandler>,
    invocations: Vec<(String, serde_json::Value)>,

    faults: BTreeMap<FaultPoint, VecDeque<RemoteError>>,
    next_seq: u128,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, AuthListener>,
}

///
/// MemoryRemote
///

#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
    listeners: Arc<Mutex<Listeners>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ---------------------------------------------------------------------
    // Seeding and policy knobs
    // ---------------------------------------------------------------------

    /// Register a sign-in account; returns its principal id.
    pub fn add_account(&self, email: &str, secret: &str) -> String {
        let mut state = lock(&self.state);
        let principal_id = state.mint_id();
        state.accounts.insert(
            email.to_lowercase(),
            Account {
                principal_id: principal_id.clone(),
                secret: secret.to_string(),
            },
        );

        principal_id
    }

    /// Insert a row verbatim (an `id` column is minted when absent).
    pub fn seed(&self, table: &str, mut row: Row) -> String {
        let mut state = lock(&self.state);
        let id = match row.get("id").and_then(serde_json::Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = state.mint_id();
                row.insert("id".into(), serde_json::Value::String(id.clone()));
                id
            }
        };
        state.tables.entry(table.to_string()).or_default().push(row);

        id
    }

    /// Column values filled in on insert when the payload omits them.
    pub fn set_default(&self, table: &str, column: &str, value: serde_json::Value) {
        lock(&self.state)
            .defaults
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), value);
    }

    /// Reject inserts that leave `column` absent or null.
    pub fn require_column(&self, table: &str, column: &str) {
        lock(&self.state)
            .required
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
    }

    /// Hide every row of `table` from reads, or fail reads with `error`.
    pub fn deny_reads(&self, table: &str, error: Option<RemoteError>) {
        lock(&self.state)
            .denied_reads
            .insert(table.to_string(), error);
    }

    pub fn allow_reads(&self, table: &str) {
        lock(&self.state).denied_reads.remove(table);
    }

    /// Stop handing out public locators.
    pub fn refuse_locators(&self, refuse: bool) {
        lock(&self.state).refuse_locators = refuse;
    }

    /// Queue a failure for the next call at `point`.
    pub fn fail_next(&self, point: FaultPoint, error: RemoteError) {
        lock(&self.state)
            .faults
            .entry(point)
            .or_default()
            .push_back(error);
    }

    pub fn register_function(&self, name: &str, handler: FunctionHandler) {
        lock(&self.state)
            .functions
            .insert(name.to_string(), handler);
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// Every row of `table`, ignoring read policy.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn row(&self, table: &str, id: &str) -> Option<Row> {
        self.rows(table).into_iter().find(|row| row_id(row) == Some(id))
    }

    #[must_use]
    pub fn object_paths(&self, bucket: &str) -> Vec<String> {
        lock(&self.state)
            .objects
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<(String, serde_json::Value)> {
        lock(&self.state).invocations.clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn take_fault(&self, point: &FaultPoint) -> Result<(), RemoteError> {
        let mut state = lock(&self.state);
        match state.faults.get_mut(point).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // Listeners run outside both locks so they may call back into the remote.
    fn emit(&self, event: &AuthEvent) {
        let listeners: Vec<AuthListener> = lock(&self.listeners).entries.values().cloned().collect();
        for listener in listeners {
            listener(event.clone());
        }
    }
}

impl State {
    fn mint_id(&mut self) -> String {
        self.next_seq += 1;
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();

        Ulid::from_parts(millis, self.next_seq).to_string()
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(serde_json::Value::as_str)
}

fn not_found(table: &str, id: &str) -> RemoteError {
    RemoteError::response(406, format!("no row in {table} with id {id}")).with_code("PGRST116")
}

#[async_trait]
impl RemoteTables for MemoryRemote {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, RemoteError> {
        self.take_fault(&FaultPoint::Select(table.to_string()))?;

        let state = lock(&self.state);
        if let Some(denial) = state.denied_reads.get(table) {
            return match denial {
                Some(err) => Err(err.clone()),
                None => Ok(Vec::new()),
            };
        }

        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        drop(state);

        // minted ids grow with insertion, so the id tiebreak keeps insertion order
        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|order| {
                    let left = a.get(&order.column).cloned().map_or(Value::Null, Value::from);
                    let right = b.get(&order.column).cloned().map_or(Value::Null, Value::from);
                    match order.direction {
                        super::Direction::Asc => left.order_cmp(&right),
                        super::Direction::Desc => right.order_cmp(&left),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| row_id(a).cmp(&row_id(b)))
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        debug!(table, rows = rows.len(), "memory select");

        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, RemoteError> {
        self.take_fault(&FaultPoint::Insert(table.to_string()))?;

        let mut state = lock(&self.state);
        if let Some(defaults) = state.defaults.get(table) {
            for (column, value) in defaults {
                row.entry(column.clone()).or_insert_with(|| value.clone());
            }
        }
        if let Some(required) = state.required.get(table) {
            for column in required {
                if row.get(column).is_none_or(serde_json::Value::is_null) {
                    return Err(RemoteError::response(
                        400,
                        format!(
                            "null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"
                        ),
                    )
                    .with_code("23502"));
                }
            }
        }
        if row_id(&row).is_none() {
            let id = state.mint_id();
            row.insert("id".into(), serde_json::Value::String(id));
        }
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, RemoteError> {
        self.take_fault(&FaultPoint::Update(table.to_string()))?;

        let mut state = lock(&self.state);
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| not_found(table, id))?;
        for (column, value) in patch {
            if column != "id" {
                row.insert(column, value);
            }
        }

        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        self.take_fault(&FaultPoint::Delete(table.to_string()))?;

        if let Some(rows) = lock(&self.state).tables.get_mut(table) {
            rows.retain(|row| row_id(row) != Some(id));
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for MemoryRemote {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.take_fault(&FaultPoint::Upload(bucket.to_string()))?;

        lock(&self.state)
            .objects
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), bytes);

        Ok(())
    }

    fn public_locator(&self, bucket: &str, path: &str) -> Option<String> {
        if lock(&self.state).refuse_locators {
            return None;
        }
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        Some(format!("{LOCATOR_BASE}/{bucket}/{}", encoded.join("/")))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), RemoteError> {
        self.take_fault(&FaultPoint::Remove(bucket.to_string()))?;

        if let Some(objects) = lock(&self.state).objects.get_mut(bucket) {
            for path in paths {
                objects.remove(path);
            }
        }

        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, RemoteError> {
        Ok(self
            .object_paths(bucket)
            .into_iter()
            .filter(|path| path.starts_with(prefix))
            .collect())
    }
}

#[async_trait]
impl RemoteAuth for MemoryRemote {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<AuthSession, RemoteError> {
        self.take_fault(&FaultPoint::SignIn)?;

        let session = {
            let mut state = lock(&self.state);
            let principal_id = match state.accounts.get(&email.to_lowercase()) {
                Some(account) if account.secret == secret => account.principal_id.clone(),
                _ => {
                    return Err(RemoteError::response(400, "Invalid login credentials")
                        .with_code("invalid_credentials"));
                }
            };
            state.issued_tokens += 1;
            let session = AuthSession {
                principal_id,
                email: email.to_string(),
                access_token: format!("token-{}", state.issued_tokens),
            };
            state.session = Some(session.clone());
            session
        };
        self.emit(&AuthEvent::SignedIn(session.clone()));

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.take_fault(&FaultPoint::SignOut)?;

        let had_session = lock(&self.state).session.take().is_some();
        if had_session {
            self.emit(&AuthEvent::SignedOut);
        }

        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError> {
        Ok(lock(&self.state).session.clone())
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        let id = {
            let mut listeners = lock(&self.listeners);
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.entries.insert(id, listener);
            id
        };
        let registry = Arc::clone(&self.listeners);

        AuthSubscription::new(move || {
            lock(&registry).entries.remove(&id);
        })
    }
}

#[async_trait]
impl RemoteFunctions for MemoryRemote {
    async fn invoke(
        &self,
        name: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        self.take_fault(&FaultPoint::Invoke(name.to_string()))?;

        let handler = {
            let mut state = lock(&self.state);
            state.invocations.push((name.to_string(), body.clone()));
            state.functions.get(name).cloned()
        };

        match handler {
            Some(handler) => handler(body),
            None => Err(RemoteError::response(404, format!("function {name} not found"))),
        }
    }
}

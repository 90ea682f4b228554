//! Contracts of the hosted data/auth/object-storage service.
//!
//! Every collaborator is injected as an `Arc<dyn …>`; nothing in this crate
//! reaches for an ambient client handle.

mod memory;
mod query;
#[cfg(feature = "rest")]
mod rest;


use crate::error::{ErrorClass, WriteFailureReason};
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

// re-exports
pub use memory::{FaultPoint, FunctionHandler, MemoryRemote};
pub use query::{Direction, Filter, Order, Select};
#[cfg(feature = "rest")]
pub use rest::RestRemote;

/// A row in storage convention.
pub type Row = serde_json::Map<String, serde_json::Value>;

///
/// CONSTANTS
///

/// Message fragments that identify an expired or invalid credential token.
pub const CREDENTIAL_MARKERS: &[&str] = &["jwt", "refresh token", "token is expired"];

/// PostgREST codes for a rejected credential.
pub const CREDENTIAL_CODES: &[&str] = &["PGRST301", "PGRST303"];

///
/// RemoteErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemoteErrorKind {
    /// The request never produced a response.
    Network,

    /// The service answered with an error payload.
    Response,
}

///
/// RemoteError
///
/// The error slot of every remote call.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Network,
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn response(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Response,
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// True when the failure references an expired or invalid credential.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        if self.status == Some(401) {
            return true;
        }
        if self
            .code
            .as_deref()
            .is_some_and(|code| CREDENTIAL_CODES.contains(&code))
        {
            return true;
        }

        let message = self.message.to_lowercase();
        CREDENTIAL_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.is_credential_failure() {
            return ErrorClass::Authorization;
        }

        match self.kind {
            RemoteErrorKind::Network => ErrorClass::Transient,
            RemoteErrorKind::Response => match self.status {
                Some(408 | 429 | 500..) | None => ErrorClass::Transient,
                Some(_) => ErrorClass::Domain,
            },
        }
    }

    /// Sub-reason implied by the response code, if any.
    #[must_use]
    pub fn domain_reason(&self) -> Option<WriteFailureReason> {
        match self.code.as_deref() {
            Some("23502" | "22P02" | "PGRST204") => Some(WriteFailureReason::Validation),
            Some("23505" | "23503" | "23514") => Some(WriteFailureReason::Constraint),
            Some("42501") => Some(WriteFailureReason::Policy),
            _ if self.status == Some(403) => Some(WriteFailureReason::Policy),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------

///
/// RemoteTables
///

#[async_trait]
pub trait RemoteTables: Send + Sync {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, RemoteError>;

    /// Insert one row and return it with server-assigned fields.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError>;

    /// Apply a partial row to the row with `id` and return the stored row.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, RemoteError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------

///
/// RemoteStorage
///

#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), RemoteError>;

    /// Publicly resolvable locator for an object, if the bucket exposes one.
    fn public_locator(&self, bucket: &str, path: &str) -> Option<String>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), RemoteError>;

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, RemoteError>;
}

// ---------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------

///
/// AuthSession
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthSession {
    pub principal_id: String,
    pub email: String,
    pub access_token: String,
}

///
/// AuthEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

pub type AuthListener = Arc<dyn Fn(AuthEvent) + Send + Sync>;

///
/// AuthSubscription
///
/// Unsubscribe handle; dropping it detaches the listener.
///

pub struct AuthSubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl AuthSubscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

///
/// RemoteAuth
///

#[async_trait]
pub trait RemoteAuth: Send + Sync {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<AuthSession, RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;

    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError>;

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription;
}

// ---------------------------------------------------------------------
// Named remote procedures
// ---------------------------------------------------------------------

///
/// RemoteFunctions
///
/// Privileged user management and outbound notifications.
///

#[async_trait]
pub trait RemoteFunctions: Send + Sync {
    async fn invoke(
        &self,
        name: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError>;
}

///
/// Remote
///
/// The injected handle bundle.
///

#[derive(Clone)]
pub struct Remote {
    pub tables: Arc<dyn RemoteTables>,
    pub storage: Arc<dyn RemoteStorage>,
    pub auth: Arc<dyn RemoteAuth>,
    pub functions: Arc<dyn RemoteFunctions>,
}

impl Remote {
    /// Bundle a backend that implements every contract.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RemoteTables + RemoteStorage + RemoteAuth + RemoteFunctions + 'static,
    {
        Self {
            tables: backend.clone(),
            storage: backend.clone(),
            auth: backend.clone(),
            functions: backend,
        }
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote").finish_non_exhaustive()
    }
}

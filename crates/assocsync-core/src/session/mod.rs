//! Authenticated-identity lifecycle.
//!
//! The keeper fails closed: an authenticated principal without a readable
//! profile is signed out immediately, so a half-authenticated session is
//! never observable.

mod admin;

#[cfg(test)]
mod tests;

use crate::{
    codec,
    error::{Error, WriteFailureReason},
    model::{EntityKind, Profile},
    remote::{AuthEvent, AuthSubscription, Direction, RemoteAuth, RemoteTables, Select},
};
use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::{mpsc, watch};

// re-exports
pub use admin::{NewUser, UserAdmin};

///
/// SessionState
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SessionState {
    /// Initial state while an existing session is being resolved.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Profile),
}

impl SessionState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }
}

///
/// SessionKeeper
///

pub struct SessionKeeper {
    auth: Arc<dyn RemoteAuth>,
    tables: Arc<dyn RemoteTables>,
    state: watch::Sender<SessionState>,
    loading: watch::Sender<bool>,
    profiles: watch::Sender<Arc<Vec<Profile>>>,
    fault: watch::Sender<Option<Error>>,

    // bumped by every teardown; resolutions started under an older epoch
    // never publish
    epoch: AtomicU64,
    subscription: Mutex<Option<AuthSubscription>>,
}

impl SessionKeeper {
    fn new(auth: Arc<dyn RemoteAuth>, tables: Arc<dyn RemoteTables>) -> Self {
        Self {
            auth,
            tables,
            state: watch::Sender::new(SessionState::Unknown),
            loading: watch::Sender::new(true),
            profiles: watch::Sender::new(Arc::new(Vec::new())),
            fault: watch::Sender::new(None),
            epoch: AtomicU64::new(0),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the auth feed, then resolve any existing session.
    ///
    /// Must be called from within a tokio runtime; the feed is pumped by a
    /// spawned task that stops once the keeper is dropped.
    pub async fn start(auth: Arc<dyn RemoteAuth>, tables: Arc<dyn RemoteTables>) -> Arc<Self> {
        let keeper = Arc::new(Self::new(auth, tables));

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = keeper.auth.subscribe(Arc::new(move |event| {
            // receiver gone means the keeper is gone
            let _ = tx.send(event);
        }));
        *keeper
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        tokio::spawn(pump(Arc::downgrade(&keeper), rx));

        keeper.resolve_current().await;

        keeper
    }

    // ---------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------

    /// Sign in and resolve the principal's profile.
    ///
    /// On any failure the remote session is torn down before the error is
    /// returned.
    pub async fn login(&self, email: &str, secret: &str) -> Result<Profile, Error> {
        self.loading.send_replace(true);
        self.fault.send_replace(None);

        let result = match self.auth.sign_in(email, secret).await {
            Ok(session) => {
                let epoch = self.epoch.load(Ordering::Acquire);
                self.establish(&session.principal_id, epoch).await
            }
            Err(err) => {
                tracing::info!(%email, error = %err, "sign-in rejected");
                self.logout().await;
                Err(Error::from_sign_in(err))
            }
        };

        self.loading.send_replace(false);

        result
    }

    /// Clear the remote session and all local identity state. Idempotent;
    /// remote failures are logged, never returned.
    pub async fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);

        if let Err(err) = self.auth.sign_out().await {
            tracing::warn!(error = %err, "remote sign-out failed; clearing local session");
        }

        self.clear_local();
    }

    /// Re-read the session from the auth service and re-resolve the profile.
    pub async fn resolve_current(&self) {
        self.loading.send_replace(true);
        let epoch = self.epoch.load(Ordering::Acquire);

        match self.auth.current_session().await {
            Ok(Some(session)) => {
                // failures already tore the session down and set the fault
                let _ = self.establish(&session.principal_id, epoch).await;
            }
            Ok(None) => self.publish_anonymous(epoch),
            Err(err) => {
                tracing::warn!(error = %err, "could not read current session");
                self.publish_anonymous(epoch);
            }
        }

        self.loading.send_replace(false);
    }

    /// Look up the profile row of `principal_id`.
    ///
    /// A failed lookup and a missing row are the same condition here:
    /// the principal cannot read its own profile.
    pub async fn resolve_profile(&self, principal_id: &str) -> Result<Profile, Error> {
        let query = Select::new().eq("id", principal_id).limit(1);

        let rows = self
            .tables
            .select(Profile::TABLE, &query)
            .await
            .map_err(|err| Error::profile_unavailable(principal_id, Some(err.message)))?;

        let Some(row) = rows.into_iter().next() else {
            return Err(Error::profile_unavailable(principal_id, None));
        };

        codec::decode_row(row)
            .map_err(|err| Error::profile_unavailable(principal_id, Some(err.to_string())))
    }

    /// Reload the administrable profile roster. Only a SuperAdmin sees it;
    /// every other role gets an empty roster.
    pub async fn refresh_profiles(&self) -> Result<Arc<Vec<Profile>>, Error> {
        let is_admin = self
            .identity()
            .is_some_and(|profile| profile.role.is_super_admin());
        if !is_admin {
            let empty = Arc::new(Vec::new());
            self.profiles.send_replace(Arc::clone(&empty));
            return Ok(empty);
        }

        let query = Select::new().order_by("name", Direction::Asc);
        let rows = self
            .tables
            .select(Profile::TABLE, &query)
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;
        let roster = Arc::new(codec::decode_rows::<Profile>(rows)?);
        self.profiles.send_replace(Arc::clone(&roster));

        Ok(roster)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Profile> {
        self.state.borrow().identity().cloned()
    }

    pub fn require_identity(&self) -> Result<Profile, Error> {
        self.identity().ok_or(Error::NotAuthenticated)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    #[must_use]
    pub fn profiles(&self) -> watch::Receiver<Arc<Vec<Profile>>> {
        self.profiles.subscribe()
    }

    /// Last `ProfileUnavailable` seen, kept for the recovery path.
    #[must_use]
    pub fn fault(&self) -> Option<Error> {
        self.fault.borrow().clone()
    }

    pub fn take_fault(&self) -> Option<Error> {
        self.fault.send_replace(None)
    }

    #[must_use]
    pub fn faults(&self) -> watch::Receiver<Option<Error>> {
        self.fault.subscribe()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn establish(&self, principal_id: &str, epoch: u64) -> Result<Profile, Error> {
        match self.resolve_profile(principal_id).await {
            Ok(profile) => {
                let published = self.state.send_if_modified(|state| {
                    if self.epoch.load(Ordering::Acquire) != epoch {
                        return false;
                    }
                    *state = SessionState::Authenticated(profile.clone());
                    true
                });
                if !published {
                    tracing::debug!(%principal_id, "session changed while resolving; result dropped");
                    return Err(Error::NotAuthenticated);
                }

                tracing::info!(%principal_id, role = %profile.role, "session established");
                if let Err(err) = self.refresh_profiles().await {
                    tracing::warn!(error = %err, "profile roster unavailable");
                }

                Ok(profile)
            }
            Err(err) => {
                tracing::warn!(%principal_id, error = %err, "profile unreadable; signing out");
                self.logout().await;
                self.fault.send_replace(Some(err.clone()));

                Err(err)
            }
        }
    }

    async fn on_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => {
                tracing::debug!("auth feed: signed out");
                self.epoch.fetch_add(1, Ordering::AcqRel);
                self.clear_local();
            }
            AuthEvent::SignedIn(_) | AuthEvent::TokenRefreshed(_) => {
                // the feed may lag behind login/logout, so trust only the
                // session the auth service reports now
                self.resolve_current().await;
            }
        }
    }

    fn publish_anonymous(&self, epoch: u64) {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::Acquire) != epoch || *state == SessionState::Anonymous {
                return false;
            }
            *state = SessionState::Anonymous;
            true
        });
        self.profiles.send_replace(Arc::new(Vec::new()));
    }

    fn clear_local(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Anonymous {
                return false;
            }
            *state = SessionState::Anonymous;
            true
        });
        self.profiles.send_replace(Arc::new(Vec::new()));
    }
}

impl std::fmt::Debug for SessionKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeeper")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

async fn pump(keeper: Weak<SessionKeeper>, mut events: mpsc::UnboundedReceiver<AuthEvent>) {
    while let Some(event) = events.recv().await {
        let Some(keeper) = keeper.upgrade() else {
            break;
        };
        keeper.on_auth_event(event).await;
    }
}

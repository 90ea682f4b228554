use assocsync_core::{
    attachment::DocumentVault,
    config::ConsoleConfig,
    error::Error,
    model::{
        EntityKind, Event, InventoryItem, Member, Profile, Project, ServiceProvider,
    },
    remote::Remote,
    report::{ActionLabel, Reporter},
    session::{SessionKeeper, UserAdmin},
    store::{CommunicationLog, EntityStore, Ledger, ListOptions},
};
use std::sync::Arc;

///
/// Console
///
/// Every store of the console, wired to one injected remote. Stores share
/// the session keeper and the reporter, so an authorization failure seen
/// by any of them ends the session.
///

pub struct Console {
    config: ConsoleConfig,
    session: Arc<SessionKeeper>,
    reporter: Arc<Reporter>,
    users: UserAdmin,
    members: EntityStore<Member>,
    ledger: Ledger,
    events: EntityStore<Event>,
    vault: DocumentVault,
    communications: CommunicationLog,
    projects: EntityStore<Project>,
    providers: EntityStore<ServiceProvider>,
    inventory: EntityStore<InventoryItem>,
}

impl Console {
    /// Start the session keeper and build every store.
    pub async fn connect(remote: Remote, config: ConsoleConfig) -> Self {
        let session = SessionKeeper::start(remote.auth.clone(), remote.tables.clone()).await;
        let reporter = Arc::new(Reporter::new(
            Arc::clone(&session),
            config.session.logout_delay(),
        ));

        let limit = config.stores.default_limit;
        let store = || StoreFactory {
            remote: &remote,
            reporter: &reporter,
            limit,
        };

        let users = UserAdmin::new(
            Arc::clone(&session),
            remote.tables.clone(),
            remote.functions.clone(),
            Arc::clone(&reporter),
            config.functions.clone(),
        );
        let ledger = Ledger::new(store().build(), remote.tables.clone());
        let vault = DocumentVault::new(
            store().build(),
            remote.storage.clone(),
            Arc::clone(&session),
            Arc::clone(&reporter),
            config.buckets.clone(),
        );
        let communications = CommunicationLog::new(
            store().build(),
            remote.tables.clone(),
            remote.functions.clone(),
            config.functions.send_email.clone(),
        );

        tracing::info!(state = ?session.state(), "console connected");

        Self {
            members: store().build(),
            events: store().build(),
            projects: store().build(),
            providers: store().build(),
            inventory: store().build(),
            users,
            ledger,
            vault,
            communications,
            session,
            reporter,
            config,
        }
    }

    /// Connect to the hosted service described by `config.remote`.
    #[cfg(feature = "rest")]
    pub async fn connect_rest(config: ConsoleConfig) -> Result<Self, Error> {
        let backend = assocsync_core::remote::RestRemote::new(&config.remote).map_err(|err| {
            Error::from_remote(err, assocsync_core::error::WriteFailureReason::Validation)
        })?;

        Ok(Self::connect(Remote::from_backend(backend), config).await)
    }

    //
    // Session
    //

    /// Sign in. Failures are reported and returned so the login form can
    /// render them.
    pub async fn login(&self, email: &str, secret: &str) -> Result<Profile, Error> {
        let result = self.session.login(email, secret).await;
        if let Err(err) = &result {
            self.reporter.report(err, &ActionLabel::session("Sign in"));
        }

        result
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    /// Load every collection concurrently. All reads must succeed; the
    /// first failure is reported once and returned.
    pub async fn load_all(&self) -> Result<(), Error> {
        let all = ListOptions::new;

        let result = tokio::try_join!(
            self.members.try_list(all()),
            self.ledger.store().try_list(all()),
            self.events.try_list(all()),
            self.vault.documents().try_list(all()),
            self.communications.store().try_list(all()),
            self.projects.try_list(all()),
            self.providers.try_list(all()),
            self.inventory.try_list(all()),
        );

        match result {
            Ok(_) => {
                tracing::debug!("all collections loaded");
                Ok(())
            }
            Err(err) => {
                self.reporter
                    .report(&err, &ActionLabel::general("Load console data"));
                Err(err)
            }
        }
    }

    //
    // Accessors
    //

    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<SessionKeeper> {
        &self.session
    }

    #[must_use]
    pub const fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    #[must_use]
    pub const fn users(&self) -> &UserAdmin {
        &self.users
    }

    #[must_use]
    pub const fn members(&self) -> &EntityStore<Member> {
        &self.members
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn events(&self) -> &EntityStore<Event> {
        &self.events
    }

    #[must_use]
    pub const fn documents(&self) -> &DocumentVault {
        &self.vault
    }

    #[must_use]
    pub const fn communications(&self) -> &CommunicationLog {
        &self.communications
    }

    #[must_use]
    pub const fn projects(&self) -> &EntityStore<Project> {
        &self.projects
    }

    #[must_use]
    pub const fn providers(&self) -> &EntityStore<ServiceProvider> {
        &self.providers
    }

    #[must_use]
    pub const fn inventory(&self) -> &EntityStore<InventoryItem> {
        &self.inventory
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("session", &self.session)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

// Stores built here share the console's remote, reporter and row cap.
struct StoreFactory<'a> {
    remote: &'a Remote,
    reporter: &'a Arc<Reporter>,
    limit: usize,
}

impl StoreFactory<'_> {
    fn build<E: EntityKind>(self) -> EntityStore<E> {
        EntityStore::new(self.remote.tables.clone(), Arc::clone(self.reporter))
            .with_default_limit(self.limit)
    }
}

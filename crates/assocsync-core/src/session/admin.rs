use crate::{
    codec,
    config::FunctionConfig,
    error::{Error, WriteFailureReason},
    model::{EntityId, EntityKind, Profile, ProfilePatch, Role},
    remote::{RemoteFunctions, RemoteTables},
    report::{ActionLabel, NoticeLevel, Reporter},
    session::SessionKeeper,
};
use serde::Serialize;
use std::sync::Arc;

///
/// NewUser
///

#[derive(Clone, Debug, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

///
/// UserAdmin
///
/// Account management for SuperAdmins. The role checks here only keep the
/// console from offering actions that the remote policy layer would refuse;
/// they are not a security boundary.
///

pub struct UserAdmin {
    session: Arc<SessionKeeper>,
    tables: Arc<dyn RemoteTables>,
    functions: Arc<dyn RemoteFunctions>,
    reporter: Arc<Reporter>,
    names: FunctionConfig,
}

impl UserAdmin {
    #[must_use]
    pub fn new(
        session: Arc<SessionKeeper>,
        tables: Arc<dyn RemoteTables>,
        functions: Arc<dyn RemoteFunctions>,
        reporter: Arc<Reporter>,
        names: FunctionConfig,
    ) -> Self {
        Self {
            session,
            tables,
            functions,
            reporter,
            names,
        }
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<(), Error> {
        let result = self.try_create_user(user).await;
        self.finish(result, "Create user", format!("User {} created.", user.email))
            .await
    }

    pub async fn remove_user(&self, id: &EntityId) -> Result<(), Error> {
        let result = self.try_remove_user(id).await;
        self.finish(result, "Remove user", "User removed.".to_string())
            .await
    }

    pub async fn set_role(&self, id: &EntityId, role: Role) -> Result<Profile, Error> {
        match self.try_set_role(id, role).await {
            Ok(profile) => {
                self.refresh_roster().await;
                self.reporter
                    .notify(NoticeLevel::Success, format!("{} is now {role}.", profile.name));
                Ok(profile)
            }
            Err(err) => {
                self.reporter.report(&err, &ActionLabel::general("Change role"));
                Err(err)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn require_super_admin(&self) -> Result<Profile, Error> {
        let identity = self.session.require_identity()?;
        if !identity.role.is_super_admin() {
            return Err(Error::forbidden("only a super admin may manage users"));
        }

        Ok(identity)
    }

    async fn try_create_user(&self, user: &NewUser) -> Result<(), Error> {
        self.require_super_admin()?;

        let body = serde_json::to_value(user).map_err(|err| Error::decode(err.to_string()))?;
        self.functions
            .invoke(&self.names.create_user, body)
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;

        tracing::info!(email = %user.email, role = %user.role, "user created");

        Ok(())
    }

    async fn try_remove_user(&self, id: &EntityId) -> Result<(), Error> {
        let identity = self.require_super_admin()?;
        if &identity.id == id {
            return Err(Error::forbidden("you cannot remove your own account"));
        }

        self.functions
            .invoke(
                &self.names.delete_user,
                serde_json::json!({ "userId": id.as_str() }),
            )
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;

        tracing::info!(%id, "user removed");

        Ok(())
    }

    async fn try_set_role(&self, id: &EntityId, role: Role) -> Result<Profile, Error> {
        let identity = self.require_super_admin()?;
        if &identity.id == id {
            return Err(Error::forbidden("you cannot change your own role"));
        }

        let patch = ProfilePatch {
            role: Some(role),
            ..ProfilePatch::default()
        };
        let stored = self
            .tables
            .update(Profile::TABLE, id.as_str(), codec::encode_row(&patch)?)
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;

        tracing::info!(%id, %role, "role changed");

        codec::decode_row(stored)
    }

    async fn finish(
        &self,
        result: Result<(), Error>,
        action: &str,
        success: String,
    ) -> Result<(), Error> {
        match result {
            Ok(()) => {
                self.refresh_roster().await;
                self.reporter.notify(NoticeLevel::Success, success);
                Ok(())
            }
            Err(err) => {
                self.reporter.report(&err, &ActionLabel::general(action));
                Err(err)
            }
        }
    }

    async fn refresh_roster(&self) {
        if let Err(err) = self.session.refresh_profiles().await {
            self.reporter
                .report(&err, &ActionLabel::general("Refresh users"));
        }
    }
}

impl std::fmt::Debug for UserAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAdmin")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

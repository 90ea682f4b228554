use crate::{
    codec,
    error::{Error, WriteFailureReason},
    model::{
        AssociationRole, Communication, CommunicationDraft, EntityId, EntityKind, Member,
        MemberStatus,
    },
    remote::{RemoteFunctions, RemoteTables, Select},
    report::ActionLabel,
    store::EntityStore,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

///
/// Audience
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Audience {
    AllMembers,
    Status(MemberStatus),
    Role(AssociationRole),
    Selected(Vec<EntityId>),
}

///
/// Message
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

///
/// CommunicationLog
///
/// Append-only log of sent messages. A record is appended only after the
/// outbound email function accepted the message.
///

pub struct CommunicationLog {
    store: EntityStore<Communication>,
    tables: Arc<dyn RemoteTables>,
    functions: Arc<dyn RemoteFunctions>,
    send_function: String,
}

impl CommunicationLog {
    #[must_use]
    pub fn new(
        store: EntityStore<Communication>,
        tables: Arc<dyn RemoteTables>,
        functions: Arc<dyn RemoteFunctions>,
        send_function: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tables,
            functions,
            send_function: send_function.into(),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &EntityStore<Communication> {
        &self.store
    }

    pub async fn send(&self, message: &Message, audience: &Audience) -> Result<Communication, Error> {
        let result = self.try_send(message, audience).await;
        if let Err(err) = &result {
            self.store
                .reporter
                .report(err, &ActionLabel::email("Send communication"));
        }

        result
    }

    pub async fn try_send(
        &self,
        message: &Message,
        audience: &Audience,
    ) -> Result<Communication, Error> {
        if message.subject.trim().is_empty() {
            return Err(Error::validation("a subject is required"));
        }

        let (addresses, description) = self.resolve(audience).await?;
        if addresses.is_empty() {
            return Err(Error::validation(format!("no recipients in {description}")));
        }

        let body = json!({
            "to": addresses,
            "subject": message.subject,
            "body": message.body,
        });
        self.functions
            .invoke(&self.send_function, body)
            .await
            .map_err(|err| {
                Error::from_remote(err, WriteFailureReason::Email)
                    .with_reason(WriteFailureReason::Email)
            })?;
        tracing::info!(recipients = addresses.len(), subject = %message.subject, "message sent");

        let draft = CommunicationDraft {
            subject: message.subject.clone(),
            body: message.body.clone(),
            recipients: description,
            sent_at: Utc::now(),
        };

        self.store.try_create(&draft).await
    }

    /// Recipient addresses plus a human-readable audience description.
    pub async fn resolve(&self, audience: &Audience) -> Result<(Vec<String>, String), Error> {
        let query = match audience {
            Audience::AllMembers | Audience::Selected(_) => Select::new(),
            Audience::Status(status) => Select::new().eq("status", status.to_string()),
            Audience::Role(role) => Select::new().eq("role", role.to_string()),
        };
        let rows = self
            .tables
            .select(Member::TABLE, &query)
            .await
            .map_err(|err| Error::from_remote(err, WriteFailureReason::Database))?;
        let mut members: Vec<Member> = codec::decode_rows(rows)?;

        if let Audience::Selected(ids) = audience {
            members.retain(|member| ids.contains(&member.id));
        }

        let addresses: Vec<String> = members
            .into_iter()
            .map(|member| member.email)
            .filter(|email| !email.trim().is_empty())
            .collect();

        let description = match audience {
            Audience::AllMembers => format!("All members ({})", addresses.len()),
            Audience::Status(status) => format!("{status} members ({})", addresses.len()),
            Audience::Role(role) => format!("{role} ({})", addresses.len()),
            Audience::Selected(_) => format!("{} selected members", addresses.len()),
        };

        Ok((addresses, description))
    }
}

impl std::fmt::Debug for CommunicationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationLog")
            .field("store", &self.store)
            .field("send_function", &self.send_function)
            .finish_non_exhaustive()
    }
}

//! Failure classification and user-facing notices.
//!
//! Every reported failure produces exactly one notice. Authorization
//! failures additionally schedule a forced logout after a short delay so
//! the notice can render first.

#[cfg(test)]
mod tests;

use crate::{
    error::{Error, ErrorClass, WriteFailureReason},
    obs::{EventSink, SyncEvent, global_sink},
    session::SessionKeeper,
};
use derive_more::Display;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{runtime::Handle, sync::watch};

///
/// CONSTANTS
///

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

pub const PROFILE_UNAVAILABLE_MESSAGE: &str = "You are signed in, but your profile could not be \
     read. An access policy on profiles is most likely misconfigured.";

pub const STORAGE_HINT: &str =
    "Check that the storage bucket exists and that your account may write to it.";

pub const EMAIL_HINT: &str =
    "Check that the email function is deployed and its mail provider is configured.";

///
/// ActionCategory
///
/// Selects the remediation hint appended to domain failures.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum ActionCategory {
    #[default]
    General,
    Storage,
    Email,
    Session,
}

///
/// ActionLabel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionLabel {
    pub label: String,
    pub category: ActionCategory,
}

impl ActionLabel {
    pub fn new(label: impl Into<String>, category: ActionCategory) -> Self {
        Self {
            label: label.into(),
            category,
        }
    }

    pub fn general(label: impl Into<String>) -> Self {
        Self::new(label, ActionCategory::General)
    }

    pub fn storage(label: impl Into<String>) -> Self {
        Self::new(label, ActionCategory::Storage)
    }

    pub fn email(label: impl Into<String>) -> Self {
        Self::new(label, ActionCategory::Email)
    }

    pub fn session(label: impl Into<String>) -> Self {
        Self::new(label, ActionCategory::Session)
    }
}

///
/// NoticeLevel
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

///
/// RecoveryAction
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum RecoveryAction {
    /// Offer the profile-policy remediation for an unreadable profile row.
    ProfilePolicy,
}

///
/// Notice
///
/// The transient notification state rendered by the presentation layer.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub recovery: Option<RecoveryAction>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            recovery: None,
        }
    }

    #[must_use]
    pub const fn with_recovery(mut self, recovery: RecoveryAction) -> Self {
        self.recovery = Some(recovery);
        self
    }
}

///
/// Reporter
///

pub struct Reporter {
    session: Option<Arc<SessionKeeper>>,
    logout_delay: Duration,
    notice: watch::Sender<Option<Notice>>,
    logout_pending: Arc<AtomicBool>,
    sink: Arc<dyn EventSink>,
}

impl Reporter {
    #[must_use]
    pub fn new(session: Arc<SessionKeeper>, logout_delay: Duration) -> Self {
        Self::build(Some(session), logout_delay)
    }

    /// Reporter with nobody to log out; authorization failures only notify.
    #[must_use]
    pub fn without_session() -> Self {
        Self::build(None, Duration::ZERO)
    }

    fn build(session: Option<Arc<SessionKeeper>>, logout_delay: Duration) -> Self {
        Self {
            session,
            logout_delay,
            notice: watch::Sender::new(None),
            logout_pending: Arc::new(AtomicBool::new(false)),
            sink: global_sink(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn classify(error: &Error) -> ErrorClass {
        error.class()
    }

    /// Surface one failure. Never panics and never blocks on the logout.
    pub fn report(&self, error: &Error, action: &ActionLabel) -> ErrorClass {
        let class = Self::classify(error);
        self.sink.record(SyncEvent::Reported { class });

        let notice = match (class, error) {
            (ErrorClass::Authorization, _) => {
                tracing::warn!(action = %action.label, %error, "authorization failure");
                self.schedule_logout();
                Notice::new(NoticeLevel::Warning, SESSION_EXPIRED_MESSAGE)
            }
            (_, Error::ProfileUnavailable { .. }) => {
                tracing::warn!(action = %action.label, %error, "profile unavailable");
                Notice::new(NoticeLevel::Error, PROFILE_UNAVAILABLE_MESSAGE)
                    .with_recovery(RecoveryAction::ProfilePolicy)
            }
            (ErrorClass::Domain, _) => {
                tracing::info!(action = %action.label, %error, "action failed");
                Notice::new(NoticeLevel::Error, domain_message(error, action))
            }
            (ErrorClass::Transient, _) => {
                tracing::info!(action = %action.label, %error, "transient failure");
                Notice::new(
                    NoticeLevel::Warning,
                    format!(
                        "{} failed because the service could not be reached. Please try again.",
                        action.label
                    ),
                )
            }
        };

        self.notice.send_replace(Some(notice));

        class
    }

    /// Publish a non-failure notice (for example, a success confirmation).
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.notice.send_replace(Some(Notice::new(level, message)));
    }

    pub fn dismiss(&self) {
        self.notice.send_replace(None);
    }

    #[must_use]
    pub fn notices(&self) -> watch::Receiver<Option<Notice>> {
        self.notice.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        self.notice.borrow().clone()
    }

    #[must_use]
    pub fn logout_pending(&self) -> bool {
        self.logout_pending.load(Ordering::Acquire)
    }

    // At most one forced logout is in flight at a time.
    fn schedule_logout(&self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if self.logout_pending.swap(true, Ordering::AcqRel) {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("no async runtime; forced logout skipped");
            self.logout_pending.store(false, Ordering::Release);
            return;
        };

        self.sink.record(SyncEvent::ForcedLogout);
        let pending = Arc::clone(&self.logout_pending);
        let delay = self.logout_delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            session.logout().await;
            pending.store(false, Ordering::Release);
        });
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("logout_delay", &self.logout_delay)
            .field("notice", &*self.notice.borrow())
            .finish_non_exhaustive()
    }
}

fn domain_message(error: &Error, action: &ActionLabel) -> String {
    let detail = match error {
        Error::DomainWriteFailure { message, .. } => message.clone(),
        other => other.to_string(),
    };
    let mut message = format!("{} failed: {detail}", action.label);

    if let Some(hint) = hint_for(action.category, error.reason()) {
        message.push(' ');
        message.push_str(hint);
    }

    message
}

// The failing step's reason wins over the action's category.
const fn hint_for(
    category: ActionCategory,
    reason: Option<WriteFailureReason>,
) -> Option<&'static str> {
    match (reason, category) {
        (Some(WriteFailureReason::Email), _) => Some(EMAIL_HINT),
        (Some(WriteFailureReason::Storage | WriteFailureReason::Locator), _) => {
            Some(STORAGE_HINT)
        }
        (Some(WriteFailureReason::Database | WriteFailureReason::Validation), _) => None,
        (_, ActionCategory::Storage) => Some(STORAGE_HINT),
        (_, ActionCategory::Email) => Some(EMAIL_HINT),
        _ => None,
    }
}

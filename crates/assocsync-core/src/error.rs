use crate::remote::{RemoteError, RemoteErrorKind};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// ErrorClass
///
/// Coarse classification that drives the reporter's control flow.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    /// Network-level or unclassified failure; the caller may retry.
    Transient,

    /// Expired or invalid credential; always forces a logout.
    Authorization,

    /// Structured failure of the attempted action itself.
    Domain,
}

///
/// WriteFailureReason
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum WriteFailureReason {
    /// Missing or malformed input, rejected before or by the store.
    Validation,

    /// Uniqueness, foreign-key or check constraint.
    Constraint,

    /// Object storage rejected the blob operation.
    Storage,

    /// No public locator could be resolved for an uploaded object.
    Locator,

    /// Metadata row write failed.
    Database,

    /// Outbound notification function failed.
    Email,

    /// Remote authorization policy denied the write.
    Policy,
}

///
/// Error
///
/// Classified failure surfaced by stores, the session keeper and the
/// attachment handler.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("session expired: {message}")]
    AuthorizationExpired { message: String },

    /// Authenticated principal whose profile row cannot be read.
    #[error("no readable profile for principal {principal}")]
    ProfileUnavailable {
        principal: String,
        detail: Option<String>,
    },

    #[error("{reason} failure: {message}")]
    DomainWriteFailure {
        reason: WriteFailureReason,
        message: String,
    },

    #[error("transient I/O failure: {message}")]
    TransientIo { message: String },

    #[error("sign-in rejected: {message}")]
    SignInRejected { message: String },

    #[error("no authenticated session")]
    NotAuthenticated,

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("payload decode failed: {message}")]
    Decode { message: String },
}

impl Error {
    pub fn domain(reason: WriteFailureReason, message: impl Into<String>) -> Self {
        Self::DomainWriteFailure {
            reason,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::domain(WriteFailureReason::Validation, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn profile_unavailable(principal: impl Into<String>, detail: Option<String>) -> Self {
        Self::ProfileUnavailable {
            principal: principal.into(),
            detail,
        }
    }

    /// Classify a remote failure. `fallback` names the sub-reason used when
    /// the response carries no more specific constraint or policy code.
    #[must_use]
    pub fn from_remote(err: RemoteError, fallback: WriteFailureReason) -> Self {
        match err.class() {
            ErrorClass::Authorization => Self::AuthorizationExpired {
                message: err.message,
            },
            ErrorClass::Transient => Self::TransientIo {
                message: err.message,
            },
            ErrorClass::Domain => {
                let reason = err.domain_reason().unwrap_or(fallback);
                Self::domain(reason, err.message)
            }
        }
    }

    /// Re-tag a domain failure with the sub-reason of the step that failed.
    /// Authorization and transient failures keep their class.
    #[must_use]
    pub fn with_reason(self, reason: WriteFailureReason) -> Self {
        match self {
            Self::DomainWriteFailure { message, .. } | Self::Decode { message } => {
                Self::domain(reason, message)
            }
            other => other,
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AuthorizationExpired { .. } | Self::NotAuthenticated => {
                ErrorClass::Authorization
            }
            Self::TransientIo { .. } => ErrorClass::Transient,
            Self::ProfileUnavailable { .. }
            | Self::DomainWriteFailure { .. }
            | Self::SignInRejected { .. }
            | Self::Forbidden { .. }
            | Self::Decode { .. } => ErrorClass::Domain,
        }
    }

    #[must_use]
    pub const fn reason(&self) -> Option<WriteFailureReason> {
        match self {
            Self::DomainWriteFailure { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Failure of a sign-in attempt itself (bad credentials, network).
    #[must_use]
    pub fn from_sign_in(err: RemoteError) -> Self {
        match err.kind {
            RemoteErrorKind::Network => Self::TransientIo {
                message: err.message,
            },
            RemoteErrorKind::Response => Self::SignInRejected {
                message: err.message,
            },
        }
    }
}

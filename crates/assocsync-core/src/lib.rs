//! Client-side data sync and session integrity for the association
//! console: key-casing codec, per-table entity stores with write-through
//! resync, the session keeper, failure reporting and blob attachments.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod attachment;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod obs;
pub mod remote;
pub mod report;
pub mod session;
pub mod store;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Row cap for list reads that set no limit of their own.
pub const DEFAULT_LIST_LIMIT: usize = 500;

///
/// Prelude
///
/// Domain vocabulary and the operation surfaces. Remote adapters and
/// observability stay one module level down.
///

pub mod prelude {
    pub use crate::{
        attachment::{DocumentVault, NewDocument, Upload},
        error::{Error, ErrorClass, WriteFailureReason},
        model::*,
        report::{ActionLabel, Notice, NoticeLevel, RecoveryAction, Reporter},
        session::{SessionKeeper, SessionState, UserAdmin},
        store::{Audience, CommunicationLog, EntityStore, Ledger, ListOptions, Message},
        value::Value,
    };
}

//! Event sink boundary.
//!
//! Components hold an `Arc<dyn EventSink>` and emit `SyncEvent`s; the
//! default sink folds them into the global counters. Tests install their
//! own sink per component instead of reading shared global state.

use crate::{error::ErrorClass, obs::metrics};
use std::sync::{Arc, LazyLock};

///
/// SyncOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncOp {
    List,
    Create,
    Update,
    Delete,
}

///
/// SyncEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncEvent {
    /// A remote call for `table` finished. `rows` counts rows returned by a
    /// list, or rows written by a mutation.
    OpFinish {
        op: SyncOp,
        table: &'static str,
        rows: u64,
        ok: bool,
    },

    /// A resync result arrived after a newer one and was dropped.
    ResyncDiscarded { table: &'static str },

    /// An orphaned blob was removed after a failed attachment step.
    Compensation { bucket: String, ok: bool },

    /// The reporter surfaced a failure of the given class.
    Reported { class: ErrorClass },

    /// An authorization failure scheduled a forced logout.
    ForcedLogout,
}

///
/// EventSink
///

pub trait EventSink: Send + Sync {
    fn record(&self, event: SyncEvent);
}

///
/// GlobalEventSink
///
/// Default process-wide sink writing into the global counters.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalEventSink;

impl EventSink for GlobalEventSink {
    fn record(&self, event: SyncEvent) {
        metrics::with_state_mut(|m| m.apply(&event));
    }
}

static GLOBAL_SINK: LazyLock<Arc<dyn EventSink>> = LazyLock::new(|| Arc::new(GlobalEventSink));

/// Shared handle to the default sink.
#[must_use]
pub fn global_sink() -> Arc<dyn EventSink> {
    Arc::clone(&GLOBAL_SINK)
}

/// Snapshot the global counters.
///
/// `window_start_ms` drops the counters when the current window began
/// before the given instant.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset every global counter and start a new window.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

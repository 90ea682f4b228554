//! Observability: in-process sync counters and the sink boundary.
//!
//! Stores, the reporter and the vault never touch `metrics` directly; every
//! signal flows through `SyncEvent` and an `EventSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventReport, EventState, TableCounters, TableSummary};
pub use sink::{
    EventSink, GlobalEventSink, SyncEvent, SyncOp, global_sink, metrics_report, metrics_reset_all,
};

use crate::{
    error::ErrorClass,
    obs::sink::{SyncEvent, SyncOp},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
};

///
/// EventState
/// Ephemeral, in-memory counters for sync activity since `since_ms`.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub reports: ReportCounters,
    pub tables: BTreeMap<String, TableCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            reports: ReportCounters::default(),
            tables: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

impl EventState {
    /// Fold one event into the counters.
    pub fn apply(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::OpFinish {
                op,
                table,
                rows,
                ok,
            } => {
                self.ops.bump(*op, *rows, *ok);
                self.tables
                    .entry((*table).to_string())
                    .or_default()
                    .bump(*op, *rows, *ok);
            }

            SyncEvent::ResyncDiscarded { table } => {
                self.ops.resyncs_discarded = self.ops.resyncs_discarded.saturating_add(1);
                let entry = self.tables.entry((*table).to_string()).or_default();
                entry.resyncs_discarded = entry.resyncs_discarded.saturating_add(1);
            }

            SyncEvent::Compensation { ok, .. } => {
                if *ok {
                    self.ops.compensations = self.ops.compensations.saturating_add(1);
                } else {
                    self.ops.compensation_failures =
                        self.ops.compensation_failures.saturating_add(1);
                }
            }

            SyncEvent::Reported { class } => {
                let slot = match class {
                    ErrorClass::Transient => &mut self.reports.transient,
                    ErrorClass::Authorization => &mut self.reports.authorization,
                    ErrorClass::Domain => &mut self.reports.domain,
                };
                *slot = slot.saturating_add(1);
            }

            SyncEvent::ForcedLogout => {
                self.reports.forced_logouts = self.reports.forced_logouts.saturating_add(1);
            }
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Remote calls
    pub list_calls: u64,
    pub create_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub failed_calls: u64,

    // Rows
    pub rows_listed: u64,
    pub rows_written: u64,

    // Consistency
    pub resyncs_discarded: u64,
    pub compensations: u64,
    pub compensation_failures: u64,
}

impl EventOps {
    const fn bump(&mut self, op: SyncOp, rows: u64, ok: bool) {
        match op {
            SyncOp::List => {
                self.list_calls = self.list_calls.saturating_add(1);
                self.rows_listed = self.rows_listed.saturating_add(rows);
            }
            SyncOp::Create => self.create_calls = self.create_calls.saturating_add(1),
            SyncOp::Update => self.update_calls = self.update_calls.saturating_add(1),
            SyncOp::Delete => self.delete_calls = self.delete_calls.saturating_add(1),
        }
        if !matches!(op, SyncOp::List) {
            self.rows_written = self.rows_written.saturating_add(rows);
        }
        if !ok {
            self.failed_calls = self.failed_calls.saturating_add(1);
        }
    }
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub list_calls: u64,
    pub write_calls: u64,
    pub failed_calls: u64,
    pub rows_listed: u64,
    pub resyncs_discarded: u64,
}

impl TableCounters {
    const fn bump(&mut self, op: SyncOp, rows: u64, ok: bool) {
        if matches!(op, SyncOp::List) {
            self.list_calls = self.list_calls.saturating_add(1);
            self.rows_listed = self.rows_listed.saturating_add(rows);
        } else {
            self.write_calls = self.write_calls.saturating_add(1);
        }
        if !ok {
            self.failed_calls = self.failed_calls.saturating_add(1);
        }
    }
}

///
/// ReportCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ReportCounters {
    pub transient: u64,
    pub authorization: u64,
    pub domain: u64,
    pub forced_logouts: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    let guard = EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut guard = EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Raw counters; `None` when the window filter excluded them.
    pub counters: Option<EventState>,
    pub tables: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub list_calls: u64,
    pub write_calls: u64,
    pub failed_calls: u64,
    pub avg_rows_per_list: f64,
    pub resyncs_discarded: u64,
}

#[must_use]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| snap.since_ms < start) {
        return EventReport::default();
    }

    build_report(snap)
}

/// Summarize a counter snapshot, busiest tables first.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn build_report(snap: EventState) -> EventReport {
    let mut tables: Vec<TableSummary> = snap
        .tables
        .iter()
        .map(|(table, c)| TableSummary {
            table: table.clone(),
            list_calls: c.list_calls,
            write_calls: c.write_calls,
            failed_calls: c.failed_calls,
            avg_rows_per_list: if c.list_calls > 0 {
                c.rows_listed as f64 / c.list_calls as f64
            } else {
                0.0
            },
            resyncs_discarded: c.resyncs_discarded,
        })
        .collect();

    tables.sort_by(|a, b| {
        (b.list_calls + b.write_calls)
            .cmp(&(a.list_calls + a.write_calls))
            .then_with(|| a.table.cmp(&b.table))
    });

    EventReport {
        counters: Some(snap),
        tables,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn list(table: &'static str, rows: u64) -> SyncEvent {
        SyncEvent::OpFinish {
            op: SyncOp::List,
            table,
            rows,
            ok: true,
        }
    }

    #[test]
    fn apply_tracks_ops_per_table() {
        let mut state = EventState::default();
        state.apply(&list("members", 4));
        state.apply(&list("members", 2));
        state.apply(&SyncEvent::OpFinish {
            op: SyncOp::Create,
            table: "events",
            rows: 1,
            ok: false,
        });
        state.apply(&SyncEvent::ResyncDiscarded { table: "members" });

        assert_eq!(state.ops.list_calls, 2);
        assert_eq!(state.ops.rows_listed, 6);
        assert_eq!(state.ops.failed_calls, 1);
        assert_eq!(state.tables["members"].resyncs_discarded, 1);
        assert_eq!(state.tables["events"].write_calls, 1);
    }

    #[test]
    fn apply_counts_reports_by_class() {
        let mut state = EventState::default();
        for class in [
            ErrorClass::Domain,
            ErrorClass::Domain,
            ErrorClass::Authorization,
        ] {
            state.apply(&SyncEvent::Reported { class });
        }
        state.apply(&SyncEvent::ForcedLogout);

        assert_eq!(state.reports.domain, 2);
        assert_eq!(state.reports.authorization, 1);
        assert_eq!(state.reports.forced_logouts, 1);
    }

    #[test]
    fn report_orders_busiest_tables_first() {
        let mut state = EventState::default();
        state.apply(&list("events", 3));
        state.apply(&list("members", 2));
        state.apply(&list("members", 4));

        let report = build_report(state);
        let tables: Vec<_> = report.tables.iter().map(|t| t.table.as_str()).collect();

        assert_eq!(tables, ["members", "events"]);
        assert_eq!(report.tables[0].avg_rows_per_list, 3.0);
    }

    #[test]
    fn future_window_hides_counters() {
        let report = report_window_start(Some(u64::MAX));
        assert!(report.counters.is_none());
    }
}

use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for query evaluation.
///

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) scopes: BTreeMap<String, ScopeCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Executor entrypoints
    pub queries: u64,
    pub pages_exhausted: u64,

    // Physical reads
    pub scan_fetches: u64,
    pub columns_scanned: u64,
    pub membership_checks: u64,

    // Output
    pub ids_returned: u64,

    // Failures
    pub cursors_rejected: u64,
    pub store_read_failures: u64,
}

///
/// ScopeCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ScopeCounters {
    pub queries: u64,
    pub columns_scanned: u64,
    pub ids_returned: u64,
}

///
/// EventReport
/// Point-in-time copy of the metrics state.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub scopes: BTreeMap<String, ScopeCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Snapshot the current state.
pub(crate) fn report() -> EventReport {
    EVENT_STATE.with(|m| {
        let state = m.borrow();
        EventReport {
            ops: state.ops.clone(),
            scopes: state.scopes.clone(),
        }
    })
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

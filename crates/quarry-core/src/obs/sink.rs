//! Metrics sink boundary.
//!
//! Engine logic never touches `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.

use crate::obs::metrics;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Debug)]
pub enum MetricsEvent {
    QueryStart {
        scope: String,
    },
    QueryFinish {
        scope: String,
        ids_returned: u64,
        exhausted: bool,
    },
    ScanFetch {
        scope: String,
        columns: u64,
    },
    MembershipCheck,
    CursorRejected,
    StoreReadFailed,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: &MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: &MetricsEvent) {
        match event {
            MetricsEvent::QueryStart { scope } => {
                metrics::with_state_mut(|m| {
                    m.ops.queries = m.ops.queries.saturating_add(1);
                    let entry = m.scopes.entry(scope.clone()).or_default();
                    entry.queries = entry.queries.saturating_add(1);
                });
            }

            MetricsEvent::QueryFinish {
                scope,
                ids_returned,
                exhausted,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.ids_returned = m.ops.ids_returned.saturating_add(*ids_returned);
                    if *exhausted {
                        m.ops.pages_exhausted = m.ops.pages_exhausted.saturating_add(1);
                    }
                    let entry = m.scopes.entry(scope.clone()).or_default();
                    entry.ids_returned = entry.ids_returned.saturating_add(*ids_returned);
                });
            }

            MetricsEvent::ScanFetch { scope, columns } => {
                metrics::with_state_mut(|m| {
                    m.ops.scan_fetches = m.ops.scan_fetches.saturating_add(1);
                    m.ops.columns_scanned = m.ops.columns_scanned.saturating_add(*columns);
                    let entry = m.scopes.entry(scope.clone()).or_default();
                    entry.columns_scanned = entry.columns_scanned.saturating_add(*columns);
                });
            }

            MetricsEvent::MembershipCheck => {
                metrics::with_state_mut(|m| {
                    m.ops.membership_checks = m.ops.membership_checks.saturating_add(1);
                });
            }

            MetricsEvent::CursorRejected => {
                metrics::with_state_mut(|m| {
                    m.ops.cursors_rejected = m.ops.cursors_rejected.saturating_add(1);
                });
            }

            MetricsEvent::StoreReadFailed => {
                metrics::with_state_mut(|m| {
                    m.ops.store_read_failures = m.ops.store_read_failures.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) fn record(event: &MetricsEvent) {
    let installed = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match installed {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current metrics state for diagnostics and tests.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous sink is restored on every exit path, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingSink {
        fetches: Cell<u64>,
    }

    impl MetricsSink for CountingSink {
        fn record(&self, event: &MetricsEvent) {
            if matches!(event, MetricsEvent::ScanFetch { .. }) {
                self.fetches.set(self.fetches.get() + 1);
            }
        }
    }

    #[test]
    fn global_sink_accumulates_per_scope_counters() {
        metrics_reset_all();

        record(&MetricsEvent::ScanFetch {
            scope: "users".to_string(),
            columns: 12,
        });
        record(&MetricsEvent::ScanFetch {
            scope: "users".to_string(),
            columns: 3,
        });

        let report = metrics_report();
        assert_eq!(report.ops.scan_fetches, 2);
        assert_eq!(report.ops.columns_scanned, 15);
        assert_eq!(report.scopes["users"].columns_scanned, 15);
    }

    #[test]
    fn override_sink_captures_events_and_restores_global() {
        metrics_reset_all();
        let sink = Rc::new(CountingSink::default());

        with_metrics_sink(sink.clone(), || {
            record(&MetricsEvent::ScanFetch {
                scope: "users".to_string(),
                columns: 1,
            });
        });
        record(&MetricsEvent::ScanFetch {
            scope: "users".to_string(),
            columns: 1,
        });

        assert_eq!(sink.fetches.get(), 1);
        assert_eq!(metrics_report().ops.scan_fetches, 1);
    }
}

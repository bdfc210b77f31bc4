//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Query evaluation reports through `MetricsEvent`; human-readable events go
//! through `tracing` at the call sites.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, ScopeCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};

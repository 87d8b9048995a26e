//! Observability: compile and execution counters behind a sink abstraction.
//!
//! Emitters and the planner record events; they never touch counters directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, FunctionCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};

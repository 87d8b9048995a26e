//! Metrics sink boundary.
//!
//! Compiler and interpreter code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    SetupFinish {
        terms: u64,
        slots: u64,
        shared: u64,
        decomposed: u64,
        storage_bytes: u64,
    },
    SetupRejected,
    FunctionEmitted {
        function: &'static str,
        instructions: u64,
    },
    Invocation {
        function: &'static str,
    },
    InvocationFailed {
        function: &'static str,
    },
    RowsAdvanced {
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::SetupFinish {
                terms,
                slots,
                shared,
                decomposed,
                storage_bytes,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.setups = m.ops.setups.saturating_add(1);
                    m.ops.terms_planned = m.ops.terms_planned.saturating_add(terms);
                    m.ops.slots_allocated = m.ops.slots_allocated.saturating_add(slots);
                    m.ops.slots_shared = m.ops.slots_shared.saturating_add(shared);
                    m.ops.terms_decomposed = m.ops.terms_decomposed.saturating_add(decomposed);
                    m.ops.storage_bytes_max = m.ops.storage_bytes_max.max(storage_bytes);
                });
            }

            MetricsEvent::SetupRejected => {
                metrics::with_state_mut(|m| {
                    m.ops.setups_rejected = m.ops.setups_rejected.saturating_add(1);
                });
            }

            MetricsEvent::FunctionEmitted {
                function,
                instructions,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.functions_emitted = m.ops.functions_emitted.saturating_add(1);
                    m.ops.instructions_emitted =
                        m.ops.instructions_emitted.saturating_add(instructions);

                    let entry = metrics::function_entry(m, function);
                    entry.emitted = entry.emitted.saturating_add(1);
                    entry.instructions = entry.instructions.saturating_add(instructions);
                });
            }

            MetricsEvent::Invocation { function } => {
                metrics::with_state_mut(|m| {
                    m.ops.invocations = m.ops.invocations.saturating_add(1);
                    let entry = metrics::function_entry(m, function);
                    entry.invocations = entry.invocations.saturating_add(1);
                });
            }

            MetricsEvent::InvocationFailed { function } => {
                metrics::with_state_mut(|m| {
                    m.ops.invocations_failed = m.ops.invocations_failed.saturating_add(1);
                    let entry = metrics::function_entry(m, function);
                    entry.failures = entry.failures.saturating_add(1);
                });
            }

            MetricsEvent::RowsAdvanced { rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_advanced = m.ops.rows_advanced.saturating_add(rows);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous pointer on every exit including unwind.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the installing borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope and `Guard`
    //   restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        record(MetricsEvent::SetupRejected);
        assert_eq!(outer_calls.load(Ordering::SeqCst), 0);

        with_metrics_sink(&outer, || {
            record(MetricsEvent::SetupRejected);
            with_metrics_sink(&inner, || {
                record(MetricsEvent::RowsAdvanced { rows: 1 });
            });
            record(MetricsEvent::SetupRejected);
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::SetupRejected);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn function_events_accumulate_per_function() {
        metrics_reset_all();

        record(MetricsEvent::FunctionEmitted {
            function: "advance",
            instructions: 12,
        });
        record(MetricsEvent::Invocation {
            function: "advance",
        });
        record(MetricsEvent::InvocationFailed {
            function: "advance",
        });

        let report = metrics_report();
        assert_eq!(report.ops.functions_emitted, 1);
        assert_eq!(report.ops.instructions_emitted, 12);
        assert_eq!(report.ops.invocations, 1);
        assert_eq!(report.ops.invocations_failed, 1);

        let entry = report
            .functions
            .get("advance")
            .expect("function counters should be present");
        assert_eq!(entry.instructions, 12);
        assert_eq!(entry.failures, 1);
    }

    #[test]
    fn setup_events_track_max_storage() {
        metrics_reset_all();

        for storage_bytes in [16, 48, 24] {
            record(MetricsEvent::SetupFinish {
                terms: 2,
                slots: 2,
                shared: 0,
                decomposed: 0,
                storage_bytes,
            });
        }

        let ops = metrics_report().ops;
        assert_eq!(ops.setups, 3);
        assert_eq!(ops.slots_allocated, 6);
        assert_eq!(ops.storage_bytes_max, 48);
    }
}

use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for aggregate compilation and execution.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub functions: BTreeMap<String, FunctionCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Planner
    pub setups: u64,
    pub setups_rejected: u64,
    pub terms_planned: u64,
    pub slots_allocated: u64,
    pub slots_shared: u64,
    pub terms_decomposed: u64,
    pub storage_bytes_max: u64,

    // Emission
    pub functions_emitted: u64,
    pub instructions_emitted: u64,

    // Execution
    pub invocations: u64,
    pub invocations_failed: u64,
    pub rows_advanced: u64,
}

///
/// FunctionCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FunctionCounters {
    pub emitted: u64,
    pub instructions: u64,
    pub invocations: u64,
    pub failures: u64,
}

///
/// EventReport
/// Snapshot of the event state for tests and EXPLAIN-style surfaces.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub functions: BTreeMap<String, FunctionCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Per-function counters, created on first use.
pub(crate) fn function_entry<'a>(
    state: &'a mut EventState,
    function: &str,
) -> &'a mut FunctionCounters {
    state.functions.entry(function.to_string()).or_default()
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        functions: m.functions.clone(),
    })
}

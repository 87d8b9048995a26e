//! Module: aggregation
//! Responsibility: aggregate planning and emission of init/advance/finalize code.
//! Does not own: grouping, hashing, or partial-buffer merging.
//! Boundary: reads slots only through the storage emission helpers.
//!
//! Flow: `Aggregation::setup` builds an immutable slot table; the
//! initializer, updater and finalizer only read it. `AggregationProgram`
//! compiles all four functions for direct execution.

mod advance;
mod config;
mod error;
mod explain;
mod finalize;
mod init;
mod plan;
mod program;
mod term;

#[cfg(test)]
mod tests;

pub use config::AggregationConfig;
pub use error::AggregateSetupError;
pub use explain::{AggregationExplain, SlotExplain, TermExplain};
pub use plan::{AggregateInfo, Aggregation, TermBinding};
pub use program::AggregationProgram;
pub use term::{AggregateKind, AggregateTarget, AggregateTerm, SlotKind};

//! Core runtime for aggregen: aggregate planning and code emission for a
//! compiled query engine, together with the storage layout, typed values
//! and the register interpreter the emitted code runs on.

pub mod aggregation;
pub mod codegen;
pub mod error;
pub mod obs;
pub mod storage;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Prelude contains only the types needed to plan, compile and run aggregates.
///

pub mod prelude {
    pub use crate::{
        aggregation::{
            AggregateInfo, AggregateKind, AggregateSetupError, AggregateTarget, AggregateTerm,
            Aggregation, AggregationConfig, AggregationProgram, SlotKind, TermBinding,
        },
        codegen::{CodeGen, CompiledFunction, ExecError, Operand, StorageSpace},
        error::InternalError,
        storage::UpdateableStorage,
        types::{Decimal, Float64, SqlType},
        value::Value,
    };
}

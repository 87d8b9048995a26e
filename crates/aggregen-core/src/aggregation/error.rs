use crate::{
    aggregation::AggregateKind,
    storage::LayoutError,
    types::SqlType,
};
use thiserror::Error as ThisError;

///
/// AggregateSetupError
///
/// Configuration error raised by `Aggregation::setup`. No instance exists
/// after a failed setup.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AggregateSetupError {
    #[error("term {index}: {kind} requires an input expression")]
    MissingTarget { index: usize, kind: AggregateKind },

    #[error("term {index}: COUNT(*) does not take an input expression")]
    CountStarWithTarget { index: usize },

    #[error("term {index}: {kind} is not defined for {ty}")]
    IncompatibleType {
        index: usize,
        kind: AggregateKind,
        ty: SqlType,
    },

    #[error("term {index}: {kind} over {ty} has no fixed-size storage")]
    UnstorableType {
        index: usize,
        kind: AggregateKind,
        ty: SqlType,
    },

    #[error("term {index}: {kind} cannot produce {ty}")]
    InvalidOutputType {
        index: usize,
        kind: AggregateKind,
        ty: SqlType,
    },

    #[error("term {index}: DISTINCT is not supported for {kind}")]
    DistinctUnsupported { index: usize, kind: AggregateKind },

    #[error("aggregate storage needs {required} bytes, limit is {limit}")]
    StorageLimitExceeded { required: usize, limit: usize },

    #[error("storage layout: {0}")]
    Layout(#[from] LayoutError),
}

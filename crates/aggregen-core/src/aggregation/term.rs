use crate::types::SqlType;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// AggregateKind
///
/// Caller-visible aggregate function.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AggregateKind {
    Count,
    CountStar,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::CountStar => "COUNT(*)",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// SlotKind
///
/// Operation applied to one physically stored slot. AVG never appears
/// here; it is served by a SUM slot and a COUNT slot.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SlotKind {
    Count,
    CountStar,
    Sum,
    Min,
    Max,
}

impl SlotKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::CountStar => "COUNT(*)",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Counting slots always hold a value and carry no set flag.
    #[must_use]
    pub const fn is_counter(self) -> bool {
        matches!(self, Self::Count | Self::CountStar)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// AggregateTarget
///
/// Input expression of a term: canonical text (the sharing identity) and type.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AggregateTarget {
    pub expr: String,
    pub sql_type: SqlType,
}

impl AggregateTarget {
    #[must_use]
    pub fn new(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            expr: expr.into(),
            sql_type,
        }
    }
}

///
/// AggregateTerm
///
/// One requested aggregate. Term order is part of the public contract:
/// initial values and final outputs are positionally aligned to it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AggregateTerm {
    pub kind: AggregateKind,
    pub target: Option<AggregateTarget>,
    pub distinct: bool,
    pub output_type: Option<SqlType>,
}

impl AggregateTerm {
    /// Build a term over a target expression.
    #[must_use]
    pub fn new(kind: AggregateKind, expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            kind,
            target: Some(AggregateTarget::new(expr, sql_type)),
            distinct: false,
            output_type: None,
        }
    }

    #[must_use]
    pub const fn count_star() -> Self {
        Self {
            kind: AggregateKind::CountStar,
            target: None,
            distinct: false,
            output_type: None,
        }
    }

    #[must_use]
    pub fn count(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self::new(AggregateKind::Count, expr, sql_type)
    }

    #[must_use]
    pub fn sum(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self::new(AggregateKind::Sum, expr, sql_type)
    }

    #[must_use]
    pub fn min(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self::new(AggregateKind::Min, expr, sql_type)
    }

    #[must_use]
    pub fn max(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self::new(AggregateKind::Max, expr, sql_type)
    }

    #[must_use]
    pub fn avg(expr: impl Into<String>, sql_type: SqlType) -> Self {
        Self::new(AggregateKind::Avg, expr, sql_type)
    }

    /// Mark the term DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Declare the output type (AVG only).
    #[must_use]
    pub const fn with_output_type(mut self, output_type: SqlType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Type of the value this term feeds per row. COUNT(*) feeds a BIGINT placeholder.
    #[must_use]
    pub fn input_type(&self) -> SqlType {
        self.target
            .as_ref()
            .map_or(SqlType::BigInt, |target| target.sql_type)
    }
}

impl fmt::Display for AggregateTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.target) {
            (AggregateKind::CountStar, _) | (_, None) => f.write_str(self.kind.name()),
            (kind, Some(target)) => {
                let distinct = if self.distinct { "DISTINCT " } else { "" };
                write!(f, "{kind}({distinct}{})", target.expr)
            }
        }
    }
}

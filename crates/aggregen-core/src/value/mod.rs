//! Module: value
//! Responsibility: the possibly-NULL typed SQL value consumed by emitted code.
//! Does not own: buffer encoding (storage) or operator selection (aggregation).
//! Boundary: arithmetic/comparison semantics are decided here; callers only pick the operator.

mod arith;
mod compare;


use crate::types::{Decimal, Float64, SqlType};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Datum
///
/// Non-NULL payload of a value. Integer types of every width share the
/// `Int` payload; the owning `Value` carries the declared width.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Double(Float64),
    #[display("'{_0}'")]
    Text(String),
}

///
/// Value
///
/// SQL value tagged with its data type; `datum == None` is NULL.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Value {
    sql_type: SqlType,
    datum: Option<Datum>,
}

impl Value {
    /// Build the NULL value of one type.
    #[must_use]
    pub const fn null(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            datum: None,
        }
    }

    #[must_use]
    pub const fn boolean(v: bool) -> Self {
        Self::from_parts(SqlType::Boolean, Datum::Bool(v))
    }

    #[must_use]
    pub fn tiny_int(v: i8) -> Self {
        Self::from_parts(SqlType::TinyInt, Datum::Int(i64::from(v)))
    }

    #[must_use]
    pub fn small_int(v: i16) -> Self {
        Self::from_parts(SqlType::SmallInt, Datum::Int(i64::from(v)))
    }

    #[must_use]
    pub fn integer(v: i32) -> Self {
        Self::from_parts(SqlType::Integer, Datum::Int(i64::from(v)))
    }

    #[must_use]
    pub const fn big_int(v: i64) -> Self {
        Self::from_parts(SqlType::BigInt, Datum::Int(v))
    }

    #[must_use]
    pub const fn decimal(v: Decimal) -> Self {
        Self::from_parts(SqlType::Decimal, Datum::Decimal(v))
    }

    #[must_use]
    pub const fn double(v: Float64) -> Self {
        Self::from_parts(SqlType::Double, Datum::Double(v))
    }

    /// Build a DOUBLE from a raw float; `None` for NaN and infinities.
    #[must_use]
    pub fn try_double(v: f64) -> Option<Self> {
        Float64::try_new(v).map(Self::double)
    }

    /// Build a DATE from days since the epoch.
    #[must_use]
    pub fn date(days: i32) -> Self {
        Self::from_parts(SqlType::Date, Datum::Int(i64::from(days)))
    }

    /// Build a TIMESTAMP from microseconds since the epoch.
    #[must_use]
    pub const fn timestamp(micros: i64) -> Self {
        Self::from_parts(SqlType::Timestamp, Datum::Int(micros))
    }

    #[must_use]
    pub fn varchar(v: impl Into<String>) -> Self {
        Self::from_parts(SqlType::Varchar, Datum::Text(v.into()))
    }

    /// Build a value from a type tag and an already-validated datum.
    pub(crate) const fn from_parts(sql_type: SqlType, datum: Datum) -> Self {
        Self {
            sql_type,
            datum: Some(datum),
        }
    }

    /// Build a value of `sql_type` from an i64, checking the type's range.
    pub fn from_i64(sql_type: SqlType, v: i64) -> Result<Self, ValueError> {
        let Some((lo, hi)) = int_bounds(sql_type) else {
            return Err(ValueError::TypeMismatch {
                op: "from_i64",
                left: sql_type,
                right: SqlType::BigInt,
            });
        };
        if v < lo || v > hi {
            return Err(ValueError::Overflow { op: "from_i64", ty: sql_type });
        }

        Ok(Self::from_parts(sql_type, Datum::Int(v)))
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.datum.is_none()
    }

    #[must_use]
    pub const fn datum(&self) -> Option<&Datum> {
        self.datum.as_ref()
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self.datum {
            Some(Datum::Bool(v)) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self.datum {
            Some(Datum::Decimal(v)) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.datum {
            Some(datum) => write!(f, "{datum}"),
            None => f.write_str("null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::big_int(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::decimal(v)
    }
}

impl From<Float64> for Value {
    fn from(v: Float64) -> Self {
        Self::double(v)
    }
}

///
/// ValueError
///
/// Failures of value arithmetic, comparison and casts.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValueError {
    #[error("{op} overflowed {ty}")]
    Overflow { op: &'static str, ty: SqlType },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{op} is not defined for {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: SqlType,
        right: SqlType,
    },
}

/// Inclusive value range of the integer-backed types.
pub(crate) const fn int_bounds(sql_type: SqlType) -> Option<(i64, i64)> {
    match sql_type {
        SqlType::TinyInt => Some((i8::MIN as i64, i8::MAX as i64)),
        SqlType::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
        SqlType::Integer | SqlType::Date => Some((i32::MIN as i64, i32::MAX as i64)),
        SqlType::BigInt | SqlType::Timestamp => Some((i64::MIN, i64::MAX)),
        SqlType::Boolean | SqlType::Decimal | SqlType::Double | SqlType::Varchar => None,
    }
}

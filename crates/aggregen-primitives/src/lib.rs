#[macro_use]
mod macros;

use serde::{Deserialize, Serialize};
use std::fmt;

///
/// SqlType
///
/// Canonical SQL data type tag shared by values, storage layouts and
/// aggregate planning.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Double,
    Date,
    Timestamp,
    Varchar,
}

impl SqlType {
    /// Return the full metadata descriptor for one SQL type.
    #[must_use]
    pub const fn metadata(self) -> SqlTypeMetadata {
        sql_type_registry!(metadata_from_registry, self)
    }

    /// Return the canonical upper-case SQL name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.metadata().name
    }

    /// Return the coarse routing family for this type.
    #[must_use]
    pub const fn family(self) -> SqlTypeFamily {
        self.metadata().family
    }

    /// Return whether values of this type are numbers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.metadata().is_numeric
    }

    /// Return whether this type is a fixed-width integer.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        self.metadata().is_integral
    }

    /// Return whether `+` and `/` are defined for this type.
    #[must_use]
    pub const fn supports_arithmetic(self) -> bool {
        self.metadata().supports_arithmetic
    }

    /// Return whether values of this type are totally ordered.
    #[must_use]
    pub const fn supports_ordering(self) -> bool {
        self.metadata().supports_ordering
    }

    /// Return the fixed in-buffer width, or `None` for variable-length types.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self.metadata().storage_size {
            0 => None,
            size => Some(size),
        }
    }

    /// Return the in-buffer alignment requirement.
    #[must_use]
    pub const fn storage_align(self) -> usize {
        self.metadata().storage_align
    }

    /// Return the accumulator type used when summing values of this type.
    ///
    /// Narrow integers widen to BIGINT; non-arithmetic types have no sum type.
    #[must_use]
    pub const fn sum_type(self) -> Option<Self> {
        match self {
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt => Some(Self::BigInt),
            Self::Decimal => Some(Self::Decimal),
            Self::Double => Some(Self::Double),
            Self::Boolean | Self::Date | Self::Timestamp | Self::Varchar => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// SqlTypeMetadata
///
/// Capability metadata consumed by value arithmetic, storage layout and
/// aggregate validation.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SqlTypeMetadata {
    pub name: &'static str,
    pub family: SqlTypeFamily,
    pub is_numeric: bool,
    pub is_integral: bool,
    pub supports_arithmetic: bool,
    pub supports_ordering: bool,
    pub storage_size: usize,
    pub storage_align: usize,
}

///
/// SqlTypeFamily
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SqlTypeFamily {
    Bool,
    Numeric,
    Temporal,
    Textual,
}

/// Ordered list of all SQL types in registry order.
pub const ALL_SQL_TYPES: [SqlType; 10] = sql_type_registry!(all_types_from_registry);

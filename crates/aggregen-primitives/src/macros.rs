#[macro_export]
macro_rules! sql_type_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (
                Boolean,
                "BOOLEAN",
                Bool,
                is_numeric = false,
                is_integral = false,
                supports_arithmetic = false,
                supports_ordering = true,
                storage_size = 1,
                storage_align = 1
            ),
            (
                TinyInt,
                "TINYINT",
                Numeric,
                is_numeric = true,
                is_integral = true,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 1,
                storage_align = 1
            ),
            (
                SmallInt,
                "SMALLINT",
                Numeric,
                is_numeric = true,
                is_integral = true,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 2,
                storage_align = 2
            ),
            (
                Integer,
                "INTEGER",
                Numeric,
                is_numeric = true,
                is_integral = true,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 4,
                storage_align = 4
            ),
            (
                BigInt,
                "BIGINT",
                Numeric,
                is_numeric = true,
                is_integral = true,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 8,
                storage_align = 8
            ),
            (
                Decimal,
                "DECIMAL",
                Numeric,
                is_numeric = true,
                is_integral = false,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 16,
                storage_align = 8
            ),
            (
                Double,
                "DOUBLE",
                Numeric,
                is_numeric = true,
                is_integral = false,
                supports_arithmetic = true,
                supports_ordering = true,
                storage_size = 8,
                storage_align = 8
            ),
            (
                Date,
                "DATE",
                Temporal,
                is_numeric = false,
                is_integral = false,
                supports_arithmetic = false,
                supports_ordering = true,
                storage_size = 4,
                storage_align = 4
            ),
            (
                Timestamp,
                "TIMESTAMP",
                Temporal,
                is_numeric = false,
                is_integral = false,
                supports_arithmetic = false,
                supports_ordering = true,
                storage_size = 8,
                storage_align = 8
            ),
            (
                Varchar,
                "VARCHAR",
                Textual,
                is_numeric = false,
                is_integral = false,
                supports_arithmetic = false,
                supports_ordering = true,
                storage_size = 0,
                storage_align = 1
            ),
        }
    };
}

#[macro_export]
macro_rules! sql_type_registry {
    ($macro:ident) => {
        $crate::sql_type_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::sql_type_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $ty:expr; @entries $( ($variant:ident, $name:literal, $family:ident, is_numeric = $is_numeric:expr, is_integral = $is_integral:expr, supports_arithmetic = $supports_arithmetic:expr, supports_ordering = $supports_ordering:expr, storage_size = $storage_size:expr, storage_align = $storage_align:expr) ),* $(,)? ) => {
        match $ty {
            $(
                $crate::SqlType::$variant => $crate::SqlTypeMetadata {
                    name: $name,
                    family: $crate::SqlTypeFamily::$family,
                    is_numeric: $is_numeric,
                    is_integral: $is_integral,
                    supports_arithmetic: $supports_arithmetic,
                    supports_ordering: $supports_ordering,
                    storage_size: $storage_size,
                    storage_align: $storage_align,
                },
            )*
        }
    };
}

macro_rules! all_types_from_registry {
    ( @entries $( ($variant:ident, $name:literal, $family:ident, is_numeric = $is_numeric:expr, is_integral = $is_integral:expr, supports_arithmetic = $supports_arithmetic:expr, supports_ordering = $supports_ordering:expr, storage_size = $storage_size:expr, storage_align = $storage_align:expr) ),* $(,)? ) => {
        [ $( $crate::SqlType::$variant ),* ]
    };
}

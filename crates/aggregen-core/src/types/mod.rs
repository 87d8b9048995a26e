mod decimal;
mod float;

pub use decimal::Decimal;
pub use float::{Float64, Float64DecodeError};

// re-exports
pub use aggregen_primitives::{SqlType, SqlTypeFamily};

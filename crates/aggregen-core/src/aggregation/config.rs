use crate::types::SqlType;
use serde::{Deserialize, Serialize};

///
/// AggregationConfig
///
/// Knobs for one aggregate setup. Built with const builders; the default
/// matches the behaviour of an unconfigured compiler.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AggregationConfig {
    pub avg_output_type: SqlType,
    pub max_storage_bytes: usize,
    pub decimal_scale: Option<u32>,
}

impl AggregationConfig {
    pub const DEFAULT_MAX_STORAGE_BYTES: usize = 64 * 1024;
    pub const DEFAULT_DECIMAL_SCALE: u32 = 10;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            avg_output_type: SqlType::Decimal,
            max_storage_bytes: Self::DEFAULT_MAX_STORAGE_BYTES,
            decimal_scale: Some(Self::DEFAULT_DECIMAL_SCALE),
        }
    }

    /// Output type of AVG terms that do not declare one.
    #[must_use]
    pub const fn avg_output_type(mut self, ty: SqlType) -> Self {
        self.avg_output_type = ty;
        self
    }

    /// Upper bound on the per-group buffer size.
    #[must_use]
    pub const fn max_storage_bytes(mut self, bytes: usize) -> Self {
        self.max_storage_bytes = bytes;
        self
    }

    /// Fractional digits DECIMAL averages round to; `None` keeps full precision.
    #[must_use]
    pub const fn decimal_scale(mut self, scale: Option<u32>) -> Self {
        self.decimal_scale = scale;
        self
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::new()
    }
}

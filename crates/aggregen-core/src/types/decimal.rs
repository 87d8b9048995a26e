use derive_more::{Display, FromStr};
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal as WrappedDecimal;
use serde::{Deserialize, Serialize};

///
/// Decimal
///
/// Fixed-point decimal used for DECIMAL values and DECIMAL averages.
/// Stored in aggregate buffers as the 16-byte rust_decimal wire form.
///

#[derive(
    Clone, Copy, Debug, Default, Display, Eq, FromStr, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Decimal(WrappedDecimal);

impl Decimal {
    pub const ZERO: Self = Self(WrappedDecimal::ZERO);

    /// Width of the buffer encoding.
    pub const ENCODED_LEN: usize = 16;

    #[must_use]
    /// Construct a decimal from mantissa and scale.
    pub fn new(num: i64, scale: u32) -> Self {
        Self(WrappedDecimal::new(num, scale))
    }

    #[must_use]
    pub fn from_i64(n: i64) -> Self {
        Self(WrappedDecimal::from(n))
    }

    /// Fallible conversion from a float; `None` for non-finite or out-of-range input.
    #[must_use]
    pub fn from_f64(n: f64) -> Option<Self> {
        WrappedDecimal::from_f64(n).map(Self)
    }

    /// Lossy conversion to f64.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        self.0.to_f64()
    }

    /// Truncating conversion to i64; `None` when the integer part does not fit.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.0.trunc().to_i64()
    }

    /// Checked addition; `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked division; `None` on division by zero or overflow.
    #[must_use]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        self.0.checked_div(rhs.0).map(Self)
    }

    #[must_use]
    /// Round to a given number of decimal places.
    pub fn round_dp(&self, dp: u32) -> Self {
        Self(self.0.round_dp(dp))
    }

    /// Returns `true` if the value is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the number of fractional decimal places.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.0.scale()
    }

    ///
    /// ENCODING
    ///

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        self.0.serialize()
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::ENCODED_LEN]) -> Self {
        Self(WrappedDecimal::deserialize(bytes))
    }
}

impl From<WrappedDecimal> for Decimal {
    fn from(d: WrappedDecimal) -> Self {
        Self(d)
    }
}

impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

// Serde: decimal string, so explain output keeps exact digits.
impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<WrappedDecimal>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

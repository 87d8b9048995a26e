use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};
use thiserror::Error as ThisError;

///
/// Float64
///
/// Finite f64 only; -0.0 canonically stored as 0.0
///

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Serialize)]
pub struct Float64(f64);

impl Float64 {
    #[must_use]
    /// Fallible constructor that rejects non-finite values and normalizes -0.0.
    pub fn try_new(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }

        // canonicalize -0.0 to 0.0 so Eq/Ord are consistent
        Some(Self(if v == 0.0 { 0.0 } else { v }))
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_bits().to_le_bytes()
    }

    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, Float64DecodeError> {
        let buf: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Float64DecodeError::InvalidSize { len: bytes.len() })?;
        let value = f64::from_bits(u64::from_le_bytes(buf));

        Self::try_new(value).ok_or(Float64DecodeError::NonFinite)
    }
}

#[derive(Debug, ThisError)]
pub enum Float64DecodeError {
    #[error("invalid float64 length: {len} bytes")]
    InvalidSize { len: usize },
    #[error("non-finite float64 payload")]
    NonFinite,
}

impl Eq for Float64 {}

impl PartialEq for Float64 {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Hash for Float64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Ord for Float64 {
    fn cmp(&self, other: &Self) -> Ordering {
        // finite by construction
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Float64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

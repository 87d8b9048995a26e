//! Fixed-width little-endian encoding of slot values inside a storage space.

use crate::{
    storage::SlotAccess,
    types::{Decimal, Float64, SqlType},
    value::{Datum, Value},
};
use thiserror::Error as ThisError;

///
/// SlotCodecError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SlotCodecError {
    #[error("slot at offset {offset} ({ty}) lies outside a {len}-byte storage space")]
    OutOfBounds { offset: usize, ty: SqlType, len: usize },

    #[error("value of type {found} cannot be stored in a {expected} slot")]
    TypeMismatch { expected: SqlType, found: SqlType },

    #[error("slot at offset {offset} holds a non-finite DOUBLE payload")]
    NonFinite { offset: usize },

    #[error("{ty} has no fixed-width encoding")]
    VariableLength { ty: SqlType },
}

/// Return whether the slot's set flag is raised. Slots without a flag are always set.
pub(crate) fn is_set(space: &[u8], access: &SlotAccess) -> Result<bool, SlotCodecError> {
    let Some(flag) = access.flag else {
        return Ok(true);
    };
    let byte = space.get(flag.byte).ok_or(SlotCodecError::OutOfBounds {
        offset: flag.byte,
        ty: access.sql_type,
        len: space.len(),
    })?;

    Ok(byte & flag.mask != 0)
}

/// Raise or clear the slot's set flag. No-op for slots without a flag.
pub(crate) fn set_flag(
    space: &mut [u8],
    access: &SlotAccess,
    raised: bool,
) -> Result<(), SlotCodecError> {
    let Some(flag) = access.flag else {
        return Ok(());
    };
    let len = space.len();
    let byte = space.get_mut(flag.byte).ok_or(SlotCodecError::OutOfBounds {
        offset: flag.byte,
        ty: access.sql_type,
        len,
    })?;
    if raised {
        *byte |= flag.mask;
    } else {
        *byte &= !flag.mask;
    }

    Ok(())
}

/// Read one slot. Unset slots read as NULL of the slot type.
pub(crate) fn read(space: &[u8], access: &SlotAccess) -> Result<Value, SlotCodecError> {
    if !is_set(space, access)? {
        return Ok(Value::null(access.sql_type));
    }
    let bytes = slot_bytes(space, access)?;

    let value = match access.sql_type {
        SqlType::Boolean => Value::boolean(bytes[0] != 0),
        SqlType::TinyInt => Value::tiny_int(i8::from_le_bytes([bytes[0]])),
        SqlType::SmallInt => Value::small_int(i16::from_le_bytes(array(bytes))),
        SqlType::Integer => Value::integer(i32::from_le_bytes(array(bytes))),
        SqlType::Date => Value::date(i32::from_le_bytes(array(bytes))),
        SqlType::BigInt => Value::big_int(i64::from_le_bytes(array(bytes))),
        SqlType::Timestamp => Value::timestamp(i64::from_le_bytes(array(bytes))),
        SqlType::Decimal => Value::decimal(Decimal::from_bytes(array(bytes))),
        SqlType::Double => Value::double(
            Float64::try_from_bytes(bytes).map_err(|_| SlotCodecError::NonFinite {
                offset: access.offset,
            })?,
        ),
        SqlType::Varchar => {
            return Err(SlotCodecError::VariableLength {
                ty: access.sql_type,
            });
        }
    };

    Ok(value)
}

/// Write one slot. Writing NULL clears the set flag and leaves the payload bytes.
pub(crate) fn write(
    space: &mut [u8],
    access: &SlotAccess,
    value: &Value,
) -> Result<(), SlotCodecError> {
    if value.sql_type() != access.sql_type {
        return Err(SlotCodecError::TypeMismatch {
            expected: access.sql_type,
            found: value.sql_type(),
        });
    }
    let Some(datum) = value.datum() else {
        return set_flag(space, access, false);
    };

    let ty = access.sql_type;
    let bytes = slot_bytes_mut(space, access)?;
    match (ty, datum) {
        (SqlType::Boolean, Datum::Bool(v)) => bytes[0] = u8::from(*v),
        #[expect(clippy::cast_possible_truncation)]
        (SqlType::TinyInt, Datum::Int(v)) => bytes.copy_from_slice(&(*v as i8).to_le_bytes()),
        #[expect(clippy::cast_possible_truncation)]
        (SqlType::SmallInt, Datum::Int(v)) => bytes.copy_from_slice(&(*v as i16).to_le_bytes()),
        #[expect(clippy::cast_possible_truncation)]
        (SqlType::Integer | SqlType::Date, Datum::Int(v)) => {
            bytes.copy_from_slice(&(*v as i32).to_le_bytes());
        }
        (SqlType::BigInt | SqlType::Timestamp, Datum::Int(v)) => {
            bytes.copy_from_slice(&v.to_le_bytes());
        }
        (SqlType::Decimal, Datum::Decimal(v)) => bytes.copy_from_slice(&v.to_bytes()),
        (SqlType::Double, Datum::Double(v)) => bytes.copy_from_slice(&v.to_le_bytes()),
        _ => return Err(SlotCodecError::VariableLength { ty }),
    }

    set_flag(space, access, true)
}

fn slot_bytes<'a>(space: &'a [u8], access: &SlotAccess) -> Result<&'a [u8], SlotCodecError> {
    let len = space.len();
    let end = access.offset + access.size;

    space
        .get(access.offset..end)
        .ok_or(SlotCodecError::OutOfBounds {
            offset: access.offset,
            ty: access.sql_type,
            len,
        })
}

fn slot_bytes_mut<'a>(
    space: &'a mut [u8],
    access: &SlotAccess,
) -> Result<&'a mut [u8], SlotCodecError> {
    let len = space.len();
    let end = access.offset + access.size;

    space
        .get_mut(access.offset..end)
        .ok_or(SlotCodecError::OutOfBounds {
            offset: access.offset,
            ty: access.sql_type,
            len,
        })
}

// Slot widths come from the type registry, so the slice length always matches N.
fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

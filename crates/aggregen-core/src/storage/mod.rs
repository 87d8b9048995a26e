//! Module: storage
//! Responsibility: fixed-layout mutable storage for aggregate state.
//! Does not own: what a slot means (aggregation) or how instructions run (codegen).
//! Boundary: the only place that computes offsets; emitted code carries them as baked accesses.

pub(crate) mod codec;


use crate::{
    codegen::{CodeGen, Operand, StorageSpace},
    error::InternalError,
    types::SqlType,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub use codec::SlotCodecError;

///
/// SlotAccess
///
/// Resolved address of one slot, baked into emitted load/store instructions.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SlotAccess {
    pub sql_type: SqlType,
    pub offset: usize,
    pub size: usize,
    pub flag: Option<FlagBit>,
}

///
/// FlagBit
///
/// Position of a slot's set flag inside the header bitmap.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlagBit {
    pub byte: usize,
    pub mask: u8,
}

///
/// SlotLayout
///
/// Public descriptor of one allocated slot.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SlotLayout {
    pub index: u32,
    pub sql_type: SqlType,
    pub offset: usize,
    pub size: usize,
    pub nullable: bool,
}

///
/// LayoutError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LayoutError {
    #[error("storage layout is already finalized")]
    AlreadyFinalized,

    #[error("storage layout is not finalized")]
    NotFinalized,

    #[error("{ty} has no fixed-size storage representation")]
    VariableLength { ty: SqlType },

    #[error("unknown storage slot {index}")]
    UnknownSlot { index: u32 },
}

#[derive(Clone, Copy, Debug)]
struct SlotRequest {
    sql_type: SqlType,
    nullable: bool,
}

///
/// UpdateableStorage
///
/// Builder and descriptor for one aggregate buffer. Callers request slots
/// with `add_type`, freeze the layout with `finalize`, then emit typed
/// accesses through the load/store helpers.
///
/// Buffer layout: a set-flag bitmap (one bit per nullable slot) followed by
/// naturally aligned slot payloads. Total size is padded to the widest
/// alignment so buffers can be packed back to back.
///

#[derive(Clone, Debug, Default)]
pub struct UpdateableStorage {
    requests: Vec<SlotRequest>,
    layout: Option<Vec<SlotAccess>>,
    storage_size: usize,
}

impl UpdateableStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a slot whose value may be unset. Returns its placement key.
    pub fn add_type(&mut self, sql_type: SqlType) -> Result<u32, LayoutError> {
        self.request(sql_type, true)
    }

    /// Request a slot that always holds a value (no set flag).
    pub fn add_non_null_type(&mut self, sql_type: SqlType) -> Result<u32, LayoutError> {
        self.request(sql_type, false)
    }

    fn request(&mut self, sql_type: SqlType, nullable: bool) -> Result<u32, LayoutError> {
        if self.layout.is_some() {
            return Err(LayoutError::AlreadyFinalized);
        }
        if sql_type.fixed_size().is_none() {
            return Err(LayoutError::VariableLength { ty: sql_type });
        }
        let index = u32::try_from(self.requests.len())
            .map_err(|_| LayoutError::UnknownSlot { index: u32::MAX })?;
        self.requests.push(SlotRequest { sql_type, nullable });

        Ok(index)
    }

    /// Freeze the layout and compute every slot offset.
    pub fn finalize(&mut self) -> Result<(), LayoutError> {
        if self.layout.is_some() {
            return Err(LayoutError::AlreadyFinalized);
        }

        let nullable_count = self.requests.iter().filter(|r| r.nullable).count();
        let mut offset = nullable_count.div_ceil(8);
        let mut max_align = 1;
        let mut next_flag = 0usize;
        let mut layout = Vec::with_capacity(self.requests.len());

        for request in &self.requests {
            let ty = request.sql_type;
            let size = ty
                .fixed_size()
                .ok_or(LayoutError::VariableLength { ty })?;
            let align = ty.storage_align();
            offset += align_pad(offset, align);
            max_align = max_align.max(align);

            let flag = request.nullable.then(|| {
                let bit = next_flag;
                next_flag += 1;
                FlagBit {
                    byte: bit / 8,
                    mask: 1 << (bit % 8),
                }
            });

            layout.push(SlotAccess {
                sql_type: ty,
                offset,
                size,
                flag,
            });
            offset += size;
        }

        self.storage_size = offset + align_pad(offset, max_align);
        self.layout = Some(layout);

        Ok(())
    }

    /// Number of requested slots.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        self.requests.len()
    }

    /// Total buffer size in bytes. Zero until finalized.
    #[must_use]
    pub const fn storage_size(&self) -> usize {
        self.storage_size
    }

    /// Allocate a zeroed buffer of the finalized size.
    ///
    /// A zeroed buffer is not initialized aggregate state; run an initializer first.
    pub fn allocate_space(&self) -> Result<Vec<u8>, LayoutError> {
        if self.layout.is_none() {
            return Err(LayoutError::NotFinalized);
        }

        Ok(vec![0; self.storage_size])
    }

    /// Describe one finalized slot.
    pub fn slot(&self, index: u32) -> Result<SlotLayout, LayoutError> {
        let access = self.access(index)?;

        Ok(SlotLayout {
            index,
            sql_type: access.sql_type,
            offset: access.offset,
            size: access.size,
            nullable: access.flag.is_some(),
        })
    }

    /// Describe every finalized slot in placement order.
    pub fn slots(&self) -> Result<Vec<SlotLayout>, LayoutError> {
        (0..self.requests.len())
            .map(|i| {
                let index = u32::try_from(i)
                    .map_err(|_| LayoutError::UnknownSlot { index: u32::MAX })?;
                self.slot(index)
            })
            .collect()
    }

    /// Resolve the baked access of one slot.
    pub fn access(&self, index: u32) -> Result<SlotAccess, LayoutError> {
        let layout = self.layout.as_ref().ok_or(LayoutError::NotFinalized)?;

        usize::try_from(index)
            .ok()
            .and_then(|i| layout.get(i))
            .copied()
            .ok_or(LayoutError::UnknownSlot { index })
    }

    ///
    /// EMISSION
    ///

    /// Emit a load of one slot. Unset slots load as NULL.
    pub fn load(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
    ) -> Result<Operand, InternalError> {
        let access = self.bind(cg, space, index)?;

        Ok(cg.load_slot(space, access))
    }

    /// Emit a store of one slot and raise its set flag.
    ///
    /// Storing a NULL operand clears the flag instead.
    pub fn store(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
        value: Operand,
    ) -> Result<(), InternalError> {
        let access = self.bind(cg, space, index)?;
        if value.sql_type() != access.sql_type {
            return Err(InternalError::storage_invariant(format!(
                "store of {} into {} slot {index}",
                value.sql_type(),
                access.sql_type
            )));
        }

        cg.store_slot(space, access, value);
        Ok(())
    }

    /// Emit a test of one slot's set flag. Yields a BOOLEAN operand.
    pub fn is_set(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
    ) -> Result<Operand, InternalError> {
        let access = self.bind(cg, space, index)?;

        Ok(cg.test_slot(space, access))
    }

    /// Emit a clear of one slot's set flag.
    pub fn clear(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
    ) -> Result<(), InternalError> {
        let access = self.bind(cg, space, index)?;
        if access.flag.is_none() {
            return Err(InternalError::storage_invariant(format!(
                "slot {index} has no set flag to clear"
            )));
        }

        cg.clear_slot(space, access);
        Ok(())
    }

    // Resolve a slot and pin the emitted function to this buffer size.
    fn bind(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
    ) -> Result<SlotAccess, InternalError> {
        let access = self
            .access(index)
            .map_err(|err| InternalError::storage_invariant(err.to_string()))?;
        cg.require_space_size(space, self.storage_size)?;

        Ok(access)
    }
}

/// Padding needed to bring `offset` up to a multiple of `align`.
const fn align_pad(offset: usize, align: usize) -> usize {
    (align - (offset % align)) % align
}

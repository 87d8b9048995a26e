use crate::{
    aggregation::{Aggregation, SlotKind},
    codegen::{CodeGen, Operand, StorageSpace},
    error::InternalError,
    value::Value,
};

impl Aggregation {
    /// Emit the identity state of a global aggregation.
    ///
    /// Counters start at zero; every other slot starts unset, so finalizing
    /// without any advance yields COUNT = 0 and NULL for the rest.
    pub fn create_initial_global_values(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
    ) -> Result<(), InternalError> {
        for info in &self.infos {
            if info.aggregate_type.is_counter() {
                let zero = cg.const_value(Value::big_int(0));
                self.storage.store(cg, space, info.storage_index, zero)?;
            } else {
                self.storage.clear(cg, space, info.storage_index)?;
            }
        }

        Ok(())
    }

    /// Emit the state of a group seeded by its first row.
    ///
    /// Equivalent to the global identity followed by one advance, folded
    /// into a single write per slot. `initial` is aligned to the terms.
    pub fn create_initial_values(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        initial: &[Operand],
    ) -> Result<(), InternalError> {
        self.check_row_operands("create_initial_values", initial)?;

        for info in &self.infos {
            let value = initial[info.source_index];

            match info.aggregate_type {
                SlotKind::CountStar => {
                    let one = cg.const_value(Value::big_int(1));
                    self.storage.store(cg, space, info.storage_index, one)?;
                }
                SlotKind::Count => {
                    let is_null = cg.is_null(value);
                    let index = info.storage_index;
                    cg.emit_if(
                        is_null,
                        |cg| {
                            let zero = cg.const_value(Value::big_int(0));
                            self.storage.store(cg, space, index, zero)
                        },
                        |cg| {
                            let one = cg.const_value(Value::big_int(1));
                            self.storage.store(cg, space, index, one)
                        },
                    )?;
                }
                SlotKind::Sum => {
                    // NULL stores clear the set flag
                    let promoted = cg.cast(value, info.sql_type)?;
                    self.storage.store(cg, space, info.storage_index, promoted)?;
                }
                SlotKind::Min | SlotKind::Max => {
                    self.storage.store(cg, space, info.storage_index, value)?;
                }
            }
        }

        Ok(())
    }

    // Per-row operand vectors must match the terms in length and type.
    pub(crate) fn check_row_operands(
        &self,
        op: &str,
        row: &[Operand],
    ) -> Result<(), InternalError> {
        if row.len() != self.terms.len() {
            return Err(InternalError::aggregation_invariant(format!(
                "{op}: expected {} operands, found {}",
                self.terms.len(),
                row.len()
            )));
        }

        for (index, (term, operand)) in self.terms.iter().zip(row).enumerate() {
            if term.target.is_some() && term.input_type() != operand.sql_type() {
                return Err(InternalError::aggregation_invariant(format!(
                    "{op}: operand {index} is {}, {term} expects {}",
                    operand.sql_type(),
                    term.input_type()
                )));
            }
        }

        Ok(())
    }
}

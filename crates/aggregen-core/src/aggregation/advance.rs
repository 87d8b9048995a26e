use crate::{
    aggregation::{AggregateInfo, Aggregation, SlotKind},
    codegen::{CodeGen, CompareOp, Operand, StorageSpace},
    error::InternalError,
    value::Value,
};

impl Aggregation {
    /// Emit the update of every slot for one row. `next` is aligned to the terms.
    ///
    /// Slots are updated one after another. If the emitted code fails part way
    /// through a row, slots updated before the failure keep that row and the
    /// failing slot keeps its previous value, so the buffer no longer matches
    /// any prefix of the input. Discard it after an `ExecError`.
    pub fn advance_values(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        next: &[Operand],
    ) -> Result<(), InternalError> {
        self.check_row_operands("advance_values", next)?;

        for info in &self.infos {
            self.do_advance_value(cg, space, info, next[info.source_index])?;
        }

        Ok(())
    }

    /// Emit the update of one slot with one input value.
    ///
    /// NULL inputs leave every slot but COUNT(*) untouched. Unset SUM/MIN/MAX
    /// slots take the input as-is; set slots fold it in.
    pub fn do_advance_value(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        info: &AggregateInfo,
        next: Operand,
    ) -> Result<(), InternalError> {
        let index = info.storage_index;

        match info.aggregate_type {
            SlotKind::CountStar => self.emit_increment(cg, space, index),
            SlotKind::Count => {
                let present = not_null(cg, next)?;
                cg.emit_if_then(present, |cg| self.emit_increment(cg, space, index))
            }
            SlotKind::Sum => {
                let value = cg.cast(next, info.sql_type)?;
                let present = not_null(cg, value)?;
                cg.emit_if_then(present, |cg| {
                    let is_set = self.storage.is_set(cg, space, index)?;
                    cg.emit_if(
                        is_set,
                        |cg| {
                            let current = self.storage.load(cg, space, index)?;
                            let sum = cg.add(current, value)?;
                            self.storage.store(cg, space, index, sum)
                        },
                        |cg| self.storage.store(cg, space, index, value),
                    )
                })
            }
            SlotKind::Min | SlotKind::Max => {
                let op = if info.aggregate_type == SlotKind::Min {
                    CompareOp::Lt
                } else {
                    CompareOp::Gt
                };
                let present = not_null(cg, next)?;
                cg.emit_if_then(present, |cg| {
                    let is_set = self.storage.is_set(cg, space, index)?;
                    cg.emit_if(
                        is_set,
                        |cg| {
                            let current = self.storage.load(cg, space, index)?;
                            let better = cg.compare(op, next, current)?;
                            cg.emit_if_then(better, |cg| self.storage.store(cg, space, index, next))
                        },
                        |cg| self.storage.store(cg, space, index, next),
                    )
                })
            }
        }
    }

    fn emit_increment(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        index: u32,
    ) -> Result<(), InternalError> {
        let current = self.storage.load(cg, space, index)?;
        let one = cg.const_value(Value::big_int(1));
        let next = cg.add(current, one)?;

        self.storage.store(cg, space, index, next)
    }
}

fn not_null(cg: &mut CodeGen, value: Operand) -> Result<Operand, InternalError> {
    let is_null = cg.is_null(value);

    cg.not(is_null)
}

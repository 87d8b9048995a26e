use crate::{
    aggregation::{AggregateInfo, Aggregation, TermBinding},
    codegen::{CodeGen, CompareOp, Operand, StorageSpace},
    error::InternalError,
    types::SqlType,
    value::Value,
};

impl Aggregation {
    /// Emit the caller-visible result of every term, in term order.
    pub fn finalize_values(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
    ) -> Result<Vec<Operand>, InternalError> {
        let mut outputs = Vec::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            let output = match *binding {
                TermBinding::Slot { slot } => {
                    let info = self.info(slot)?;
                    self.storage.load(cg, space, info.storage_index)?
                }
                TermBinding::Average {
                    sum,
                    count,
                    output_type,
                } => self.emit_average(cg, space, sum, count, output_type)?,
            };
            outputs.push(output);
        }

        Ok(outputs)
    }

    // NULL over zero counted rows. Integral outputs divide in the stored sum
    // type and narrow the quotient; other outputs divide in the output type.
    fn emit_average(
        &self,
        cg: &mut CodeGen,
        space: StorageSpace,
        sum: usize,
        count: usize,
        output_type: SqlType,
    ) -> Result<Operand, InternalError> {
        let sum_info = self.info(sum)?;
        let (sum_index, sum_type) = (sum_info.storage_index, sum_info.sql_type);
        let divide_in = if output_type.is_integral() {
            sum_type
        } else {
            output_type
        };
        let count_index = self.info(count)?.storage_index;
        let scale = self.config.decimal_scale;

        let result = cg.const_null(output_type);
        let counted = self.storage.load(cg, space, count_index)?;
        let zero = cg.const_value(Value::big_int(0));
        let has_rows = cg.compare(CompareOp::Gt, counted, zero)?;

        cg.emit_if_then(has_rows, |cg| {
            let total = self.storage.load(cg, space, sum_index)?;
            let numerator = cg.cast(total, divide_in)?;
            let denominator = cg.cast(counted, divide_in)?;
            let quotient = cg.div(numerator, denominator)?;
            let mut average = cg.cast(quotient, output_type)?;
            if let (SqlType::Decimal, Some(scale)) = (output_type, scale) {
                average = cg.round(average, scale)?;
            }

            cg.copy(result, average)
        })?;

        Ok(result)
    }

    fn info(&self, slot: usize) -> Result<&AggregateInfo, InternalError> {
        self.infos.get(slot).ok_or_else(|| {
            InternalError::aggregation_invariant(format!("binding refers to missing slot {slot}"))
        })
    }
}

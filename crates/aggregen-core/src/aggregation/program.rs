use crate::{
    aggregation::{AggregateKind, Aggregation},
    codegen::{CodeGen, CompiledFunction, ExecError, Operand},
    error::InternalError,
    obs::sink::{self, MetricsEvent},
    types::SqlType,
    value::Value,
};

const INIT_GLOBAL: &str = "aggregate_init_global";
const INIT_SEEDED: &str = "aggregate_init";
const ADVANCE: &str = "aggregate_advance";
const FINALIZE: &str = "aggregate_finalize";

///
/// AggregationProgram
///
/// The four emitted functions of one `Aggregation`, compiled once and run
/// against caller-owned buffers. Rows passed to the driver are aligned to
/// the terms; values in COUNT(*) positions are ignored.
///

#[derive(Clone, Debug)]
pub struct AggregationProgram {
    init_global: CompiledFunction,
    init_seeded: CompiledFunction,
    advance: CompiledFunction,
    finalize: CompiledFunction,
    // term positions that feed an argument, in argument order
    input_positions: Vec<usize>,
    term_count: usize,
    is_global: bool,
    storage_size: usize,
    output_types: Vec<SqlType>,
}

impl AggregationProgram {
    /// Emit and seal every function of `aggregation`.
    pub fn compile(aggregation: &Aggregation) -> Result<Self, InternalError> {
        let input_positions: Vec<usize> = aggregation
            .terms()
            .iter()
            .enumerate()
            .filter(|(_, term)| term.kind != AggregateKind::CountStar)
            .map(|(i, _)| i)
            .collect();

        let init_global = {
            let mut cg = CodeGen::new(INIT_GLOBAL);
            let space = cg.storage_space()?;
            aggregation.create_initial_global_values(&mut cg, space)?;
            cg.finish()?
        };

        let init_seeded = {
            let mut cg = CodeGen::new(INIT_SEEDED);
            let space = cg.storage_space()?;
            let row = row_operands(&mut cg, aggregation)?;
            aggregation.create_initial_values(&mut cg, space, &row)?;
            cg.finish()?
        };

        let advance = {
            let mut cg = CodeGen::new(ADVANCE);
            let space = cg.storage_space()?;
            let row = row_operands(&mut cg, aggregation)?;
            aggregation.advance_values(&mut cg, space, &row)?;
            cg.finish()?
        };

        let finalize = {
            let mut cg = CodeGen::new(FINALIZE);
            let space = cg.storage_space()?;
            let outputs = aggregation.finalize_values(&mut cg, space)?;
            cg.ret(&outputs);
            cg.finish()?
        };

        Ok(Self {
            init_global,
            init_seeded,
            advance,
            finalize,
            input_positions,
            term_count: aggregation.terms().len(),
            is_global: aggregation.is_global(),
            storage_size: aggregation.storage_size(),
            output_types: aggregation.output_types(),
        })
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn storage_size(&self) -> usize {
        self.storage_size
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.is_global
    }

    #[must_use]
    pub fn output_types(&self) -> &[SqlType] {
        &self.output_types
    }

    /// Every compiled function in emission order.
    #[must_use]
    pub const fn functions(&self) -> [&CompiledFunction; 4] {
        [
            &self.init_global,
            &self.init_seeded,
            &self.advance,
            &self.finalize,
        ]
    }

    ///
    /// DRIVER
    ///

    /// A zeroed buffer of the right size. Run an initializer before use.
    #[must_use]
    pub fn allocate(&self) -> Vec<u8> {
        vec![0; self.storage_size]
    }

    /// Reset `buffer` to the global identity state.
    pub fn init_global(&self, buffer: &mut [u8]) -> Result<(), ExecError> {
        self.init_global.invoke(buffer, &[]).map(drop)
    }

    /// Seed `buffer` with the first row of a group.
    pub fn init_with(&self, buffer: &mut [u8], row: &[Value]) -> Result<(), ExecError> {
        let args = self.arguments(INIT_SEEDED, row)?;

        self.init_seeded.invoke(buffer, &args).map(drop)
    }

    /// Fold one row into `buffer`.
    ///
    /// On error the buffer may hold a partial update of the failing row and
    /// must not be finalized or advanced again.
    pub fn advance(&self, buffer: &mut [u8], row: &[Value]) -> Result<(), ExecError> {
        let args = self.arguments(ADVANCE, row)?;

        self.advance.invoke(buffer, &args).map(drop)
    }

    /// Fold a batch of rows into `buffer`. Stops at the first failing row and
    /// leaves the buffer unusable, as with `advance`.
    pub fn advance_all<R>(&self, buffer: &mut [u8], rows: &[R]) -> Result<(), ExecError>
    where
        R: AsRef<[Value]>,
    {
        let mut advanced = 0u64;
        let result = rows.iter().try_for_each(|row| {
            self.advance(buffer, row.as_ref())?;
            advanced += 1;
            Ok(())
        });
        sink::record(MetricsEvent::RowsAdvanced { rows: advanced });

        result
    }

    /// Produce one output per term from `buffer`.
    pub fn finalize(&self, buffer: &mut [u8]) -> Result<Vec<Value>, ExecError> {
        self.finalize.invoke(buffer, &[])
    }

    /// Aggregate `rows` into a fresh buffer and finalize it.
    ///
    /// Global programs start from the identity state. Grouped programs seed
    /// from the first row and yield no output for an empty input.
    pub fn evaluate<R>(&self, rows: &[R]) -> Result<Option<Vec<Value>>, ExecError>
    where
        R: AsRef<[Value]>,
    {
        let mut buffer = self.allocate();

        if self.is_global {
            self.init_global(&mut buffer)?;
            self.advance_all(&mut buffer, rows)?;
        } else {
            let Some((first, rest)) = rows.split_first() else {
                return Ok(None);
            };
            self.init_with(&mut buffer, first.as_ref())?;
            self.advance_all(&mut buffer, rest)?;
        }

        self.finalize(&mut buffer).map(Some)
    }

    // Select the argument values of one row.
    fn arguments(&self, function: &'static str, row: &[Value]) -> Result<Vec<Value>, ExecError> {
        if row.len() != self.term_count {
            return Err(ExecError::ArgumentCount {
                function,
                expected: self.term_count,
                found: row.len(),
            });
        }

        Ok(self
            .input_positions
            .iter()
            .map(|&i| row[i].clone())
            .collect())
    }
}

// Declare one argument per non-COUNT(*) term; COUNT(*) positions get a
// placeholder constant since their value is never read.
fn row_operands(
    cg: &mut CodeGen,
    aggregation: &Aggregation,
) -> Result<Vec<Operand>, InternalError> {
    let mut next_param = 0;
    let mut row = Vec::with_capacity(aggregation.terms().len());

    for term in aggregation.terms() {
        let operand = if term.kind == AggregateKind::CountStar {
            cg.const_null(SqlType::BigInt)
        } else {
            let operand = cg.param(next_param, term.input_type())?;
            next_param += 1;
            operand
        };
        row.push(operand);
    }

    Ok(row)
}

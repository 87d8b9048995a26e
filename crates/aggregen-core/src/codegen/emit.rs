use crate::{
    codegen::{
        BinaryOp, CompareOp, CompiledFunction, Instr, Label, Reg,
        function::ParamSlot,
    },
    error::InternalError,
    obs::sink::{self, MetricsEvent},
    storage::SlotAccess,
    types::SqlType,
    value::Value,
};

///
/// Operand
///
/// Emitted value handle: a register plus its SQL type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Operand {
    reg: Reg,
    sql_type: SqlType,
}

impl Operand {
    #[must_use]
    pub const fn reg(self) -> Reg {
        self.reg
    }

    #[must_use]
    pub const fn sql_type(self) -> SqlType {
        self.sql_type
    }
}

///
/// StorageSpace
///
/// Handle to the caller-provided buffer an emitted function mutates.
/// Obtained once per function from `CodeGen::storage_space`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StorageSpace {
    _private: (),
}

///
/// CodeGen
///
/// Emitter for one function. Instructions are appended in program order;
/// structured control flow is built with `emit_if` and friends.
///

#[derive(Debug)]
pub struct CodeGen {
    name: &'static str,
    instrs: Vec<Instr>,
    registers: Vec<SqlType>,
    params: Vec<Option<Operand>>,
    labels: Vec<Option<usize>>,
    space_declared: bool,
    space_size: Option<usize>,
}

impl CodeGen {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            instrs: Vec::new(),
            registers: Vec::new(),
            params: Vec::new(),
            labels: Vec::new(),
            space_declared: false,
            space_size: None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Declare the storage-space argument of this function.
    pub fn storage_space(&mut self) -> Result<StorageSpace, InternalError> {
        if self.space_declared {
            return Err(InternalError::codegen_invariant(format!(
                "{}: storage space declared twice",
                self.name
            )));
        }
        self.space_declared = true;

        Ok(StorageSpace { _private: () })
    }

    /// Pin the byte length the storage space must have at invocation.
    pub(crate) fn require_space_size(
        &mut self,
        _space: StorageSpace,
        size: usize,
    ) -> Result<(), InternalError> {
        if !self.space_declared {
            return Err(InternalError::codegen_invariant(format!(
                "{}: storage space used before it was declared",
                self.name
            )));
        }
        match self.space_size {
            Some(existing) if existing != size => Err(InternalError::codegen_invariant(format!(
                "{}: storage space bound to {existing} and {size} bytes",
                self.name
            ))),
            _ => {
                self.space_size = Some(size);
                Ok(())
            }
        }
    }

    /// Declare (or re-fetch) positional argument `index` of type `sql_type`.
    ///
    /// Arguments are bound before the first instruction runs, so a parameter
    /// declared inside a branch is still valid after it.
    pub fn param(&mut self, index: usize, sql_type: SqlType) -> Result<Operand, InternalError> {
        if index >= self.params.len() {
            self.params.resize(index + 1, None);
        }
        if let Some(existing) = self.params[index] {
            if existing.sql_type != sql_type {
                return Err(InternalError::codegen_invariant(format!(
                    "{}: parameter {index} declared as {} and {sql_type}",
                    self.name, existing.sql_type
                )));
            }
            return Ok(existing);
        }

        let operand = self.alloc(sql_type);
        self.params[index] = Some(operand);

        Ok(operand)
    }

    ///
    /// VALUES
    ///

    pub fn const_value(&mut self, value: Value) -> Operand {
        let dst = self.alloc(value.sql_type());
        self.instrs.push(Instr::Const {
            dst: dst.reg,
            value,
        });

        dst
    }

    pub fn const_null(&mut self, sql_type: SqlType) -> Operand {
        self.const_value(Value::null(sql_type))
    }

    /// Overwrite `dst` with `src`. Both must share a type.
    pub fn copy(&mut self, dst: Operand, src: Operand) -> Result<(), InternalError> {
        self.expect_same("copy", dst, src)?;
        self.instrs.push(Instr::Copy {
            dst: dst.reg,
            src: src.reg,
        });

        Ok(())
    }

    pub fn is_null(&mut self, src: Operand) -> Operand {
        let dst = self.alloc(SqlType::Boolean);
        self.instrs.push(Instr::IsNull {
            dst: dst.reg,
            src: src.reg,
        });

        dst
    }

    pub fn not(&mut self, src: Operand) -> Result<Operand, InternalError> {
        self.expect_type("not", src, SqlType::Boolean)?;
        let dst = self.alloc(SqlType::Boolean);
        self.instrs.push(Instr::Not {
            dst: dst.reg,
            src: src.reg,
        });

        Ok(dst)
    }

    /// Emit checked arithmetic. Overflow and division by zero fail at run time.
    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand, InternalError> {
        self.expect_same(op.symbol(), lhs, rhs)?;
        if !lhs.sql_type.supports_arithmetic() {
            return Err(InternalError::codegen_unsupported(format!(
                "{}: {} is not defined for {}",
                self.name,
                op.symbol(),
                lhs.sql_type
            )));
        }
        let dst = self.alloc(lhs.sql_type);
        self.instrs.push(Instr::Binary {
            dst: dst.reg,
            op,
            lhs: lhs.reg,
            rhs: rhs.reg,
        });

        Ok(dst)
    }

    pub fn add(&mut self, lhs: Operand, rhs: Operand) -> Result<Operand, InternalError> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn div(&mut self, lhs: Operand, rhs: Operand) -> Result<Operand, InternalError> {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    /// Emit a comparison. Yields NULL when either side is NULL.
    pub fn compare(
        &mut self,
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand, InternalError> {
        self.expect_same(op.symbol(), lhs, rhs)?;
        if !lhs.sql_type.supports_ordering() {
            return Err(InternalError::codegen_unsupported(format!(
                "{}: {} has no ordering",
                self.name, lhs.sql_type
            )));
        }
        let dst = self.alloc(SqlType::Boolean);
        self.instrs.push(Instr::Compare {
            dst: dst.reg,
            op,
            lhs: lhs.reg,
            rhs: rhs.reg,
        });

        Ok(dst)
    }

    /// Emit a cast. Casting to the operand's own type emits nothing.
    pub fn cast(&mut self, src: Operand, to: SqlType) -> Result<Operand, InternalError> {
        if src.sql_type == to {
            return Ok(src);
        }
        if !(src.sql_type.is_numeric() && to.is_numeric()) {
            return Err(InternalError::codegen_unsupported(format!(
                "{}: no cast from {} to {to}",
                self.name, src.sql_type
            )));
        }
        let dst = self.alloc(to);
        self.instrs.push(Instr::Cast {
            dst: dst.reg,
            src: src.reg,
            to,
        });

        Ok(dst)
    }

    /// Round a DECIMAL operand to `scale` fractional digits.
    pub fn round(&mut self, src: Operand, scale: u32) -> Result<Operand, InternalError> {
        self.expect_type("round", src, SqlType::Decimal)?;
        let dst = self.alloc(SqlType::Decimal);
        self.instrs.push(Instr::Round {
            dst: dst.reg,
            src: src.reg,
            scale,
        });

        Ok(dst)
    }

    ///
    /// CONTROL FLOW
    ///

    /// Emit `if cond { then } else { otherwise }`. A NULL condition takes the else arm.
    pub fn emit_if<T, E>(
        &mut self,
        cond: Operand,
        then_block: T,
        else_block: E,
    ) -> Result<(), InternalError>
    where
        T: FnOnce(&mut Self) -> Result<(), InternalError>,
        E: FnOnce(&mut Self) -> Result<(), InternalError>,
    {
        self.expect_type("if", cond, SqlType::Boolean)?;
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.instrs.push(Instr::JumpUnless {
            cond: cond.reg,
            target: else_label,
        });
        then_block(self)?;
        self.instrs.push(Instr::Jump(end_label));
        self.mark(else_label)?;
        else_block(self)?;
        self.mark(end_label)
    }

    /// Emit `if cond { then }`.
    pub fn emit_if_then<T>(&mut self, cond: Operand, then_block: T) -> Result<(), InternalError>
    where
        T: FnOnce(&mut Self) -> Result<(), InternalError>,
    {
        self.expect_type("if", cond, SqlType::Boolean)?;
        let end_label = self.new_label();

        self.instrs.push(Instr::JumpUnless {
            cond: cond.reg,
            target: end_label,
        });
        then_block(self)?;
        self.mark(end_label)
    }

    /// Emit a return of the given operands.
    pub fn ret(&mut self, values: &[Operand]) {
        self.instrs
            .push(Instr::Return(values.iter().map(|v| v.reg).collect()));
    }

    /// Seal the function. A trailing empty return is appended when missing.
    pub fn finish(mut self) -> Result<CompiledFunction, InternalError> {
        if !matches!(self.instrs.last(), Some(Instr::Return(_))) {
            self.ret(&[]);
        }

        let mut targets = Vec::with_capacity(self.labels.len());
        for (i, bound) in self.labels.iter().enumerate() {
            let pc = bound.ok_or_else(|| {
                InternalError::codegen_invariant(format!("{}: label L{i} never bound", self.name))
            })?;
            targets.push(pc);
        }

        let mut params = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            let operand = param.ok_or_else(|| {
                InternalError::codegen_invariant(format!(
                    "{}: parameter {index} never declared",
                    self.name
                ))
            })?;
            params.push(ParamSlot {
                reg: operand.reg,
                sql_type: operand.sql_type,
            });
        }

        sink::record(MetricsEvent::FunctionEmitted {
            function: self.name,
            instructions: self.instrs.len() as u64,
        });

        Ok(CompiledFunction::new(
            self.name,
            self.instrs,
            self.registers,
            params,
            self.space_size,
            targets,
        ))
    }

    ///
    /// SLOT ACCESS
    ///

    pub(crate) fn load_slot(&mut self, _space: StorageSpace, access: SlotAccess) -> Operand {
        let dst = self.alloc(access.sql_type);
        self.instrs.push(Instr::LoadSlot {
            dst: dst.reg,
            access,
        });

        dst
    }

    pub(crate) fn store_slot(&mut self, _space: StorageSpace, access: SlotAccess, src: Operand) {
        self.instrs.push(Instr::StoreSlot {
            access,
            src: src.reg,
        });
    }

    pub(crate) fn test_slot(&mut self, _space: StorageSpace, access: SlotAccess) -> Operand {
        let dst = self.alloc(SqlType::Boolean);
        self.instrs.push(Instr::TestSlot {
            dst: dst.reg,
            access,
        });

        dst
    }

    pub(crate) fn clear_slot(&mut self, _space: StorageSpace, access: SlotAccess) {
        self.instrs.push(Instr::ClearSlot { access });
    }

    ///
    /// HELPERS
    ///

    fn alloc(&mut self, sql_type: SqlType) -> Operand {
        #[expect(clippy::cast_possible_truncation)]
        let reg = Reg(self.registers.len() as u32);
        self.registers.push(sql_type);

        Operand { reg, sql_type }
    }

    fn new_label(&mut self) -> Label {
        #[expect(clippy::cast_possible_truncation)]
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);

        label
    }

    fn mark(&mut self, label: Label) -> Result<(), InternalError> {
        let slot = self.labels.get_mut(label.index()).ok_or_else(|| {
            InternalError::codegen_invariant(format!("{}: unknown label {label}", self.name))
        })?;
        if slot.is_some() {
            return Err(InternalError::codegen_invariant(format!(
                "{}: label {label} bound twice",
                self.name
            )));
        }
        *slot = Some(self.instrs.len());
        self.instrs.push(Instr::Mark(label));

        Ok(())
    }

    fn expect_same(
        &self,
        op: &str,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<(), InternalError> {
        if lhs.sql_type == rhs.sql_type {
            return Ok(());
        }

        Err(InternalError::codegen_invariant(format!(
            "{}: {op} operands disagree ({} vs {})",
            self.name, lhs.sql_type, rhs.sql_type
        )))
    }

    fn expect_type(&self, op: &str, operand: Operand, ty: SqlType) -> Result<(), InternalError> {
        if operand.sql_type == ty {
            return Ok(());
        }

        Err(InternalError::codegen_invariant(format!(
            "{}: {op} expects {ty}, found {}",
            self.name, operand.sql_type
        )))
    }
}

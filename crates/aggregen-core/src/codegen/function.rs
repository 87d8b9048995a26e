use crate::{
    codegen::{BinaryOp, Instr, Reg},
    obs::sink::{self, MetricsEvent},
    storage::{SlotCodecError, codec},
    types::SqlType,
    value::{Value, ValueError},
};
use std::fmt::{self, Write as _};
use thiserror::Error as ThisError;

///
/// ExecError
///
/// Failure while running an emitted function.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExecError {
    #[error("{function}: expected {expected} arguments, found {found}")]
    ArgumentCount {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{function}: argument {index} has type {found}, expected {expected}")]
    ArgumentType {
        function: &'static str,
        index: usize,
        expected: SqlType,
        found: SqlType,
    },

    #[error("{function}: storage space is {found} bytes, expected {expected}")]
    BufferSize {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Slot(#[from] SlotCodecError),

    #[error("{function}: {message}")]
    Internal {
        function: &'static str,
        message: String,
    },
}

impl ExecError {
    /// True for SQL-level arithmetic failures (overflow, division by zero).
    #[must_use]
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Value(ValueError::Overflow { .. } | ValueError::DivisionByZero)
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ParamSlot {
    pub(crate) reg: Reg,
    pub(crate) sql_type: SqlType,
}

///
/// CompiledFunction
///
/// Sealed output of `CodeGen::finish`. Immutable and free of buffer state:
/// concurrent callers may invoke it on their own buffers.
///

#[derive(Clone, Debug)]
pub struct CompiledFunction {
    name: &'static str,
    instrs: Vec<Instr>,
    registers: Vec<SqlType>,
    params: Vec<ParamSlot>,
    space_size: Option<usize>,
    targets: Vec<usize>,
}

impl CompiledFunction {
    pub(crate) const fn new(
        name: &'static str,
        instrs: Vec<Instr>,
        registers: Vec<SqlType>,
        params: Vec<ParamSlot>,
        space_size: Option<usize>,
        targets: Vec<usize>,
    ) -> Self {
        Self {
            name,
            instrs,
            registers,
            params,
            space_size,
            targets,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    /// Declared argument types in positional order.
    #[must_use]
    pub fn param_types(&self) -> Vec<SqlType> {
        self.params.iter().map(|p| p.sql_type).collect()
    }

    /// Storage-space length the function was emitted against, if it touches one.
    #[must_use]
    pub const fn space_size(&self) -> Option<usize> {
        self.space_size
    }

    /// Render the instruction listing, one instruction per line.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = format!("fn {}(", self.name);
        for (i, param) in self.params.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            let _ = write!(out, "{sep}{}: {}", param.reg, param.sql_type);
        }
        out.push_str(")\n");
        for instr in &self.instrs {
            let indent = if matches!(instr, Instr::Mark(_)) { "" } else { "  " };
            let _ = writeln!(out, "{indent}{instr}");
        }

        out
    }

    /// Run the function against one storage space.
    pub fn invoke(&self, space: &mut [u8], args: &[Value]) -> Result<Vec<Value>, ExecError> {
        let result = self.run(space, args);

        match &result {
            Ok(_) => sink::record(MetricsEvent::Invocation {
                function: self.name,
            }),
            Err(_) => sink::record(MetricsEvent::InvocationFailed {
                function: self.name,
            }),
        }

        result
    }

    fn run(&self, space: &mut [u8], args: &[Value]) -> Result<Vec<Value>, ExecError> {
        self.check_inputs(space, args)?;

        let mut frame = Frame {
            function: self.name,
            regs: self.registers.iter().map(|ty| Value::null(*ty)).collect(),
        };
        for (param, arg) in self.params.iter().zip(args) {
            frame.set(param.reg, arg.clone())?;
        }

        let mut pc = 0;
        while let Some(instr) = self.instrs.get(pc) {
            pc += 1;

            match instr {
                Instr::Const { dst, value } => frame.set(*dst, value.clone())?,
                Instr::Copy { dst, src } => {
                    let value = frame.get(*src)?.clone();
                    frame.set(*dst, value)?;
                }
                Instr::LoadSlot { dst, access } => frame.set(*dst, codec::read(space, access)?)?,
                Instr::StoreSlot { access, src } => codec::write(space, access, frame.get(*src)?)?,
                Instr::TestSlot { dst, access } => {
                    frame.set(*dst, Value::boolean(codec::is_set(space, access)?))?;
                }
                Instr::ClearSlot { access } => codec::set_flag(space, access, false)?,
                Instr::IsNull { dst, src } => {
                    let is_null = frame.get(*src)?.is_null();
                    frame.set(*dst, Value::boolean(is_null))?;
                }
                Instr::Not { dst, src } => {
                    let value = match frame.get(*src)?.as_bool() {
                        Some(b) => Value::boolean(!b),
                        None => Value::null(SqlType::Boolean),
                    };
                    frame.set(*dst, value)?;
                }
                Instr::Binary { dst, op, lhs, rhs } => {
                    let (lhs, rhs) = (frame.get(*lhs)?, frame.get(*rhs)?);
                    let value = match op {
                        BinaryOp::Add => lhs.checked_add(rhs)?,
                        BinaryOp::Div => lhs.checked_div(rhs)?,
                    };
                    frame.set(*dst, value)?;
                }
                Instr::Compare { dst, op, lhs, rhs } => {
                    let value = match frame.get(*lhs)?.compare(frame.get(*rhs)?)? {
                        Some(ordering) => Value::boolean(op.holds(ordering)),
                        None => Value::null(SqlType::Boolean),
                    };
                    frame.set(*dst, value)?;
                }
                Instr::Cast { dst, src, to } => {
                    let value = frame.get(*src)?.cast(*to)?;
                    frame.set(*dst, value)?;
                }
                Instr::Round { dst, src, scale } => {
                    let src = frame.get(*src)?;
                    let value = match src.as_decimal() {
                        Some(d) => Value::decimal(d.round_dp(*scale)),
                        None => src.clone(),
                    };
                    frame.set(*dst, value)?;
                }
                Instr::Mark(_) => {}
                Instr::Jump(label) => pc = self.target(label.index())?,
                Instr::JumpUnless { cond, target } => {
                    if frame.get(*cond)?.as_bool() != Some(true) {
                        pc = self.target(target.index())?;
                    }
                }
                Instr::Return(values) => {
                    return values.iter().map(|r| frame.get(*r).cloned()).collect();
                }
            }
        }

        Ok(Vec::new())
    }

    fn check_inputs(&self, space: &[u8], args: &[Value]) -> Result<(), ExecError> {
        if args.len() != self.params.len() {
            return Err(ExecError::ArgumentCount {
                function: self.name,
                expected: self.params.len(),
                found: args.len(),
            });
        }
        for (index, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if arg.sql_type() != param.sql_type {
                return Err(ExecError::ArgumentType {
                    function: self.name,
                    index,
                    expected: param.sql_type,
                    found: arg.sql_type(),
                });
            }
        }
        if let Some(expected) = self.space_size
            && space.len() != expected
        {
            return Err(ExecError::BufferSize {
                function: self.name,
                expected,
                found: space.len(),
            });
        }

        Ok(())
    }

    fn target(&self, label: usize) -> Result<usize, ExecError> {
        self.targets.get(label).copied().ok_or_else(|| ExecError::Internal {
            function: self.name,
            message: format!("jump to unknown label L{label}"),
        })
    }
}

impl fmt::Display for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.listing())
    }
}

// Register file of one invocation.
struct Frame {
    function: &'static str,
    regs: Vec<Value>,
}

impl Frame {
    fn get(&self, reg: Reg) -> Result<&Value, ExecError> {
        self.regs.get(reg.index()).ok_or_else(|| self.bad_reg(reg))
    }

    fn set(&mut self, reg: Reg, value: Value) -> Result<(), ExecError> {
        let function = self.function;
        let slot = self
            .regs
            .get_mut(reg.index())
            .ok_or_else(|| ExecError::Internal {
                function,
                message: format!("write to unknown register {reg}"),
            })?;
        *slot = value;

        Ok(())
    }

    fn bad_reg(&self, reg: Reg) -> ExecError {
        ExecError::Internal {
            function: self.function,
            message: format!("read of unknown register {reg}"),
        }
    }
}

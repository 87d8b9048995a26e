use crate::{storage::SlotAccess, types::SqlType, value::Value};
use std::fmt;

///
/// Reg
///
/// Virtual register. Every register has one SQL type fixed at emission.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Reg(pub(crate) u32);

impl Reg {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

///
/// Label
///
/// Branch target; bound to an instruction position exactly once.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Label(pub(crate) u32);

impl Label {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    Add,
    Div,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Div => "/",
        }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether an ordering satisfies this operator.
    #[must_use]
    pub const fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match self {
            Self::Eq => matches!(ordering, Equal),
            Self::Ne => !matches!(ordering, Equal),
            Self::Lt => matches!(ordering, Less),
            Self::Le => !matches!(ordering, Greater),
            Self::Gt => matches!(ordering, Greater),
            Self::Ge => !matches!(ordering, Less),
        }
    }
}

///
/// Instr
///
/// One instruction of the register IR. Operand types are checked when the
/// instruction is emitted; the interpreter trusts them.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instr {
    Const {
        dst: Reg,
        value: Value,
    },
    Copy {
        dst: Reg,
        src: Reg,
    },
    LoadSlot {
        dst: Reg,
        access: SlotAccess,
    },
    StoreSlot {
        access: SlotAccess,
        src: Reg,
    },
    TestSlot {
        dst: Reg,
        access: SlotAccess,
    },
    ClearSlot {
        access: SlotAccess,
    },
    IsNull {
        dst: Reg,
        src: Reg,
    },
    Not {
        dst: Reg,
        src: Reg,
    },
    Binary {
        dst: Reg,
        op: BinaryOp,
        lhs: Reg,
        rhs: Reg,
    },
    Compare {
        dst: Reg,
        op: CompareOp,
        lhs: Reg,
        rhs: Reg,
    },
    Cast {
        dst: Reg,
        src: Reg,
        to: SqlType,
    },
    Round {
        dst: Reg,
        src: Reg,
        scale: u32,
    },
    Mark(Label),
    Jump(Label),
    JumpUnless {
        cond: Reg,
        target: Label,
    },
    Return(Vec<Reg>),
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const { dst, value } => write!(f, "{dst} = const {value}:{}", value.sql_type()),
            Self::Copy { dst, src } => write!(f, "{dst} = {src}"),
            Self::LoadSlot { dst, access } => {
                write!(f, "{dst} = load {}@{}", access.sql_type, access.offset)
            }
            Self::StoreSlot { access, src } => {
                write!(f, "store {}@{} = {src}", access.sql_type, access.offset)
            }
            Self::TestSlot { dst, access } => write!(f, "{dst} = is_set @{}", access.offset),
            Self::ClearSlot { access } => write!(f, "clear @{}", access.offset),
            Self::IsNull { dst, src } => write!(f, "{dst} = is_null {src}"),
            Self::Not { dst, src } => write!(f, "{dst} = not {src}"),
            Self::Binary { dst, op, lhs, rhs } => {
                write!(f, "{dst} = {lhs} {} {rhs}", op.symbol())
            }
            Self::Compare { dst, op, lhs, rhs } => {
                write!(f, "{dst} = {lhs} {} {rhs}", op.symbol())
            }
            Self::Cast { dst, src, to } => write!(f, "{dst} = cast {src} as {to}"),
            Self::Round { dst, src, scale } => write!(f, "{dst} = round {src}, {scale}"),
            Self::Mark(label) => write!(f, "{label}:"),
            Self::Jump(label) => write!(f, "jump {label}"),
            Self::JumpUnless { cond, target } => write!(f, "jump_unless {cond}, {target}"),
            Self::Return(values) => {
                f.write_str("return")?;
                for (i, reg) in values.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{reg}")?;
                }
                Ok(())
            }
        }
    }
}

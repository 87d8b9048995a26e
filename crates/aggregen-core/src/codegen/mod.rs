//! Module: codegen
//! Responsibility: emission of typed register code and its execution.
//! Does not own: storage offsets (storage) or aggregate semantics (aggregation).
//! Boundary: emitters check operand types up front; the interpreter trusts emitted code.

mod emit;
mod function;
mod instr;

#[cfg(test)]
mod tests;

pub use emit::{CodeGen, Operand, StorageSpace};
pub use function::{CompiledFunction, ExecError};
pub use instr::{BinaryOp, CompareOp, Instr, Label, Reg};

//! Errors surfaced by parsing and execution

use crate::token::Op;

/// Unrecoverable runtime conditions. Execution stops at the faulting instruction.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Fault {
    #[error("fatal: undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("fatal: ret with an empty call stack")]
    EmptyCallStack,
    #[error("fatal: division by zero")]
    DivisionByZero,
    #[error("fatal: {op:?} is missing operand #{index}")]
    MissingOperand { op: Op, index: usize },
}

/// Rejections raised while building a program in strict mode.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },
}

use thiserror::Error;

use super::symbols::SymbolError;
use crate::ast::SourcePosition;

fn culprit(symbol: &Option<String>) -> String {
    match symbol {
        Some(name) => format!(" {}", name),
        None => String::new(),
    }
}

/// Everything that can go wrong while assembling a line.
///
/// None of these are recovered from: the first one aborts the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),
    #[error("redefinition of label {0}")]
    RedefinedSymbol(String),
    #[error("invalid operand for {0} addressing")]
    InvalidOperand(crate::ast::AddressingMode),
    #[error("operand{} {value:#x} out of range", culprit(.symbol))]
    OperandOutOfRange { value: i32, symbol: Option<String> },
    #[error("destination{} must be within 128 bytes of branch", culprit(.0))]
    BranchOutOfBounds(Option<String>),
    #[error("destination{} must be within 32768 bytes of long branch", culprit(.0))]
    LongBranchOutOfBounds(Option<String>),
    #[error("destination{} must be within same bank as jump", culprit(.0))]
    JumpOutOfBounds(Option<String>),
    #[error("relative address{} must be within same bank as instruction", culprit(.0))]
    RelativeAddressOutOfBounds(Option<String>),
    #[error("must specify label for EQU")]
    MissingLabelForEqu,
    #[error("{0} operand must be known on first pass")]
    ForwardReference(&'static str),
    #[error("PAD length must not be negative, got {0}")]
    NegativePad(i32),
    #[error("cannot open included file {path}: {reason}")]
    FileError { path: String, reason: String },
    #[error("assembly did not converge within {0} passes")]
    PassLimitExceeded(u32),
}

impl ErrorKind {
    /// Whether the error is measured against label or program counter
    /// values that may still move while the layout settles.
    pub fn depends_on_layout(&self) -> bool {
        matches!(
            self,
            ErrorKind::BranchOutOfBounds(_)
                | ErrorKind::LongBranchOutOfBounds(_)
                | ErrorKind::JumpOutOfBounds(_)
                | ErrorKind::RelativeAddressOutOfBounds(_)
        )
    }
}

impl From<SymbolError> for ErrorKind {
    fn from(err: SymbolError) -> Self {
        match err {
            SymbolError::Redefined(name) => ErrorKind::RedefinedSymbol(name),
        }
    }
}

/// An [`ErrorKind`] tied to the line it was raised on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{position}: {kind}")]
pub struct CompilerError {
    pub position: SourcePosition,
    pub kind: ErrorKind,
}

impl CompilerError {
    pub fn new(position: SourcePosition, kind: ErrorKind) -> Self {
        Self { position, kind }
    }
}

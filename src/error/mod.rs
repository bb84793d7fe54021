//! Error types for all compilation and execution phases.

use crate::span::Span;
use thiserror::Error;

/// Parser errors.
///
/// The parser records as many of these as it can recover from; callers
/// receive the full list.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input at {0}")]
    UnexpectedEof(Span),

    #[error("Unterminated string literal at {0}")]
    UnterminatedString(Span),

    #[error("Integer literal '{0}' out of range at {1}")]
    InvalidNumber(String, Span),

    #[error("Invalid assignment target at {0}")]
    InvalidAssignmentTarget(Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof(span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::InvalidNumber(_, span) => *span,
            Self::InvalidAssignmentTarget(span) => *span,
            Self::General { span, .. } => *span,
        }
    }
}

/// Type checking errors.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, found {found} at {span}")]
    Mismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Undefined variable '{0}' at {1}")]
    UndefinedVariable(String, Span),

    #[error("Undefined function '{0}' at {1}")]
    UndefinedFunction(String, Span),

    #[error("Cannot call a non-function value at {0}")]
    NotCallable(Span),

    #[error("Wrong number of arguments: expected {expected}, got {got} at {span}")]
    WrongArity {
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("Cannot mutably borrow immutable binding '{0}' at {1}")]
    MutBorrowOfImmutable(String, Span),

    #[error("Use of '{0}' after its borrow was invalidated at {1}")]
    InvalidatedBorrow(String, Span),

    #[error("Cannot assign to immutable binding '{0}' at {1}")]
    AssignToImmutable(String, Span),

    #[error("Invalid assignment target at {0}")]
    InvalidAssignmentTarget(Span),

    #[error("Cannot dereference non-reference type '{0}' at {1}")]
    NotAReference(String, Span),

    #[error("Function '{0}' is declared more than once at {1}")]
    DuplicateFunction(String, Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl TypeError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Mismatch { span, .. } => *span,
            Self::UndefinedVariable(_, span) => *span,
            Self::UndefinedFunction(_, span) => *span,
            Self::NotCallable(span) => *span,
            Self::WrongArity { span, .. } => *span,
            Self::MutBorrowOfImmutable(_, span) => *span,
            Self::InvalidatedBorrow(_, span) => *span,
            Self::AssignToImmutable(_, span) => *span,
            Self::InvalidAssignmentTarget(span) => *span,
            Self::NotAReference(_, span) => *span,
            Self::DuplicateFunction(_, span) => *span,
            Self::General { span, .. } => *span,
        }
    }
}

/// Bytecode compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Undefined variable '{0}' at {1}")]
    UndefinedVariable(String, Span),

    #[error("Undefined function '{0}' at {1}")]
    UndefinedFunction(String, Span),

    #[error("Function '{0}' is declared more than once at {1}")]
    DuplicateFunction(String, Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }
}

/// Bytecode preflight errors raised while loading a module into the VM.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Entry function 'main' not found")]
    MissingEntry,

    #[error("Entry function 'main' must take no parameters, has {0}")]
    EntryArity(usize),

    #[error("Function '{name}' has entry pc {entry_pc} outside the instruction stream")]
    BadEntryPc { name: String, entry_pc: usize },

    #[error("Jump target {target} out of range at pc {pc}")]
    JumpOutOfRange { target: usize, pc: usize },

    #[error("Constant index {index} out of range at pc {pc}")]
    ConstantOutOfRange { index: usize, pc: usize },

    #[error("Function index {index} out of range at pc {pc}")]
    FunctionOutOfRange { index: usize, pc: usize },

    #[error("Unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Truncated instruction stream")]
    Truncated,
}

/// Runtime faults. None of these are recoverable from within the VM.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },

    #[error("Stack overflow at pc {pc}")]
    StackOverflow { pc: usize },

    #[error("Memory access out of bounds: slot {slot} at pc {pc}")]
    MemoryOutOfBounds { slot: usize, pc: usize },

    #[error("Type mismatch: expected {expected}, found {found} at pc {pc}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        pc: usize,
    },

    #[error("Division by zero at pc {pc}")]
    DivisionByZero { pc: usize },

    #[error("Bad function index {index} at pc {pc}")]
    BadFunctionIndex { index: usize, pc: usize },

    #[error("Corrupted call frame at pc {pc}")]
    CorruptedFrame { pc: usize },

    #[error("Instruction budget of {limit} exhausted at pc {pc}")]
    StepLimitExceeded { limit: u64, pc: usize },
}

/// A unified error type for the whole pipeline.
#[derive(Debug, Error)]
pub enum FerriteError {
    #[error("Parse error: {0}")]
    Parser(#[from] ParserError),

    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

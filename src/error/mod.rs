//! Error types for every phase: scanning, compiling and running.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::span::Span;

/// Lexer errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerError {
    #[error("Unexpected character '{0}'.")]
    UnexpectedChar(char, Span),

    #[error("Unterminated string.")]
    UnterminatedString(Span),

    #[error("Invalid number literal '{0}'.")]
    InvalidNumber(String, Span),
}

impl LexerError {
    pub fn unexpected_char(c: char, span: Span) -> Self {
        Self::UnexpectedChar(c, span)
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::UnterminatedString(span)
    }

    pub fn invalid_number(s: impl Into<String>, span: Span) -> Self {
        Self::InvalidNumber(s.into(), span)
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar(_, span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::InvalidNumber(_, span) => *span,
        }
    }
}

/// Where a compile diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a concrete token; holds its lexeme.
    At(String),
    /// At the end of the input.
    End,
    /// The offending token was itself an error (lexer failure).
    Unknown,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme),
            ErrorLocation::End => write!(f, " at end"),
            ErrorLocation::Unknown => Ok(()),
        }
    }
}

/// A single compile diagnostic, formatted exactly as it is reported.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, location: ErrorLocation, message: impl Into<String>) -> Self {
        Self {
            line,
            location,
            message: message.into(),
        }
    }
}

/// Every diagnostic surfaced by one compilation, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

/// Runtime errors. `Display` is the bare message; see [`RuntimeError::report`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    NumberOperands { line: u32 },

    #[error("Operands must be two numbers or two strings.")]
    AddOperands { line: u32 },

    #[error("Operand must be a number.")]
    NumberOperand { line: u32 },

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: u32 },

    #[error("Stack overflow.")]
    StackOverflow { line: u32 },

    #[error("Unknown opcode {opcode}.")]
    UnknownOpcode { opcode: u8, line: u32 },

    #[error("Malformed bytecode: {message}.")]
    MalformedChunk { message: String, line: u32 },
}

impl RuntimeError {
    pub fn undefined_variable(name: impl Into<String>, line: u32) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            line,
        }
    }

    pub fn malformed(message: impl Into<String>, line: u32) -> Self {
        Self::MalformedChunk {
            message: message.into(),
            line,
        }
    }

    /// Source line of the instruction that failed.
    pub fn line(&self) -> u32 {
        match self {
            Self::NumberOperands { line } => *line,
            Self::AddOperands { line } => *line,
            Self::NumberOperand { line } => *line,
            Self::UndefinedVariable { line, .. } => *line,
            Self::StackOverflow { line } => *line,
            Self::UnknownOpcode { line, .. } => *line,
            Self::MalformedChunk { line, .. } => *line,
        }
    }

    /// The two-line report printed for the user.
    pub fn report(&self) -> String {
        format!("{}\n[line {}] in script", self, self.line())
    }
}

/// Outcome of a failed `interpret` call.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),

    #[error("{}", .0.report())]
    Runtime(#[from] RuntimeError),

    #[error("Could not open file \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InterpretError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Compile(_) | Self::Io { .. } => 1,
            Self::Runtime(_) => 2,
        }
    }
}

use std::fmt;

use cart_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Malformed source.
    Syntax,
    /// Well-formed source that uses a construct the sandbox forbids.
    Restricted,
    /// Source that exceeds a compiler limit (registers, constants, nesting).
    Limit,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompileErrorKind::Syntax => "syntax",
            CompileErrorKind::Restricted => "restricted",
            CompileErrorKind::Limit => "limit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error at line {line}, col {col}: {message}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            col,
        }
    }

    pub fn syntax(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::new(CompileErrorKind::Syntax, message, line, col)
    }

    pub fn restricted(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::new(CompileErrorKind::Restricted, message, line, col)
    }

    pub fn limit(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::new(CompileErrorKind::Limit, message, line, col)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::syntax(e.message, e.line, e.col)
    }
}

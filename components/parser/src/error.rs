//! Parser error types and helpers

use core_types::{ErrorKind, SourceError, SourcePosition};

/// Create a syntax error at a given position
pub fn syntax_error(message: impl Into<String>, position: Option<SourcePosition>) -> SourceError {
    SourceError::new(ErrorKind::SyntaxError, message).or_at(position)
}

/// Create an unexpected token error
pub fn unexpected_token(
    expected: &str,
    got: &str,
    position: Option<SourcePosition>,
) -> SourceError {
    syntax_error(format!("Expected {}, got {}", expected, got), position)
}

/// Create an unexpected end of input error
pub fn unexpected_eof(position: Option<SourcePosition>) -> SourceError {
    syntax_error("Unexpected end of input", position)
}

/// Create a type error (incompatible operand or assignment types)
pub fn type_error(message: impl Into<String>, position: Option<SourcePosition>) -> SourceError {
    SourceError::new(ErrorKind::TypeError, message).or_at(position)
}

/// Create a reference error (unresolved variable, type or member)
pub fn reference_error(
    message: impl Into<String>,
    position: Option<SourcePosition>,
) -> SourceError {
    SourceError::new(ErrorKind::ReferenceError, message).or_at(position)
}

/// Create an internal error (generator limits, unsupported constructs)
pub fn internal_error(message: impl Into<String>, position: Option<SourcePosition>) -> SourceError {
    SourceError::new(ErrorKind::InternalError, message).or_at(position)
}

//! Error values produced by the parsing and code generation capabilities.
//!
//! The lexer, parser and code generator all report failures as a
//! [`SourceError`]. Higher layers map these onto their own error taxonomy.

use crate::SourcePosition;
use std::fmt;
use thiserror::Error;

/// The kind of a [`SourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed source text
    SyntaxError,
    /// Operand or assignment types do not agree
    TypeError,
    /// A name, type or member could not be resolved
    ReferenceError,
    /// Internal generator failure (unsupported construct, encoding limits)
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// An error with a kind, a message and an optional source position.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, SourceError, SourcePosition};
///
/// let error = SourceError::new(ErrorKind::SyntaxError, "Expected ';'")
///     .at(SourcePosition::new(1, 9, 8));
///
/// assert_eq!(error.message, "Expected ';'");
/// assert_eq!(error.to_string(), "SyntaxError at 1:9: Expected ';'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}: {message}", fmt_position(.source_position))]
pub struct SourceError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
}

impl SourceError {
    /// Create an error without a position
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source_position: None,
        }
    }

    /// Attach a position, replacing any existing one
    pub fn at(mut self, position: SourcePosition) -> Self {
        self.source_position = Some(position);
        self
    }

    /// Attach a position only if none is recorded yet
    pub fn or_at(mut self, position: Option<SourcePosition>) -> Self {
        if self.source_position.is_none() {
            self.source_position = position;
        }
        self
    }
}

fn fmt_position(position: &Option<SourcePosition>) -> String {
    match position {
        Some(pos) => format!(" at {}", pos),
        None => String::new(),
    }
}

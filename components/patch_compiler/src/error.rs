//! Error taxonomy of a patch session

use core_types::{SourceError, SourcePosition};
use thiserror::Error;

/// Result alias for patch compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Failure of a patch compilation step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The fragment is not syntactically valid
    #[error("parse error: {0}")]
    Parse(SourceError),

    /// A name that already has a slot was allocated again
    #[error("variable '{name}' already occupies slot {slot}")]
    DuplicateDeclaration {
        /// Variable name
        name: String,
        /// Slot already assigned to it
        slot: u16,
    },

    /// No generator could be installed for the target method
    #[error("cannot install code generator: {0}")]
    HookInstallation(String),

    /// The generator rejected a statement
    #[error("cannot compile statement: {0}")]
    Emission(SourceError),

    /// The generated code could not be read back
    #[error("cannot extract bytecode: {0}")]
    Extraction(String),

    /// A local was redeclared with a type of a different storage kind
    #[error(
        "variable '{name}' redeclared as {declared} but slot {slot} holds {existing}{}",
        fmt_position(.position)
    )]
    RedeclarationTypeMismatch {
        /// Variable name
        name: String,
        /// Slot of the first declaration
        slot: u16,
        /// Type of the first declaration
        existing: String,
        /// Type of the redeclaration
        declared: String,
        /// Position of the redeclaration
        position: Option<SourcePosition>,
    },

    /// Method metadata names a local with an unusable descriptor
    #[error("invalid method metadata: {0}")]
    InvalidMetadata(String),

    /// The session failed earlier and must be discarded
    #[error("patch session is unusable after an earlier failure")]
    SessionPoisoned,
}

impl CompileError {
    /// Check if the user can recover by editing the source text
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CompileError::Parse(_)
                | CompileError::Emission(_)
                | CompileError::RedeclarationTypeMismatch { .. }
        )
    }

    /// Source position the error refers to, if any
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            CompileError::Parse(err) | CompileError::Emission(err) => err.source_position,
            CompileError::RedeclarationTypeMismatch { position, .. } => *position,
            _ => None,
        }
    }
}

fn fmt_position(position: &Option<SourcePosition>) -> String {
    match position {
        Some(pos) => format!(" at {}", pos),
        None => String::new(),
    }
}

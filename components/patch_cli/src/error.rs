//! Error types for the CLI

use patch_compiler::CompileError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// File I/O error
    #[error("cannot read '{path}': {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON input
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be serialized
    #[error("cannot write JSON output: {0}")]
    Output(#[from] serde_json::Error),

    /// REPL error
    #[error("REPL error: {0}")]
    Repl(String),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Compile(err) if err.is_recoverable() => 1,
            CliError::Io { .. } | CliError::Json { .. } => 2,
            _ => 3,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

//! jpatch CLI library
//!
//! Provides the Runtime struct and supporting modules for the `jpatch`
//! binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::{load_metadata, load_workspace, FragmentReport, Runtime, SymbolReport};

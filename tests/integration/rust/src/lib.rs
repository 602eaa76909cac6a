//! Integration test suite for the patch compiler
//!
//! This crate provides integration tests that verify components work
//! together correctly across component boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use parser;
    pub use patch_cli;
    pub use patch_compiler;
}

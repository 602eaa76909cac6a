//! Options of a patch session

use serde::{Deserialize, Serialize};

/// Behaviour switches for [`StatementCompiler`](crate::StatementCompiler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchOptions {
    /// Reject a redeclaration whose storage kind differs from the slot's
    /// existing type instead of silently reusing the slot
    pub strict_redeclaration: bool,
}

impl PatchOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `strict_redeclaration`
    pub fn with_strict_redeclaration(mut self, strict: bool) -> Self {
        self.strict_redeclaration = strict;
        self
    }
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            strict_redeclaration: true,
        }
    }
}

//! Reading the generated code back out of a generator

use crate::error::{CompileError, CompileResult};
use crate::hook::{GenerationState, GeneratorHandle};
use tracing::debug;

/// Encodes the pending buffer of a finished generator
#[derive(Debug, Clone, Copy, Default)]
pub struct BytecodeExtractor;

impl BytecodeExtractor {
    /// Encoded `code[]` bytes of the last pass
    ///
    /// A handle that never emitted yields an empty buffer. Extracting from a
    /// pass that is still running or that failed is an error.
    pub fn extract(handle: &GeneratorHandle) -> CompileResult<Vec<u8>> {
        match handle.state() {
            GenerationState::Ready => return Ok(Vec::new()),
            GenerationState::Complete => {}
            state => {
                return Err(CompileError::Extraction(format!(
                    "generator is {}, not complete",
                    state
                )))
            }
        }

        let buffer = handle.backend().pending_buffer();
        let bytes = buffer
            .to_bytes()
            .map_err(|err| CompileError::Extraction(err.to_string()))?;
        debug!(
            instructions = buffer.instruction_count(),
            bytes = bytes.len(),
            "extracted bytecode"
        );
        Ok(bytes)
    }
}

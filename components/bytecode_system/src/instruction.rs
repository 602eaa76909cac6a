//! One entry of a code buffer
//!
//! Instructions remember the statement they were lowered from so that a
//! `LineNumberTable` can be produced for the spliced code.

use crate::opcode::Opcode;
use core_types::SourcePosition;

/// An opcode plus the source position it came from, if known
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: Opcode,
    /// Position of the originating source text
    pub source_position: Option<SourcePosition>,
}

impl Instruction {
    /// Instruction without a source position
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            source_position: None,
        }
    }

    /// Instruction lowered from `position`
    pub fn with_position(opcode: Opcode, position: SourcePosition) -> Self {
        Self {
            opcode,
            source_position: Some(position),
        }
    }

    /// Source line, when known and representable in a `LineNumberTable`
    pub fn line(&self) -> Option<u16> {
        self.source_position
            .and_then(|position| u16::try_from(position.line).ok())
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        self.opcode.encoded_len()
    }
}

//! Bytecode chunk - compiled bytecode container
//!
//! Holds the instruction list for one code fragment together with the
//! constant pool it references, tracks operand stack depth as instructions
//! are emitted, and encodes the result into a JVM `code[]` array.

use crate::constant_pool::ConstPool;
use crate::instruction::Instruction;
use crate::opcode::{InvokeKind, Opcode};
use core_types::SourcePosition;
use std::fmt::Write as _;
use thiserror::Error;

/// Prefix byte widening the next local variable instruction
const WIDE: u8 = 0xc4;

/// Maximum length of a method's code array
const MAX_CODE_LENGTH: usize = 65535;

/// Errors raised while encoding a chunk
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A branch refers to an instruction index outside the chunk
    #[error("instruction {at} jumps to missing instruction {target}")]
    InvalidJumpTarget {
        /// Index of the branch instruction
        at: usize,
        /// Offending target
        target: usize,
    },
    /// A branch offset does not fit in 16 bits
    #[error("instruction {at} branch offset {offset} exceeds 16 bits")]
    BranchOutOfRange {
        /// Index of the branch instruction
        at: usize,
        /// Byte offset that was required
        offset: i64,
    },
    /// The encoded code array exceeds the class file limit
    #[error("code length {0} exceeds 65535 bytes")]
    CodeTooLarge(usize),
}

/// A compiled bytecode chunk containing instructions and constants
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeChunk {
    /// Sequence of bytecode instructions
    pub instructions: Vec<Instruction>,
    /// Constant pool referenced by the instructions
    pub constant_pool: ConstPool,
    /// Operand stack depth after the last emitted instruction
    stack_depth: i32,
    /// Highest stack depth seen
    max_stack: u16,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk with a fresh constant pool
    pub fn new() -> Self {
        Self::with_constant_pool(ConstPool::new())
    }

    /// Create an empty chunk appending to an existing constant pool
    pub fn with_constant_pool(constant_pool: ConstPool) -> Self {
        Self {
            instructions: Vec::new(),
            constant_pool,
            stack_depth: 0,
            max_stack: 0,
        }
    }

    /// Emit an instruction without source position
    pub fn emit(&mut self, opcode: Opcode) {
        self.track_stack(&opcode);
        self.instructions.push(Instruction::new(opcode));
    }

    /// Emit an instruction with source position
    pub fn emit_with_position(&mut self, opcode: Opcode, position: SourcePosition) {
        self.track_stack(&opcode);
        self.instructions
            .push(Instruction::with_position(opcode, position));
    }

    /// Emit an instruction, attaching the position when one is known
    pub fn emit_at(&mut self, opcode: Opcode, position: Option<SourcePosition>) {
        match position {
            Some(position) => self.emit_with_position(opcode, position),
            None => self.emit(opcode),
        }
    }

    fn track_stack(&mut self, opcode: &Opcode) {
        self.stack_depth = (self.stack_depth + opcode.stack_effect()).max(0);
        self.max_stack = self.max_stack.max(self.stack_depth as u16);
    }

    /// Point the branch at instruction `at` to instruction `target`
    ///
    /// Does nothing if `at` is not a branch.
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        if let Some(inst) = self.instructions.get_mut(at) {
            inst.opcode.set_jump_target(target);
        }
    }

    /// Get the number of instructions
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Check if no instruction has been emitted
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Operand stack depth after the last instruction
    pub fn stack_depth(&self) -> i32 {
        self.stack_depth
    }

    /// Reset the tracked depth, e.g. at a branch join point
    pub fn set_stack_depth(&mut self, depth: i32) {
        self.stack_depth = depth.max(0);
        self.max_stack = self.max_stack.max(self.stack_depth as u16);
    }

    /// Maximum operand stack depth reached
    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    /// Clear all instructions and stack tracking; the constant pool is kept
    pub fn clear(&mut self) {
        self.instructions.clear();
        self.stack_depth = 0;
        self.max_stack = 0;
    }

    /// Byte offset of every instruction, plus the total length as last element
    pub fn byte_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.instructions.len() + 1);
        let mut offset = 0;
        for inst in &self.instructions {
            offsets.push(offset);
            offset += inst.encoded_len();
        }
        offsets.push(offset);
        offsets
    }

    /// `(start_pc, line)` pairs for a `LineNumberTable`, one per line change
    pub fn line_numbers(&self) -> Vec<(u16, u16)> {
        let offsets = self.byte_offsets();
        let mut table: Vec<(u16, u16)> = Vec::new();
        for (index, inst) in self.instructions.iter().enumerate() {
            let (Some(line), Ok(pc)) = (inst.line(), u16::try_from(offsets[index])) else {
                continue;
            };
            if table.last().map(|&(_, last)| last) != Some(line) {
                table.push((pc, line));
            }
        }
        table
    }

    /// Encode the instructions as a JVM `code[]` array
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let offsets = self.byte_offsets();
        let total = offsets[offsets.len() - 1];
        if total > MAX_CODE_LENGTH {
            return Err(EncodeError::CodeTooLarge(total));
        }

        let mut bytes = Vec::with_capacity(total);
        for (index, inst) in self.instructions.iter().enumerate() {
            self.encode_instruction(index, &inst.opcode, &offsets, &mut bytes)?;
        }
        Ok(bytes)
    }

    fn encode_instruction(
        &self,
        index: usize,
        opcode: &Opcode,
        offsets: &[usize],
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let byte = opcode.opcode_byte();
        if let Some(target) = opcode.jump_target() {
            let target_offset = *offsets
                .get(target)
                .ok_or(EncodeError::InvalidJumpTarget { at: index, target })?;
            let relative = target_offset as i64 - offsets[index] as i64;
            let relative = i16::try_from(relative).map_err(|_| EncodeError::BranchOutOfRange {
                at: index,
                offset: relative,
            })?;
            out.push(byte);
            out.extend_from_slice(&relative.to_be_bytes());
            return Ok(());
        }

        match opcode {
            Opcode::Bipush(value) => out.extend_from_slice(&[byte, *value as u8]),
            Opcode::Sipush(value) => {
                out.push(byte);
                out.extend_from_slice(&value.to_be_bytes());
            }
            Opcode::Ldc(pool_index) if *pool_index <= u8::MAX as u16 => {
                out.extend_from_slice(&[byte, *pool_index as u8])
            }
            Opcode::Load(_, slot) | Opcode::Store(_, slot) => {
                if slot.0 <= 3 {
                    out.push(byte);
                } else if opcode.is_wide() {
                    out.extend_from_slice(&[WIDE, byte]);
                    out.extend_from_slice(&slot.0.to_be_bytes());
                } else {
                    out.extend_from_slice(&[byte, slot.0 as u8]);
                }
            }
            Opcode::Iinc(slot, delta) => {
                if opcode.is_wide() {
                    out.extend_from_slice(&[WIDE, byte]);
                    out.extend_from_slice(&slot.0.to_be_bytes());
                    out.extend_from_slice(&delta.to_be_bytes());
                } else {
                    out.extend_from_slice(&[byte, slot.0 as u8, *delta as i8 as u8]);
                }
            }
            Opcode::NewArray(atype) => out.extend_from_slice(&[byte, *atype as u8]),
            Opcode::Invoke {
                kind: InvokeKind::Interface,
                index: pool_index,
                arg_slots,
                ..
            } => {
                out.push(byte);
                out.extend_from_slice(&pool_index.to_be_bytes());
                out.extend_from_slice(&[arg_slots + 1, 0]);
            }
            op => match op.pool_index() {
                Some(pool_index) => {
                    out.push(byte);
                    out.extend_from_slice(&pool_index.to_be_bytes());
                }
                None => out.push(byte),
            },
        }
        Ok(())
    }

    /// Render the chunk as `offset: mnemonic operands` lines
    ///
    /// Pool references are followed by a comment naming the referenced entry.
    pub fn disassemble(&self) -> String {
        let offsets = self.byte_offsets();
        let mut text = String::new();
        for (index, inst) in self.instructions.iter().enumerate() {
            let _ = write!(text, "{:>4}: ", offsets[index]);
            match inst.opcode.jump_target() {
                Some(target) => {
                    let target = offsets.get(target).copied().unwrap_or(usize::MAX);
                    let _ = write!(text, "{} {}", inst.opcode.mnemonic(), target);
                }
                None => {
                    let _ = write!(text, "{}", inst.opcode);
                }
            }
            if let Some(pool_index) = inst.opcode.pool_index() {
                let _ = write!(text, "  // {}", self.constant_pool.describe(pool_index));
            }
            text.push('\n');
        }
        text
    }
}

impl Default for BytecodeChunk {
    fn default() -> Self {
        Self::new()
    }
}

//! JVM bytecode model for method-body patches
//!
//! This crate provides the instruction set, a growable code buffer with
//! operand stack tracking, and a constant pool that appends to an existing
//! class's pool.
//!
//! # Features
//!
//! - Typed opcode families with automatic short (`iload_0`) and `wide` forms
//! - Jumps by instruction index, resolved to byte offsets on encoding
//! - Interned constant pool entries numbered after a seeded count
//! - Disassembly for diagnostics
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeChunk, LocalSlot, Opcode};
//! use core_types::StorageKind;
//!
//! let mut chunk = BytecodeChunk::new();
//!
//! // int x = 5; with x in slot 3
//! chunk.emit(Opcode::Iconst(5));
//! chunk.emit(Opcode::Store(StorageKind::Int, LocalSlot(3)));
//!
//! assert_eq!(chunk.to_bytes().unwrap(), vec![0x08, 0x3e]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod constant_pool;
pub mod instruction;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::{BytecodeChunk, EncodeError};
pub use constant_pool::{encode_modified_utf8, ConstPool, Constant, PoolError};
pub use instruction::Instruction;
pub use opcode::{
    ArrayElement, Condition, IntegralKind, InvokeKind, LocalSlot, NumericKind, Opcode,
    PrimitiveArrayType,
};

//! Tests for BytecodeChunk encoding and stack tracking

use bytecode_system::{
    BytecodeChunk, ConstPool, Condition, EncodeError, InvokeKind, LocalSlot, NumericKind, Opcode,
    PrimitiveArrayType,
};
use core_types::{SourcePosition, StorageKind};

#[test]
fn test_chunk_emit_instruction() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::AconstNull);
    assert_eq!(chunk.instructions.len(), 1);
    assert!(matches!(chunk.instructions[0].opcode, Opcode::AconstNull));
}

#[test]
fn test_chunk_emit_with_position() {
    let mut chunk = BytecodeChunk::new();
    let pos = SourcePosition::new(2, 5, 14);
    chunk.emit_with_position(Opcode::Iconst(1), pos);
    chunk.emit_at(Opcode::Pop, None);
    assert_eq!(chunk.instructions[0].source_position, Some(pos));
    assert_eq!(chunk.instructions[1].source_position, None);
}

#[test]
fn test_double_store_uses_dstore_3() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::Dconst(1));
    chunk.emit(Opcode::Store(StorageKind::Double, LocalSlot(3)));
    assert_eq!(chunk.to_bytes(), Ok(vec![0x0f, 0x4a]));
    assert_eq!(chunk.max_stack(), 2);
}

#[test]
fn test_long_arithmetic_stack_depth() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::Load(StorageKind::Long, LocalSlot(4)));
    chunk.emit(Opcode::Lconst(1));
    chunk.emit(Opcode::Add(NumericKind::Long));
    assert_eq!(chunk.max_stack(), 4);
    assert_eq!(chunk.stack_depth(), 2);
    chunk.emit(Opcode::Store(StorageKind::Long, LocalSlot(4)));
    assert_eq!(chunk.to_bytes(), Ok(vec![0x16, 0x04, 0x0a, 0x61, 0x37, 0x04]));
}

#[test]
fn test_set_stack_depth_raises_max() {
    let mut chunk = BytecodeChunk::new();
    chunk.set_stack_depth(3);
    assert_eq!(chunk.max_stack(), 3);
    chunk.set_stack_depth(-1);
    assert_eq!(chunk.stack_depth(), 0);
}

#[test]
fn test_invoke_encoding() {
    let mut pool = ConstPool::new();
    let println = pool
        .add_method_ref("java/io/PrintStream", "println", "(I)V")
        .unwrap();
    let size = pool
        .add_interface_method_ref("java/util/List", "size", "()I")
        .unwrap();
    let mut chunk = BytecodeChunk::with_constant_pool(pool);
    chunk.emit(Opcode::Invoke {
        kind: InvokeKind::Virtual,
        index: println,
        arg_slots: 1,
        return_slots: 0,
    });
    chunk.emit(Opcode::Invoke {
        kind: InvokeKind::Interface,
        index: size,
        arg_slots: 0,
        return_slots: 1,
    });
    let bytes = chunk.to_bytes().unwrap();
    assert_eq!(bytes[0], 0xb6);
    assert_eq!(u16::from_be_bytes([bytes[1], bytes[2]]), println);
    assert_eq!(bytes[3], 0xb9);
    assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), size);
    assert_eq!(&bytes[6..], &[1, 0]);
}

#[test]
fn test_ldc_wide_index() {
    let mut chunk = BytecodeChunk::with_constant_pool(ConstPool::with_reserved(300));
    let index = chunk.constant_pool.add_integer(1_000_000).unwrap();
    chunk.emit(Opcode::Ldc(index));
    assert_eq!(chunk.to_bytes(), Ok(vec![0x13, 0x01, 0x2c]));
}

#[test]
fn test_newarray_encoding() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::Bipush(10));
    chunk.emit(Opcode::NewArray(PrimitiveArrayType::Int));
    assert_eq!(chunk.to_bytes(), Ok(vec![0x10, 0x0a, 0xbc, 0x0a]));
}

#[test]
fn test_branch_to_end_of_chunk() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::Iconst(0));
    chunk.emit(Opcode::If(Condition::Ne, 2));
    assert_eq!(chunk.to_bytes(), Ok(vec![0x03, 0x9a, 0x00, 0x03]));
}

#[test]
fn test_branch_out_of_range() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::Goto(40_001));
    for _ in 0..40_000 {
        chunk.emit(Opcode::Nop);
    }
    assert!(matches!(
        chunk.to_bytes(),
        Err(EncodeError::BranchOutOfRange { at: 0, .. })
    ));
}

#[test]
fn test_code_too_large() {
    let mut chunk = BytecodeChunk::new();
    for _ in 0..70_000 {
        chunk.emit(Opcode::Nop);
    }
    assert_eq!(chunk.to_bytes(), Err(EncodeError::CodeTooLarge(70_000)));
}

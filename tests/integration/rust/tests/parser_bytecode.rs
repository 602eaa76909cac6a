//! Parser to Bytecode Integration Tests
//!
//! Tests the integration between the parser and bytecode_system components:
//! statements are parsed, lowered by the generator and encoded against a
//! constant pool that continues an existing class.

use bytecode_system::{ConstPool, Constant, Opcode};
use parser::{BytecodeGenerator, DetachedResolver, MethodContext, Parser, SymbolTable};

fn generator_with_pool(reserved: u16) -> BytecodeGenerator {
    BytecodeGenerator::with_resolver(
        MethodContext::detached(),
        Box::new(DetachedResolver),
        ConstPool::with_reserved(reserved),
    )
}

fn compile(generator: &mut BytecodeGenerator, source: &str) -> Vec<u8> {
    let mut scope = SymbolTable::new();
    let statements = Parser::new(source)
        .parse(&mut scope)
        .expect("Failed to parse");
    generator
        .generate(&statements, &mut scope)
        .expect("Failed to generate bytecode");
    generator.chunk().to_bytes().expect("Failed to encode")
}

/// Test: String literals are appended after the existing pool entries
#[test]
fn test_string_literal_uses_appended_index() {
    let mut generator = generator_with_pool(30);
    let bytes = compile(&mut generator, "String s = \"hi\";");

    // ldc #31, astore_0
    assert_eq!(bytes, vec![0x12, 31, 0x4b]);
    let pool = generator.constant_pool();
    assert_eq!(pool.get(30), Some(&Constant::Utf8("hi".to_string())));
    assert_eq!(pool.get(31), Some(&Constant::String(30)));
    assert_eq!(pool.count(), 32);
}

/// Test: Long constants take two pool indices
#[test]
fn test_long_constant_takes_two_indices() {
    let mut generator = generator_with_pool(30);
    let bytes = compile(&mut generator, "long big = 123456789012L;");

    // ldc2_w #30, lstore_0
    assert_eq!(bytes, vec![0x14, 0x00, 0x1e, 0x3f]);
    assert_eq!(generator.constant_pool().count(), 32);
    assert_eq!(generator.max_locals(), 2);

    // tag, then the 8 value bytes
    let encoded = generator.constant_pool().encode_since(30);
    assert_eq!(encoded.len(), 9);
    assert_eq!(encoded[0], 5);
}

/// Test: Equal constants are shared
#[test]
fn test_constants_are_deduplicated() {
    let mut generator = generator_with_pool(1);
    compile(&mut generator, "String a = \"x\"; String b = \"x\"; int big = 100000;");

    let entries = generator.constant_pool().entries_since(1);
    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .any(|(_, constant)| **constant == Constant::Integer(100000)));
}

/// Test: Branch offsets are consistent with instruction offsets
#[test]
fn test_branches_land_on_instruction_boundaries() {
    let mut generator = generator_with_pool(1);
    let bytes = compile(
        &mut generator,
        "int sum = 0; for (int i = 0; i < 100; i++) { if (i % 3 == 0) continue; sum += i; }",
    );

    let chunk = generator.chunk();
    let offsets = chunk.byte_offsets();
    assert_eq!(offsets.last().copied(), Some(bytes.len()));
    for (index, inst) in chunk.instructions.iter().enumerate() {
        if let Some(target) = inst.opcode.jump_target() {
            let at = offsets[index] as i64;
            let delta = i16::from_be_bytes([bytes[offsets[index] + 1], bytes[offsets[index] + 2]]);
            assert_eq!(at + i64::from(delta), offsets[target] as i64);
        }
    }
    assert!(chunk
        .instructions
        .iter()
        .any(|inst| matches!(inst.opcode, Opcode::Goto(_))));
}

/// Test: Disassembly names the constants it references
#[test]
fn test_disassembly_resolves_constants() {
    let mut generator = generator_with_pool(10);
    compile(&mut generator, "StringBuilder sb = new StringBuilder(); String s = \"v\" + 1;");

    let text = generator.chunk().disassemble();
    assert!(text.contains("new"));
    assert!(text.contains("java/lang/StringBuilder"));
    assert!(text.contains("invokespecial"));
}

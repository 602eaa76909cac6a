//! End-to-end compilation passes against a seeded allocator

use core_types::TypeDescriptor;
use parser::{Symbol, SymbolTable};
use patch_compiler::{
    ClassInfo, CodeGenerationHook, CompileError, MethodInfo, Resource, StatementCompiler,
    TargetContext, VariableSlot, VariableSlotAllocator, Workspace,
};
use std::sync::Arc;

fn hook() -> CodeGenerationHook {
    let workspace = Arc::new(Workspace::new(Resource::new("app").with_class(
        ClassInfo::new("demo/Job").with_method(MethodInfo::new_static("execute", "()V")),
    )));
    let context = TargetContext::new(workspace, "demo/Job", "execute", "()V");
    let mut hook = CodeGenerationHook::new();
    hook.install(&context).unwrap();
    hook
}

#[test]
fn test_int_local_takes_next_free_slot() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(3);
    let fragment = StatementCompiler::default()
        .compile_statements("int x = 7;", &SymbolTable::new(), &mut allocator, &mut hook)
        .unwrap();

    let x = fragment.introduced_symbols.get("x").unwrap();
    assert_eq!((x.slot_index, x.width), (3, 1));
    assert_eq!(allocator.high_water_mark(), 4);
    assert_eq!(fragment.max_locals, 4);
    // bipush 7, istore_3
    assert_eq!(fragment.bytecode, vec![0x10, 0x07, 0x3e]);
}

#[test]
fn test_double_local_takes_two_slots() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(3);
    let fragment = StatementCompiler::default()
        .compile_statements("double d = 1.0;", &SymbolTable::new(), &mut allocator, &mut hook)
        .unwrap();

    let d = fragment.introduced_symbols.get("d").unwrap();
    assert_eq!((d.slot_index, d.width), (3, 2));
    assert_eq!(allocator.high_water_mark(), 5);
    // dconst_1, dstore_3
    assert_eq!(fragment.bytecode, vec![0x0f, 0x4a]);
}

#[test]
fn test_reference_to_existing_local_adds_nothing() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::seeded(
        2,
        vec![VariableSlot::new("y", 1, TypeDescriptor::Int)],
    )
    .unwrap();
    let mut root = SymbolTable::new();
    root.declare(Symbol::bound("y", TypeDescriptor::Int, bytecode_system::LocalSlot(1)));

    let fragment = StatementCompiler::default()
        .compile_statements("y = y * 3;", &root, &mut allocator, &mut hook)
        .unwrap();

    assert!(fragment.introduced_symbols.is_empty());
    assert_eq!(allocator.high_water_mark(), 2);
    // iload_1 iconst_3 imul istore_1
    assert_eq!(fragment.bytecode, vec![0x1b, 0x06, 0x68, 0x3c]);
}

#[test]
fn test_syntax_error_leaves_allocator_untouched() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(3);
    let err = StatementCompiler::default()
        .compile_statements("int x = ;", &SymbolTable::new(), &mut allocator, &mut hook)
        .unwrap_err();

    assert!(matches!(err, CompileError::Parse(_)));
    assert!(err.is_recoverable());
    assert_eq!(allocator.high_water_mark(), 3);
    assert!(allocator.is_empty());
}

#[test]
fn test_undefined_reference_in_second_statement() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(3);
    let err = StatementCompiler::default()
        .compile_statements(
            "int x = 1;\nint z = nowhere + 1;",
            &SymbolTable::new(),
            &mut allocator,
            &mut hook,
        )
        .unwrap_err();

    match &err {
        CompileError::Emission(source) => {
            assert!(source.message.contains("nowhere"));
            assert_eq!(source.source_position.map(|p| p.line), Some(2));
        }
        other => panic!("expected emission error, got {:?}", other),
    }
    // the first statement's slot stays, the failing one is released
    assert_eq!(allocator.lookup("x").map(|s| s.slot_index), Some(3));
    assert!(allocator.lookup("z").is_none());
    assert!(matches!(
        hook.extract_buffer(),
        Err(CompileError::Extraction(_))
    ));
}

#[test]
fn test_empty_source_is_empty_fragment() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(5);
    let fragment = StatementCompiler::default()
        .compile_statements("  ", &SymbolTable::new(), &mut allocator, &mut hook)
        .unwrap();
    assert!(fragment.is_empty());
    assert!(fragment.introduced_symbols.is_empty());
    assert_eq!(fragment.max_locals, 5);
    assert!(fragment.new_constants().is_empty());
}

#[test]
fn test_nested_declarations_are_placed() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(0);
    let fragment = StatementCompiler::default()
        .compile_statements(
            "int sum = 0; for (int i = 0; i < 10; i++) { long sq = i * i; sum += i; }",
            &SymbolTable::new(),
            &mut allocator,
            &mut hook,
        )
        .unwrap();
    let slots: Vec<(&str, u16)> = fragment
        .introduced_symbols
        .iter()
        .map(|s| (s.name.as_str(), s.slot_index))
        .collect();
    assert_eq!(slots, vec![("sum", 0), ("i", 1), ("sq", 2)]);
    assert_eq!(fragment.max_locals, 4);
    assert!(fragment.max_stack >= 2);
}

#[test]
fn test_line_numbers_follow_source_lines() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(0);
    let fragment = StatementCompiler::default()
        .compile_statements(
            "int a = 1;\nint b = 2;",
            &SymbolTable::new(),
            &mut allocator,
            &mut hook,
        )
        .unwrap();

    // iconst_1 istore_0 | iconst_2 istore_1
    assert_eq!(fragment.bytecode, vec![0x04, 0x3b, 0x05, 0x3c]);
    assert_eq!(fragment.line_numbers, vec![(0, 1), (2, 2)]);
}

#[test]
fn test_oversized_string_literal_is_rejected() {
    let mut hook = hook();
    let mut allocator = VariableSlotAllocator::new(0);
    let source = format!("int n = 1;\nString s = \"{}\";", "a".repeat(70_000));
    let err = StatementCompiler::default()
        .compile_statements(&source, &SymbolTable::new(), &mut allocator, &mut hook)
        .unwrap_err();

    match err {
        CompileError::Emission(source) => {
            assert!(source.message.contains("constant string too long"));
            assert_eq!(source.source_position.map(|p| p.line), Some(2));
        }
        other => panic!("expected emission error, got {:?}", other),
    }
    assert!(allocator.lookup("s").is_none());
}

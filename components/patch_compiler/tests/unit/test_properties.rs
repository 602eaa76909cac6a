//! Slot allocation invariants across passes and sessions

use core_types::{MethodDescriptor, TypeDescriptor};
use parser::SymbolTable;
use patch_compiler::{
    ClassInfo, CodeGenerationHook, CompileError, LocalVariable, MethodInfo, MethodMetadata,
    PatchOptions, PatchSession, Resource, StatementCompiler, TargetContext,
    VariableSlotAllocator, Workspace,
};
use std::sync::Arc;

fn context() -> TargetContext {
    let workspace = Arc::new(Workspace::new(Resource::new("app").with_class(
        ClassInfo::new("demo/Task").with_method(MethodInfo::new("step", "(J)V")),
    )));
    TargetContext::new(workspace, "demo/Task", "step", "(J)V")
}

fn session() -> PatchSession {
    PatchSession::open_target(context(), PatchOptions::default()).unwrap()
}

#[test]
fn test_slots_are_monotonic_and_disjoint() {
    let mut allocator = VariableSlotAllocator::new(1);
    let types = [
        TypeDescriptor::Int,
        TypeDescriptor::Long,
        TypeDescriptor::Boolean,
        TypeDescriptor::Double,
        TypeDescriptor::string(),
        TypeDescriptor::Float,
    ];
    let slots: Vec<_> = types
        .iter()
        .enumerate()
        .map(|(i, ty)| allocator.allocate(&format!("v{}", i), ty.clone()).unwrap())
        .collect();

    for pair in slots.windows(2) {
        assert!(pair[0].slot_index < pair[1].slot_index);
        assert!(!pair[0].overlaps(&pair[1]));
        assert_eq!(pair[0].end(), u32::from(pair[1].slot_index));
    }
    let widths: Vec<u16> = slots.iter().map(|s| s.width).collect();
    assert_eq!(widths, vec![1, 2, 1, 2, 1, 1]);
}

#[test]
fn test_same_seed_same_assignment() {
    let source = "long a = arg0; String s = \"x\" + a; int n = s.length();";
    let first = session().compile(source).unwrap();
    let second = session().compile(source).unwrap();
    assert_eq!(first.introduced_symbols, second.introduced_symbols);
    assert_eq!(first.bytecode, second.bytecode);
    assert_eq!(first.introduced_symbols.names(), vec!["a", "s", "n"]);
}

#[test]
fn test_redeclaration_reuses_slot() {
    let mut session = session();
    session.compile("int count = 1;").unwrap();
    let before = session.allocator().high_water_mark();

    let again = session.compile("int count = 2;").unwrap();
    assert!(again.introduced_symbols.is_empty());
    assert_eq!(session.allocator().high_water_mark(), before);
    // iconst_2 istore_3
    assert_eq!(again.bytecode, vec![0x05, 0x3e]);
}

#[test]
fn test_redeclaration_with_other_storage_kind() {
    let mut strict = session();
    strict.compile("int count = 1;").unwrap();
    let err = strict.compile("long count = 5;").unwrap_err();
    match &err {
        CompileError::RedeclarationTypeMismatch {
            name,
            slot,
            existing,
            declared,
            ..
        } => {
            assert_eq!(name, "count");
            assert_eq!(*slot, 3);
            assert_eq!(existing, "int");
            assert_eq!(declared, "long");
        }
        other => panic!("expected redeclaration mismatch, got {:?}", other),
    }
    assert!(err.is_recoverable());

    let options = PatchOptions::default().with_strict_redeclaration(false);
    let mut lenient = PatchSession::open_target(context(), options).unwrap();
    lenient.compile("int count = 1;").unwrap();
    let fragment = lenient.compile("long count = 5;").unwrap();
    // the variable keeps its int slot
    assert_eq!(fragment.bytecode, vec![0x08, 0x3e]);
}

#[test]
fn test_same_storage_kind_redeclaration_is_accepted() {
    let mut session = session();
    session.compile("int flags = 1;").unwrap();
    assert!(session.compile("short flags = 2;").is_ok());
}

#[test]
fn test_failed_statement_commits_nothing_after_it() {
    let mut hook = CodeGenerationHook::new();
    hook.install(&context()).unwrap();
    let mut allocator = MethodMetadata::from_descriptor("demo/Task", false, &MethodDescriptor::parse("(J)V").unwrap())
        .allocator()
        .unwrap();

    let result = StatementCompiler::default().compile_statements(
        "int a = 1; int b = 2; int c = missing(); int d = 4; int e = 5;",
        &SymbolTable::new(),
        &mut allocator,
        &mut hook,
    );
    assert!(matches!(result, Err(CompileError::Emission(_))));
    let names: Vec<&str> = allocator.allocated().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(allocator.high_water_mark(), 5);
}

#[test]
fn test_snapshot_excludes_existing_locals() {
    let metadata = MethodMetadata::new(
        4,
        vec![
            LocalVariable::new("this", 0, "Ldemo/Task;"),
            LocalVariable::new("arg0", 1, "J"),
            LocalVariable::new("label", 3, "Ljava/lang/String;"),
        ],
    );
    let mut session = PatchSession::open(context(), metadata, PatchOptions::default()).unwrap();
    let fragment = session
        .compile("String label = \"done\"; int size = label.length();")
        .unwrap();
    assert_eq!(fragment.introduced_symbols.names(), vec!["size"]);
    assert_eq!(fragment.introduced_symbols.get("size").map(|s| s.slot_index), Some(4));
}

#[test]
fn test_sibling_blocks_share_one_name_map() {
    let mut session = session();
    let err = session
        .compile("{ String s = \"a\"; } { int s = 1; }")
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::RedeclarationTypeMismatch { ref name, .. } if name == "s"
    ));
}

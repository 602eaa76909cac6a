//! Host symbol resolution through an installed generator

use patch_compiler::{
    ClassInfo, CompileError, FieldInfo, LocalVariable, MethodInfo, PatchOptions, PatchSession,
    Resource, TargetContext, Workspace,
};
use std::sync::Arc;

const POOL_COUNT: u16 = 40;

fn workspace() -> Arc<Workspace> {
    let counter = ClassInfo::new("demo/Counter")
        .with_constant_pool_count(POOL_COUNT)
        .with_field(FieldInfo::new("hits", "I"))
        .with_field(FieldInfo::new_static("LIMIT", "I"))
        .with_method(MethodInfo::new("tick", "(I)V").with_locals(
            3,
            vec![
                LocalVariable::new("this", 0, "Ldemo/Counter;"),
                LocalVariable::new("amount", 1, "I"),
                LocalVariable::new("scratch", 2, "Ljava/lang/Object;"),
            ],
        ))
        .with_method(MethodInfo::new("reset", "()V"))
        .with_method(MethodInfo::new_static("create", "()Ldemo/Counter;"));
    Arc::new(Workspace::new(Resource::new("app.jar").with_class(counter)))
}

fn session() -> PatchSession {
    let context = TargetContext::new(workspace(), "demo/Counter", "tick", "(I)V");
    PatchSession::open_target(context, PatchOptions::default()).unwrap()
}

#[test]
fn test_local_variable_table_names() {
    let mut session = session();
    let fragment = session.compile("int twice = amount * 2;").unwrap();
    assert_eq!(fragment.introduced_symbols.get("twice").map(|s| s.slot_index), Some(3));
    assert_eq!(fragment.max_locals, 4);
}

#[test]
fn test_println_uses_new_constants() {
    let mut session = session();
    let fragment = session.compile("System.out.println(amount);").unwrap();
    let bytes = &fragment.bytecode;
    assert_eq!(bytes.len(), 7);
    // getstatic, iload_1, invokevirtual
    assert_eq!(bytes[0], 0xb2);
    assert_eq!(bytes[3], 0x1b);
    assert_eq!(bytes[4], 0xb6);

    let field_index = u16::from_be_bytes([bytes[1], bytes[2]]);
    assert!(field_index >= POOL_COUNT);
    let constants = fragment.new_constants();
    assert!(!constants.is_empty());
    assert!(constants.iter().all(|(index, _)| *index >= POOL_COUNT));
}

#[test]
fn test_instance_field_and_static_field() {
    let mut session = session();
    let fragment = session.compile("hits = hits + LIMIT;").unwrap();
    // aload_0 aload_0 getfield iadd after getstatic, putfield
    assert_eq!(fragment.bytecode[0], 0x2a);
    assert!(fragment.bytecode.contains(&0xb4));
    assert!(fragment.bytecode.contains(&0xb2));
    assert_eq!(fragment.bytecode[fragment.bytecode.len() - 3], 0xb5);
}

#[test]
fn test_method_calls_on_this_class() {
    let mut session = session();
    let fragment = session
        .compile("reset(); Counter other = Counter.create(); other.tick(amount);")
        .unwrap();
    assert!(fragment.introduced_symbols.contains("other"));
    assert_eq!(
        fragment.introduced_symbols.get("other").map(|s| s.type_descriptor.descriptor()),
        Some("Ldemo/Counter;".to_string())
    );
    // invokevirtual reset, invokestatic create
    assert_eq!(&fragment.bytecode[..2], &[0x2a, 0xb6]);
    assert!(fragment.bytecode.contains(&0xb8));
}

#[test]
fn test_unknown_member_is_emission_error() {
    let mut session = session();
    let err = session.compile("hits = missingField;").unwrap_err();
    assert!(matches!(err, CompileError::Emission(_)));
    assert!(err.to_string().contains("missingField"));
}

#[test]
fn test_unknown_class_fails_install() {
    let context = TargetContext::new(workspace(), "demo/Absent", "run", "()V");
    let err = PatchSession::open_target(context, PatchOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::HookInstallation(_)));
}

#[test]
fn test_workspace_from_json_session() {
    let workspace = Workspace::from_json(
        r#"{
            "primary": {
                "name": "service.jar",
                "classes": [{
                    "name": "svc/Handler",
                    "constant_pool_count": 12,
                    "methods": [{
                        "name": "handle",
                        "descriptor": "(Ljava/lang/String;)V",
                        "is_static": true
                    }]
                }]
            }
        }"#,
    )
    .unwrap();
    let context = TargetContext::parse_method(Arc::new(workspace), "svc.Handler", "handle(Ljava/lang/String;)V")
        .unwrap();
    let mut session = PatchSession::open_target(context, PatchOptions::default()).unwrap();
    let fragment = session.compile("int len = arg0.length();").unwrap();
    // aload_0, invokevirtual, istore_1
    assert_eq!(fragment.bytecode[0], 0x2a);
    assert_eq!(fragment.bytecode[1], 0xb6);
    assert_eq!(fragment.bytecode[4], 0x3c);
}

//! Full Pipeline Integration Tests
//!
//! Tests the complete flow: workspace -> session -> parser -> slot placement
//! -> generator -> extracted bytecode, across several passes of one edit.

use patch_compiler::{
    ClassInfo, CompileError, FieldInfo, LocalVariable, MethodInfo, MethodMetadata, PatchOptions,
    PatchSession, Resource, TargetContext, Workspace,
};
use std::sync::Arc;

fn workspace() -> Arc<Workspace> {
    let account = ClassInfo::new("bank/Account")
        .with_constant_pool_count(64)
        .with_field(FieldInfo::new("balance", "J"))
        .with_field(FieldInfo::new("owner", "Ljava/lang/String;"))
        .with_method(
            MethodInfo::new("deposit", "(J)V").with_locals(
                3,
                vec![
                    LocalVariable::new("this", 0, "Lbank/Account;"),
                    LocalVariable::new("amount", 1, "J"),
                ],
            ),
        )
        .with_method(MethodInfo::new("audit", "(Ljava/lang/String;)Z").private())
        .with_method(MethodInfo::new_static("fee", "(J)J"));
    let ledger = ClassInfo::new("bank/util/Ledger")
        .with_method(MethodInfo::new_static("record", "(Ljava/lang/String;J)V"));
    Arc::new(
        Workspace::new(Resource::new("bank.jar").with_class(account))
            .with_library(Resource::new("ledger.jar").with_class(ledger)),
    )
}

fn deposit_session() -> PatchSession {
    let context = TargetContext::new(workspace(), "bank/Account", "deposit", "(J)V");
    PatchSession::open_target(context, PatchOptions::default()).unwrap()
}

/// Test: locals of the method are visible, new ones go after them
#[test]
fn test_full_pipeline_uses_local_variable_table() {
    let mut session = deposit_session();
    let fragment = session.compile("long net = amount - fee(amount);").unwrap();

    let net = fragment.introduced_symbols.get("net").unwrap();
    assert_eq!((net.slot_index, net.width), (3, 2));
    assert_eq!(fragment.max_locals, 5);
    // lload_1 lload_1 invokestatic lsub lstore_3
    assert_eq!(&fragment.bytecode[..3], &[0x1f, 0x1f, 0xb8]);
    assert_eq!(&fragment.bytecode[5..], &[0x65, 0x42]);
}

/// Test: fields, private calls and library classes resolve
#[test]
fn test_full_pipeline_host_members() {
    let mut session = deposit_session();
    let fragment = session
        .compile(
            "if (audit(owner)) { balance += amount; bank.util.Ledger.record(owner, balance); }",
        )
        .unwrap();

    // private methods are called with invokespecial
    assert!(fragment.bytecode.contains(&0xb7));
    assert!(fragment.bytecode.contains(&0xb8));
    assert!(fragment
        .new_constants()
        .iter()
        .all(|(index, _)| *index >= 64));
}

/// Test: throwing a runtime exception
#[test]
fn test_full_pipeline_throw() {
    let mut session = deposit_session();
    let fragment = session
        .compile("if (amount < 0L) throw new IllegalArgumentException(\"negative\");")
        .unwrap();
    assert_eq!(fragment.bytecode.last(), Some(&0xbf));
    assert!(fragment.max_stack >= 3);
}

/// Test: passes build on each other and report only their own locals
#[test]
fn test_full_pipeline_multiple_passes() {
    let mut session = deposit_session();
    let first = session.compile("int count = 0;").unwrap();
    let second = session
        .compile("String label = owner + \":\" + count; count++;")
        .unwrap();
    let third = session.compile("count = label.length();").unwrap();

    assert_eq!(first.introduced_symbols.names(), vec!["count"]);
    assert_eq!(second.introduced_symbols.names(), vec!["label"]);
    assert!(third.introduced_symbols.is_empty());
    assert_eq!(second.introduced_symbols.get("label").map(|s| s.slot_index), Some(4));
    assert_eq!(third.max_locals, 5);

    let committed = session.committed_metadata();
    let names: Vec<&str> = committed.locals.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["this", "amount", "count", "label"]);
}

/// Test: a rejected pass leaves the seed usable for a new session
#[test]
fn test_full_pipeline_failure_and_retry() {
    let mut session = deposit_session();
    session.compile("int ok = 1;").unwrap();
    let err = session.compile("int bad = owner;").unwrap_err();
    assert!(matches!(err, CompileError::Emission(_)));
    assert!(err.to_string().contains("incompatible types"));
    assert!(session.is_poisoned());

    let mut retry = session.reopen().unwrap();
    let fragment = retry.compile("int good = owner.length();").unwrap();
    // the seed does not know `ok`, so `good` starts at the first free slot
    assert_eq!(fragment.introduced_symbols.get("good").map(|s| s.slot_index), Some(3));
}

/// Test: explicit metadata overrides the workspace's table
#[test]
fn test_full_pipeline_explicit_metadata() {
    let context = TargetContext::new(workspace(), "bank/Account", "deposit", "(J)V");
    let metadata = MethodMetadata::new(
        6,
        vec![
            LocalVariable::new("this", 0, "Lbank/Account;"),
            LocalVariable::new("amount", 1, "J"),
            LocalVariable::new("rate", 3, "D"),
            LocalVariable::new("flag", 5, "Z"),
        ],
    );
    let mut session = PatchSession::open(context, metadata, PatchOptions::default()).unwrap();
    let fragment = session
        .compile("double interest = amount * rate; if (flag) interest = 0.0;")
        .unwrap();
    assert_eq!(fragment.introduced_symbols.get("interest").map(|s| s.slot_index), Some(6));
    assert_eq!(fragment.max_locals, 8);
}

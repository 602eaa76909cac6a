//! Tests for Opcode encoding metadata

use bytecode_system::{ArrayElement, Condition, InvokeKind, LocalSlot, NumericKind, Opcode};
use core_types::StorageKind;

#[test]
fn test_all_short_load_forms() {
    let kinds = [
        (StorageKind::Int, 0x1a),
        (StorageKind::Long, 0x1e),
        (StorageKind::Float, 0x22),
        (StorageKind::Double, 0x26),
        (StorageKind::Reference, 0x2a),
    ];
    for (kind, base) in kinds {
        for slot in 0..4u16 {
            let op = Opcode::Load(kind, LocalSlot(slot));
            assert_eq!(op.opcode_byte(), base + slot as u8);
            assert_eq!(op.encoded_len(), 1);
        }
    }
}

#[test]
fn test_long_form_local() {
    let op = Opcode::Store(StorageKind::Reference, LocalSlot(4));
    assert_eq!(op.opcode_byte(), 0x3a);
    assert_eq!(op.encoded_len(), 2);
    assert_eq!(op.mnemonic(), "astore");
    assert_eq!(op.to_string(), "astore 4");
}

#[test]
fn test_array_opcodes() {
    assert_eq!(Opcode::ArrayLoad(ArrayElement::Int).opcode_byte(), 0x2e);
    assert_eq!(Opcode::ArrayStore(ArrayElement::Char).opcode_byte(), 0x55);
    assert_eq!(Opcode::ArrayLoad(ArrayElement::Double).stack_effect(), 0);
    assert_eq!(Opcode::ArrayStore(ArrayElement::Long).stack_effect(), -4);
}

#[test]
fn test_conversion_opcodes() {
    assert_eq!(
        Opcode::Convert(NumericKind::Int, NumericKind::Long).opcode_byte(),
        0x85
    );
    assert_eq!(
        Opcode::Convert(NumericKind::Double, NumericKind::Float).opcode_byte(),
        0x90
    );
    assert_eq!(
        Opcode::Convert(NumericKind::Long, NumericKind::Int).stack_effect(),
        -1
    );
}

#[test]
fn test_branch_bytes() {
    assert_eq!(Opcode::If(Condition::Le, 0).opcode_byte(), 0x9e);
    assert_eq!(Opcode::IfIcmp(Condition::Eq, 0).opcode_byte(), 0x9f);
    assert_eq!(Opcode::IfNonNull(0).opcode_byte(), 0xc7);
    assert_eq!(Opcode::Goto(0).encoded_len(), 3);
}

#[test]
fn test_set_jump_target() {
    let mut op = Opcode::IfAcmpNe(0);
    assert!(op.set_jump_target(9));
    assert_eq!(op.jump_target(), Some(9));

    let mut not_a_branch = Opcode::Pop;
    assert!(!not_a_branch.set_jump_target(9));
}

#[test]
fn test_return_and_field_effects() {
    assert_eq!(Opcode::Return(Some(StorageKind::Double)).opcode_byte(), 0xaf);
    assert_eq!(Opcode::Return(None).opcode_byte(), 0xb1);
    assert_eq!(Opcode::GetField { index: 1, width: 2 }.stack_effect(), 1);
    assert_eq!(Opcode::PutStatic { index: 1, width: 1 }.stack_effect(), -1);
    let ctor = Opcode::Invoke {
        kind: InvokeKind::Special,
        index: 1,
        arg_slots: 0,
        return_slots: 0,
    };
    assert_eq!(ctor.stack_effect(), -1);
    assert_eq!(ctor.mnemonic(), "invokespecial");
}

//! Unit tests for TypeDescriptor and MethodDescriptor

use core_types::{MethodDescriptor, StorageKind, TypeDescriptor};

#[test]
fn test_storage_kinds() {
    assert_eq!(TypeDescriptor::Boolean.storage_kind(), StorageKind::Int);
    assert_eq!(TypeDescriptor::Char.storage_kind(), StorageKind::Int);
    assert_eq!(TypeDescriptor::Long.storage_kind(), StorageKind::Long);
    assert_eq!(TypeDescriptor::Float.storage_kind(), StorageKind::Float);
    assert_eq!(TypeDescriptor::Double.storage_kind(), StorageKind::Double);
    assert_eq!(
        TypeDescriptor::parse("[J").unwrap().storage_kind(),
        StorageKind::Reference
    );
}

#[test]
fn test_only_long_and_double_are_wide() {
    let wide: Vec<_> = ["Z", "B", "C", "S", "I", "J", "F", "D", "Ljava/lang/Object;", "[D"]
        .iter()
        .map(|d| TypeDescriptor::parse(d).unwrap())
        .filter(|t| t.is_wide())
        .collect();
    assert_eq!(wide, vec![TypeDescriptor::Long, TypeDescriptor::Double]);
}

#[test]
fn test_display_names() {
    assert_eq!(TypeDescriptor::Int.display_name(), "int");
    assert_eq!(TypeDescriptor::Double.display_name(), "double");
    assert_eq!(
        TypeDescriptor::parse("[Ljava/util/List;").unwrap().display_name(),
        "java.util.List[]"
    );
}

#[test]
fn test_numeric_and_integral() {
    assert!(TypeDescriptor::Char.is_numeric());
    assert!(!TypeDescriptor::Boolean.is_numeric());
    assert!(TypeDescriptor::Long.is_integral());
    assert!(!TypeDescriptor::Float.is_integral());
    assert!(TypeDescriptor::string().is_string());
}

#[test]
fn test_method_descriptor_void_and_params() {
    let desc = MethodDescriptor::parse("(JD)V").unwrap();
    assert_eq!(desc.params, vec![TypeDescriptor::Long, TypeDescriptor::Double]);
    assert_eq!(desc.param_slots(), 4);
    assert_eq!(desc.return_slots(), 0);
    assert_eq!(desc.to_string(), "(JD)V");
}

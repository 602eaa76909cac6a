//! Tests for ConstPool

use bytecode_system::{ConstPool, Constant};

#[test]
fn test_class_entry_shares_utf8() {
    let mut pool = ConstPool::new();
    let class = pool.add_class("java/lang/String").unwrap();
    let text = pool.add_utf8("java/lang/String").unwrap();
    assert_eq!(text, 1);
    assert_eq!(class, 2);
    assert_eq!(pool.get(class), Some(&Constant::Class(1)));
}

#[test]
fn test_field_ref_layout() {
    let mut pool = ConstPool::with_reserved(20);
    let field = pool
        .add_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")
        .unwrap();
    // Utf8 owner, Class, Utf8 name, Utf8 descriptor, NameAndType, Fieldref
    assert_eq!(field, 25);
    assert_eq!(pool.len(), 6);
    assert_eq!(
        pool.describe(field),
        "java/lang/System.out:Ljava/io/PrintStream;"
    );
}

#[test]
fn test_float_and_double_interning_by_bits() {
    let mut pool = ConstPool::new();
    let a = pool.add_float(1.5).unwrap();
    let b = pool.add_float(1.5).unwrap();
    let c = pool.add_double(1.5).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_encode_integer_and_long() {
    let mut pool = ConstPool::new();
    pool.add_integer(0x0102_0304).unwrap();
    pool.add_long(1).unwrap();
    let bytes = pool.encode_since(1);
    assert_eq!(&bytes[..5], &[3, 1, 2, 3, 4]);
    assert_eq!(&bytes[5..], &[5, 0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn test_reserved_indices_describe_as_numbers() {
    let pool = ConstPool::with_reserved(12);
    assert_eq!(pool.describe(4), "#4");
    assert!(pool.is_empty());
    assert_eq!(pool.reserved(), 12);
}

//! Unit tests for SourcePosition

use core_types::SourcePosition;

#[test]
fn test_source_position_fields() {
    let pos = SourcePosition::new(2, 7, 19);
    assert_eq!(pos.line, 2);
    assert_eq!(pos.column, 7);
    assert_eq!(pos.offset, 19);
}

#[test]
fn test_source_position_equality() {
    assert_eq!(SourcePosition::new(1, 1, 0), SourcePosition::new(1, 1, 0));
    assert_ne!(SourcePosition::new(1, 1, 0), SourcePosition::new(1, 2, 1));
}

#[test]
fn test_source_position_default_is_origin_offset() {
    let pos = SourcePosition::default();
    assert_eq!(pos.offset, 0);
}

//! Unit tests for SourceError and ErrorKind

use core_types::{ErrorKind, SourceError, SourcePosition};

#[test]
fn test_error_kinds_are_distinct() {
    assert_ne!(ErrorKind::SyntaxError, ErrorKind::TypeError);
    assert_ne!(ErrorKind::ReferenceError, ErrorKind::InternalError);
}

#[test]
fn test_source_error_display_with_position() {
    let error = SourceError::new(ErrorKind::TypeError, "incompatible types: String cannot be converted to int")
        .at(SourcePosition::new(4, 2, 30));
    assert_eq!(
        error.to_string(),
        "TypeError at 4:2: incompatible types: String cannot be converted to int"
    );
}

#[test]
fn test_source_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    let error = SourceError::new(ErrorKind::SyntaxError, "Unexpected end of input");
    takes_error(&error);
}

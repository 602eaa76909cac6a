//! Core types shared by the patch compilation components.
//!
//! This crate provides the foundational vocabulary used across the workspace:
//! source locations, the error value produced by parsing and code generation,
//! and the JVM type descriptors that drive local-slot widths and opcode
//! selection.
//!
//! # Overview
//!
//! - [`TypeDescriptor`] - JVM field descriptor (`I`, `J`, `Ljava/lang/String;`, `[D`, ...)
//! - [`MethodDescriptor`] - JVM method descriptor (`(IJ)V`, ...)
//! - [`StorageKind`] - Local/operand storage category of a type
//! - [`SourceError`] - Error raised while parsing or generating code
//! - [`ErrorKind`] - Category of a [`SourceError`]
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::{TypeDescriptor, SourceError, ErrorKind};
//!
//! let long = TypeDescriptor::parse("J").unwrap();
//! assert_eq!(long.width(), 2);
//! assert_eq!(long.display_name(), "long");
//!
//! let error = SourceError::new(ErrorKind::ReferenceError, "cannot resolve symbol 'x'");
//! assert_eq!(error.kind, ErrorKind::ReferenceError);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod descriptor;
mod error;
mod source;

pub use descriptor::{DescriptorError, MethodDescriptor, StorageKind, TypeDescriptor};
pub use error::{ErrorKind, SourceError};
pub use source::SourcePosition;

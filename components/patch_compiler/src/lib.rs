//! Patch compiler - compiles Java statement fragments for a live method edit
//!
//! A [`PatchSession`] ties together the pieces of one method edit:
//! - [`VariableSlotAllocator`]: monotonic local slot assignment, seeded
//!   with the locals the method already has
//! - [`CodeGenerationHook`]: installs a generator that resolves fields,
//!   methods and classes of the [`Workspace`]
//! - [`StatementCompiler`]: parses a fragment, places its locals and emits it
//! - [`BytecodeExtractor`]: reads the finished `code[]` bytes back out
//!
//! # Example
//!
//! ```
//! use patch_compiler::{
//!     ClassInfo, MethodInfo, PatchOptions, PatchSession, Resource, TargetContext, Workspace,
//! };
//! use std::sync::Arc;
//!
//! let workspace = Arc::new(Workspace::new(
//!     Resource::new("app.jar")
//!         .with_class(ClassInfo::new("demo/Calc").with_method(MethodInfo::new("run", "(I)V"))),
//! ));
//! let context = TargetContext::new(workspace, "demo/Calc", "run", "(I)V");
//! let mut session = PatchSession::open_target(context, PatchOptions::default()).unwrap();
//!
//! let fragment = session.compile("int x = arg0 * 2;").unwrap();
//! // iload_1 iconst_2 imul istore_2
//! assert_eq!(fragment.bytecode, vec![0x1b, 0x05, 0x68, 0x3d]);
//! assert_eq!(fragment.introduced_symbols.get("x").map(|s| s.slot_index), Some(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod compiler;
pub mod error;
pub mod extractor;
pub mod fragment;
pub mod hook;
mod jdk;
pub mod metadata;
pub mod options;
pub mod session;
pub mod workspace;

pub use allocator::{AllocatorCheckpoint, VariableSlot, VariableSlotAllocator};
pub use compiler::StatementCompiler;
pub use error::{CompileError, CompileResult};
pub use extractor::BytecodeExtractor;
pub use fragment::{CompiledFragment, SymbolSnapshot};
pub use hook::{CodeGenerationHook, GenerationBackend, GenerationState, GeneratorHandle};
pub use metadata::{LocalVariable, MethodMetadata};
pub use options::PatchOptions;
pub use session::PatchSession;
pub use workspace::{
    ClassInfo, FieldInfo, MethodInfo, Resource, TargetContext, Workspace, WorkspaceResolver,
};

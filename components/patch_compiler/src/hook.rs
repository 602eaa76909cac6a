//! Installation of the code generator for a target method
//!
//! The hook owns one generator at a time. Installing for the target it
//! already serves is a no-op; installing for another target drops the old
//! generator first.

use crate::error::{CompileError, CompileResult};
use crate::extractor::BytecodeExtractor;
use crate::workspace::{TargetContext, WorkspaceResolver};
use bytecode_system::{BytecodeChunk, ConstPool};
use core_types::{SourceError, TypeDescriptor};
use parser::{BytecodeGenerator, Statement, SymbolTable, TypeRef};
use std::fmt;
use tracing::{debug, info};

/// Statement lowering used by a [`GeneratorHandle`]
pub trait GenerationBackend: fmt::Debug {
    /// Lower one statement into the pending buffer
    fn emit(&mut self, statement: &Statement, scope: &mut SymbolTable<'_>)
        -> Result<(), SourceError>;

    /// Resolve a declared type
    fn resolve_type(&self, type_ref: &TypeRef) -> Result<TypeDescriptor, SourceError>;

    /// Instructions emitted since the last reset
    fn pending_buffer(&self) -> &BytecodeChunk;

    /// Locals needed by the emitted code
    fn max_locals(&self) -> u16;

    /// Operand stack depth needed by the emitted code
    fn max_stack(&self) -> u16;

    /// Raise the local count to at least `count`
    fn reserve_locals(&mut self, count: u16);

    /// Constant pool including appended entries
    fn constant_pool(&self) -> &ConstPool;

    /// Drop the pending buffer
    fn reset(&mut self);
}

impl GenerationBackend for BytecodeGenerator {
    fn emit(
        &mut self,
        statement: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        BytecodeGenerator::emit(self, statement, scope)
    }

    fn resolve_type(&self, type_ref: &TypeRef) -> Result<TypeDescriptor, SourceError> {
        BytecodeGenerator::resolve_type(self, type_ref)
    }

    fn pending_buffer(&self) -> &BytecodeChunk {
        self.chunk()
    }

    fn max_locals(&self) -> u16 {
        BytecodeGenerator::max_locals(self)
    }

    fn max_stack(&self) -> u16 {
        BytecodeGenerator::max_stack(self)
    }

    fn reserve_locals(&mut self, count: u16) {
        BytecodeGenerator::reserve_locals(self, count)
    }

    fn constant_pool(&self) -> &ConstPool {
        BytecodeGenerator::constant_pool(self)
    }

    fn reset(&mut self) {
        BytecodeGenerator::reset(self)
    }
}

/// Progress of a generator through one compilation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Nothing emitted since installation
    Ready,
    /// A pass is in progress
    Emitting,
    /// The last pass emitted every statement
    Complete,
    /// The last pass stopped on an error
    Failed,
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationState::Ready => "ready",
            GenerationState::Emitting => "emitting",
            GenerationState::Complete => "complete",
            GenerationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A generator together with the state of its current pass
#[derive(Debug)]
pub struct GeneratorHandle {
    backend: Box<dyn GenerationBackend>,
    state: GenerationState,
    emitted: usize,
}

impl GeneratorHandle {
    /// Wrap a backend
    pub fn new(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            state: GenerationState::Ready,
            emitted: 0,
        }
    }

    /// Start a pass with an empty buffer
    pub fn begin(&mut self) {
        self.backend.reset();
        self.state = GenerationState::Emitting;
        self.emitted = 0;
    }

    /// Emit one statement of the current pass
    pub fn emit(
        &mut self,
        statement: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        if self.state != GenerationState::Emitting {
            self.begin();
        }
        match self.backend.emit(statement, scope) {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(err) => {
                self.state = GenerationState::Failed;
                Err(err)
            }
        }
    }

    /// Mark the current pass as fully emitted
    pub fn finish(&mut self) {
        if self.state == GenerationState::Emitting {
            self.state = GenerationState::Complete;
        }
    }

    /// Mark the current pass as abandoned
    pub fn fail(&mut self) {
        self.state = GenerationState::Failed;
    }

    /// Current state
    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// The backend
    pub fn backend(&self) -> &dyn GenerationBackend {
        self.backend.as_ref()
    }

    /// Resolve a declared type through the backend
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<TypeDescriptor, SourceError> {
        self.backend.resolve_type(type_ref)
    }

    /// Raise the backend's local count
    pub fn reserve_locals(&mut self, count: u16) {
        self.backend.reserve_locals(count);
    }

    /// Statements emitted in the current pass
    pub fn statements_emitted(&self) -> usize {
        self.emitted
    }
}

#[derive(Debug)]
struct InstalledGenerator {
    target: TargetContext,
    handle: GeneratorHandle,
}

/// Installs and hands out the generator of a patch session
#[derive(Debug, Default)]
pub struct CodeGenerationHook {
    installed: Option<InstalledGenerator>,
}

impl CodeGenerationHook {
    /// Create a hook with nothing installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a workspace-aware generator for `context`
    ///
    /// Reinstalling for the same target keeps the existing generator.
    pub fn install(&mut self, context: &TargetContext) -> CompileResult<&mut GeneratorHandle> {
        if self.serves(context) {
            debug!(
                class = %context.class_name,
                method = %context.method_name,
                "reusing installed generator"
            );
            return self.current_generator();
        }

        let method = context.method_context()?;
        let constant_pool = context.constant_pool()?;
        let resolver = WorkspaceResolver::for_target(context);
        let generator = BytecodeGenerator::with_resolver(method, Box::new(resolver), constant_pool);
        self.install_backend(context, Box::new(generator))
    }

    /// Install a specific backend for `context`, replacing any other
    pub fn install_backend(
        &mut self,
        context: &TargetContext,
        backend: Box<dyn GenerationBackend>,
    ) -> CompileResult<&mut GeneratorHandle> {
        if let Some(previous) = self.installed.take() {
            info!(
                class = %previous.target.class_name,
                method = %previous.target.method_name,
                "replacing installed generator"
            );
        }
        info!(
            class = %context.class_name,
            method = %context.method_name,
            descriptor = %context.method_descriptor,
            "installed generator"
        );
        let installed = self.installed.insert(InstalledGenerator {
            target: context.clone(),
            handle: GeneratorHandle::new(backend),
        });
        Ok(&mut installed.handle)
    }

    /// Check if a generator is installed
    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// Check if the installed generator serves `context`
    pub fn serves(&self, context: &TargetContext) -> bool {
        self.installed
            .as_ref()
            .map_or(false, |installed| installed.target.same_target(context))
    }

    /// The installed generator
    pub fn current_generator(&mut self) -> CompileResult<&mut GeneratorHandle> {
        self.installed
            .as_mut()
            .map(|installed| &mut installed.handle)
            .ok_or_else(|| CompileError::HookInstallation("no generator installed".to_string()))
    }

    /// The installed generator, read-only
    pub fn handle(&self) -> Option<&GeneratorHandle> {
        self.installed.as_ref().map(|installed| &installed.handle)
    }

    /// Encoded buffer of the installed generator
    pub fn extract_buffer(&self) -> CompileResult<Vec<u8>> {
        let handle = self
            .handle()
            .ok_or_else(|| CompileError::Extraction("no generator installed".to_string()))?;
        BytecodeExtractor::extract(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{ClassInfo, MethodInfo, Resource, Workspace};
    use std::sync::Arc;

    fn context(workspace: &Arc<Workspace>, method: &str) -> TargetContext {
        TargetContext::new(Arc::clone(workspace), "demo/App", method, "()V")
    }

    fn workspace() -> Arc<Workspace> {
        Arc::new(Workspace::new(
            Resource::new("app").with_class(
                ClassInfo::new("demo/App")
                    .with_method(MethodInfo::new("run", "()V"))
                    .with_method(MethodInfo::new("stop", "()V")),
            ),
        ))
    }

    #[test]
    fn test_install_is_idempotent() {
        let ws = workspace();
        let mut hook = CodeGenerationHook::new();
        hook.install(&context(&ws, "run")).unwrap().begin();
        assert_eq!(
            hook.current_generator().unwrap().state(),
            GenerationState::Emitting
        );
        // same target keeps the handle and its state
        hook.install(&context(&ws, "run")).unwrap();
        assert_eq!(
            hook.current_generator().unwrap().state(),
            GenerationState::Emitting
        );
    }

    #[test]
    fn test_install_other_target_replaces() {
        let ws = workspace();
        let mut hook = CodeGenerationHook::new();
        hook.install(&context(&ws, "run")).unwrap().begin();
        let handle = hook.install(&context(&ws, "stop")).unwrap();
        assert_eq!(handle.state(), GenerationState::Ready);
        assert!(hook.serves(&context(&ws, "stop")));
        assert!(!hook.serves(&context(&ws, "run")));
    }

    #[test]
    fn test_install_unknown_method_fails() {
        let ws = workspace();
        let mut hook = CodeGenerationHook::new();
        let err = hook.install(&context(&ws, "missing")).unwrap_err();
        assert!(matches!(err, CompileError::HookInstallation(_)));
        assert!(!err.is_recoverable());
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_current_generator_requires_install() {
        let mut hook = CodeGenerationHook::new();
        assert!(matches!(
            hook.current_generator(),
            Err(CompileError::HookInstallation(_))
        ));
        assert!(matches!(
            hook.extract_buffer(),
            Err(CompileError::Extraction(_))
        ));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(GenerationState::Complete.to_string(), "complete");
        assert_eq!(GenerationState::Failed.to_string(), "failed");
    }
}

//! A patch session: one method edit, any number of compilation passes

use crate::allocator::VariableSlotAllocator;
use crate::compiler::StatementCompiler;
use crate::error::{CompileError, CompileResult};
use crate::fragment::CompiledFragment;
use crate::hook::CodeGenerationHook;
use crate::metadata::MethodMetadata;
use crate::options::PatchOptions;
use crate::workspace::TargetContext;
use parser::SymbolTable;
use tracing::{info, warn};

/// Allocator, root symbols and generator of one method edit
///
/// Each [`compile`](Self::compile) call is a pass. Variables introduced by a
/// pass are visible to later passes. After any failure the session refuses
/// further passes; start over with [`reopen`](Self::reopen).
#[derive(Debug)]
pub struct PatchSession {
    context: TargetContext,
    metadata: MethodMetadata,
    /// Seed plus the variables of successful passes
    committed: MethodMetadata,
    allocator: VariableSlotAllocator,
    root_symbols: SymbolTable<'static>,
    hook: CodeGenerationHook,
    compiler: StatementCompiler,
    poisoned: bool,
    passes: usize,
}

impl PatchSession {
    /// Open a session seeded with `metadata`
    pub fn open(
        context: TargetContext,
        metadata: MethodMetadata,
        options: PatchOptions,
    ) -> CompileResult<Self> {
        let allocator = metadata.allocator()?;
        let root_symbols = metadata.root_symbols()?;
        let mut hook = CodeGenerationHook::new();
        hook.install(&context)?;
        info!(
            class = %context.class_name,
            method = %context.method_name,
            locals = metadata.locals.len(),
            next_slot = allocator.high_water_mark(),
            "opened patch session"
        );
        Ok(Self {
            context,
            committed: metadata.clone(),
            metadata,
            allocator,
            root_symbols,
            hook,
            compiler: StatementCompiler::new(options),
            poisoned: false,
            passes: 0,
        })
    }

    /// Open a session seeded with the metadata the workspace records
    pub fn open_target(context: TargetContext, options: PatchOptions) -> CompileResult<Self> {
        let metadata = context.metadata()?;
        Self::open(context, metadata, options)
    }

    /// Run one compilation pass
    pub fn compile(&mut self, source: &str) -> CompileResult<CompiledFragment> {
        if self.poisoned {
            return Err(CompileError::SessionPoisoned);
        }
        let result = self.compiler.compile_statements(
            source,
            &self.root_symbols,
            &mut self.allocator,
            &mut self.hook,
        );
        match result {
            Ok(fragment) => {
                for slot in &fragment.introduced_symbols {
                    self.root_symbols.bind(
                        &slot.name,
                        slot.type_descriptor.clone(),
                        slot.local_slot(),
                    );
                }
                self.committed.merge(&fragment);
                self.passes += 1;
                Ok(fragment)
            }
            Err(err) => {
                warn!(error = %err, pass = self.passes + 1, "patch session poisoned");
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Metadata of the method with the variables of every successful pass
    ///
    /// Slots kept by the statements before a failing one are not included.
    pub fn committed_metadata(&self) -> MethodMetadata {
        self.committed.clone()
    }

    /// A fresh session from the metadata this session was opened with
    pub fn reopen(&self) -> CompileResult<Self> {
        Self::open(
            self.context.clone(),
            self.metadata.clone(),
            self.compiler.options().clone(),
        )
    }

    /// A fresh session whose seed includes this session's variables
    ///
    /// Fails with [`CompileError::SessionPoisoned`] after a failed pass.
    pub fn commit(&self) -> CompileResult<Self> {
        if self.poisoned {
            return Err(CompileError::SessionPoisoned);
        }
        Self::open(
            self.context.clone(),
            self.committed_metadata(),
            self.compiler.options().clone(),
        )
    }

    /// The slot allocator
    pub fn allocator(&self) -> &VariableSlotAllocator {
        &self.allocator
    }

    /// Names visible to the next pass
    pub fn root_symbols(&self) -> &SymbolTable<'static> {
        &self.root_symbols
    }

    /// The class and method under edit
    pub fn context(&self) -> &TargetContext {
        &self.context
    }

    /// The seed metadata
    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    /// The generator hook
    pub fn hook(&self) -> &CodeGenerationHook {
        &self.hook
    }

    /// Check if an earlier pass failed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of successful passes
    pub fn passes(&self) -> usize {
        self.passes
    }
}

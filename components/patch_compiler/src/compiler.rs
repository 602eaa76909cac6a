//! One compilation pass: parse, place locals, emit, extract

use crate::allocator::{VariableSlot, VariableSlotAllocator};
use crate::error::{CompileError, CompileResult};
use crate::extractor::BytecodeExtractor;
use crate::fragment::{CompiledFragment, SymbolSnapshot};
use crate::hook::{CodeGenerationHook, GeneratorHandle};
use crate::options::PatchOptions;
use parser::{Declarator, Parser, Statement, SymbolTable};
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// Compiles statement source into a [`CompiledFragment`]
#[derive(Debug, Clone, Default)]
pub struct StatementCompiler {
    options: PatchOptions,
}

impl StatementCompiler {
    /// Create a compiler
    pub fn new(options: PatchOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Compile `source` through the generator installed in `hook`
    ///
    /// Names bound in `root_symbols` are visible to the source. Declarations
    /// reuse the slot of a name the allocator already knows and take fresh
    /// slots otherwise; only the fresh ones are reported in the fragment.
    /// When a statement fails, the slots it allocated are released and
    /// earlier statements keep theirs.
    pub fn compile_statements(
        &self,
        source: &str,
        root_symbols: &SymbolTable<'_>,
        allocator: &mut VariableSlotAllocator,
        hook: &mut CodeGenerationHook,
    ) -> CompileResult<CompiledFragment> {
        let handle = hook.current_generator()?;

        let mut scope = SymbolTable::chained(root_symbols);
        let mut statements = Parser::new(source)
            .parse(&mut scope)
            .map_err(CompileError::Parse)?;
        info!(statements = statements.len(), "compiling patch");

        adopt_root_symbols(root_symbols, allocator)?;

        handle.begin();
        handle.reserve_locals(allocator.high_water_mark());

        let mut fresh = Vec::new();
        for statement in statements.iter_mut() {
            let checkpoint = allocator.checkpoint();
            let fresh_before = fresh.len();
            let result = self
                .place_locals(statement, allocator, handle, &mut fresh)
                .and_then(|()| {
                    handle.reserve_locals(allocator.high_water_mark());
                    handle
                        .emit(statement, &mut scope)
                        .map_err(|err| CompileError::Emission(err.or_at(statement.position())))
                });
            if let Err(err) = result {
                allocator.rollback(checkpoint);
                fresh.truncate(fresh_before);
                handle.fail();
                debug!(error = %err, "statement rejected");
                return Err(err);
            }
        }

        handle.finish();
        let bytecode = BytecodeExtractor::extract(handle)?;
        let fragment = build_fragment(bytecode, fresh, allocator, handle);
        info!(
            statements = handle.statements_emitted(),
            bytes = fragment.bytecode.len(),
            introduced = fragment.introduced_symbols.len(),
            max_locals = fragment.max_locals,
            max_stack = fragment.max_stack,
            "compiled patch"
        );
        Ok(fragment)
    }

    /// Assign a slot and resolved type to every declarator of `statement`
    fn place_locals(
        &self,
        statement: &mut Statement,
        allocator: &mut VariableSlotAllocator,
        handle: &GeneratorHandle,
        fresh: &mut Vec<VariableSlot>,
    ) -> CompileResult<()> {
        let strict = self.options.strict_redeclaration;
        statement.visit_declarators_mut(&mut |declarator: &mut Declarator| {
            let declared = handle
                .resolve_type(&declarator.type_ref)
                .map_err(|err| CompileError::Emission(err.or_at(declarator.position)))?;

            let slot = match allocator.lookup(&declarator.name) {
                Some(existing) => {
                    if strict && existing.type_descriptor.storage_kind() != declared.storage_kind()
                    {
                        return Err(CompileError::RedeclarationTypeMismatch {
                            name: declarator.name.clone(),
                            slot: existing.slot_index,
                            existing: existing.type_descriptor.display_name(),
                            declared: declared.display_name(),
                            position: declarator.position,
                        });
                    }
                    debug!(
                        name = %declarator.name,
                        slot = existing.slot_index,
                        "reusing local slot"
                    );
                    existing.clone()
                }
                None => {
                    let slot = allocator.allocate(&declarator.name, declared)?;
                    fresh.push(slot.clone());
                    slot
                }
            };

            declarator.local_slot = Some(slot.local_slot());
            declarator.resolved_class_name = Some(slot.type_descriptor.display_name());
            Ok(())
        })
    }
}

/// Register bound root symbols the allocator has not seen, nearest table first
fn adopt_root_symbols(
    root_symbols: &SymbolTable<'_>,
    allocator: &mut VariableSlotAllocator,
) -> CompileResult<()> {
    let mut seen = HashSet::new();
    let mut table = Some(root_symbols);
    while let Some(current) = table {
        for symbol in current.symbols() {
            if !seen.insert(symbol.name.as_str()) || allocator.lookup(&symbol.name).is_some() {
                continue;
            }
            if let (Some(descriptor), Some(slot)) = (&symbol.descriptor, symbol.slot) {
                trace!(name = %symbol.name, slot = slot.0, "adopting root symbol");
                allocator.register_existing(VariableSlot::new(
                    symbol.name.clone(),
                    slot.0,
                    descriptor.clone(),
                ))?;
            }
        }
        table = current.parent();
    }
    Ok(())
}

fn build_fragment(
    bytecode: Vec<u8>,
    fresh: Vec<VariableSlot>,
    allocator: &VariableSlotAllocator,
    handle: &GeneratorHandle,
) -> CompiledFragment {
    let backend = handle.backend();
    CompiledFragment {
        bytecode,
        introduced_symbols: SymbolSnapshot::new(fresh),
        max_locals: allocator.high_water_mark().max(backend.max_locals()),
        max_stack: backend.max_stack(),
        constant_pool: backend.constant_pool().clone(),
        line_numbers: backend.pending_buffer().line_numbers(),
    }
}

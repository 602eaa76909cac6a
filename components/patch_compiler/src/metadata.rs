//! Local variable metadata of the method being patched

use crate::allocator::{VariableSlot, VariableSlotAllocator};
use crate::error::{CompileError, CompileResult};
use crate::fragment::CompiledFragment;
use core_types::{MethodDescriptor, TypeDescriptor};
use parser::{Symbol, SymbolTable};
use serde::{Deserialize, Serialize};

/// One entry of a method's local variable table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVariable {
    /// Variable name
    pub name: String,
    /// First local slot
    pub index: u16,
    /// Field descriptor of the variable's type
    pub descriptor: String,
}

impl LocalVariable {
    /// Create an entry
    pub fn new(name: impl Into<String>, index: u16, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            descriptor: descriptor.into(),
        }
    }

    /// Parse the descriptor into a slot record
    pub fn to_slot(&self) -> CompileResult<VariableSlot> {
        let ty = TypeDescriptor::parse(&self.descriptor).map_err(|e| {
            CompileError::InvalidMetadata(format!("local '{}': {}", self.name, e))
        })?;
        Ok(VariableSlot::new(self.name.clone(), self.index, ty))
    }
}

/// Declared locals of a method, used to seed a patch session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Declared max-locals of the method's code
    #[serde(default)]
    pub max_locals: u16,
    /// Known local variables
    #[serde(default)]
    pub locals: Vec<LocalVariable>,
}

impl MethodMetadata {
    /// Create metadata from a local variable table
    pub fn new(max_locals: u16, locals: Vec<LocalVariable>) -> Self {
        Self { max_locals, locals }
    }

    /// Metadata for a method without a local variable table
    ///
    /// Names `this` (instance methods, typed as `owner`) and `arg0`, `arg1`,
    /// ... for the parameters, each placed after the previous one's width.
    pub fn from_descriptor(owner: &str, is_static: bool, descriptor: &MethodDescriptor) -> Self {
        let mut locals = Vec::with_capacity(descriptor.params.len() + 1);
        let mut index = 0u16;
        if !is_static {
            locals.push(LocalVariable::new(
                "this",
                0,
                TypeDescriptor::object(owner).descriptor(),
            ));
            index = 1;
        }
        for (i, param) in descriptor.params.iter().enumerate() {
            locals.push(LocalVariable::new(
                format!("arg{}", i),
                index,
                param.descriptor(),
            ));
            index += param.width();
        }
        Self {
            max_locals: index,
            locals,
        }
    }

    /// Parsed local variables
    pub fn slots(&self) -> CompileResult<Vec<VariableSlot>> {
        self.locals.iter().map(LocalVariable::to_slot).collect()
    }

    /// An allocator seeded with these locals
    pub fn allocator(&self) -> CompileResult<VariableSlotAllocator> {
        VariableSlotAllocator::seeded(self.max_locals, self.slots()?)
    }

    /// A root symbol table binding every named local
    ///
    /// Repeated names bind the same entry the allocator keeps.
    pub fn root_symbols(&self) -> CompileResult<SymbolTable<'static>> {
        let allocator = self.allocator()?;
        let mut table = SymbolTable::new();
        for slot in allocator.slots() {
            table.declare(Symbol::bound(
                slot.name.clone(),
                slot.type_descriptor.clone(),
                slot.local_slot(),
            ));
        }
        Ok(table)
    }

    /// Add the symbols introduced by a fragment and raise `max_locals`
    pub fn merge(&mut self, fragment: &CompiledFragment) {
        for slot in fragment.introduced_symbols.iter() {
            self.locals.retain(|local| local.name != slot.name);
            self.locals.push(LocalVariable::new(
                slot.name.clone(),
                slot.slot_index,
                slot.type_descriptor.descriptor(),
            ));
        }
        self.max_locals = self.max_locals.max(fragment.max_locals);
    }

    /// Local named `name`
    pub fn local(&self, name: &str) -> Option<&LocalVariable> {
        self.locals.iter().find(|local| local.name == name)
    }
}

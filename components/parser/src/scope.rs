//! Chained symbol tables for local variables
//!
//! A fragment is parsed against a table chained to the method's root table:
//! names declared by the fragment live in the child, names already known to
//! the method stay visible through the parent without being redeclared.

use crate::ast::TypeRef;
use bytecode_system::LocalSlot;
use core_types::TypeDescriptor;
use std::collections::HashMap;

/// A local variable known to a symbol table
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Variable name
    pub name: String,
    /// Type as written, for variables declared in source
    pub type_ref: Option<TypeRef>,
    /// Resolved type, once known
    pub descriptor: Option<TypeDescriptor>,
    /// Local variable slot, once assigned
    pub slot: Option<LocalSlot>,
}

impl Symbol {
    /// A symbol for a variable that already has a slot and a type
    pub fn bound(name: impl Into<String>, descriptor: TypeDescriptor, slot: LocalSlot) -> Self {
        Self {
            name: name.into(),
            type_ref: None,
            descriptor: Some(descriptor),
            slot: Some(slot),
        }
    }

    /// A symbol declared in source, not yet resolved or allocated
    pub fn declared(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            descriptor: type_ref.primitive_descriptor(),
            type_ref: Some(type_ref),
            slot: None,
        }
    }

    /// Check if the symbol can be loaded and stored
    pub fn is_bound(&self) -> bool {
        self.slot.is_some() && self.descriptor.is_some()
    }
}

/// Symbol table, optionally chained to a parent
#[derive(Debug, Clone, Default)]
pub struct SymbolTable<'p> {
    parent: Option<&'p SymbolTable<'p>>,
    symbols: HashMap<String, Symbol>,
}

impl<'p> SymbolTable<'p> {
    /// Create a root table
    pub fn new() -> Self {
        Self {
            parent: None,
            symbols: HashMap::new(),
        }
    }

    /// Create a table whose lookups fall back to `parent`
    pub fn chained(parent: &'p SymbolTable<'p>) -> Self {
        Self {
            parent: Some(parent),
            symbols: HashMap::new(),
        }
    }

    /// Parent table, if chained
    pub fn parent(&self) -> Option<&'p SymbolTable<'p>> {
        self.parent
    }

    /// Record a symbol in this table, replacing any previous entry of the same name
    pub fn declare(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    /// Assign type and slot to a name in this table, declaring it if needed
    pub fn bind(&mut self, name: &str, descriptor: TypeDescriptor, slot: LocalSlot) {
        match self.symbols.get_mut(name) {
            Some(symbol) => {
                symbol.descriptor = Some(descriptor);
                symbol.slot = Some(slot);
            }
            None => self.declare(Symbol::bound(name, descriptor, slot)),
        }
    }

    /// Look a name up in this table and its ancestors
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .get(name)
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Nearest symbol of this name that has a slot and a type
    ///
    /// A fragment declaration that has not been emitted yet does not hide a
    /// bound variable of the same name further up the chain.
    pub fn lookup_bound(&self, name: &str) -> Option<&Symbol> {
        match self.symbols.get(name) {
            Some(symbol) if symbol.is_bound() => Some(symbol),
            _ => self.parent.and_then(|parent| parent.lookup_bound(name)),
        }
    }

    /// Look a name up in this table only
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Check if a name is visible from this table
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Symbols recorded directly in this table
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Number of symbols recorded directly in this table
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if this table records no symbols of its own
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chained_lookup() {
        let mut root = SymbolTable::new();
        root.declare(Symbol::bound("y", TypeDescriptor::Int, LocalSlot(1)));

        let mut child = SymbolTable::chained(&root);
        child.declare(Symbol::declared("x", TypeRef::named("String")));

        assert_eq!(child.lookup("y").and_then(|s| s.slot), Some(LocalSlot(1)));
        assert!(child.lookup_local("y").is_none());
        assert!(!child.lookup("x").map_or(false, Symbol::is_bound));
        assert!(root.lookup("x").is_none());
    }

    #[test]
    fn test_bind_updates_declared_symbol() {
        let mut table = SymbolTable::new();
        table.declare(Symbol::declared(
            "d",
            TypeRef::primitive(TypeDescriptor::Double),
        ));
        assert_eq!(
            table.lookup("d").and_then(|s| s.descriptor.clone()),
            Some(TypeDescriptor::Double)
        );
        table.bind("d", TypeDescriptor::Double, LocalSlot(3));
        let symbol = table.lookup("d").unwrap();
        assert!(symbol.is_bound());
        assert!(symbol.type_ref.is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_child_shadows_parent() {
        let mut root = SymbolTable::new();
        root.declare(Symbol::bound("i", TypeDescriptor::Int, LocalSlot(2)));
        let mut child = SymbolTable::chained(&root);
        child.bind("i", TypeDescriptor::Int, LocalSlot(2));
        assert_eq!(child.symbols().count(), 1);
        assert!(child.parent().is_some());
    }

    #[test]
    fn test_lookup_bound_skips_pending_declaration() {
        let mut root = SymbolTable::new();
        root.declare(Symbol::bound("y", TypeDescriptor::Int, LocalSlot(1)));
        let mut child = SymbolTable::chained(&root);
        child.declare(Symbol::declared("y", TypeRef::named("String")));
        assert_eq!(child.lookup_bound("y").and_then(|s| s.slot), Some(LocalSlot(1)));
        assert!(child.lookup_bound("z").is_none());
    }
}

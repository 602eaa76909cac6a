//! Output of one compilation pass

use crate::allocator::VariableSlot;
use bytecode_system::{ConstPool, Constant};

/// Variables introduced by one compilation pass, ordered by slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSnapshot {
    symbols: Vec<VariableSlot>,
}

impl SymbolSnapshot {
    /// Create a snapshot
    pub fn new(mut symbols: Vec<VariableSlot>) -> Self {
        symbols.sort_by_key(|slot| slot.slot_index);
        Self { symbols }
    }

    /// Variable named `name`
    pub fn get(&self, name: &str) -> Option<&VariableSlot> {
        self.symbols.iter().find(|slot| slot.name == name)
    }

    /// Check if `name` was introduced
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Introduced variables
    pub fn iter(&self) -> std::slice::Iter<'_, VariableSlot> {
        self.symbols.iter()
    }

    /// Names of the introduced variables
    pub fn names(&self) -> Vec<&str> {
        self.symbols.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Number of introduced variables
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if nothing was introduced
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<'a> IntoIterator for &'a SymbolSnapshot {
    type Item = &'a VariableSlot;
    type IntoIter = std::slice::Iter<'a, VariableSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

/// Bytecode and symbols produced for a patch
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFragment {
    /// Encoded `code[]` bytes of the fragment
    pub bytecode: Vec<u8>,
    /// Variables allocated for the fragment
    pub introduced_symbols: SymbolSnapshot,
    /// Locals the method needs once the fragment is spliced in
    pub max_locals: u16,
    /// Operand stack depth the fragment needs
    pub max_stack: u16,
    /// The class constant pool extended with the fragment's constants
    pub constant_pool: ConstPool,
    /// `(start_pc, line)` pairs relative to the fragment's first byte, with
    /// lines counted in the patch source
    pub line_numbers: Vec<(u16, u16)>,
}

impl CompiledFragment {
    /// Constant pool entries added for the fragment
    pub fn new_constants(&self) -> Vec<(u16, &Constant)> {
        self.constant_pool
            .entries_since(self.constant_pool.reserved())
    }

    /// Check if the fragment has no code
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Bytecode as lowercase hex pairs separated by spaces
    pub fn hex(&self) -> String {
        self.bytecode
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

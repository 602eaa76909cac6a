//! Local variable slot allocation
//!
//! Slots handed out by a [`VariableSlotAllocator`] are never renumbered:
//! bytecode elsewhere in the method already refers to them by index. New
//! names are placed at the cursor, which only moves forward, except when
//! the allocations of a single failed statement are rolled back.

use crate::error::{CompileError, CompileResult};
use bytecode_system::LocalSlot;
use core_types::{ErrorKind, SourceError, TypeDescriptor};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A named local variable and the slots it occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    /// Variable name
    pub name: String,
    /// First local slot
    pub slot_index: u16,
    /// Static type
    pub type_descriptor: TypeDescriptor,
    /// Number of consecutive slots (2 for `long` and `double`)
    pub width: u16,
}

impl VariableSlot {
    /// Create a slot record; the width follows from the type
    pub fn new(name: impl Into<String>, slot_index: u16, type_descriptor: TypeDescriptor) -> Self {
        let width = type_descriptor.width();
        Self {
            name: name.into(),
            slot_index,
            type_descriptor,
            width,
        }
    }

    /// One past the last slot occupied
    pub fn end(&self) -> u32 {
        u32::from(self.slot_index) + u32::from(self.width)
    }

    /// The first slot as a bytecode operand
    pub fn local_slot(&self) -> LocalSlot {
        LocalSlot(self.slot_index)
    }

    /// Check if the slot ranges of two variables intersect
    pub fn overlaps(&self, other: &VariableSlot) -> bool {
        u32::from(self.slot_index) < other.end() && u32::from(other.slot_index) < self.end()
    }
}

/// Allocator state to roll back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorCheckpoint {
    next_free_slot: u16,
    allocated: usize,
}

/// Maps variable names of one method edit to local slots
#[derive(Debug, Clone, Default)]
pub struct VariableSlotAllocator {
    next_free_slot: u16,
    slots: HashMap<String, VariableSlot>,
    /// Names allocated here, in allocation order
    allocated: Vec<String>,
}

impl VariableSlotAllocator {
    /// Create an allocator whose first fresh slot is `next_free_slot`
    pub fn new(next_free_slot: u16) -> Self {
        Self {
            next_free_slot,
            slots: HashMap::new(),
            allocated: Vec::new(),
        }
    }

    /// Create an allocator seeded with the method's existing locals
    ///
    /// The cursor starts after both `next_free_slot` and the end of every
    /// existing variable.
    pub fn seeded<I>(next_free_slot: u16, existing: I) -> CompileResult<Self>
    where
        I: IntoIterator<Item = VariableSlot>,
    {
        let mut allocator = Self::new(next_free_slot);
        for slot in existing {
            allocator.register_existing(slot)?;
        }
        Ok(allocator)
    }

    /// Slot already assigned to `name` in this session
    pub fn lookup(&self, name: &str) -> Option<&VariableSlot> {
        self.slots.get(name)
    }

    /// Assign the next free slots to a new name
    ///
    /// Fails with [`CompileError::DuplicateDeclaration`] if `name` already
    /// has a slot.
    pub fn allocate(
        &mut self,
        name: &str,
        type_descriptor: TypeDescriptor,
    ) -> CompileResult<VariableSlot> {
        if let Some(existing) = self.slots.get(name) {
            return Err(CompileError::DuplicateDeclaration {
                name: name.to_string(),
                slot: existing.slot_index,
            });
        }

        let slot = VariableSlot::new(name, self.next_free_slot, type_descriptor);
        self.next_free_slot = end_slot(&slot)?;
        debug!(
            name,
            slot = slot.slot_index,
            width = slot.width,
            descriptor = %slot.type_descriptor.descriptor(),
            "allocated local slot"
        );
        self.slots.insert(name.to_string(), slot.clone());
        self.allocated.push(name.to_string());
        Ok(slot)
    }

    /// Record a variable that already exists in the method
    ///
    /// The cursor moves past the variable if needed. A local variable table
    /// lists a name once per scope, so a repeated name keeps the binding
    /// with the highest slot.
    pub fn register_existing(&mut self, slot: VariableSlot) -> CompileResult<()> {
        self.next_free_slot = self.next_free_slot.max(end_slot(&slot)?);
        if let Some(existing) = self.slots.get(&slot.name) {
            if existing.slot_index > slot.slot_index {
                trace!(name = %slot.name, slot = slot.slot_index, "shadowed existing local");
                return Ok(());
            }
        }
        trace!(name = %slot.name, slot = slot.slot_index, "registered existing local");
        self.slots.insert(slot.name.clone(), slot);
        Ok(())
    }

    /// One past the highest slot in use
    pub fn high_water_mark(&self) -> u16 {
        self.next_free_slot
    }

    /// Current state, for [`rollback`](Self::rollback)
    pub fn checkpoint(&self) -> AllocatorCheckpoint {
        AllocatorCheckpoint {
            next_free_slot: self.next_free_slot,
            allocated: self.allocated.len(),
        }
    }

    /// Forget every allocation made since `checkpoint`
    pub fn rollback(&mut self, checkpoint: AllocatorCheckpoint) {
        if checkpoint.allocated >= self.allocated.len() {
            return;
        }
        for name in self.allocated.drain(checkpoint.allocated..) {
            self.slots.remove(&name);
        }
        debug!(
            from = self.next_free_slot,
            to = checkpoint.next_free_slot,
            "released local slots"
        );
        self.next_free_slot = checkpoint.next_free_slot;
    }

    /// Variables allocated by this allocator (not seeded), in allocation order
    pub fn allocated(&self) -> impl Iterator<Item = &VariableSlot> {
        self.allocated.iter().filter_map(|name| self.slots.get(name))
    }

    /// Every known variable, ordered by slot
    pub fn slots(&self) -> Vec<&VariableSlot> {
        let mut slots: Vec<&VariableSlot> = self.slots.values().collect();
        slots.sort_by(|a, b| a.slot_index.cmp(&b.slot_index).then(a.name.cmp(&b.name)));
        slots
    }

    /// Number of known variables
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no variable is known
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn end_slot(slot: &VariableSlot) -> CompileResult<u16> {
    u16::try_from(slot.end()).map_err(|_| {
        CompileError::Emission(SourceError::new(
            ErrorKind::InternalError,
            format!("too many local variables to place '{}'", slot.name),
        ))
    })
}

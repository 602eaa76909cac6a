//! Class file constant pool
//!
//! A pool may be seeded with the entry count of the class being patched so
//! that newly added entries are numbered after the existing ones. Existing
//! entries are never read back; only the appended ones can be encoded.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Largest valid constant pool index
const MAX_INDEX: u32 = u16::MAX as u32;

/// Errors raised while appending to a constant pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool has no index left for a new entry
    #[error("constant pool overflow: cannot add {0} beyond index 65535")]
    Overflow(String),
    /// A UTF-8 entry longer than its 16-bit length field allows
    #[error("constant string too long: {0} bytes, at most 65535")]
    Utf8TooLong(usize),
}

/// A constant pool entry
///
/// Float and double values are stored as raw bits so entries can be interned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// CONSTANT_Utf8
    Utf8(String),
    /// CONSTANT_Integer
    Integer(i32),
    /// CONSTANT_Float (IEEE 754 bits)
    Float(u32),
    /// CONSTANT_Long
    Long(i64),
    /// CONSTANT_Double (IEEE 754 bits)
    Double(u64),
    /// CONSTANT_Class, pointing at the internal name
    Class(u16),
    /// CONSTANT_String, pointing at the text
    String(u16),
    /// CONSTANT_Fieldref
    FieldRef {
        /// Owner class index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// CONSTANT_Methodref
    MethodRef {
        /// Owner class index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// CONSTANT_InterfaceMethodref
    InterfaceMethodRef {
        /// Owner interface index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// CONSTANT_NameAndType
    NameAndType {
        /// Member name index
        name: u16,
        /// Descriptor index
        descriptor: u16,
    },
}

impl Constant {
    /// Class file tag byte
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef { .. } => 9,
            Constant::MethodRef { .. } => 10,
            Constant::InterfaceMethodRef { .. } => 11,
            Constant::NameAndType { .. } => 12,
        }
    }

    /// Number of pool indices occupied (2 for long and double)
    pub fn slots(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        match self {
            Constant::Utf8(text) => {
                let bytes = encode_modified_utf8(text);
                // length checked by `ConstPool::add`
                out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                out.extend_from_slice(&bytes);
            }
            Constant::Integer(value) => out.extend_from_slice(&value.to_be_bytes()),
            Constant::Float(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Long(value) => out.extend_from_slice(&value.to_be_bytes()),
            Constant::Double(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Class(index) | Constant::String(index) => {
                out.extend_from_slice(&index.to_be_bytes())
            }
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            Constant::NameAndType { name, descriptor } => {
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
            }
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Utf8(text) => write!(f, "Utf8 {:?}", text),
            Constant::Integer(value) => write!(f, "Integer {}", value),
            Constant::Float(bits) => write!(f, "Float {}", f32::from_bits(*bits)),
            Constant::Long(value) => write!(f, "Long {}", value),
            Constant::Double(bits) => write!(f, "Double {}", f64::from_bits(*bits)),
            Constant::Class(index) => write!(f, "Class #{}", index),
            Constant::String(index) => write!(f, "String #{}", index),
            Constant::FieldRef {
                class,
                name_and_type,
            } => write!(f, "Fieldref #{}.#{}", class, name_and_type),
            Constant::MethodRef {
                class,
                name_and_type,
            } => write!(f, "Methodref #{}.#{}", class, name_and_type),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => write!(f, "InterfaceMethodref #{}.#{}", class, name_and_type),
            Constant::NameAndType { name, descriptor } => {
                write!(f, "NameAndType #{}:#{}", name, descriptor)
            }
        }
    }
}

/// Constant pool with interning of appended entries
#[derive(Debug, Clone, PartialEq)]
pub struct ConstPool {
    /// Count of entries owned by the target class (class file `constant_pool_count`)
    reserved: u16,
    /// Appended entries with their indices, in index order
    entries: Vec<(u16, Constant)>,
    /// Interning table
    lookup: HashMap<Constant, u16>,
    /// Next free index
    next: u32,
}

impl ConstPool {
    /// Create an empty pool; the first entry gets index 1
    pub fn new() -> Self {
        Self::with_reserved(1)
    }

    /// Create a pool whose first `count - 1` indices belong to an existing class
    ///
    /// `count` is the class file's `constant_pool_count`; index 0 is always
    /// reserved.
    pub fn with_reserved(count: u16) -> Self {
        let reserved = count.max(1);
        Self {
            reserved,
            entries: Vec::new(),
            lookup: HashMap::new(),
            next: reserved as u32,
        }
    }

    /// Current `constant_pool_count` (one past the highest used index)
    pub fn count(&self) -> u16 {
        self.next.min(MAX_INDEX) as u16
    }

    /// Count the pool was seeded with
    pub fn reserved(&self) -> u16 {
        self.reserved
    }

    /// Number of appended entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an appended entry by index
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|pos| &self.entries[pos].1)
    }

    /// Entries appended at or after the given count, in index order
    pub fn entries_since(&self, count: u16) -> Vec<(u16, &Constant)> {
        self.entries
            .iter()
            .filter(|(index, _)| *index >= count)
            .map(|(index, constant)| (*index, constant))
            .collect()
    }

    /// Class file encoding of the entries appended at or after `count`
    pub fn encode_since(&self, count: u16) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, constant) in self.entries_since(count) {
            constant.encode(&mut out);
        }
        out
    }

    /// Append a constant, reusing an equal appended entry
    pub fn add(&mut self, constant: Constant) -> Result<u16, PoolError> {
        if let Some(&index) = self.lookup.get(&constant) {
            return Ok(index);
        }
        if let Constant::Utf8(text) = &constant {
            let len = modified_utf8_len(text);
            if len > usize::from(u16::MAX) {
                return Err(PoolError::Utf8TooLong(len));
            }
        }
        let index = self.next;
        if index + constant.slots() as u32 - 1 >= MAX_INDEX {
            return Err(PoolError::Overflow(constant.to_string()));
        }
        let index = index as u16;
        self.next += constant.slots() as u32;
        self.lookup.insert(constant.clone(), index);
        self.entries.push((index, constant));
        Ok(index)
    }

    /// Add a UTF-8 entry
    pub fn add_utf8(&mut self, text: &str) -> Result<u16, PoolError> {
        self.add(Constant::Utf8(text.to_string()))
    }

    /// Add an int constant
    pub fn add_integer(&mut self, value: i32) -> Result<u16, PoolError> {
        self.add(Constant::Integer(value))
    }

    /// Add a float constant
    pub fn add_float(&mut self, value: f32) -> Result<u16, PoolError> {
        self.add(Constant::Float(value.to_bits()))
    }

    /// Add a long constant
    pub fn add_long(&mut self, value: i64) -> Result<u16, PoolError> {
        self.add(Constant::Long(value))
    }

    /// Add a double constant
    pub fn add_double(&mut self, value: f64) -> Result<u16, PoolError> {
        self.add(Constant::Double(value.to_bits()))
    }

    /// Add a class reference by internal name (`java/lang/String`, `[I`)
    pub fn add_class(&mut self, internal_name: &str) -> Result<u16, PoolError> {
        let name = self.add_utf8(internal_name)?;
        self.add(Constant::Class(name))
    }

    /// Add a string literal
    pub fn add_string(&mut self, value: &str) -> Result<u16, PoolError> {
        let text = self.add_utf8(value)?;
        self.add(Constant::String(text))
    }

    /// Add a name-and-type pair
    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, PoolError> {
        let name = self.add_utf8(name)?;
        let descriptor = self.add_utf8(descriptor)?;
        self.add(Constant::NameAndType { name, descriptor })
    }

    /// Add a field reference
    pub fn add_field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, PoolError> {
        let class = self.add_class(owner)?;
        let name_and_type = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::FieldRef {
            class,
            name_and_type,
        })
    }

    /// Add a method reference
    pub fn add_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, PoolError> {
        let class = self.add_class(owner)?;
        let name_and_type = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::MethodRef {
            class,
            name_and_type,
        })
    }

    /// Add an interface method reference
    pub fn add_interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, PoolError> {
        let class = self.add_class(owner)?;
        let name_and_type = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::InterfaceMethodRef {
            class,
            name_and_type,
        })
    }

    /// Human-readable rendering of an appended entry, following references
    ///
    /// Returns e.g. `java/lang/StringBuilder.append:(I)Ljava/lang/StringBuilder;`
    /// for a method reference. Reserved indices render as `#<index>`.
    pub fn describe(&self, index: u16) -> String {
        match self.get(index) {
            None => format!("#{}", index),
            Some(Constant::Utf8(text)) => text.clone(),
            Some(Constant::Integer(value)) => value.to_string(),
            Some(Constant::Float(bits)) => format!("{}f", f32::from_bits(*bits)),
            Some(Constant::Long(value)) => format!("{}l", value),
            Some(Constant::Double(bits)) => format!("{}d", f64::from_bits(*bits)),
            Some(Constant::Class(name)) => self.describe(*name),
            Some(Constant::String(text)) => format!("{:?}", self.describe(*text)),
            Some(Constant::NameAndType { name, descriptor }) => {
                format!("{}:{}", self.describe(*name), self.describe(*descriptor))
            }
            Some(Constant::FieldRef {
                class,
                name_and_type,
            })
            | Some(Constant::MethodRef {
                class,
                name_and_type,
            })
            | Some(Constant::InterfaceMethodRef {
                class,
                name_and_type,
            }) => format!(
                "{}.{}",
                self.describe(*class),
                self.describe(*name_and_type)
            ),
        }
    }
}

impl Default for ConstPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode text as JVM modified UTF-8
///
/// NUL is written as two bytes and supplementary characters as surrogate
/// pairs of three bytes each.
pub fn encode_modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Length of `text` in modified UTF-8
fn modified_utf8_len(text: &str) -> usize {
    text.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007f => 1,
            0x0000 | 0x0080..=0x07ff => 2,
            _ => 3,
        })
        .sum()
}

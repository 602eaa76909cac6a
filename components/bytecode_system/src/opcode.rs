//! JVM opcodes
//!
//! Defines the subset of the JVM instruction set emitted for method-body
//! patches. Families of opcodes that differ only by operand type (`iload`,
//! `lload`, ..., `iadd`, `ladd`, ...) are folded into one variant carrying the
//! kind; the short and `wide` encodings are chosen when the chunk is encoded.

use core_types::StorageKind;
use std::fmt;

/// Local variable table index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSlot(pub u16);

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operand kind of arithmetic and conversion instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// int (`i` prefix)
    Int,
    /// long (`l` prefix)
    Long,
    /// float (`f` prefix)
    Float,
    /// double (`d` prefix)
    Double,
}

impl NumericKind {
    /// Map a storage kind onto a numeric kind; `None` for references
    pub fn from_storage(kind: StorageKind) -> Option<Self> {
        match kind {
            StorageKind::Int => Some(NumericKind::Int),
            StorageKind::Long => Some(NumericKind::Long),
            StorageKind::Float => Some(NumericKind::Float),
            StorageKind::Double => Some(NumericKind::Double),
            StorageKind::Reference => None,
        }
    }

    /// Stack slots taken by a value of this kind
    pub fn width(self) -> i32 {
        match self {
            NumericKind::Long | NumericKind::Double => 2,
            _ => 1,
        }
    }

    fn index(self) -> u8 {
        match self {
            NumericKind::Int => 0,
            NumericKind::Long => 1,
            NumericKind::Float => 2,
            NumericKind::Double => 3,
        }
    }

    fn prefix(self) -> char {
        match self {
            NumericKind::Int => 'i',
            NumericKind::Long => 'l',
            NumericKind::Float => 'f',
            NumericKind::Double => 'd',
        }
    }
}

/// Operand kind of shift and bitwise instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegralKind {
    /// int
    Int,
    /// long
    Long,
}

impl IntegralKind {
    fn index(self) -> u8 {
        match self {
            IntegralKind::Int => 0,
            IntegralKind::Long => 1,
        }
    }

    fn prefix(self) -> char {
        match self {
            IntegralKind::Int => 'i',
            IntegralKind::Long => 'l',
        }
    }

    fn width(self) -> i32 {
        match self {
            IntegralKind::Int => 1,
            IntegralKind::Long => 2,
        }
    }
}

/// Element kind of array load/store instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayElement {
    /// `int[]`
    Int,
    /// `long[]`
    Long,
    /// `float[]`
    Float,
    /// `double[]`
    Double,
    /// object arrays
    Reference,
    /// `byte[]` and `boolean[]`
    Byte,
    /// `char[]`
    Char,
    /// `short[]`
    Short,
}

impl ArrayElement {
    fn index(self) -> u8 {
        match self {
            ArrayElement::Int => 0,
            ArrayElement::Long => 1,
            ArrayElement::Float => 2,
            ArrayElement::Double => 3,
            ArrayElement::Reference => 4,
            ArrayElement::Byte => 5,
            ArrayElement::Char => 6,
            ArrayElement::Short => 7,
        }
    }

    fn width(self) -> i32 {
        match self {
            ArrayElement::Long | ArrayElement::Double => 2,
            _ => 1,
        }
    }

    fn prefix(self) -> char {
        match self {
            ArrayElement::Int => 'i',
            ArrayElement::Long => 'l',
            ArrayElement::Float => 'f',
            ArrayElement::Double => 'd',
            ArrayElement::Reference => 'a',
            ArrayElement::Byte => 'b',
            ArrayElement::Char => 'c',
            ArrayElement::Short => 's',
        }
    }
}

/// `atype` operand of `newarray`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveArrayType {
    /// T_BOOLEAN
    Boolean = 4,
    /// T_CHAR
    Char = 5,
    /// T_FLOAT
    Float = 6,
    /// T_DOUBLE
    Double = 7,
    /// T_BYTE
    Byte = 8,
    /// T_SHORT
    Short = 9,
    /// T_INT
    Int = 10,
    /// T_LONG
    Long = 11,
}

/// Comparison used by conditional branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// >=
    Ge,
    /// >
    Gt,
    /// <=
    Le,
}

impl Condition {
    /// The condition that holds exactly when this one does not
    pub fn negate(self) -> Self {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Lt => Condition::Ge,
            Condition::Ge => Condition::Lt,
            Condition::Gt => Condition::Le,
            Condition::Le => Condition::Gt,
        }
    }

    fn index(self) -> u8 {
        match self {
            Condition::Eq => 0,
            Condition::Ne => 1,
            Condition::Lt => 2,
            Condition::Ge => 3,
            Condition::Gt => 4,
            Condition::Le => 5,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Lt => "lt",
            Condition::Ge => "ge",
            Condition::Gt => "gt",
            Condition::Le => "le",
        }
    }
}

/// Method invocation flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// invokevirtual
    Virtual,
    /// invokespecial (constructors, private and super calls)
    Special,
    /// invokestatic
    Static,
    /// invokeinterface
    Interface,
}

/// Bytecode opcodes
///
/// Jump operands are instruction indices within the owning chunk; they are
/// turned into relative byte offsets when the chunk is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // Constants
    /// Do nothing
    Nop,
    /// Push null
    AconstNull,
    /// Push int constant -1..=5 (`iconst_<n>`)
    Iconst(i8),
    /// Push long constant 0 or 1
    Lconst(u8),
    /// Push float constant 0, 1 or 2
    Fconst(u8),
    /// Push double constant 0 or 1
    Dconst(u8),
    /// Push sign-extended byte
    Bipush(i8),
    /// Push sign-extended short
    Sipush(i16),
    /// Push single-width constant from pool (`ldc`/`ldc_w`)
    Ldc(u16),
    /// Push long/double constant from pool
    Ldc2W(u16),

    // Locals
    /// Load local variable
    Load(StorageKind, LocalSlot),
    /// Store local variable
    Store(StorageKind, LocalSlot),
    /// Increment int local by constant
    Iinc(LocalSlot, i16),

    // Arrays
    /// Load array element
    ArrayLoad(ArrayElement),
    /// Store array element
    ArrayStore(ArrayElement),
    /// Push array length
    ArrayLength,
    /// Create primitive array
    NewArray(PrimitiveArrayType),
    /// Create reference array of class at pool index
    ANewArray(u16),

    // Stack
    /// Pop one slot
    Pop,
    /// Pop two slots
    Pop2,
    /// Duplicate top slot
    Dup,
    /// Duplicate top slot beneath the second
    DupX1,
    /// Duplicate top slot beneath the third
    DupX2,
    /// Duplicate top two slots
    Dup2,
    /// Duplicate top two slots beneath the third
    Dup2X1,
    /// Duplicate top two slots beneath the fourth
    Dup2X2,
    /// Swap top two slots
    Swap,

    // Arithmetic
    /// Add
    Add(NumericKind),
    /// Subtract
    Sub(NumericKind),
    /// Multiply
    Mul(NumericKind),
    /// Divide
    Div(NumericKind),
    /// Remainder
    Rem(NumericKind),
    /// Negate
    Neg(NumericKind),
    /// Shift left
    Shl(IntegralKind),
    /// Arithmetic shift right
    Shr(IntegralKind),
    /// Logical shift right
    Ushr(IntegralKind),
    /// Bitwise and
    And(IntegralKind),
    /// Bitwise or
    Or(IntegralKind),
    /// Bitwise xor
    Xor(IntegralKind),

    // Conversions
    /// Primitive widening/narrowing between numeric kinds
    Convert(NumericKind, NumericKind),
    /// int to byte
    I2b,
    /// int to char
    I2c,
    /// int to short
    I2s,

    // Comparison
    /// Compare longs
    Lcmp,
    /// Compare floats, -1 on NaN
    Fcmpl,
    /// Compare floats, 1 on NaN
    Fcmpg,
    /// Compare doubles, -1 on NaN
    Dcmpl,
    /// Compare doubles, 1 on NaN
    Dcmpg,

    // Control flow
    /// Branch if int compares against zero
    If(Condition, usize),
    /// Branch if two ints compare
    IfIcmp(Condition, usize),
    /// Branch if references are equal
    IfAcmpEq(usize),
    /// Branch if references differ
    IfAcmpNe(usize),
    /// Branch if null
    IfNull(usize),
    /// Branch if not null
    IfNonNull(usize),
    /// Unconditional branch
    Goto(usize),
    /// Return value of the given kind, or void
    Return(Option<StorageKind>),
    /// Throw exception reference on top of stack
    AThrow,

    // Fields and methods
    /// Read static field; `width` is the field's slot width
    GetStatic {
        /// Fieldref pool index
        index: u16,
        /// Field value width
        width: u8,
    },
    /// Write static field
    PutStatic {
        /// Fieldref pool index
        index: u16,
        /// Field value width
        width: u8,
    },
    /// Read instance field
    GetField {
        /// Fieldref pool index
        index: u16,
        /// Field value width
        width: u8,
    },
    /// Write instance field
    PutField {
        /// Fieldref pool index
        index: u16,
        /// Field value width
        width: u8,
    },
    /// Invoke a method
    Invoke {
        /// Invocation flavour
        kind: InvokeKind,
        /// Methodref / InterfaceMethodref pool index
        index: u16,
        /// Slots taken by the arguments (excluding the receiver)
        arg_slots: u8,
        /// Slots pushed by the return value
        return_slots: u8,
    },

    // Objects
    /// Allocate instance of class at pool index
    New(u16),
    /// Checked reference cast
    CheckCast(u16),
    /// Type test
    InstanceOf(u16),
}

impl Opcode {
    /// Check if this opcode is a terminator (ends basic block)
    pub fn is_terminator(&self) -> bool {
        self.jump_target().is_some() || matches!(self, Opcode::Return(_) | Opcode::AThrow)
    }

    /// Check if this opcode is an unconditional terminator
    pub fn is_unconditional_terminator(&self) -> bool {
        matches!(self, Opcode::Return(_) | Opcode::Goto(_) | Opcode::AThrow)
    }

    /// Jump target (instruction index) of a branch
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Opcode::If(_, target)
            | Opcode::IfIcmp(_, target)
            | Opcode::IfAcmpEq(target)
            | Opcode::IfAcmpNe(target)
            | Opcode::IfNull(target)
            | Opcode::IfNonNull(target)
            | Opcode::Goto(target) => Some(*target),
            _ => None,
        }
    }

    /// Replace the jump target of a branch. Returns false for non-branches.
    pub fn set_jump_target(&mut self, new_target: usize) -> bool {
        match self {
            Opcode::If(_, target)
            | Opcode::IfIcmp(_, target)
            | Opcode::IfAcmpEq(target)
            | Opcode::IfAcmpNe(target)
            | Opcode::IfNull(target)
            | Opcode::IfNonNull(target)
            | Opcode::Goto(target) => {
                *target = new_target;
                true
            }
            _ => false,
        }
    }

    /// Net change of the operand stack depth, in slots
    pub fn stack_effect(&self) -> i32 {
        match self {
            Opcode::Nop | Opcode::Iinc(..) | Opcode::Swap => 0,
            Opcode::AconstNull
            | Opcode::Iconst(_)
            | Opcode::Fconst(_)
            | Opcode::Bipush(_)
            | Opcode::Sipush(_)
            | Opcode::Ldc(_) => 1,
            Opcode::Lconst(_) | Opcode::Dconst(_) | Opcode::Ldc2W(_) => 2,
            Opcode::Load(kind, _) => kind.width() as i32,
            Opcode::Store(kind, _) => -(kind.width() as i32),
            Opcode::ArrayLoad(element) => element.width() - 2,
            Opcode::ArrayStore(element) => -(element.width() + 2),
            Opcode::ArrayLength | Opcode::NewArray(_) | Opcode::ANewArray(_) => 0,
            Opcode::Pop => -1,
            Opcode::Pop2 => -2,
            Opcode::Dup | Opcode::DupX1 | Opcode::DupX2 => 1,
            Opcode::Dup2 | Opcode::Dup2X1 | Opcode::Dup2X2 => 2,
            Opcode::Add(kind)
            | Opcode::Sub(kind)
            | Opcode::Mul(kind)
            | Opcode::Div(kind)
            | Opcode::Rem(kind) => -kind.width(),
            Opcode::Neg(_) => 0,
            // value shifted stays, int shift distance is consumed
            Opcode::Shl(_) | Opcode::Shr(_) | Opcode::Ushr(_) => -1,
            Opcode::And(kind) | Opcode::Or(kind) | Opcode::Xor(kind) => -kind.width(),
            Opcode::Convert(from, to) => to.width() - from.width(),
            Opcode::I2b | Opcode::I2c | Opcode::I2s => 0,
            Opcode::Lcmp | Opcode::Dcmpl | Opcode::Dcmpg => -3,
            Opcode::Fcmpl | Opcode::Fcmpg => -1,
            Opcode::If(..) | Opcode::IfNull(_) | Opcode::IfNonNull(_) => -1,
            Opcode::IfIcmp(..) | Opcode::IfAcmpEq(_) | Opcode::IfAcmpNe(_) => -2,
            Opcode::Goto(_) => 0,
            Opcode::Return(kind) => -(kind.map_or(0, |k| k.width() as i32)),
            Opcode::AThrow => -1,
            Opcode::GetStatic { width, .. } => *width as i32,
            Opcode::PutStatic { width, .. } => -(*width as i32),
            Opcode::GetField { width, .. } => *width as i32 - 1,
            Opcode::PutField { width, .. } => -(*width as i32) - 1,
            Opcode::Invoke {
                kind,
                arg_slots,
                return_slots,
                ..
            } => {
                let receiver = if *kind == InvokeKind::Static { 0 } else { 1 };
                *return_slots as i32 - *arg_slots as i32 - receiver
            }
            Opcode::New(_) => 1,
            Opcode::CheckCast(_) | Opcode::InstanceOf(_) => 0,
        }
    }

    /// The primary opcode byte (the short form where one exists)
    pub fn opcode_byte(&self) -> u8 {
        match self {
            Opcode::Nop => 0x00,
            Opcode::AconstNull => 0x01,
            Opcode::Iconst(n) => (0x03 + *n as i16) as u8,
            Opcode::Lconst(n) => 0x09 + n,
            Opcode::Fconst(n) => 0x0b + n,
            Opcode::Dconst(n) => 0x0e + n,
            Opcode::Bipush(_) => 0x10,
            Opcode::Sipush(_) => 0x11,
            Opcode::Ldc(index) => {
                if *index <= u8::MAX as u16 {
                    0x12
                } else {
                    0x13
                }
            }
            Opcode::Ldc2W(_) => 0x14,
            Opcode::Load(kind, slot) => {
                let family = storage_index(*kind);
                if slot.0 <= 3 {
                    0x1a + family * 4 + slot.0 as u8
                } else {
                    0x15 + family
                }
            }
            Opcode::Store(kind, slot) => {
                let family = storage_index(*kind);
                if slot.0 <= 3 {
                    0x3b + family * 4 + slot.0 as u8
                } else {
                    0x36 + family
                }
            }
            Opcode::Iinc(..) => 0x84,
            Opcode::ArrayLoad(element) => 0x2e + element.index(),
            Opcode::ArrayStore(element) => 0x4f + element.index(),
            Opcode::ArrayLength => 0xbe,
            Opcode::NewArray(_) => 0xbc,
            Opcode::ANewArray(_) => 0xbd,
            Opcode::Pop => 0x57,
            Opcode::Pop2 => 0x58,
            Opcode::Dup => 0x59,
            Opcode::DupX1 => 0x5a,
            Opcode::DupX2 => 0x5b,
            Opcode::Dup2 => 0x5c,
            Opcode::Dup2X1 => 0x5d,
            Opcode::Dup2X2 => 0x5e,
            Opcode::Swap => 0x5f,
            Opcode::Add(kind) => 0x60 + kind.index(),
            Opcode::Sub(kind) => 0x64 + kind.index(),
            Opcode::Mul(kind) => 0x68 + kind.index(),
            Opcode::Div(kind) => 0x6c + kind.index(),
            Opcode::Rem(kind) => 0x70 + kind.index(),
            Opcode::Neg(kind) => 0x74 + kind.index(),
            Opcode::Shl(kind) => 0x78 + kind.index(),
            Opcode::Shr(kind) => 0x7a + kind.index(),
            Opcode::Ushr(kind) => 0x7c + kind.index(),
            Opcode::And(kind) => 0x7e + kind.index(),
            Opcode::Or(kind) => 0x80 + kind.index(),
            Opcode::Xor(kind) => 0x82 + kind.index(),
            Opcode::Convert(from, to) => convert_byte(*from, *to),
            Opcode::I2b => 0x91,
            Opcode::I2c => 0x92,
            Opcode::I2s => 0x93,
            Opcode::Lcmp => 0x94,
            Opcode::Fcmpl => 0x95,
            Opcode::Fcmpg => 0x96,
            Opcode::Dcmpl => 0x97,
            Opcode::Dcmpg => 0x98,
            Opcode::If(cond, _) => 0x99 + cond.index(),
            Opcode::IfIcmp(cond, _) => 0x9f + cond.index(),
            Opcode::IfAcmpEq(_) => 0xa5,
            Opcode::IfAcmpNe(_) => 0xa6,
            Opcode::Goto(_) => 0xa7,
            Opcode::Return(kind) => match kind {
                Some(kind) => 0xac + storage_index(*kind),
                None => 0xb1,
            },
            Opcode::GetStatic { .. } => 0xb2,
            Opcode::PutStatic { .. } => 0xb3,
            Opcode::GetField { .. } => 0xb4,
            Opcode::PutField { .. } => 0xb5,
            Opcode::Invoke { kind, .. } => match kind {
                InvokeKind::Virtual => 0xb6,
                InvokeKind::Special => 0xb7,
                InvokeKind::Static => 0xb8,
                InvokeKind::Interface => 0xb9,
            },
            Opcode::New(_) => 0xbb,
            Opcode::AThrow => 0xbf,
            Opcode::CheckCast(_) => 0xc0,
            Opcode::InstanceOf(_) => 0xc1,
            Opcode::IfNull(_) => 0xc6,
            Opcode::IfNonNull(_) => 0xc7,
        }
    }

    /// Check if this instruction needs the `wide` prefix
    pub fn is_wide(&self) -> bool {
        match self {
            Opcode::Load(_, slot) | Opcode::Store(_, slot) => slot.0 > u8::MAX as u16,
            Opcode::Iinc(slot, delta) => {
                slot.0 > u8::MAX as u16 || *delta < i8::MIN as i16 || *delta > i8::MAX as i16
            }
            _ => false,
        }
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        match self {
            Opcode::Load(_, slot) | Opcode::Store(_, slot) => {
                if slot.0 <= 3 {
                    1
                } else if self.is_wide() {
                    4
                } else {
                    2
                }
            }
            Opcode::Iinc(..) => {
                if self.is_wide() {
                    6
                } else {
                    3
                }
            }
            Opcode::Bipush(_) | Opcode::NewArray(_) => 2,
            Opcode::Ldc(index) => {
                if *index <= u8::MAX as u16 {
                    2
                } else {
                    3
                }
            }
            Opcode::Sipush(_)
            | Opcode::Ldc2W(_)
            | Opcode::ANewArray(_)
            | Opcode::New(_)
            | Opcode::CheckCast(_)
            | Opcode::InstanceOf(_)
            | Opcode::GetStatic { .. }
            | Opcode::PutStatic { .. }
            | Opcode::GetField { .. }
            | Opcode::PutField { .. } => 3,
            Opcode::Invoke { kind, .. } => {
                if *kind == InvokeKind::Interface {
                    5
                } else {
                    3
                }
            }
            op if op.jump_target().is_some() => 3,
            _ => 1,
        }
    }

    /// Instruction mnemonic, e.g. `iload_1`, `ldc2_w`, `if_icmplt`
    pub fn mnemonic(&self) -> String {
        match self {
            Opcode::Nop => "nop".to_string(),
            Opcode::AconstNull => "aconst_null".to_string(),
            Opcode::Iconst(-1) => "iconst_m1".to_string(),
            Opcode::Iconst(n) => format!("iconst_{}", n),
            Opcode::Lconst(n) => format!("lconst_{}", n),
            Opcode::Fconst(n) => format!("fconst_{}", n),
            Opcode::Dconst(n) => format!("dconst_{}", n),
            Opcode::Bipush(_) => "bipush".to_string(),
            Opcode::Sipush(_) => "sipush".to_string(),
            Opcode::Ldc(index) => {
                if *index <= u8::MAX as u16 {
                    "ldc".to_string()
                } else {
                    "ldc_w".to_string()
                }
            }
            Opcode::Ldc2W(_) => "ldc2_w".to_string(),
            Opcode::Load(kind, slot) => local_mnemonic(*kind, "load", *slot),
            Opcode::Store(kind, slot) => local_mnemonic(*kind, "store", *slot),
            Opcode::Iinc(..) => "iinc".to_string(),
            Opcode::ArrayLoad(element) => format!("{}aload", element.prefix()),
            Opcode::ArrayStore(element) => format!("{}astore", element.prefix()),
            Opcode::ArrayLength => "arraylength".to_string(),
            Opcode::NewArray(_) => "newarray".to_string(),
            Opcode::ANewArray(_) => "anewarray".to_string(),
            Opcode::Pop => "pop".to_string(),
            Opcode::Pop2 => "pop2".to_string(),
            Opcode::Dup => "dup".to_string(),
            Opcode::DupX1 => "dup_x1".to_string(),
            Opcode::DupX2 => "dup_x2".to_string(),
            Opcode::Dup2 => "dup2".to_string(),
            Opcode::Dup2X1 => "dup2_x1".to_string(),
            Opcode::Dup2X2 => "dup2_x2".to_string(),
            Opcode::Swap => "swap".to_string(),
            Opcode::Add(kind) => format!("{}add", kind.prefix()),
            Opcode::Sub(kind) => format!("{}sub", kind.prefix()),
            Opcode::Mul(kind) => format!("{}mul", kind.prefix()),
            Opcode::Div(kind) => format!("{}div", kind.prefix()),
            Opcode::Rem(kind) => format!("{}rem", kind.prefix()),
            Opcode::Neg(kind) => format!("{}neg", kind.prefix()),
            Opcode::Shl(kind) => format!("{}shl", kind.prefix()),
            Opcode::Shr(kind) => format!("{}shr", kind.prefix()),
            Opcode::Ushr(kind) => format!("{}ushr", kind.prefix()),
            Opcode::And(kind) => format!("{}and", kind.prefix()),
            Opcode::Or(kind) => format!("{}or", kind.prefix()),
            Opcode::Xor(kind) => format!("{}xor", kind.prefix()),
            Opcode::Convert(from, to) => format!("{}2{}", from.prefix(), to.prefix()),
            Opcode::I2b => "i2b".to_string(),
            Opcode::I2c => "i2c".to_string(),
            Opcode::I2s => "i2s".to_string(),
            Opcode::Lcmp => "lcmp".to_string(),
            Opcode::Fcmpl => "fcmpl".to_string(),
            Opcode::Fcmpg => "fcmpg".to_string(),
            Opcode::Dcmpl => "dcmpl".to_string(),
            Opcode::Dcmpg => "dcmpg".to_string(),
            Opcode::If(cond, _) => format!("if{}", cond.suffix()),
            Opcode::IfIcmp(cond, _) => format!("if_icmp{}", cond.suffix()),
            Opcode::IfAcmpEq(_) => "if_acmpeq".to_string(),
            Opcode::IfAcmpNe(_) => "if_acmpne".to_string(),
            Opcode::IfNull(_) => "ifnull".to_string(),
            Opcode::IfNonNull(_) => "ifnonnull".to_string(),
            Opcode::Goto(_) => "goto".to_string(),
            Opcode::Return(Some(kind)) => format!("{}return", storage_prefix(*kind)),
            Opcode::Return(None) => "return".to_string(),
            Opcode::AThrow => "athrow".to_string(),
            Opcode::GetStatic { .. } => "getstatic".to_string(),
            Opcode::PutStatic { .. } => "putstatic".to_string(),
            Opcode::GetField { .. } => "getfield".to_string(),
            Opcode::PutField { .. } => "putfield".to_string(),
            Opcode::Invoke { kind, .. } => match kind {
                InvokeKind::Virtual => "invokevirtual".to_string(),
                InvokeKind::Special => "invokespecial".to_string(),
                InvokeKind::Static => "invokestatic".to_string(),
                InvokeKind::Interface => "invokeinterface".to_string(),
            },
            Opcode::New(_) => "new".to_string(),
            Opcode::CheckCast(_) => "checkcast".to_string(),
            Opcode::InstanceOf(_) => "instanceof".to_string(),
        }
    }

    /// Constant pool index referenced by this instruction, if any
    pub fn pool_index(&self) -> Option<u16> {
        match self {
            Opcode::Ldc(index)
            | Opcode::Ldc2W(index)
            | Opcode::ANewArray(index)
            | Opcode::New(index)
            | Opcode::CheckCast(index)
            | Opcode::InstanceOf(index)
            | Opcode::GetStatic { index, .. }
            | Opcode::PutStatic { index, .. }
            | Opcode::GetField { index, .. }
            | Opcode::PutField { index, .. }
            | Opcode::Invoke { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Opcode::Bipush(n) => write!(f, "{} {}", mnemonic, n),
            Opcode::Sipush(n) => write!(f, "{} {}", mnemonic, n),
            Opcode::Load(_, slot) | Opcode::Store(_, slot) if slot.0 > 3 => {
                write!(f, "{} {}", mnemonic, slot)
            }
            Opcode::Iinc(slot, delta) => write!(f, "{} {} {}", mnemonic, slot, delta),
            Opcode::NewArray(atype) => write!(f, "{} {:?}", mnemonic, atype),
            op => match (op.jump_target(), op.pool_index()) {
                (Some(target), _) => write!(f, "{} @{}", mnemonic, target),
                (_, Some(index)) => write!(f, "{} #{}", mnemonic, index),
                _ => f.write_str(&mnemonic),
            },
        }
    }
}

fn storage_index(kind: StorageKind) -> u8 {
    match kind {
        StorageKind::Int => 0,
        StorageKind::Long => 1,
        StorageKind::Float => 2,
        StorageKind::Double => 3,
        StorageKind::Reference => 4,
    }
}

fn storage_prefix(kind: StorageKind) -> char {
    match kind {
        StorageKind::Int => 'i',
        StorageKind::Long => 'l',
        StorageKind::Float => 'f',
        StorageKind::Double => 'd',
        StorageKind::Reference => 'a',
    }
}

fn local_mnemonic(kind: StorageKind, op: &str, slot: LocalSlot) -> String {
    if slot.0 <= 3 {
        format!("{}{}_{}", storage_prefix(kind), op, slot.0)
    } else {
        format!("{}{}", storage_prefix(kind), op)
    }
}

fn convert_byte(from: NumericKind, to: NumericKind) -> u8 {
    use NumericKind::*;
    match (from, to) {
        (Int, Long) => 0x85,
        (Int, Float) => 0x86,
        (Int, Double) => 0x87,
        (Long, Int) => 0x88,
        (Long, Float) => 0x89,
        (Long, Double) => 0x8a,
        (Float, Int) => 0x8b,
        (Float, Long) => 0x8c,
        (Float, Double) => 0x8d,
        (Double, Int) => 0x8e,
        (Double, Long) => 0x8f,
        (Double, Float) => 0x90,
        // same-kind conversions are never emitted
        _ => 0x00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_is_terminator() {
        assert!(Opcode::Return(None).is_terminator());
        assert!(Opcode::Goto(0).is_terminator());
        assert!(Opcode::If(Condition::Eq, 0).is_terminator());
        assert!(Opcode::AThrow.is_terminator());
        assert!(!Opcode::Add(NumericKind::Int).is_terminator());
    }

    #[test]
    fn test_opcode_is_unconditional_terminator() {
        assert!(Opcode::Return(Some(StorageKind::Int)).is_unconditional_terminator());
        assert!(Opcode::Goto(0).is_unconditional_terminator());
        assert!(!Opcode::IfIcmp(Condition::Lt, 0).is_unconditional_terminator());
    }

    #[test]
    fn test_short_local_forms() {
        assert_eq!(Opcode::Load(StorageKind::Int, LocalSlot(0)).opcode_byte(), 0x1a);
        assert_eq!(Opcode::Load(StorageKind::Reference, LocalSlot(0)).opcode_byte(), 0x2a);
        assert_eq!(Opcode::Store(StorageKind::Int, LocalSlot(3)).opcode_byte(), 0x3e);
        assert_eq!(Opcode::Store(StorageKind::Double, LocalSlot(3)).opcode_byte(), 0x4a);
        assert_eq!(Opcode::Store(StorageKind::Long, LocalSlot(4)).opcode_byte(), 0x37);
    }

    #[test]
    fn test_constant_bytes() {
        assert_eq!(Opcode::Iconst(-1).opcode_byte(), 0x02);
        assert_eq!(Opcode::Iconst(5).opcode_byte(), 0x08);
        assert_eq!(Opcode::Lconst(1).opcode_byte(), 0x0a);
        assert_eq!(Opcode::Dconst(0).opcode_byte(), 0x0e);
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Opcode::Lconst(0).stack_effect(), 2);
        assert_eq!(Opcode::Add(NumericKind::Long).stack_effect(), -2);
        assert_eq!(Opcode::Lcmp.stack_effect(), -3);
        assert_eq!(Opcode::Shl(IntegralKind::Long).stack_effect(), -1);
        let invoke = Opcode::Invoke {
            kind: InvokeKind::Virtual,
            index: 1,
            arg_slots: 2,
            return_slots: 1,
        };
        assert_eq!(invoke.stack_effect(), -2);
    }

    #[test]
    fn test_wide_detection() {
        assert!(!Opcode::Load(StorageKind::Int, LocalSlot(255)).is_wide());
        assert!(Opcode::Load(StorageKind::Int, LocalSlot(256)).is_wide());
        assert!(Opcode::Iinc(LocalSlot(1), 200).is_wide());
        assert_eq!(Opcode::Iinc(LocalSlot(1), 200).encoded_len(), 6);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::Iconst(-1).mnemonic(), "iconst_m1");
        assert_eq!(Opcode::Load(StorageKind::Long, LocalSlot(2)).mnemonic(), "lload_2");
        assert_eq!(
            Opcode::Convert(NumericKind::Int, NumericKind::Double).mnemonic(),
            "i2d"
        );
        assert_eq!(Opcode::IfIcmp(Condition::Ge, 0).mnemonic(), "if_icmpge");
    }

    #[test]
    fn test_condition_negate() {
        assert_eq!(Condition::Lt.negate(), Condition::Ge);
        assert_eq!(Condition::Eq.negate().negate(), Condition::Eq);
    }
}

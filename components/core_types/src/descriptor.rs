//! JVM type descriptors.
//!
//! Field descriptors (`I`, `J`, `Ljava/lang/String;`, `[[D`) and method
//! descriptors (`(ILjava/lang/String;)V`) as defined by the class file format.
//! The descriptor determines how many local-variable slots a value occupies
//! and which family of load/store/arithmetic opcodes applies to it.

use std::fmt;
use thiserror::Error;

/// Failure to parse a descriptor string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid descriptor '{descriptor}': {reason}")]
pub struct DescriptorError {
    /// The offending descriptor text
    pub descriptor: String,
    /// What was wrong with it
    pub reason: String,
}

impl DescriptorError {
    fn new(descriptor: &str, reason: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

/// Storage category of a value, as seen by local-variable and operand-stack
/// instructions.
///
/// `boolean`, `byte`, `char`, `short` and `int` all share the `Int` category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// int-like primitives
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// object and array references
    Reference,
}

impl StorageKind {
    /// Number of slots a value of this kind occupies
    pub fn width(self) -> u16 {
        match self {
            StorageKind::Long | StorageKind::Double => 2,
            _ => 1,
        }
    }
}

/// A JVM field descriptor.
///
/// # Examples
///
/// ```
/// use core_types::TypeDescriptor;
///
/// let string = TypeDescriptor::parse("Ljava/lang/String;").unwrap();
/// assert_eq!(string.display_name(), "java.lang.String");
/// assert_eq!(string.width(), 1);
///
/// let matrix = TypeDescriptor::parse("[[D").unwrap();
/// assert_eq!(matrix.display_name(), "double[][]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Parse a complete field descriptor
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let (ty, rest) = Self::parse_prefix(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(DescriptorError::new(descriptor, "trailing characters"));
        }
        Ok(ty)
    }

    /// Parse one field descriptor from the front of `input`, returning the rest
    fn parse_prefix<'a>(
        input: &'a str,
        whole: &str,
    ) -> Result<(TypeDescriptor, &'a str), DescriptorError> {
        let mut chars = input.chars();
        let tag = chars
            .next()
            .ok_or_else(|| DescriptorError::new(whole, "unexpected end"))?;
        let rest = chars.as_str();
        let ty = match tag {
            'Z' => TypeDescriptor::Boolean,
            'B' => TypeDescriptor::Byte,
            'C' => TypeDescriptor::Char,
            'S' => TypeDescriptor::Short,
            'I' => TypeDescriptor::Int,
            'J' => TypeDescriptor::Long,
            'F' => TypeDescriptor::Float,
            'D' => TypeDescriptor::Double,
            'L' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| DescriptorError::new(whole, "unterminated class name"))?;
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(DescriptorError::new(whole, "empty class name"));
                }
                return Ok((TypeDescriptor::Object(name.to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (component, rest) = Self::parse_prefix(rest, whole)?;
                return Ok((TypeDescriptor::Array(Box::new(component)), rest));
            }
            other => {
                return Err(DescriptorError::new(
                    whole,
                    format!("unknown type tag '{}'", other),
                ))
            }
        };
        Ok((ty, rest))
    }

    /// Build a type from a Java source-level name.
    ///
    /// Accepts primitive keywords (`int`), binary class names using dots or
    /// slashes (`java.lang.String`) and trailing `[]` pairs for arrays.
    pub fn from_java_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(component) = name.strip_suffix("[]") {
            return Self::from_java_name(component).map(|c| TypeDescriptor::Array(Box::new(c)));
        }
        let ty = match name {
            "boolean" => TypeDescriptor::Boolean,
            "byte" => TypeDescriptor::Byte,
            "char" => TypeDescriptor::Char,
            "short" => TypeDescriptor::Short,
            "int" => TypeDescriptor::Int,
            "long" => TypeDescriptor::Long,
            "float" => TypeDescriptor::Float,
            "double" => TypeDescriptor::Double,
            "" | "void" => return None,
            other => TypeDescriptor::Object(other.replace('.', "/")),
        };
        Some(ty)
    }

    /// Shorthand for an object type from an internal name
    pub fn object(internal_name: impl Into<String>) -> Self {
        TypeDescriptor::Object(internal_name.into())
    }

    /// Shorthand for `Ljava/lang/String;`
    pub fn string() -> Self {
        TypeDescriptor::object("java/lang/String")
    }

    /// The descriptor text, e.g. `I` or `Ljava/lang/Object;`
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Java source form of the type, e.g. `int`, `java.lang.String`, `long[]`
    pub fn display_name(&self) -> String {
        match self {
            TypeDescriptor::Boolean => "boolean".to_string(),
            TypeDescriptor::Byte => "byte".to_string(),
            TypeDescriptor::Char => "char".to_string(),
            TypeDescriptor::Short => "short".to_string(),
            TypeDescriptor::Int => "int".to_string(),
            TypeDescriptor::Long => "long".to_string(),
            TypeDescriptor::Float => "float".to_string(),
            TypeDescriptor::Double => "double".to_string(),
            TypeDescriptor::Object(name) => name.replace('/', "."),
            TypeDescriptor::Array(component) => format!("{}[]", component.display_name()),
        }
    }

    /// Name used for a `CONSTANT_Class` entry: the internal name for objects,
    /// the full descriptor for arrays. `None` for primitives.
    pub fn class_constant_name(&self) -> Option<String> {
        match self {
            TypeDescriptor::Object(name) => Some(name.clone()),
            TypeDescriptor::Array(_) => Some(self.descriptor()),
            _ => None,
        }
    }

    /// Storage category used to select opcodes
    pub fn storage_kind(&self) -> StorageKind {
        match self {
            TypeDescriptor::Boolean
            | TypeDescriptor::Byte
            | TypeDescriptor::Char
            | TypeDescriptor::Short
            | TypeDescriptor::Int => StorageKind::Int,
            TypeDescriptor::Long => StorageKind::Long,
            TypeDescriptor::Float => StorageKind::Float,
            TypeDescriptor::Double => StorageKind::Double,
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => StorageKind::Reference,
        }
    }

    /// Number of local-variable slots occupied: 2 for `long`/`double`, else 1
    pub fn width(&self) -> u16 {
        self.storage_kind().width()
    }

    /// Check if this is one of the two wide primitives
    pub fn is_wide(&self) -> bool {
        self.width() == 2
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        !self.is_reference()
    }

    /// Check if this is an object or array type
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDescriptor::Object(_) | TypeDescriptor::Array(_))
    }

    /// Check if this is a numeric primitive (everything except `boolean`)
    pub fn is_numeric(&self) -> bool {
        self.is_primitive() && *self != TypeDescriptor::Boolean
    }

    /// Check if this is an integral primitive (`byte`, `short`, `char`, `int`, `long`)
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Byte
                | TypeDescriptor::Short
                | TypeDescriptor::Char
                | TypeDescriptor::Int
                | TypeDescriptor::Long
        )
    }

    /// Check if this is `Ljava/lang/String;`
    pub fn is_string(&self) -> bool {
        matches!(self, TypeDescriptor::Object(name) if name == "java/lang/String")
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Boolean => f.write_str("Z"),
            TypeDescriptor::Byte => f.write_str("B"),
            TypeDescriptor::Char => f.write_str("C"),
            TypeDescriptor::Short => f.write_str("S"),
            TypeDescriptor::Int => f.write_str("I"),
            TypeDescriptor::Long => f.write_str("J"),
            TypeDescriptor::Float => f.write_str("F"),
            TypeDescriptor::Double => f.write_str("D"),
            TypeDescriptor::Object(name) => write!(f, "L{};", name),
            TypeDescriptor::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// A JVM method descriptor.
///
/// # Examples
///
/// ```
/// use core_types::{MethodDescriptor, TypeDescriptor};
///
/// let desc = MethodDescriptor::parse("(IJLjava/lang/String;)V").unwrap();
/// assert_eq!(desc.params.len(), 3);
/// assert_eq!(desc.param_slots(), 4);
/// assert_eq!(desc.return_type, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types in declaration order
    pub params: Vec<TypeDescriptor>,
    /// Return type, `None` for `void`
    pub return_type: Option<TypeDescriptor>,
}

impl MethodDescriptor {
    /// Create a descriptor from parts
    pub fn new(params: Vec<TypeDescriptor>, return_type: Option<TypeDescriptor>) -> Self {
        Self {
            params,
            return_type,
        }
    }

    /// Parse a method descriptor string
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut rest = descriptor
            .strip_prefix('(')
            .ok_or_else(|| DescriptorError::new(descriptor, "expected '('"))?;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(DescriptorError::new(descriptor, "unterminated parameter list"));
            }
            let (param, after) = TypeDescriptor::parse_prefix(rest, descriptor)?;
            params.push(param);
            rest = after;
        }
        let return_type = if rest == "V" {
            None
        } else {
            let (ty, after) = TypeDescriptor::parse_prefix(rest, descriptor)?;
            if !after.is_empty() {
                return Err(DescriptorError::new(descriptor, "trailing characters"));
            }
            Some(ty)
        };
        Ok(Self {
            params,
            return_type,
        })
    }

    /// Total local/stack slots taken by the parameters
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(TypeDescriptor::width).sum()
    }

    /// Stack slots pushed by the return value (0 for `void`)
    pub fn return_slots(&self) -> u16 {
        self.return_type.as_ref().map_or(0, TypeDescriptor::width)
    }

    /// The descriptor text
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(ty) => write!(f, "{}", ty),
            None => f.write_str("V"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(TypeDescriptor::parse("I").unwrap(), TypeDescriptor::Int);
        assert_eq!(TypeDescriptor::parse("J").unwrap(), TypeDescriptor::Long);
        assert_eq!(TypeDescriptor::parse("Z").unwrap(), TypeDescriptor::Boolean);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TypeDescriptor::parse("").is_err());
        assert!(TypeDescriptor::parse("Q").is_err());
        assert!(TypeDescriptor::parse("Ljava/lang/String").is_err());
        assert!(TypeDescriptor::parse("II").is_err());
    }

    #[test]
    fn test_width_rules() {
        assert_eq!(TypeDescriptor::Long.width(), 2);
        assert_eq!(TypeDescriptor::Double.width(), 2);
        assert_eq!(TypeDescriptor::Int.width(), 1);
        assert_eq!(TypeDescriptor::Float.width(), 1);
        assert_eq!(TypeDescriptor::string().width(), 1);
        assert_eq!(
            TypeDescriptor::Array(Box::new(TypeDescriptor::Long)).width(),
            1
        );
    }

    #[test]
    fn test_from_java_name() {
        assert_eq!(
            TypeDescriptor::from_java_name("java.lang.String"),
            Some(TypeDescriptor::string())
        );
        assert_eq!(
            TypeDescriptor::from_java_name("int[][]").map(|t| t.descriptor()),
            Some("[[I".to_string())
        );
        assert_eq!(TypeDescriptor::from_java_name("void"), None);
    }

    #[test]
    fn test_class_constant_name() {
        assert_eq!(
            TypeDescriptor::string().class_constant_name().as_deref(),
            Some("java/lang/String")
        );
        assert_eq!(
            TypeDescriptor::parse("[I").unwrap().class_constant_name().as_deref(),
            Some("[I")
        );
        assert_eq!(TypeDescriptor::Int.class_constant_name(), None);
    }

    #[test]
    fn test_method_descriptor_round_trip_text() {
        let text = "([Ljava/lang/String;DI)Ljava/lang/Object;";
        let desc = MethodDescriptor::parse(text).unwrap();
        assert_eq!(desc.param_slots(), 4);
        assert_eq!(desc.return_slots(), 1);
        assert_eq!(desc.descriptor(), text);
    }

    #[test]
    fn test_method_descriptor_errors() {
        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(I)VV").is_err());
    }
}

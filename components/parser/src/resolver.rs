//! Host symbol resolution used by the bytecode generator
//!
//! The generator knows the locals of the fragment and the method it is
//! spliced into. Everything else (classes, fields, methods) is looked up
//! through a [`SymbolResolver`] supplied by the host.

use core_types::{MethodDescriptor, TypeDescriptor};

/// A field visible to generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Internal name of the declaring class
    pub owner: String,
    /// Field name
    pub name: String,
    /// Field type
    pub descriptor: TypeDescriptor,
    /// Static field
    pub is_static: bool,
}

/// A method or constructor visible to generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Internal name of the declaring class
    pub owner: String,
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Parameter and return types
    pub descriptor: MethodDescriptor,
    /// Static method
    pub is_static: bool,
    /// Private method (invoked with `invokespecial`)
    pub is_private: bool,
}

impl MethodRef {
    /// Java-like signature for messages, e.g. `println(int)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .descriptor
            .params
            .iter()
            .map(TypeDescriptor::display_name)
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Resolves names that are not locals of the fragment
pub trait SymbolResolver {
    /// Internal name of the class a source-level name refers to
    ///
    /// `name` may be simple (`String`) or dotted (`java.util.List`).
    fn resolve_class(&self, name: &str) -> Option<String>;

    /// Field `name` of `owner` or one of its supertypes
    fn field(&self, owner: &str, name: &str) -> Option<FieldRef>;

    /// Methods called `name` declared by `owner` or inherited by it
    fn methods(&self, owner: &str, name: &str) -> Vec<MethodRef>;

    /// Check if `owner` is an interface
    fn is_interface(&self, _owner: &str) -> bool {
        false
    }

    /// Check if `class` is `ancestor` or a subtype of it; `None` if unknown
    fn is_subclass(&self, class: &str, ancestor: &str) -> Option<bool> {
        if class == ancestor || ancestor == "java/lang/Object" {
            Some(true)
        } else {
            None
        }
    }
}

/// `java.lang` classes a detached generator can name without a host
const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "StringBuilder",
    "System",
    "Math",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Boolean",
    "Character",
    "Byte",
    "Short",
    "Thread",
    "Throwable",
    "Exception",
    "RuntimeException",
    "IllegalStateException",
    "IllegalArgumentException",
];

/// Resolver with no host: dotted names and core `java.lang` classes only,
/// no fields or methods
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedResolver;

impl SymbolResolver for DetachedResolver {
    fn resolve_class(&self, name: &str) -> Option<String> {
        if name.contains('.') {
            return Some(name.replace('.', "/"));
        }
        JAVA_LANG
            .contains(&name)
            .then(|| format!("java/lang/{}", name))
    }

    fn field(&self, _owner: &str, _name: &str) -> Option<FieldRef> {
        None
    }

    fn methods(&self, _owner: &str, _name: &str) -> Vec<MethodRef> {
        Vec::new()
    }
}

/// The method a fragment is compiled into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// Internal name of the declaring class
    pub class_name: String,
    /// Method name
    pub method_name: String,
    /// Method descriptor
    pub descriptor: MethodDescriptor,
    /// Static method (no `this` in slot 0)
    pub is_static: bool,
}

impl MethodContext {
    /// Create a context
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        descriptor: MethodDescriptor,
        is_static: bool,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor,
            is_static,
        }
    }

    /// A `static void run()` method of a class called `Patch`
    pub fn detached() -> Self {
        Self::new("Patch", "run", MethodDescriptor::new(Vec::new(), None), true)
    }

    /// First slot not taken by `this` and the parameters
    pub fn first_free_slot(&self) -> u16 {
        self.descriptor.param_slots() + if self.is_static { 0 } else { 1 }
    }
}

impl Default for MethodContext {
    fn default() -> Self {
        Self::detached()
    }
}

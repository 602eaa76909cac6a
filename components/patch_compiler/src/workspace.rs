//! Workspace model and host symbol resolution
//!
//! A [`Workspace`] describes the classes a patch can refer to: the primary
//! resource being edited, its libraries and a built-in model of the core
//! runtime classes. [`WorkspaceResolver`] answers the generator's lookups
//! against it.

use crate::error::{CompileError, CompileResult};
use crate::jdk;
use crate::metadata::{LocalVariable, MethodMetadata};
use bytecode_system::ConstPool;
use core_types::{MethodDescriptor, TypeDescriptor};
use parser::{FieldRef, MethodContext, MethodRef, SymbolResolver};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

const OBJECT: &str = "java/lang/Object";

/// A field declared by a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Static field
    #[serde(default)]
    pub is_static: bool,
}

impl FieldInfo {
    /// An instance field
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            is_static: false,
        }
    }

    /// A static field
    pub fn new_static(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::new(name, descriptor)
        }
    }
}

/// A method declared by a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Static method
    #[serde(default)]
    pub is_static: bool,
    /// Private method
    #[serde(default)]
    pub is_private: bool,
    /// Declared max-locals of the method's code, if known
    #[serde(default)]
    pub max_locals: Option<u16>,
    /// Local variable table, if known
    #[serde(default)]
    pub locals: Vec<LocalVariable>,
}

impl MethodInfo {
    /// An instance method
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            is_static: false,
            is_private: false,
            max_locals: None,
            locals: Vec::new(),
        }
    }

    /// A static method
    pub fn new_static(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::new(name, descriptor)
        }
    }

    /// Mark the method private
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Attach a local variable table
    pub fn with_locals(mut self, max_locals: u16, locals: Vec<LocalVariable>) -> Self {
        self.max_locals = Some(max_locals);
        self.locals = locals;
        self
    }

    /// Parsed descriptor
    pub fn method_descriptor(&self) -> CompileResult<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor).map_err(|e| {
            CompileError::InvalidMetadata(format!("method {}{}: {}", self.name, self.descriptor, e))
        })
    }

    /// Local variable metadata of the method declared in `owner`
    ///
    /// Falls back to names derived from the descriptor when the method has
    /// no local variable table.
    pub fn metadata(&self, owner: &str) -> CompileResult<MethodMetadata> {
        let derived =
            MethodMetadata::from_descriptor(owner, self.is_static, &self.method_descriptor()?);
        if self.locals.is_empty() {
            return Ok(MethodMetadata::new(
                derived.max_locals.max(self.max_locals.unwrap_or(0)),
                derived.locals,
            ));
        }
        Ok(MethodMetadata::new(
            self.max_locals.unwrap_or(0).max(derived.max_locals),
            self.locals.clone(),
        ))
    }
}

/// A class known to the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Internal name (`com/example/Foo`)
    pub name: String,
    /// Internal name of the superclass
    #[serde(default)]
    pub super_name: Option<String>,
    /// Internal names of the implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Interface type
    #[serde(default)]
    pub is_interface: bool,
    /// Declared fields
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    /// Declared methods and constructors
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    /// `constant_pool_count` of the class file
    #[serde(default)]
    pub constant_pool_count: u16,
}

impl ClassInfo {
    /// A class extending `java/lang/Object`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().replace('.', "/");
        let super_name = (name != OBJECT).then(|| OBJECT.to_string());
        Self {
            name,
            super_name,
            interfaces: Vec::new(),
            is_interface: false,
            fields: Vec::new(),
            methods: Vec::new(),
            constant_pool_count: 1,
        }
    }

    /// An interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            is_interface: true,
            ..Self::new(name)
        }
    }

    /// Set the superclass
    pub fn extends(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a field
    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Set the constant pool count
    pub fn with_constant_pool_count(mut self, count: u16) -> Self {
        self.constant_pool_count = count;
        self
    }

    /// Package part of the internal name, empty for the default package
    pub fn package(&self) -> &str {
        self.name.rsplit_once('/').map_or("", |(package, _)| package)
    }

    /// Simple name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit_once('/').map_or(&self.name, |(_, simple)| simple)
    }

    /// Declared field named `name`
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Declared method with this name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    /// Supertypes in declaration order
    fn supertypes(&self) -> impl Iterator<Item = &String> {
        self.super_name.iter().chain(self.interfaces.iter())
    }
}

/// A named set of classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display name (jar or directory)
    pub name: String,
    /// Classes of the resource
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

impl Resource {
    /// Create an empty resource
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
        }
    }

    /// Add a class
    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    /// Class with this internal name
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|class| class.name == name)
    }
}

/// Classes visible to a patch: primary resource, libraries, runtime model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Resource being edited
    pub primary: Resource,
    /// Libraries of the primary resource
    #[serde(default)]
    pub libraries: Vec<Resource>,
    #[serde(skip, default = "jdk::runtime_classes")]
    runtime: Vec<ClassInfo>,
}

impl Workspace {
    /// Create a workspace around a primary resource
    pub fn new(primary: Resource) -> Self {
        Self {
            primary,
            libraries: Vec::new(),
            runtime: jdk::runtime_classes(),
        }
    }

    /// Add a library resource
    pub fn with_library(mut self, library: Resource) -> Self {
        self.libraries.push(library);
        self
    }

    /// Parse a workspace description
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Class with this internal name, searched in lookup order
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.primary
            .class(name)
            .or_else(|| self.libraries.iter().find_map(|lib| lib.class(name)))
            .or_else(|| self.runtime.iter().find(|class| class.name == name))
    }

    /// Every class, in lookup order
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.primary
            .classes
            .iter()
            .chain(self.libraries.iter().flat_map(|lib| lib.classes.iter()))
            .chain(self.runtime.iter())
    }
}

/// The class and method a patch session edits
#[derive(Debug, Clone)]
pub struct TargetContext {
    /// Workspace the names of the patch resolve against
    pub workspace: Arc<Workspace>,
    /// Internal name of the class under edit
    pub class_name: String,
    /// Name of the method under edit
    pub method_name: String,
    /// Descriptor of the method under edit
    pub method_descriptor: String,
}

impl TargetContext {
    /// Create a context; dots in the class name are accepted
    pub fn new(
        workspace: Arc<Workspace>,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        method_descriptor: impl Into<String>,
    ) -> Self {
        Self {
            workspace,
            class_name: class_name.into().replace('.', "/"),
            method_name: method_name.into(),
            method_descriptor: method_descriptor.into(),
        }
    }

    /// Create a context from a `name(descriptor)` method signature such as `run(I)V`
    pub fn parse_method(
        workspace: Arc<Workspace>,
        class_name: impl Into<String>,
        method: &str,
    ) -> CompileResult<Self> {
        let split = method.find('(').ok_or_else(|| {
            CompileError::HookInstallation(format!(
                "method '{}' must be written as name(descriptor)",
                method
            ))
        })?;
        let (name, descriptor) = method.split_at(split);
        Ok(Self::new(workspace, class_name, name, descriptor))
    }

    /// The class under edit
    pub fn class(&self) -> CompileResult<&ClassInfo> {
        self.workspace.class(&self.class_name).ok_or_else(|| {
            CompileError::HookInstallation(format!(
                "class {} is not in the workspace",
                self.class_name
            ))
        })
    }

    /// The method under edit
    pub fn method(&self) -> CompileResult<&MethodInfo> {
        self.class()?
            .method(&self.method_name, &self.method_descriptor)
            .ok_or_else(|| {
                CompileError::HookInstallation(format!(
                    "method {}.{}{} is not declared",
                    self.class_name, self.method_name, self.method_descriptor
                ))
            })
    }

    /// Generator view of the method under edit
    pub fn method_context(&self) -> CompileResult<MethodContext> {
        let method = self.method()?;
        Ok(MethodContext::new(
            self.class_name.clone(),
            self.method_name.clone(),
            method.method_descriptor()?,
            method.is_static,
        ))
    }

    /// Local variable metadata of the method under edit
    pub fn metadata(&self) -> CompileResult<MethodMetadata> {
        self.method()?.metadata(&self.class_name)
    }

    /// The class constant pool, ready for appended entries
    pub fn constant_pool(&self) -> CompileResult<ConstPool> {
        Ok(ConstPool::with_reserved(self.class()?.constant_pool_count))
    }

    /// Check if both contexts name the same method of the same workspace
    pub fn same_target(&self, other: &TargetContext) -> bool {
        Arc::ptr_eq(&self.workspace, &other.workspace)
            && self.class_name == other.class_name
            && self.method_name == other.method_name
            && self.method_descriptor == other.method_descriptor
    }
}

/// [`SymbolResolver`] over a workspace, from the point of view of one class
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    workspace: Arc<Workspace>,
    class_name: String,
}

impl WorkspaceResolver {
    /// Create a resolver for code inside `class_name`
    pub fn new(workspace: Arc<Workspace>, class_name: impl Into<String>) -> Self {
        Self {
            workspace,
            class_name: class_name.into(),
        }
    }

    /// Create a resolver for the class of a target context
    pub fn for_target(context: &TargetContext) -> Self {
        Self::new(Arc::clone(&context.workspace), context.class_name.clone())
    }

    /// `owner` followed by its supertypes, breadth first, each listed once
    fn hierarchy(&self, owner: &str) -> Vec<&ClassInfo> {
        let mut seen = HashSet::new();
        let mut queue = vec![owner.to_string()];
        let mut classes = Vec::new();
        let mut next = 0;
        while next < queue.len() {
            let name = queue[next].clone();
            next += 1;
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(class) = self.workspace.class(&name) {
                queue.extend(class.supertypes().cloned());
                classes.push(class);
            }
        }
        // interfaces inherit the members of Object
        if !seen.contains(OBJECT) {
            if let Some(object) = self.workspace.class(OBJECT) {
                classes.push(object);
            }
        }
        classes
    }

    fn package(&self) -> &str {
        self.class_name
            .rsplit_once('/')
            .map_or("", |(package, _)| package)
    }
}

impl SymbolResolver for WorkspaceResolver {
    fn resolve_class(&self, name: &str) -> Option<String> {
        if name.contains('.') || name.contains('/') {
            let internal = name.replace('.', "/");
            return self.workspace.class(&internal).map(|class| class.name.clone());
        }

        let package = self.package();
        let same_package = if package.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", package, name)
        };
        if let Some(class) = self.workspace.class(&same_package) {
            return Some(class.name.clone());
        }
        if let Some(class) = self.workspace.class(&format!("java/lang/{}", name)) {
            return Some(class.name.clone());
        }

        let mut matches = self
            .workspace
            .classes()
            .filter(|class| class.simple_name() == name)
            .map(|class| class.name.as_str())
            .collect::<Vec<_>>();
        matches.dedup();
        match matches.as_slice() {
            [only] => Some(only.to_string()),
            _ => None,
        }
    }

    fn field(&self, owner: &str, name: &str) -> Option<FieldRef> {
        self.hierarchy(owner).into_iter().find_map(|class| {
            let field = class.field(name)?;
            match TypeDescriptor::parse(&field.descriptor) {
                Ok(descriptor) => Some(FieldRef {
                    owner: class.name.clone(),
                    name: field.name.clone(),
                    descriptor,
                    is_static: field.is_static,
                }),
                Err(err) => {
                    warn!(class = %class.name, field = %field.name, %err, "skipping field with bad descriptor");
                    None
                }
            }
        })
    }

    fn methods(&self, owner: &str, name: &str) -> Vec<MethodRef> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        let classes = if name == "<init>" {
            self.workspace.class(owner).into_iter().collect()
        } else {
            self.hierarchy(owner)
        };
        for class in classes {
            for method in class.methods.iter().filter(|m| m.name == name) {
                // overridden declarations further up are hidden
                if !seen.insert(method.descriptor.as_str()) {
                    continue;
                }
                if method.is_private && class.name != self.class_name {
                    continue;
                }
                match MethodDescriptor::parse(&method.descriptor) {
                    Ok(descriptor) => methods.push(MethodRef {
                        owner: if method.is_static {
                            class.name.clone()
                        } else {
                            owner.to_string()
                        },
                        name: method.name.clone(),
                        descriptor,
                        is_static: method.is_static,
                        is_private: method.is_private,
                    }),
                    Err(err) => {
                        warn!(class = %class.name, method = %method.name, %err, "skipping method with bad descriptor");
                    }
                }
            }
        }
        methods
    }

    fn is_interface(&self, owner: &str) -> bool {
        self.workspace
            .class(owner)
            .map_or(false, |class| class.is_interface)
    }

    fn is_subclass(&self, class: &str, ancestor: &str) -> Option<bool> {
        if class == ancestor || ancestor == OBJECT {
            return Some(true);
        }
        let mut seen = HashSet::new();
        let mut pending = vec![class.to_string()];
        let mut complete = true;
        while let Some(name) = pending.pop() {
            if name == ancestor {
                return Some(true);
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            match self.workspace.class(&name) {
                Some(info) => pending.extend(info.supertypes().cloned()),
                None => complete = false,
            }
        }
        complete.then_some(false)
    }
}

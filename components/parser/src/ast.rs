//! Abstract Syntax Tree node definitions

use bytecode_system::LocalSlot;
use core_types::{SourcePosition, TypeDescriptor};
use std::fmt;

/// Base of a declared type, before array dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    /// One of the eight primitive keywords
    Primitive(TypeDescriptor),
    /// Simple or dotted class name as written (`String`, `java.util.List`)
    Named(String),
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Element type
    pub base: BaseType,
    /// Number of `[]` pairs
    pub dimensions: u8,
    /// Source location
    pub position: Option<SourcePosition>,
}

impl TypeRef {
    /// A primitive type reference
    pub fn primitive(descriptor: TypeDescriptor) -> Self {
        Self {
            base: BaseType::Primitive(descriptor),
            dimensions: 0,
            position: None,
        }
    }

    /// A named (class) type reference
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            base: BaseType::Named(name.into()),
            dimensions: 0,
            position: None,
        }
    }

    /// Same type with one more array dimension
    pub fn array_of(mut self) -> Self {
        self.dimensions += 1;
        self
    }

    /// The descriptor, if it can be known without resolving class names
    pub fn primitive_descriptor(&self) -> Option<TypeDescriptor> {
        match &self.base {
            BaseType::Primitive(descriptor) => {
                let mut ty = descriptor.clone();
                for _ in 0..self.dimensions {
                    ty = TypeDescriptor::Array(Box::new(ty));
                }
                Some(ty)
            }
            BaseType::Named(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            BaseType::Primitive(descriptor) => f.write_str(&descriptor.display_name())?,
            BaseType::Named(name) => f.write_str(name)?,
        }
        for _ in 0..self.dimensions {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// One variable of a local declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// Variable name
    pub name: String,
    /// Declared type
    pub type_ref: TypeRef,
    /// Initializer
    pub init: Option<Expression>,
    /// Local variable slot assigned before emission
    pub local_slot: Option<LocalSlot>,
    /// Canonical Java name of the variable's type (`int`, `java.lang.String`)
    pub resolved_class_name: Option<String>,
    /// Source location
    pub position: Option<SourcePosition>,
}

/// Java statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Local variable declaration
    VariableDeclaration {
        /// `final` modifier present
        is_final: bool,
        /// List of declarators
        declarations: Vec<Declarator>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Expression statement
    ExpressionStatement {
        /// The expression
        expression: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// If statement
    IfStatement {
        /// Condition
        test: Expression,
        /// Consequent statement
        consequent: Box<Statement>,
        /// Alternate statement
        alternate: Option<Box<Statement>>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// While loop
    WhileStatement {
        /// Condition
        test: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Do-while loop
    DoWhileStatement {
        /// Loop body
        body: Box<Statement>,
        /// Condition
        test: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Classic for loop
    ForStatement {
        /// Initializer statements (one declaration or expression statements)
        init: Vec<Statement>,
        /// Condition
        test: Option<Expression>,
        /// Update expressions
        update: Vec<Expression>,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Block statement
    BlockStatement {
        /// Statements in block
        body: Vec<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Return statement
    ReturnStatement {
        /// Return value
        argument: Option<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Break statement
    BreakStatement {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Continue statement
    ContinueStatement {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Throw statement
    ThrowStatement {
        /// Exception expression
        argument: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Empty statement
    EmptyStatement {
        /// Source location
        position: Option<SourcePosition>,
    },
}

impl Statement {
    /// Source position of the statement
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Statement::VariableDeclaration { position, .. }
            | Statement::ExpressionStatement { position, .. }
            | Statement::IfStatement { position, .. }
            | Statement::WhileStatement { position, .. }
            | Statement::DoWhileStatement { position, .. }
            | Statement::ForStatement { position, .. }
            | Statement::BlockStatement { position, .. }
            | Statement::ReturnStatement { position, .. }
            | Statement::BreakStatement { position }
            | Statement::ContinueStatement { position }
            | Statement::ThrowStatement { position, .. }
            | Statement::EmptyStatement { position } => *position,
        }
    }

    /// Visit every declarator in this statement and its nested statements,
    /// in source order
    pub fn visit_declarators_mut<E, F>(&mut self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Declarator) -> Result<(), E>,
    {
        match self {
            Statement::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    visit(declarator)?;
                }
            }
            Statement::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                consequent.visit_declarators_mut(visit)?;
                if let Some(alternate) = alternate {
                    alternate.visit_declarators_mut(visit)?;
                }
            }
            Statement::WhileStatement { body, .. } | Statement::DoWhileStatement { body, .. } => {
                body.visit_declarators_mut(visit)?;
            }
            Statement::ForStatement { init, body, .. } => {
                for statement in init {
                    statement.visit_declarators_mut(visit)?;
                }
                body.visit_declarators_mut(visit)?;
            }
            Statement::BlockStatement { body, .. } => {
                for statement in body {
                    statement.visit_declarators_mut(visit)?;
                }
            }
            Statement::ExpressionStatement { .. }
            | Statement::ReturnStatement { .. }
            | Statement::BreakStatement { .. }
            | Statement::ContinueStatement { .. }
            | Statement::ThrowStatement { .. }
            | Statement::EmptyStatement { .. } => {}
        }
        Ok(())
    }

    /// Names declared by this statement and its nested statements
    pub fn declared_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut copy = self.clone();
        let _ = copy.visit_declarators_mut(&mut |declarator: &mut Declarator| {
            names.push(declarator.name.clone());
            Ok::<(), ()>(())
        });
        names
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// int
    Int(i32),
    /// long
    Long(i64),
    /// float
    Float(f32),
    /// double
    Double(f64),
    /// char (UTF-16 code unit)
    Char(u16),
    /// String
    String(String),
    /// boolean
    Boolean(bool),
    /// null
    Null,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Rem,
    /// <<
    Shl,
    /// >>
    Shr,
    /// >>>
    Ushr,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
}

impl BinaryOperator {
    /// Check if the operator yields a boolean comparison
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    /// Check if the operator is a shift
    pub fn is_shift(self) -> bool {
        matches!(
            self,
            BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::Ushr
        )
    }

    /// Check if the operator is `&`, `|` or `^`
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::BitXor
        )
    }

    /// Source spelling
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::Ushr => ">>>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
    /// ~
    BitNot,
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
}

/// Increment or decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// Java expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal {
        /// The value
        value: Literal,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Simple name (local, field or class)
    Identifier {
        /// Name
        name: String,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `this`
    ThisExpression {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Field access or qualified name (`a.b`)
    MemberExpression {
        /// Qualifier
        object: Box<Expression>,
        /// Member name
        property: String,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Method invocation
    CallExpression {
        /// Receiver or class qualifier; `None` for unqualified calls
        callee: Option<Box<Expression>>,
        /// Method name
        method: String,
        /// Arguments
        arguments: Vec<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Instance creation (`new T(args)`)
    NewExpression {
        /// Class to instantiate
        class: TypeRef,
        /// Constructor arguments
        arguments: Vec<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Array creation (`new T[n]`)
    NewArrayExpression {
        /// Element type (may itself be an array type)
        element: TypeRef,
        /// Length
        length: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Array element access
    IndexExpression {
        /// Array
        array: Box<Expression>,
        /// Index
        index: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Assignment, simple (`operator == None`) or compound
    AssignmentExpression {
        /// Target
        target: Box<Expression>,
        /// Operator of a compound assignment
        operator: Option<BinaryOperator>,
        /// Assigned value
        value: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `++`/`--`
    UpdateExpression {
        /// Operator
        operator: UpdateOperator,
        /// Prefix form
        prefix: bool,
        /// Target
        argument: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Binary operation
    BinaryExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `&&` / `||`
    LogicalExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: LogicalOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `test ? consequent : alternate`
    ConditionalExpression {
        /// Condition
        test: Box<Expression>,
        /// Value if true
        consequent: Box<Expression>,
        /// Value if false
        alternate: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `(T) expr`
    CastExpression {
        /// Target type
        type_ref: TypeRef,
        /// Operand
        argument: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `expr instanceof T`
    InstanceOfExpression {
        /// Operand
        argument: Box<Expression>,
        /// Tested type
        type_ref: TypeRef,
        /// Source location
        position: Option<SourcePosition>,
    },
}

impl Expression {
    /// Source position of the expression
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Expression::Literal { position, .. }
            | Expression::Identifier { position, .. }
            | Expression::ThisExpression { position }
            | Expression::MemberExpression { position, .. }
            | Expression::CallExpression { position, .. }
            | Expression::NewExpression { position, .. }
            | Expression::NewArrayExpression { position, .. }
            | Expression::IndexExpression { position, .. }
            | Expression::AssignmentExpression { position, .. }
            | Expression::UpdateExpression { position, .. }
            | Expression::UnaryExpression { position, .. }
            | Expression::BinaryExpression { position, .. }
            | Expression::LogicalExpression { position, .. }
            | Expression::ConditionalExpression { position, .. }
            | Expression::CastExpression { position, .. }
            | Expression::InstanceOfExpression { position, .. } => *position,
        }
    }

    /// Dotted name for a chain of identifiers (`java.lang.System`), if the
    /// expression is one
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Expression::Identifier { name, .. } => Some(name.clone()),
            Expression::MemberExpression {
                object, property, ..
            } => object
                .qualified_name()
                .map(|prefix| format!("{}.{}", prefix, property)),
            _ => None,
        }
    }

    /// Check if the expression may appear on the left of `=`
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier { .. }
                | Expression::MemberExpression { .. }
                | Expression::IndexExpression { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expression {
        Expression::Identifier {
            name: name.to_string(),
            position: None,
        }
    }

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::primitive(TypeDescriptor::Int).array_of();
        assert_eq!(ty.to_string(), "int[]");
        assert_eq!(
            ty.primitive_descriptor(),
            Some(TypeDescriptor::Array(Box::new(TypeDescriptor::Int)))
        );
        assert_eq!(TypeRef::named("java.util.List").primitive_descriptor(), None);
    }

    #[test]
    fn test_qualified_name() {
        let expr = Expression::MemberExpression {
            object: Box::new(Expression::MemberExpression {
                object: Box::new(ident("java")),
                property: "lang".to_string(),
                position: None,
            }),
            property: "System".to_string(),
            position: None,
        };
        assert_eq!(expr.qualified_name(), Some("java.lang.System".to_string()));
        assert!(expr.is_assignable());
    }

    #[test]
    fn test_visit_nested_declarators() {
        let declarator = |name: &str| Declarator {
            name: name.to_string(),
            type_ref: TypeRef::primitive(TypeDescriptor::Int),
            init: None,
            local_slot: None,
            resolved_class_name: None,
            position: None,
        };
        let statement = Statement::IfStatement {
            test: Expression::Literal {
                value: Literal::Boolean(true),
                position: None,
            },
            consequent: Box::new(Statement::BlockStatement {
                body: vec![Statement::VariableDeclaration {
                    is_final: false,
                    declarations: vec![declarator("a"), declarator("b")],
                    position: None,
                }],
                position: None,
            }),
            alternate: None,
            position: None,
        };
        assert_eq!(statement.declared_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_operator_classes() {
        assert!(BinaryOperator::Le.is_comparison());
        assert!(BinaryOperator::Ushr.is_shift());
        assert!(BinaryOperator::BitXor.is_bitwise());
        assert!(!BinaryOperator::Add.is_comparison());
    }
}

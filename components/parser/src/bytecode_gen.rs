//! Bytecode generation from AST
//!
//! Lowers parsed statements to JVM instructions. Operand typing follows the
//! Java rules a method-body patch needs: binary numeric promotion, widening
//! assignment conversion, string concatenation through `StringBuilder` and
//! boolean values materialised from branches.
//!
//! Expression types are computed by visiting the expression in probing mode,
//! where every emission helper is inert.

use crate::ast::*;
use crate::error::{internal_error, reference_error, type_error};
use crate::resolver::{DetachedResolver, FieldRef, MethodContext, MethodRef, SymbolResolver};
use crate::scope::SymbolTable;
use bytecode_system::{
    ArrayElement, BytecodeChunk, Condition, ConstPool, IntegralKind, InvokeKind, LocalSlot,
    NumericKind, Opcode, PoolError, PrimitiveArrayType,
};
use core_types::{MethodDescriptor, SourceError, SourcePosition, TypeDescriptor};
use std::fmt;

const OBJECT: &str = "java/lang/Object";
const STRING_BUILDER: &str = "java/lang/StringBuilder";
const THROWABLE: &str = "java/lang/Throwable";

/// Static type of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// Result of a `void` method
    Void,
    /// The `null` literal
    Null,
    /// A typed value
    Value(TypeDescriptor),
}

impl ValueType {
    /// Operand stack slots taken by the value
    pub fn width(&self) -> u16 {
        match self {
            ValueType::Void => 0,
            ValueType::Null => 1,
            ValueType::Value(ty) => ty.width(),
        }
    }

    /// Java spelling used in diagnostics
    pub fn display_name(&self) -> String {
        match self {
            ValueType::Void => "void".to_string(),
            ValueType::Null => "<null>".to_string(),
            ValueType::Value(ty) => ty.display_name(),
        }
    }

    fn is_reference(&self) -> bool {
        match self {
            ValueType::Null => true,
            ValueType::Value(ty) => ty.is_reference(),
            ValueType::Void => false,
        }
    }

    fn is_string(&self) -> bool {
        matches!(self, ValueType::Value(ty) if ty.is_string())
    }

    fn is_boolean(&self) -> bool {
        *self == ValueType::Value(TypeDescriptor::Boolean)
    }
}

/// What a simple name refers to
enum NameRef {
    Local { slot: LocalSlot, ty: TypeDescriptor },
    Field(FieldRef),
    Class(String),
}

/// Result of visiting the qualifier of a member access
enum Qualifier {
    /// Dotted prefix that names neither a value nor a class
    Package(String),
    /// A class (static member access)
    Class(String),
    /// A value left on the operand stack
    Value(ValueType),
}

/// Assignable location; receiver operands are already on the stack
enum LValue {
    Local { slot: LocalSlot, ty: TypeDescriptor },
    Static(FieldRef),
    Field(FieldRef),
    Element(TypeDescriptor),
}

impl LValue {
    fn ty(&self) -> &TypeDescriptor {
        match self {
            LValue::Local { ty, .. } | LValue::Element(ty) => ty,
            LValue::Static(field) | LValue::Field(field) => &field.descriptor,
        }
    }
}

/// Operand conversions of an arithmetic, shift or bitwise operation
struct ArithmeticPlan {
    left: TypeDescriptor,
    right: TypeDescriptor,
    result: TypeDescriptor,
}

/// Pending jumps of the innermost loops
#[derive(Debug, Default)]
struct LoopFrame {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

/// Bytecode generator that converts AST to JVM bytecode
pub struct BytecodeGenerator {
    chunk: BytecodeChunk,
    context: MethodContext,
    resolver: Box<dyn SymbolResolver>,
    max_locals: u16,
    loops: Vec<LoopFrame>,
    position: Option<SourcePosition>,
    probing: bool,
}

impl BytecodeGenerator {
    /// Create a generator for a detached `static void run()` method with a
    /// fresh constant pool
    pub fn new() -> Self {
        Self::with_resolver(
            MethodContext::detached(),
            Box::new(DetachedResolver),
            ConstPool::new(),
        )
    }

    /// Create a generator for `context`, resolving host symbols through
    /// `resolver` and appending constants to `constant_pool`
    pub fn with_resolver(
        context: MethodContext,
        resolver: Box<dyn SymbolResolver>,
        constant_pool: ConstPool,
    ) -> Self {
        let max_locals = context.first_free_slot();
        Self {
            chunk: BytecodeChunk::with_constant_pool(constant_pool),
            context,
            resolver,
            max_locals,
            loops: Vec::new(),
            position: None,
            probing: false,
        }
    }

    /// Emit every statement in order
    pub fn generate(
        &mut self,
        statements: &[Statement],
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        for statement in statements {
            self.emit(statement, scope)?;
        }
        Ok(())
    }

    /// Emit one top-level statement
    ///
    /// Declarations bind their variable in `scope` once emitted. Errors carry
    /// the position of the innermost statement that failed.
    pub fn emit(
        &mut self,
        statement: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        self.loops.clear();
        self.probing = false;
        self.visit_statement(statement, scope)
    }

    /// Static type of an expression, without emitting anything
    pub fn expression_type(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        self.infer_type(expr, scope)
    }

    /// Resolve a source type to a descriptor
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<TypeDescriptor, SourceError> {
        let mut ty = match &type_ref.base {
            BaseType::Primitive(descriptor) => descriptor.clone(),
            BaseType::Named(name) => match self.resolver.resolve_class(name) {
                Some(internal) => TypeDescriptor::Object(internal),
                None => {
                    return Err(reference_error(
                        format!("cannot find symbol: class {}", name),
                        type_ref.position,
                    ))
                }
            },
        };
        for _ in 0..type_ref.dimensions {
            ty = TypeDescriptor::Array(Box::new(ty));
        }
        Ok(ty)
    }

    /// The instruction buffer
    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    /// The constant pool, including entries appended by emitted code
    pub fn constant_pool(&self) -> &ConstPool {
        &self.chunk.constant_pool
    }

    /// The method being generated into
    pub fn context(&self) -> &MethodContext {
        &self.context
    }

    /// One past the highest local slot used so far
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Maximum operand stack depth of the emitted code
    pub fn max_stack(&self) -> u16 {
        self.chunk.max_stack()
    }

    /// Raise the local count to at least `count`
    pub fn reserve_locals(&mut self, count: u16) {
        self.max_locals = self.max_locals.max(count);
    }

    /// Drop emitted instructions; the constant pool keeps its entries
    pub fn reset(&mut self) {
        self.chunk.clear();
        self.loops.clear();
        self.position = None;
        self.probing = false;
        self.max_locals = self.context.first_free_slot();
    }

    // Emission helpers, inert while probing

    fn emit_op(&mut self, opcode: Opcode) -> usize {
        let index = self.chunk.instruction_count();
        if !self.probing {
            self.chunk.emit_at(opcode, self.position);
        }
        index
    }

    fn here(&self) -> usize {
        self.chunk.instruction_count()
    }

    fn patch_jumps(&mut self, jumps: &[usize], target: usize) {
        if self.probing {
            return;
        }
        for &at in jumps {
            self.chunk.patch_jump(at, target);
        }
    }

    fn stack_depth(&self) -> i32 {
        self.chunk.stack_depth()
    }

    fn set_stack_depth(&mut self, depth: i32) {
        if !self.probing {
            self.chunk.set_stack_depth(depth);
        }
    }

    fn pool_entry<F>(&mut self, add: F) -> Result<u16, SourceError>
    where
        F: FnOnce(&mut ConstPool) -> Result<u16, PoolError>,
    {
        if self.probing {
            return Ok(0);
        }
        add(&mut self.chunk.constant_pool).map_err(|e| internal_error(e.to_string(), self.position))
    }

    fn class_index(&mut self, ty: &TypeDescriptor) -> Result<u16, SourceError> {
        let name = ty.class_constant_name().ok_or_else(|| {
            internal_error(
                format!("{} has no class constant", ty.display_name()),
                self.position,
            )
        })?;
        self.pool_entry(|pool| pool.add_class(&name))
    }

    fn field_index(&mut self, field: &FieldRef) -> Result<u16, SourceError> {
        let descriptor = field.descriptor.descriptor();
        self.pool_entry(|pool| pool.add_field_ref(&field.owner, &field.name, &descriptor))
    }

    fn infer_type(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let was_probing = std::mem::replace(&mut self.probing, true);
        let result = self.visit_expression(expr, scope);
        self.probing = was_probing;
        result
    }

    // Statements

    fn visit_statement(
        &mut self,
        stmt: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        if stmt.position().is_some() {
            self.position = stmt.position();
        }
        self.set_stack_depth(0);
        self.lower_statement(stmt, scope)
            .map_err(|e| e.or_at(stmt.position()))
    }

    fn lower_statement(
        &mut self,
        stmt: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        match stmt {
            Statement::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    self.visit_declarator(declarator, scope)?;
                }
            }

            Statement::ExpressionStatement { expression, .. } => {
                self.visit_expression_statement(expression, scope)?;
            }

            Statement::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                let jumps = self.visit_condition(test, false, scope)?;
                self.visit_statement(consequent, scope)?;
                match alternate {
                    Some(alternate) => {
                        let end = self.emit_op(Opcode::Goto(0));
                        let here = self.here();
                        self.patch_jumps(&jumps, here);
                        self.visit_statement(alternate, scope)?;
                        let here = self.here();
                        self.patch_jumps(&[end], here);
                    }
                    None => {
                        let here = self.here();
                        self.patch_jumps(&jumps, here);
                    }
                }
            }

            Statement::WhileStatement { test, body, .. } => {
                let start = self.here();
                let exits = self.visit_condition(test, false, scope)?;
                let frame = self.visit_loop_body(body, scope)?;
                self.emit_op(Opcode::Goto(start));
                let end = self.here();
                self.patch_jumps(&frame.continues, start);
                self.patch_jumps(&exits, end);
                self.patch_jumps(&frame.breaks, end);
            }

            Statement::DoWhileStatement { body, test, .. } => {
                let start = self.here();
                let frame = self.visit_loop_body(body, scope)?;
                let next = self.here();
                self.set_stack_depth(0);
                let back = self.visit_condition(test, true, scope)?;
                self.patch_jumps(&back, start);
                let end = self.here();
                self.patch_jumps(&frame.continues, next);
                self.patch_jumps(&frame.breaks, end);
            }

            Statement::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => {
                for statement in init {
                    self.visit_statement(statement, scope)?;
                }
                let start = self.here();
                self.set_stack_depth(0);
                let exits = match test {
                    Some(test) => self.visit_condition(test, false, scope)?,
                    None => Vec::new(),
                };
                let frame = self.visit_loop_body(body, scope)?;
                let next = self.here();
                for expression in update {
                    self.set_stack_depth(0);
                    self.visit_expression_statement(expression, scope)?;
                }
                self.emit_op(Opcode::Goto(start));
                let end = self.here();
                self.patch_jumps(&frame.continues, next);
                self.patch_jumps(&exits, end);
                self.patch_jumps(&frame.breaks, end);
            }

            Statement::BlockStatement { body, .. } => {
                for statement in body {
                    self.visit_statement(statement, scope)?;
                }
            }

            Statement::ReturnStatement { argument, position } => {
                let return_type = self.context.descriptor.return_type.clone();
                match (return_type, argument) {
                    (None, None) => {
                        self.emit_op(Opcode::Return(None));
                    }
                    (None, Some(argument)) => {
                        return Err(type_error(
                            "incompatible types: unexpected return value",
                            argument.position(),
                        ))
                    }
                    (Some(_), None) => return Err(type_error("missing return value", *position)),
                    (Some(ty), Some(argument)) => {
                        let value = self.visit_expression(argument, scope)?;
                        self.coerce(&value, &ty, argument)?;
                        self.emit_op(Opcode::Return(Some(ty.storage_kind())));
                    }
                }
            }

            Statement::BreakStatement { position } | Statement::ContinueStatement { position } => {
                if self.loops.is_empty() {
                    return Err(internal_error("jump outside of loop", *position));
                }
                let jump = self.emit_op(Opcode::Goto(0));
                if let Some(frame) = self.loops.last_mut() {
                    if matches!(stmt, Statement::BreakStatement { .. }) {
                        frame.breaks.push(jump);
                    } else {
                        frame.continues.push(jump);
                    }
                }
            }

            Statement::ThrowStatement { argument, .. } => {
                let value = self.visit_expression(argument, scope)?;
                let throwable = match &value {
                    ValueType::Null => true,
                    ValueType::Value(TypeDescriptor::Object(class)) => {
                        self.resolver.is_subclass(class, THROWABLE) != Some(false)
                    }
                    _ => false,
                };
                if !throwable {
                    return Err(type_error(
                        format!(
                            "incompatible types: {} cannot be converted to java.lang.Throwable",
                            value.display_name()
                        ),
                        argument.position(),
                    ));
                }
                self.emit_op(Opcode::AThrow);
            }

            Statement::EmptyStatement { .. } => {}
        }
        Ok(())
    }

    fn visit_loop_body(
        &mut self,
        body: &Statement,
        scope: &mut SymbolTable<'_>,
    ) -> Result<LoopFrame, SourceError> {
        self.loops.push(LoopFrame::default());
        self.visit_statement(body, scope)?;
        Ok(self.loops.pop().unwrap_or_default())
    }

    fn visit_declarator(
        &mut self,
        declarator: &Declarator,
        scope: &mut SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        let ty = match &declarator.resolved_class_name {
            Some(name) => TypeDescriptor::from_java_name(name).ok_or_else(|| {
                internal_error(
                    format!("invalid resolved type '{}'", name),
                    declarator.position,
                )
            })?,
            None => self.resolve_type(&declarator.type_ref)?,
        };
        let slot = declarator.local_slot.unwrap_or(LocalSlot(self.max_locals));
        let end = slot
            .0
            .checked_add(ty.width())
            .ok_or_else(|| internal_error("too many local variables", declarator.position))?;
        self.max_locals = self.max_locals.max(end);

        if let Some(init) = &declarator.init {
            let value = self.visit_expression(init, scope)?;
            self.coerce(&value, &ty, init)?;
            self.emit_op(Opcode::Store(ty.storage_kind(), slot));
        }
        scope.bind(&declarator.name, ty, slot);
        Ok(())
    }

    fn visit_expression_statement(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        match expr {
            Expression::AssignmentExpression {
                target,
                operator,
                value,
                position,
            } => {
                self.visit_assignment(target, *operator, value, *position, false, scope)?;
            }
            Expression::UpdateExpression {
                operator,
                prefix,
                argument,
                position,
            } => {
                self.visit_update(*operator, *prefix, argument, *position, false, scope)?;
            }
            _ => match self.visit_expression(expr, scope)?.width() {
                0 => {}
                1 => {
                    self.emit_op(Opcode::Pop);
                }
                _ => {
                    self.emit_op(Opcode::Pop2);
                }
            },
        }
        Ok(())
    }

    // Conditions

    /// Emit a test of `expr`, returning the jumps taken when it equals
    /// `jump_when`; control falls through otherwise
    fn visit_condition(
        &mut self,
        expr: &Expression,
        jump_when: bool,
        scope: &SymbolTable<'_>,
    ) -> Result<Vec<usize>, SourceError> {
        match expr {
            Expression::Literal {
                value: Literal::Boolean(value),
                ..
            } => {
                if *value == jump_when {
                    Ok(vec![self.emit_op(Opcode::Goto(0))])
                } else {
                    Ok(Vec::new())
                }
            }

            Expression::UnaryExpression {
                operator: UnaryOperator::Not,
                argument,
                ..
            } => self.visit_condition(argument, !jump_when, scope),

            Expression::LogicalExpression {
                left,
                operator,
                right,
                ..
            } => {
                let decided_by_either = (*operator == LogicalOperator::Or) == jump_when;
                if decided_by_either {
                    let mut jumps = self.visit_condition(left, jump_when, scope)?;
                    jumps.extend(self.visit_condition(right, jump_when, scope)?);
                    Ok(jumps)
                } else {
                    let skip = self.visit_condition(left, !jump_when, scope)?;
                    let jumps = self.visit_condition(right, jump_when, scope)?;
                    let here = self.here();
                    self.patch_jumps(&skip, here);
                    Ok(jumps)
                }
            }

            Expression::BinaryExpression {
                left,
                operator,
                right,
                position,
            } if operator.is_comparison() => {
                self.visit_comparison(left, *operator, right, jump_when, *position, scope)
            }

            _ => {
                let ty = self.visit_expression(expr, scope)?;
                if !ty.is_boolean() {
                    return Err(type_error(
                        format!(
                            "incompatible types: {} cannot be converted to boolean",
                            ty.display_name()
                        ),
                        expr.position(),
                    ));
                }
                let condition = if jump_when { Condition::Ne } else { Condition::Eq };
                Ok(vec![self.emit_op(Opcode::If(condition, 0))])
            }
        }
    }

    fn visit_comparison(
        &mut self,
        left: &Expression,
        operator: BinaryOperator,
        right: &Expression,
        jump_when: bool,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<Vec<usize>, SourceError> {
        let condition = match operator {
            BinaryOperator::Eq => Condition::Eq,
            BinaryOperator::Ne => Condition::Ne,
            BinaryOperator::Lt => Condition::Lt,
            BinaryOperator::Le => Condition::Le,
            BinaryOperator::Gt => Condition::Gt,
            BinaryOperator::Ge => Condition::Ge,
            other => {
                return Err(internal_error(
                    format!("'{}' is not a comparison", other.symbol()),
                    position,
                ))
            }
        };
        let branch = if jump_when {
            condition
        } else {
            condition.negate()
        };
        let equality = matches!(operator, BinaryOperator::Eq | BinaryOperator::Ne);

        let lt = self.infer_type(left, scope)?;
        let rt = self.infer_type(right, scope)?;
        let bad_operands = || {
            type_error(
                format!(
                    "bad operand types for binary operator '{}': {} and {}",
                    operator.symbol(),
                    lt.display_name(),
                    rt.display_name()
                ),
                position,
            )
        };

        if equality && (lt.is_reference() || rt.is_reference()) {
            if !(lt.is_reference() && rt.is_reference()) {
                return Err(bad_operands());
            }
            if self.probing {
                return Ok(Vec::new());
            }
            let null_test = if branch == Condition::Eq {
                Opcode::IfNull(0)
            } else {
                Opcode::IfNonNull(0)
            };
            let jump = if rt == ValueType::Null {
                self.visit_expression(left, scope)?;
                self.emit_op(null_test)
            } else if lt == ValueType::Null {
                self.visit_expression(right, scope)?;
                self.emit_op(null_test)
            } else {
                self.visit_expression(left, scope)?;
                self.visit_expression(right, scope)?;
                if branch == Condition::Eq {
                    self.emit_op(Opcode::IfAcmpEq(0))
                } else {
                    self.emit_op(Opcode::IfAcmpNe(0))
                }
            };
            return Ok(vec![jump]);
        }

        if equality && lt.is_boolean() && rt.is_boolean() {
            if self.probing {
                return Ok(Vec::new());
            }
            self.visit_expression(left, scope)?;
            self.visit_expression(right, scope)?;
            return Ok(vec![self.emit_op(Opcode::IfIcmp(branch, 0))]);
        }

        let promoted = match (&lt, &rt) {
            (ValueType::Value(l), ValueType::Value(r)) => binary_promotion(l, r),
            _ => None,
        }
        .ok_or_else(bad_operands)?;
        if self.probing {
            return Ok(Vec::new());
        }

        let lt = self.visit_expression(left, scope)?;
        self.convert_operand(&lt, &promoted);
        if promoted == TypeDescriptor::Int && constant_int(right) == Some(0) {
            return Ok(vec![self.emit_op(Opcode::If(branch, 0))]);
        }
        let rt = self.visit_expression(right, scope)?;
        self.convert_operand(&rt, &promoted);

        let less = matches!(operator, BinaryOperator::Lt | BinaryOperator::Le);
        let compare = match promoted {
            TypeDescriptor::Long => Some(Opcode::Lcmp),
            TypeDescriptor::Float if less => Some(Opcode::Fcmpg),
            TypeDescriptor::Float => Some(Opcode::Fcmpl),
            TypeDescriptor::Double if less => Some(Opcode::Dcmpg),
            TypeDescriptor::Double => Some(Opcode::Dcmpl),
            _ => None,
        };
        let jump = match compare {
            Some(compare) => {
                self.emit_op(compare);
                self.emit_op(Opcode::If(branch, 0))
            }
            None => self.emit_op(Opcode::IfIcmp(branch, 0)),
        };
        Ok(vec![jump])
    }

    /// Push 1 or 0 for a boolean-valued expression
    fn materialize_condition(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let jumps = self.visit_condition(expr, false, scope)?;
        let depth = self.stack_depth();
        self.emit_op(Opcode::Iconst(1));
        let end = self.emit_op(Opcode::Goto(0));
        let here = self.here();
        self.patch_jumps(&jumps, here);
        self.set_stack_depth(depth);
        self.emit_op(Opcode::Iconst(0));
        let here = self.here();
        self.patch_jumps(&[end], here);
        Ok(ValueType::Value(TypeDescriptor::Boolean))
    }

    // Expressions

    fn visit_expression(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        match expr {
            Expression::Literal { value, .. } => self.visit_literal(value),

            Expression::Identifier { name, position } => {
                match self.resolve_simple_name(name, scope) {
                    Some(NameRef::Local { slot, ty }) => {
                        self.emit_op(Opcode::Load(ty.storage_kind(), slot));
                        Ok(ValueType::Value(ty))
                    }
                    Some(NameRef::Field(field)) => self.load_implicit_field(&field, *position),
                    Some(NameRef::Class(class)) => Err(class_as_value(&class, *position)),
                    None => Err(reference_error(
                        format!("cannot find symbol: variable {}", name),
                        *position,
                    )),
                }
            }

            Expression::ThisExpression { position } => {
                self.require_instance_context("this", *position)?;
                self.emit_op(Opcode::Load(
                    core_types::StorageKind::Reference,
                    LocalSlot(0),
                ));
                Ok(ValueType::Value(TypeDescriptor::Object(
                    self.context.class_name.clone(),
                )))
            }

            Expression::MemberExpression {
                object,
                property,
                position,
            } => match self.visit_member(object, property, *position, scope)? {
                Qualifier::Value(ty) => Ok(ty),
                Qualifier::Class(class) => Err(class_as_value(&class, *position)),
                Qualifier::Package(name) => Err(reference_error(
                    format!("cannot find symbol: {}", name),
                    *position,
                )),
            },

            Expression::CallExpression {
                callee,
                method,
                arguments,
                position,
            } => self.visit_call(callee.as_deref(), method, arguments, *position, scope),

            Expression::NewExpression {
                class,
                arguments,
                position,
            } => self.visit_new(class, arguments, *position, scope),

            Expression::NewArrayExpression {
                element,
                length,
                position,
            } => {
                let element = self.resolve_type(element)?;
                let length_type = self.visit_expression(length, scope)?;
                self.promote_to_int(&length_type, length.position().or(*position))?;
                match primitive_array_type(&element) {
                    Some(atype) => {
                        self.emit_op(Opcode::NewArray(atype));
                    }
                    None => {
                        let index = self.class_index(&element)?;
                        self.emit_op(Opcode::ANewArray(index));
                    }
                }
                Ok(ValueType::Value(TypeDescriptor::Array(Box::new(element))))
            }

            Expression::IndexExpression {
                array,
                index,
                position,
            } => {
                let element = self.visit_array_access(array, index, *position, scope)?;
                self.emit_op(Opcode::ArrayLoad(array_element(&element)));
                Ok(ValueType::Value(element))
            }

            Expression::AssignmentExpression {
                target,
                operator,
                value,
                position,
            } => self.visit_assignment(target, *operator, value, *position, true, scope),

            Expression::UpdateExpression {
                operator,
                prefix,
                argument,
                position,
            } => self.visit_update(*operator, *prefix, argument, *position, true, scope),

            Expression::UnaryExpression {
                operator: UnaryOperator::Not,
                ..
            }
            | Expression::LogicalExpression { .. } => self.materialize_condition(expr, scope),

            Expression::UnaryExpression {
                operator,
                argument,
                position,
            } => self.visit_unary(*operator, argument, *position, scope),

            Expression::BinaryExpression {
                left,
                operator,
                right,
                position,
            } => self.visit_binary(expr, left, *operator, right, *position, scope),

            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
                position,
            } => self.visit_conditional(test, consequent, alternate, *position, scope),

            Expression::CastExpression {
                type_ref,
                argument,
                position,
            } => self.visit_cast(type_ref, argument, *position, scope),

            Expression::InstanceOfExpression {
                argument,
                type_ref,
                position,
            } => {
                let target = self.resolve_type(type_ref)?;
                let value = self.visit_expression(argument, scope)?;
                if !value.is_reference() || !target.is_reference() {
                    return Err(type_error(
                        format!(
                            "unexpected type: {} instanceof {}",
                            value.display_name(),
                            target.display_name()
                        ),
                        *position,
                    ));
                }
                let index = self.class_index(&target)?;
                self.emit_op(Opcode::InstanceOf(index));
                Ok(ValueType::Value(TypeDescriptor::Boolean))
            }
        }
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<ValueType, SourceError> {
        let ty = match value {
            Literal::Int(n) => {
                self.push_int(*n)?;
                TypeDescriptor::Int
            }
            Literal::Long(n) => {
                self.push_long(*n)?;
                TypeDescriptor::Long
            }
            Literal::Float(n) => {
                self.push_float(*n)?;
                TypeDescriptor::Float
            }
            Literal::Double(n) => {
                self.push_double(*n)?;
                TypeDescriptor::Double
            }
            Literal::Char(c) => {
                self.push_int(i32::from(*c))?;
                TypeDescriptor::Char
            }
            Literal::Boolean(b) => {
                self.emit_op(Opcode::Iconst(i8::from(*b)));
                TypeDescriptor::Boolean
            }
            Literal::String(s) => {
                let index = self.pool_entry(|pool| pool.add_string(s))?;
                self.emit_op(Opcode::Ldc(index));
                TypeDescriptor::string()
            }
            Literal::Null => {
                self.emit_op(Opcode::AconstNull);
                return Ok(ValueType::Null);
            }
        };
        Ok(ValueType::Value(ty))
    }

    fn push_int(&mut self, value: i32) -> Result<(), SourceError> {
        let opcode = if (-1..=5).contains(&value) {
            Opcode::Iconst(value as i8)
        } else if let Ok(byte) = i8::try_from(value) {
            Opcode::Bipush(byte)
        } else if let Ok(short) = i16::try_from(value) {
            Opcode::Sipush(short)
        } else {
            Opcode::Ldc(self.pool_entry(|pool| pool.add_integer(value))?)
        };
        self.emit_op(opcode);
        Ok(())
    }

    fn push_long(&mut self, value: i64) -> Result<(), SourceError> {
        let opcode = match value {
            0 | 1 => Opcode::Lconst(value as u8),
            _ => Opcode::Ldc2W(self.pool_entry(|pool| pool.add_long(value))?),
        };
        self.emit_op(opcode);
        Ok(())
    }

    fn push_float(&mut self, value: f32) -> Result<(), SourceError> {
        let opcode = if value.to_bits() == 0 {
            Opcode::Fconst(0)
        } else if value == 1.0 {
            Opcode::Fconst(1)
        } else if value == 2.0 {
            Opcode::Fconst(2)
        } else {
            Opcode::Ldc(self.pool_entry(|pool| pool.add_float(value))?)
        };
        self.emit_op(opcode);
        Ok(())
    }

    fn push_double(&mut self, value: f64) -> Result<(), SourceError> {
        let opcode = if value.to_bits() == 0 {
            Opcode::Dconst(0)
        } else if value == 1.0 {
            Opcode::Dconst(1)
        } else {
            Opcode::Ldc2W(self.pool_entry(|pool| pool.add_double(value))?)
        };
        self.emit_op(opcode);
        Ok(())
    }

    /// Push the constant 1 of a promoted numeric type
    fn push_one(&mut self, ty: &TypeDescriptor) {
        let opcode = match ty {
            TypeDescriptor::Long => Opcode::Lconst(1),
            TypeDescriptor::Float => Opcode::Fconst(1),
            TypeDescriptor::Double => Opcode::Dconst(1),
            _ => Opcode::Iconst(1),
        };
        self.emit_op(opcode);
    }

    // Names and members

    fn resolve_simple_name(&self, name: &str, scope: &SymbolTable<'_>) -> Option<NameRef> {
        if let Some(symbol) = scope.lookup_bound(name) {
            if let (Some(slot), Some(ty)) = (symbol.slot, symbol.descriptor.clone()) {
                return Some(NameRef::Local { slot, ty });
            }
        }
        if let Some(field) = self.resolver.field(&self.context.class_name, name) {
            return Some(NameRef::Field(field));
        }
        self.resolver.resolve_class(name).map(NameRef::Class)
    }

    fn require_instance_context(
        &self,
        what: &str,
        position: Option<SourcePosition>,
    ) -> Result<(), SourceError> {
        if self.context.is_static {
            return Err(type_error(
                format!("non-static {} cannot be referenced from a static context", what),
                position,
            ));
        }
        Ok(())
    }

    /// Load a field named without qualifier
    fn load_implicit_field(
        &mut self,
        field: &FieldRef,
        position: Option<SourcePosition>,
    ) -> Result<ValueType, SourceError> {
        if !field.is_static {
            self.require_instance_context(&format!("variable {}", field.name), position)?;
            self.emit_op(Opcode::Load(
                core_types::StorageKind::Reference,
                LocalSlot(0),
            ));
        }
        self.load_field(field)
    }

    /// Load a field; the receiver of an instance field is on the stack
    fn load_field(&mut self, field: &FieldRef) -> Result<ValueType, SourceError> {
        let index = self.field_index(field)?;
        let width = field.descriptor.width() as u8;
        if field.is_static {
            self.emit_op(Opcode::GetStatic { index, width });
        } else {
            self.emit_op(Opcode::GetField { index, width });
        }
        Ok(ValueType::Value(field.descriptor.clone()))
    }

    fn visit_qualifier(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<Qualifier, SourceError> {
        match expr {
            Expression::Identifier { name, position } => {
                match self.resolve_simple_name(name, scope) {
                    Some(NameRef::Local { slot, ty }) => {
                        self.emit_op(Opcode::Load(ty.storage_kind(), slot));
                        Ok(Qualifier::Value(ValueType::Value(ty)))
                    }
                    Some(NameRef::Field(field)) => self
                        .load_implicit_field(&field, *position)
                        .map(Qualifier::Value),
                    Some(NameRef::Class(class)) => Ok(Qualifier::Class(class)),
                    None => Ok(Qualifier::Package(name.clone())),
                }
            }
            Expression::MemberExpression {
                object,
                property,
                position,
            } => self.visit_member(object, property, *position, scope),
            _ => {
                let ty = self.visit_expression(expr, scope)?;
                Ok(Qualifier::Value(ty))
            }
        }
    }

    fn visit_member(
        &mut self,
        object: &Expression,
        property: &str,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<Qualifier, SourceError> {
        match self.visit_qualifier(object, scope)? {
            Qualifier::Package(prefix) => {
                let name = format!("{}.{}", prefix, property);
                Ok(match self.resolver.resolve_class(&name) {
                    Some(class) => Qualifier::Class(class),
                    None => Qualifier::Package(name),
                })
            }
            Qualifier::Class(owner) => match self.resolver.field(&owner, property) {
                Some(field) if field.is_static => self.load_field(&field).map(Qualifier::Value),
                Some(_) => Err(type_error(
                    format!(
                        "non-static variable {} cannot be referenced from a static context",
                        property
                    ),
                    position,
                )),
                None => Err(reference_error(
                    format!(
                        "cannot find symbol: variable {} in {}",
                        property,
                        owner.replace('/', ".")
                    ),
                    position,
                )),
            },
            Qualifier::Value(receiver) => self
                .visit_field_of(&receiver, property, position)
                .map(Qualifier::Value),
        }
    }

    /// Field access on a receiver already on the stack
    fn visit_field_of(
        &mut self,
        receiver: &ValueType,
        property: &str,
        position: Option<SourcePosition>,
    ) -> Result<ValueType, SourceError> {
        match receiver {
            ValueType::Value(TypeDescriptor::Array(_)) if property == "length" => {
                self.emit_op(Opcode::ArrayLength);
                Ok(ValueType::Value(TypeDescriptor::Int))
            }
            ValueType::Value(TypeDescriptor::Object(owner)) => {
                match self.resolver.field(owner, property) {
                    Some(field) if field.is_static => {
                        self.emit_op(Opcode::Pop);
                        self.load_field(&field)
                    }
                    Some(field) => self.load_field(&field),
                    None => Err(reference_error(
                        format!(
                            "cannot find symbol: variable {} in {}",
                            property,
                            owner.replace('/', ".")
                        ),
                        position,
                    )),
                }
            }
            ValueType::Value(TypeDescriptor::Array(_)) => Err(reference_error(
                format!("cannot find symbol: variable {}", property),
                position,
            )),
            other => Err(type_error(
                format!("{} cannot be dereferenced", other.display_name()),
                position,
            )),
        }
    }

    /// Push array and index; returns the element type
    fn visit_array_access(
        &mut self,
        array: &Expression,
        index: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<TypeDescriptor, SourceError> {
        let element = match self.visit_expression(array, scope)? {
            ValueType::Value(TypeDescriptor::Array(element)) => *element,
            other => {
                return Err(type_error(
                    format!("array required, but {} found", other.display_name()),
                    position,
                ))
            }
        };
        let index_type = self.visit_expression(index, scope)?;
        self.promote_to_int(&index_type, index.position().or(position))?;
        Ok(element)
    }

    /// Check that a value on the stack is usable where an `int` is required
    fn promote_to_int(
        &self,
        ty: &ValueType,
        position: Option<SourcePosition>,
    ) -> Result<(), SourceError> {
        match ty {
            ValueType::Value(t) if unary_promotion(t) == Some(TypeDescriptor::Int) => Ok(()),
            ValueType::Value(t) if t.is_numeric() => Err(type_error(
                format!(
                    "incompatible types: possible lossy conversion from {} to int",
                    t.display_name()
                ),
                position,
            )),
            other => Err(type_error(
                format!(
                    "incompatible types: {} cannot be converted to int",
                    other.display_name()
                ),
                position,
            )),
        }
    }

    // Calls and instance creation

    fn argument_types(
        &mut self,
        arguments: &[Expression],
        scope: &SymbolTable<'_>,
    ) -> Result<Vec<ValueType>, SourceError> {
        let mut types = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let ty = self.infer_type(argument, scope)?;
            if ty == ValueType::Void {
                return Err(type_error("'void' type not allowed here", argument.position()));
            }
            types.push(ty);
        }
        Ok(types)
    }

    fn visit_call(
        &mut self,
        callee: Option<&Expression>,
        method: &str,
        arguments: &[Expression],
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        enum Receiver {
            Implicit,
            Class,
            Stack,
        }

        let (owner, receiver) = match callee {
            None => (self.context.class_name.clone(), Receiver::Implicit),
            Some(expr) => match self.visit_qualifier(expr, scope)? {
                Qualifier::Package(name) => {
                    return Err(reference_error(
                        format!("cannot find symbol: {}", name),
                        expr.position(),
                    ))
                }
                Qualifier::Class(class) => (class, Receiver::Class),
                Qualifier::Value(ValueType::Value(TypeDescriptor::Object(class))) => {
                    (class, Receiver::Stack)
                }
                Qualifier::Value(ValueType::Value(TypeDescriptor::Array(_))) => {
                    (OBJECT.to_string(), Receiver::Stack)
                }
                Qualifier::Value(other) => {
                    return Err(type_error(
                        format!("{} cannot be dereferenced", other.display_name()),
                        expr.position(),
                    ))
                }
            },
        };

        let arg_types = self.argument_types(arguments, scope)?;
        let candidates = self.resolver.methods(&owner, method);
        let target = self.select_method(candidates, &arg_types, method, position)?;
        if !target.is_static && !matches!(receiver, Receiver::Stack) {
            if matches!(receiver, Receiver::Class) || self.context.is_static {
                return Err(type_error(
                    format!(
                        "non-static method {} cannot be referenced from a static context",
                        target.signature()
                    ),
                    position,
                ));
            }
        }

        let result = target
            .descriptor
            .return_type
            .clone()
            .map_or(ValueType::Void, ValueType::Value);
        if self.probing {
            return Ok(result);
        }

        match receiver {
            Receiver::Implicit if !target.is_static => {
                self.emit_op(Opcode::Load(
                    core_types::StorageKind::Reference,
                    LocalSlot(0),
                ));
            }
            Receiver::Stack if target.is_static => {
                self.emit_op(Opcode::Pop);
            }
            _ => {}
        }
        self.emit_arguments(arguments, &target.descriptor.params, scope)?;
        self.emit_invoke(&target)?;
        Ok(result)
    }

    fn visit_new(
        &mut self,
        class: &TypeRef,
        arguments: &[Expression],
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let ty = self.resolve_type(class)?;
        let owner = match &ty {
            TypeDescriptor::Object(owner) if !self.resolver.is_interface(owner) => owner.clone(),
            other => {
                return Err(type_error(
                    format!("{} cannot be instantiated", other.display_name()),
                    position,
                ))
            }
        };

        let arg_types = self.argument_types(arguments, scope)?;
        let candidates = self.resolver.methods(&owner, "<init>");
        let constructor = if candidates.is_empty() {
            // no constructor list for this class: trust the call site
            let params = arg_types
                .iter()
                .map(|arg| match arg {
                    ValueType::Value(ty) => ty.clone(),
                    _ => TypeDescriptor::object(OBJECT),
                })
                .collect();
            MethodRef {
                owner: owner.clone(),
                name: "<init>".to_string(),
                descriptor: MethodDescriptor::new(params, None),
                is_static: false,
                is_private: false,
            }
        } else {
            self.select_method(candidates, &arg_types, "<init>", position)?
        };

        let result = ValueType::Value(ty.clone());
        if self.probing {
            return Ok(result);
        }
        let index = self.class_index(&ty)?;
        self.emit_op(Opcode::New(index));
        self.emit_op(Opcode::Dup);
        self.emit_arguments(arguments, &constructor.descriptor.params, scope)?;
        self.emit_invoke(&constructor)?;
        Ok(result)
    }

    fn emit_arguments(
        &mut self,
        arguments: &[Expression],
        params: &[TypeDescriptor],
        scope: &SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        for (argument, param) in arguments.iter().zip(params) {
            let ty = self.visit_expression(argument, scope)?;
            self.coerce(&ty, param, argument)?;
        }
        Ok(())
    }

    fn emit_invoke(&mut self, method: &MethodRef) -> Result<(), SourceError> {
        let kind = if method.is_static {
            InvokeKind::Static
        } else if method.name == "<init>" || method.is_private {
            InvokeKind::Special
        } else if self.resolver.is_interface(&method.owner) {
            InvokeKind::Interface
        } else {
            InvokeKind::Virtual
        };
        self.invoke(kind, method)
    }

    fn invoke(&mut self, kind: InvokeKind, method: &MethodRef) -> Result<(), SourceError> {
        let descriptor = method.descriptor.descriptor();
        let index = if kind == InvokeKind::Interface {
            self.pool_entry(|pool| {
                pool.add_interface_method_ref(&method.owner, &method.name, &descriptor)
            })?
        } else {
            self.pool_entry(|pool| pool.add_method_ref(&method.owner, &method.name, &descriptor))?
        };
        let arg_slots = u8::try_from(method.descriptor.param_slots())
            .map_err(|_| internal_error("too many method arguments", self.position))?;
        self.emit_op(Opcode::Invoke {
            kind,
            index,
            arg_slots,
            return_slots: method.descriptor.return_slots() as u8,
        });
        Ok(())
    }

    /// Invoke a well-known library method
    fn invoke_library(
        &mut self,
        kind: InvokeKind,
        owner: &str,
        name: &str,
        params: Vec<TypeDescriptor>,
        return_type: Option<TypeDescriptor>,
    ) -> Result<(), SourceError> {
        let method = MethodRef {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: MethodDescriptor::new(params, return_type),
            is_static: kind == InvokeKind::Static,
            is_private: false,
        };
        self.invoke(kind, &method)
    }

    fn select_method(
        &self,
        candidates: Vec<MethodRef>,
        arg_types: &[ValueType],
        name: &str,
        position: Option<SourcePosition>,
    ) -> Result<MethodRef, SourceError> {
        let arguments = arg_types
            .iter()
            .map(ValueType::display_name)
            .collect::<Vec<_>>()
            .join(", ");
        if candidates.is_empty() {
            return Err(reference_error(
                format!("cannot find symbol: method {}({})", name, arguments),
                position,
            ));
        }

        let applicable = |strict: bool| -> Vec<&MethodRef> {
            candidates
                .iter()
                .filter(|method| {
                    method.descriptor.params.len() == arg_types.len()
                        && arg_types
                            .iter()
                            .zip(&method.descriptor.params)
                            .all(|(arg, param)| self.invocation_compatible(arg, param, strict))
                })
                .collect()
        };
        let mut matching = applicable(true);
        if matching.is_empty() {
            matching = applicable(false);
        }
        let first = match matching.first() {
            Some(first) => *first,
            None => {
                return Err(type_error(
                    format!("no suitable method found for {}({})", name, arguments),
                    position,
                ))
            }
        };

        let most_specific = matching.iter().find(|method| {
            matching
                .iter()
                .all(|other| std::ptr::eq(**method, *other) || self.more_specific(method, other))
        });
        Ok(most_specific.map_or(first, |method| *method).clone())
    }

    fn more_specific(&self, method: &MethodRef, other: &MethodRef) -> bool {
        method
            .descriptor
            .params
            .iter()
            .zip(&other.descriptor.params)
            .all(|(mine, theirs)| {
                self.invocation_compatible(&ValueType::Value(mine.clone()), theirs, true)
            })
    }

    // Assignment

    fn visit_assignment(
        &mut self,
        target: &Expression,
        operator: Option<BinaryOperator>,
        value: &Expression,
        position: Option<SourcePosition>,
        want_value: bool,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        if let (
            Some(op @ (BinaryOperator::Add | BinaryOperator::Sub)),
            Expression::Identifier { name, .. },
        ) = (operator, target)
        {
            if let Some(NameRef::Local {
                slot,
                ty: TypeDescriptor::Int,
            }) = self.resolve_simple_name(name, scope)
            {
                let delta = constant_int(value).map(|c| {
                    if op == BinaryOperator::Add {
                        i64::from(c)
                    } else {
                        -i64::from(c)
                    }
                });
                if let Some(Ok(delta)) = delta.map(i16::try_from) {
                    self.emit_op(Opcode::Iinc(slot, delta));
                    if want_value {
                        self.emit_op(Opcode::Load(core_types::StorageKind::Int, slot));
                    }
                    return Ok(ValueType::Value(TypeDescriptor::Int));
                }
            }
        }

        let lvalue = self.prepare_lvalue(target, position, scope)?;
        let ty = lvalue.ty().clone();
        match operator {
            None => {
                let value_type = self.visit_expression(value, scope)?;
                self.coerce(&value_type, &ty, value)?;
            }
            Some(op) => {
                self.dup_lvalue_operands(&lvalue);
                self.load_lvalue(&lvalue)?;
                self.apply_compound(op, &ty, value, position, scope)?;
            }
        }
        if want_value {
            self.dup_value(&lvalue, ty.width());
        }
        self.store_lvalue(&lvalue)?;
        Ok(ValueType::Value(ty))
    }

    /// Combine the current value of a compound assignment target, already on
    /// the stack, with `value`; leaves a value of `target_ty`
    fn apply_compound(
        &mut self,
        op: BinaryOperator,
        target_ty: &TypeDescriptor,
        value: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        let value_type = self.infer_type(value, scope)?;

        if op == BinaryOperator::Add && target_ty.is_string() {
            self.invoke_library(
                InvokeKind::Static,
                "java/lang/String",
                "valueOf",
                vec![TypeDescriptor::object(OBJECT)],
                Some(TypeDescriptor::string()),
            )?;
            let builder = TypeDescriptor::object(STRING_BUILDER);
            let index = self.class_index(&builder)?;
            self.emit_op(Opcode::New(index));
            self.emit_op(Opcode::DupX1);
            self.emit_op(Opcode::Swap);
            self.invoke_library(
                InvokeKind::Special,
                STRING_BUILDER,
                "<init>",
                vec![TypeDescriptor::string()],
                None,
            )?;
            self.append(value, position, scope)?;
            return self.invoke_library(
                InvokeKind::Virtual,
                STRING_BUILDER,
                "toString",
                Vec::new(),
                Some(TypeDescriptor::string()),
            );
        }

        let current = ValueType::Value(target_ty.clone());
        let plan = self.arithmetic_plan(op, &current, &value_type, position)?;
        self.convert(target_ty, &plan.left);
        let value_type = self.visit_expression(value, scope)?;
        self.convert_operand(&value_type, &plan.right);
        self.emit_arithmetic(op, &plan.result, position)?;
        self.convert(&plan.result, target_ty);
        Ok(())
    }

    fn visit_update(
        &mut self,
        operator: UpdateOperator,
        prefix: bool,
        argument: &Expression,
        position: Option<SourcePosition>,
        want_value: bool,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let increment = operator == UpdateOperator::Increment;

        if let Expression::Identifier { name, .. } = argument {
            if let Some(NameRef::Local {
                slot,
                ty: TypeDescriptor::Int,
            }) = self.resolve_simple_name(name, scope)
            {
                let load = Opcode::Load(core_types::StorageKind::Int, slot);
                if want_value && !prefix {
                    self.emit_op(load.clone());
                }
                self.emit_op(Opcode::Iinc(slot, if increment { 1 } else { -1 }));
                if want_value && prefix {
                    self.emit_op(load);
                }
                return Ok(ValueType::Value(TypeDescriptor::Int));
            }
        }

        let lvalue = self.prepare_lvalue(argument, position, scope)?;
        let ty = lvalue.ty().clone();
        let promoted = unary_promotion(&ty).ok_or_else(|| {
            type_error(
                format!(
                    "bad operand type {} for unary operator '{}'",
                    ty.display_name(),
                    if increment { "++" } else { "--" }
                ),
                position,
            )
        })?;
        let kind = numeric_kind(&promoted)
            .ok_or_else(|| internal_error("non-numeric promotion", position))?;

        self.dup_lvalue_operands(&lvalue);
        self.load_lvalue(&lvalue)?;
        if want_value && !prefix {
            self.dup_value(&lvalue, ty.width());
        }
        self.convert(&ty, &promoted);
        self.push_one(&promoted);
        self.emit_op(if increment {
            Opcode::Add(kind)
        } else {
            Opcode::Sub(kind)
        });
        self.convert(&promoted, &ty);
        if want_value && prefix {
            self.dup_value(&lvalue, ty.width());
        }
        self.store_lvalue(&lvalue)?;
        Ok(ValueType::Value(ty))
    }

    fn prepare_lvalue(
        &mut self,
        target: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<LValue, SourceError> {
        match target {
            Expression::Identifier {
                name,
                position: name_position,
            } => match self.resolve_simple_name(name, scope) {
                Some(NameRef::Local { slot, ty }) => Ok(LValue::Local { slot, ty }),
                Some(NameRef::Field(field)) if field.is_static => Ok(LValue::Static(field)),
                Some(NameRef::Field(field)) => {
                    self.require_instance_context(&format!("variable {}", name), *name_position)?;
                    self.emit_op(Opcode::Load(
                        core_types::StorageKind::Reference,
                        LocalSlot(0),
                    ));
                    Ok(LValue::Field(field))
                }
                Some(NameRef::Class(_)) | None => Err(reference_error(
                    format!("cannot find symbol: variable {}", name),
                    name_position.or(position),
                )),
            },

            Expression::MemberExpression {
                object,
                property,
                position: member_position,
            } => {
                let position = member_position.or(position);
                match self.visit_qualifier(object, scope)? {
                    Qualifier::Class(owner) => match self.resolver.field(&owner, property) {
                        Some(field) if field.is_static => Ok(LValue::Static(field)),
                        Some(_) => Err(type_error(
                            format!(
                                "non-static variable {} cannot be referenced from a static context",
                                property
                            ),
                            position,
                        )),
                        None => Err(reference_error(
                            format!("cannot find symbol: variable {}", property),
                            position,
                        )),
                    },
                    Qualifier::Value(ValueType::Value(TypeDescriptor::Array(_)))
                        if property == "length" =>
                    {
                        Err(type_error(
                            "cannot assign a value to final variable length",
                            position,
                        ))
                    }
                    Qualifier::Value(ValueType::Value(TypeDescriptor::Object(owner))) => {
                        match self.resolver.field(&owner, property) {
                            Some(field) if field.is_static => {
                                self.emit_op(Opcode::Pop);
                                Ok(LValue::Static(field))
                            }
                            Some(field) => Ok(LValue::Field(field)),
                            None => Err(reference_error(
                                format!("cannot find symbol: variable {}", property),
                                position,
                            )),
                        }
                    }
                    Qualifier::Value(other) => Err(type_error(
                        format!("{} cannot be dereferenced", other.display_name()),
                        position,
                    )),
                    Qualifier::Package(name) => Err(reference_error(
                        format!("cannot find symbol: {}", name),
                        position,
                    )),
                }
            }

            Expression::IndexExpression {
                array,
                index,
                position: index_position,
            } => {
                let element =
                    self.visit_array_access(array, index, index_position.or(position), scope)?;
                Ok(LValue::Element(element))
            }

            other => Err(type_error("unexpected assignment target", other.position())),
        }
    }

    /// Duplicate the receiver operands of a location that is read then written
    fn dup_lvalue_operands(&mut self, lvalue: &LValue) {
        match lvalue {
            LValue::Field(_) => {
                self.emit_op(Opcode::Dup);
            }
            LValue::Element(_) => {
                self.emit_op(Opcode::Dup2);
            }
            LValue::Local { .. } | LValue::Static(_) => {}
        }
    }

    fn load_lvalue(&mut self, lvalue: &LValue) -> Result<(), SourceError> {
        match lvalue {
            LValue::Local { slot, ty } => {
                self.emit_op(Opcode::Load(ty.storage_kind(), *slot));
            }
            LValue::Static(field) | LValue::Field(field) => {
                self.load_field(field)?;
            }
            LValue::Element(element) => {
                self.emit_op(Opcode::ArrayLoad(array_element(element)));
            }
        }
        Ok(())
    }

    fn store_lvalue(&mut self, lvalue: &LValue) -> Result<(), SourceError> {
        match lvalue {
            LValue::Local { slot, ty } => {
                self.emit_op(Opcode::Store(ty.storage_kind(), *slot));
            }
            LValue::Static(field) | LValue::Field(field) => {
                let index = self.field_index(field)?;
                let width = field.descriptor.width() as u8;
                if field.is_static {
                    self.emit_op(Opcode::PutStatic { index, width });
                } else {
                    self.emit_op(Opcode::PutField { index, width });
                }
            }
            LValue::Element(element) => {
                self.emit_op(Opcode::ArrayStore(array_element(element)));
            }
        }
        Ok(())
    }

    /// Copy the value about to be stored beneath the location's operands
    fn dup_value(&mut self, lvalue: &LValue, width: u16) {
        let wide = width == 2;
        let opcode = match lvalue {
            LValue::Local { .. } | LValue::Static(_) if wide => Opcode::Dup2,
            LValue::Local { .. } | LValue::Static(_) => Opcode::Dup,
            LValue::Field(_) if wide => Opcode::Dup2X1,
            LValue::Field(_) => Opcode::DupX1,
            LValue::Element(_) if wide => Opcode::Dup2X2,
            LValue::Element(_) => Opcode::DupX2,
        };
        self.emit_op(opcode);
    }

    // Operators

    fn visit_unary(
        &mut self,
        operator: UnaryOperator,
        argument: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let ty = self.visit_expression(argument, scope)?;
        let promoted = match &ty {
            ValueType::Value(t) => unary_promotion(t),
            _ => None,
        };
        let promoted = match promoted {
            Some(p) if operator != UnaryOperator::BitNot || p.is_integral() => p,
            _ => {
                let symbol = match operator {
                    UnaryOperator::Minus => "-",
                    UnaryOperator::Plus => "+",
                    UnaryOperator::Not => "!",
                    UnaryOperator::BitNot => "~",
                };
                return Err(type_error(
                    format!(
                        "bad operand type {} for unary operator '{}'",
                        ty.display_name(),
                        symbol
                    ),
                    position,
                ));
            }
        };
        self.convert_operand(&ty, &promoted);

        match operator {
            UnaryOperator::Minus => {
                if let Some(kind) = numeric_kind(&promoted) {
                    self.emit_op(Opcode::Neg(kind));
                }
            }
            UnaryOperator::BitNot => {
                if promoted == TypeDescriptor::Long {
                    self.push_long(-1)?;
                    self.emit_op(Opcode::Xor(IntegralKind::Long));
                } else {
                    self.push_int(-1)?;
                    self.emit_op(Opcode::Xor(IntegralKind::Int));
                }
            }
            UnaryOperator::Plus | UnaryOperator::Not => {}
        }
        Ok(ValueType::Value(promoted))
    }

    fn visit_binary(
        &mut self,
        expr: &Expression,
        left: &Expression,
        operator: BinaryOperator,
        right: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        if operator.is_comparison() {
            return self.materialize_condition(expr, scope);
        }

        let lt = self.infer_type(left, scope)?;
        let rt = self.infer_type(right, scope)?;
        if operator == BinaryOperator::Add && (lt.is_string() || rt.is_string()) {
            return self.visit_string_concat(expr, scope);
        }

        let plan = self.arithmetic_plan(operator, &lt, &rt, position)?;
        if self.probing {
            return Ok(ValueType::Value(plan.result));
        }
        let lt = self.visit_expression(left, scope)?;
        self.convert_operand(&lt, &plan.left);
        let rt = self.visit_expression(right, scope)?;
        self.convert_operand(&rt, &plan.right);
        self.emit_arithmetic(operator, &plan.result, position)?;
        Ok(ValueType::Value(plan.result))
    }

    fn arithmetic_plan(
        &self,
        operator: BinaryOperator,
        lt: &ValueType,
        rt: &ValueType,
        position: Option<SourcePosition>,
    ) -> Result<ArithmeticPlan, SourceError> {
        let bad_operands = || {
            type_error(
                format!(
                    "bad operand types for binary operator '{}': {} and {}",
                    operator.symbol(),
                    lt.display_name(),
                    rt.display_name()
                ),
                position,
            )
        };
        let (l, r) = match (lt, rt) {
            (ValueType::Value(l), ValueType::Value(r)) => (l, r),
            _ => return Err(bad_operands()),
        };

        if operator.is_shift() {
            return match (unary_promotion(l), unary_promotion(r)) {
                (Some(left), Some(right)) if left.is_integral() && right.is_integral() => {
                    Ok(ArithmeticPlan {
                        left: left.clone(),
                        right: TypeDescriptor::Int,
                        result: left,
                    })
                }
                _ => Err(bad_operands()),
            };
        }

        if operator.is_bitwise()
            && *l == TypeDescriptor::Boolean
            && *r == TypeDescriptor::Boolean
        {
            return Ok(ArithmeticPlan {
                left: TypeDescriptor::Boolean,
                right: TypeDescriptor::Boolean,
                result: TypeDescriptor::Boolean,
            });
        }

        match binary_promotion(l, r) {
            Some(promoted) if !operator.is_bitwise() || promoted.is_integral() => {
                Ok(ArithmeticPlan {
                    left: promoted.clone(),
                    right: promoted.clone(),
                    result: promoted,
                })
            }
            _ => Err(bad_operands()),
        }
    }

    fn emit_arithmetic(
        &mut self,
        operator: BinaryOperator,
        ty: &TypeDescriptor,
        position: Option<SourcePosition>,
    ) -> Result<(), SourceError> {
        let integral = if *ty == TypeDescriptor::Long {
            IntegralKind::Long
        } else {
            IntegralKind::Int
        };
        let numeric = numeric_kind(ty).unwrap_or(NumericKind::Int);
        let opcode = match operator {
            BinaryOperator::Add => Opcode::Add(numeric),
            BinaryOperator::Sub => Opcode::Sub(numeric),
            BinaryOperator::Mul => Opcode::Mul(numeric),
            BinaryOperator::Div => Opcode::Div(numeric),
            BinaryOperator::Rem => Opcode::Rem(numeric),
            BinaryOperator::Shl => Opcode::Shl(integral),
            BinaryOperator::Shr => Opcode::Shr(integral),
            BinaryOperator::Ushr => Opcode::Ushr(integral),
            BinaryOperator::BitAnd => Opcode::And(integral),
            BinaryOperator::BitOr => Opcode::Or(integral),
            BinaryOperator::BitXor => Opcode::Xor(integral),
            other => {
                return Err(internal_error(
                    format!("'{}' is not an arithmetic operator", other.symbol()),
                    position,
                ))
            }
        };
        self.emit_op(opcode);
        Ok(())
    }

    fn visit_string_concat(
        &mut self,
        expr: &Expression,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let result = ValueType::Value(TypeDescriptor::string());
        if self.probing {
            return Ok(result);
        }

        let mut operands = Vec::new();
        self.collect_concat_operands(expr, scope, &mut operands)?;

        let builder = TypeDescriptor::object(STRING_BUILDER);
        let index = self.class_index(&builder)?;
        self.emit_op(Opcode::New(index));
        self.emit_op(Opcode::Dup);
        self.invoke_library(InvokeKind::Special, STRING_BUILDER, "<init>", Vec::new(), None)?;
        for operand in operands {
            self.append(operand, operand.position(), scope)?;
        }
        self.invoke_library(
            InvokeKind::Virtual,
            STRING_BUILDER,
            "toString",
            Vec::new(),
            Some(TypeDescriptor::string()),
        )?;
        Ok(result)
    }

    /// Flatten a left-leaning chain of string `+` into its operands
    fn collect_concat_operands<'e>(
        &mut self,
        expr: &'e Expression,
        scope: &SymbolTable<'_>,
        operands: &mut Vec<&'e Expression>,
    ) -> Result<(), SourceError> {
        if let Expression::BinaryExpression {
            left,
            operator: BinaryOperator::Add,
            right,
            ..
        } = expr
        {
            if self.infer_type(expr, scope)?.is_string() {
                self.collect_concat_operands(left, scope, operands)?;
                self.collect_concat_operands(right, scope, operands)?;
                return Ok(());
            }
        }
        operands.push(expr);
        Ok(())
    }

    /// Append one operand to the `StringBuilder` on the stack
    fn append(
        &mut self,
        operand: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<(), SourceError> {
        let ty = self.visit_expression(operand, scope)?;
        let param = match &ty {
            ValueType::Void => {
                return Err(type_error("'void' type not allowed here", position));
            }
            ValueType::Null => TypeDescriptor::object(OBJECT),
            ValueType::Value(t) => match t {
                TypeDescriptor::Byte | TypeDescriptor::Short => TypeDescriptor::Int,
                t if t.is_primitive() || t.is_string() => t.clone(),
                _ => TypeDescriptor::object(OBJECT),
            },
        };
        self.invoke_library(
            InvokeKind::Virtual,
            STRING_BUILDER,
            "append",
            vec![param],
            Some(TypeDescriptor::object(STRING_BUILDER)),
        )
    }

    fn visit_conditional(
        &mut self,
        test: &Expression,
        consequent: &Expression,
        alternate: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let ct = self.infer_type(consequent, scope)?;
        let at = self.infer_type(alternate, scope)?;
        let result = self.conditional_type(&ct, &at, position)?;

        let jumps = self.visit_condition(test, false, scope)?;
        if self.probing {
            return Ok(result);
        }
        let depth = self.stack_depth();
        let ct = self.visit_expression(consequent, scope)?;
        if let ValueType::Value(t) = &result {
            self.convert_operand(&ct, t);
        }
        let end = self.emit_op(Opcode::Goto(0));
        let here = self.here();
        self.patch_jumps(&jumps, here);
        self.set_stack_depth(depth);
        let at = self.visit_expression(alternate, scope)?;
        if let ValueType::Value(t) = &result {
            self.convert_operand(&at, t);
        }
        let here = self.here();
        self.patch_jumps(&[end], here);
        Ok(result)
    }

    fn conditional_type(
        &self,
        ct: &ValueType,
        at: &ValueType,
        position: Option<SourcePosition>,
    ) -> Result<ValueType, SourceError> {
        let result = match (ct, at) {
            (ValueType::Value(a), ValueType::Value(b)) if a == b => ValueType::Value(a.clone()),
            (ValueType::Value(a), ValueType::Value(b)) if a.is_numeric() && b.is_numeric() => {
                binary_promotion(a, b).map_or(ValueType::Void, ValueType::Value)
            }
            (ValueType::Null, ValueType::Null) => ValueType::Null,
            (ValueType::Null, ValueType::Value(r)) | (ValueType::Value(r), ValueType::Null)
                if r.is_reference() =>
            {
                ValueType::Value(r.clone())
            }
            (ValueType::Value(a), ValueType::Value(b)) if a.is_reference() && b.is_reference() => {
                if self.is_reference_assignable(a, b, true) {
                    ValueType::Value(b.clone())
                } else if self.is_reference_assignable(b, a, true) {
                    ValueType::Value(a.clone())
                } else {
                    ValueType::Value(TypeDescriptor::object(OBJECT))
                }
            }
            _ => ValueType::Void,
        };
        if result == ValueType::Void {
            return Err(type_error(
                format!(
                    "incompatible types in conditional expression: {} and {}",
                    ct.display_name(),
                    at.display_name()
                ),
                position,
            ));
        }
        Ok(result)
    }

    fn visit_cast(
        &mut self,
        type_ref: &TypeRef,
        argument: &Expression,
        position: Option<SourcePosition>,
        scope: &SymbolTable<'_>,
    ) -> Result<ValueType, SourceError> {
        let target = self.resolve_type(type_ref)?;
        let value = self.visit_expression(argument, scope)?;
        match &value {
            ValueType::Value(t) if t.is_numeric() && target.is_numeric() => {
                self.convert(t, &target);
            }
            ValueType::Value(t) if *t == target => {}
            ValueType::Null if target.is_reference() => {}
            ValueType::Value(t) if t.is_reference() && target.is_reference() => {
                if !self.is_reference_assignable(t, &target, true) {
                    let index = self.class_index(&target)?;
                    self.emit_op(Opcode::CheckCast(index));
                }
            }
            other => {
                return Err(type_error(
                    format!(
                        "incompatible types: {} cannot be converted to {}",
                        other.display_name(),
                        target.display_name()
                    ),
                    position,
                ))
            }
        }
        Ok(ValueType::Value(target))
    }

    // Conversions

    /// Check assignment compatibility and convert the value on the stack
    fn coerce(
        &mut self,
        from: &ValueType,
        to: &TypeDescriptor,
        expr: &Expression,
    ) -> Result<(), SourceError> {
        if self.invocation_compatible(from, to, false) {
            self.convert_operand(from, to);
            return Ok(());
        }
        if let (ValueType::Value(ty), Some(constant)) = (from, constant_int(expr)) {
            if unary_promotion(ty) == Some(TypeDescriptor::Int) && constant_fits(constant, to) {
                return Ok(());
            }
        }
        let message = match from {
            ValueType::Value(ty) if ty.is_numeric() && to.is_numeric() => format!(
                "incompatible types: possible lossy conversion from {} to {}",
                ty.display_name(),
                to.display_name()
            ),
            _ => format!(
                "incompatible types: {} cannot be converted to {}",
                from.display_name(),
                to.display_name()
            ),
        };
        Err(type_error(message, expr.position()))
    }

    fn convert_operand(&mut self, from: &ValueType, to: &TypeDescriptor) {
        if let ValueType::Value(from) = from {
            self.convert(from, to);
        }
    }

    /// Emit the primitive conversion from `from` to `to`, if any
    fn convert(&mut self, from: &TypeDescriptor, to: &TypeDescriptor) {
        if from == to || !from.is_numeric() || !to.is_numeric() {
            return;
        }
        let (Some(source), Some(target)) = (numeric_kind(from), numeric_kind(to)) else {
            return;
        };
        if source != target {
            self.emit_op(Opcode::Convert(source, target));
        }
        match to {
            TypeDescriptor::Byte => {
                self.emit_op(Opcode::I2b);
            }
            TypeDescriptor::Short if *from != TypeDescriptor::Byte => {
                self.emit_op(Opcode::I2s);
            }
            TypeDescriptor::Char => {
                self.emit_op(Opcode::I2c);
            }
            _ => {}
        }
    }

    fn invocation_compatible(&self, from: &ValueType, to: &TypeDescriptor, strict: bool) -> bool {
        match from {
            ValueType::Void => false,
            ValueType::Null => to.is_reference(),
            ValueType::Value(ty) if ty == to => true,
            ValueType::Value(ty) if ty.is_primitive() && to.is_primitive() => {
                is_widening_primitive(ty, to)
            }
            ValueType::Value(ty) if ty.is_reference() && to.is_reference() => {
                self.is_reference_assignable(ty, to, strict)
            }
            ValueType::Value(_) => false,
        }
    }

    /// Widening reference conversion; unknown class relations count as
    /// assignable unless `strict`
    fn is_reference_assignable(
        &self,
        from: &TypeDescriptor,
        to: &TypeDescriptor,
        strict: bool,
    ) -> bool {
        match (from, to) {
            (_, TypeDescriptor::Object(target)) if target == OBJECT => true,
            (TypeDescriptor::Array(_), TypeDescriptor::Object(target)) => {
                target == "java/lang/Cloneable" || target == "java/io/Serializable"
            }
            (TypeDescriptor::Array(a), TypeDescriptor::Array(b)) => {
                if a.is_reference() && b.is_reference() {
                    self.is_reference_assignable(a, b, strict)
                } else {
                    a == b
                }
            }
            (TypeDescriptor::Object(a), TypeDescriptor::Object(b)) => {
                self.resolver.is_subclass(a, b).unwrap_or(!strict)
            }
            _ => false,
        }
    }
}

impl Default for BytecodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BytecodeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytecodeGenerator")
            .field("context", &self.context)
            .field("instructions", &self.chunk.instruction_count())
            .field("max_locals", &self.max_locals)
            .field("max_stack", &self.chunk.max_stack())
            .finish()
    }
}

fn class_as_value(class: &str, position: Option<SourcePosition>) -> SourceError {
    reference_error(
        format!("cannot use class {} as a value", class.replace('/', ".")),
        position,
    )
}

fn numeric_kind(ty: &TypeDescriptor) -> Option<NumericKind> {
    if ty.is_numeric() {
        NumericKind::from_storage(ty.storage_kind())
    } else {
        None
    }
}

fn unary_promotion(ty: &TypeDescriptor) -> Option<TypeDescriptor> {
    match ty {
        TypeDescriptor::Byte
        | TypeDescriptor::Short
        | TypeDescriptor::Char
        | TypeDescriptor::Int => Some(TypeDescriptor::Int),
        TypeDescriptor::Long | TypeDescriptor::Float | TypeDescriptor::Double => Some(ty.clone()),
        _ => None,
    }
}

fn binary_promotion(a: &TypeDescriptor, b: &TypeDescriptor) -> Option<TypeDescriptor> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    let either = |ty: TypeDescriptor| *a == ty || *b == ty;
    Some(if either(TypeDescriptor::Double) {
        TypeDescriptor::Double
    } else if either(TypeDescriptor::Float) {
        TypeDescriptor::Float
    } else if either(TypeDescriptor::Long) {
        TypeDescriptor::Long
    } else {
        TypeDescriptor::Int
    })
}

fn is_widening_primitive(from: &TypeDescriptor, to: &TypeDescriptor) -> bool {
    use TypeDescriptor::*;
    matches!(
        (from, to),
        (Byte, Short | Int | Long | Float | Double)
            | (Short, Int | Long | Float | Double)
            | (Char, Int | Long | Float | Double)
            | (Int, Long | Float | Double)
            | (Long, Float | Double)
            | (Float, Double)
    )
}

/// Value of an `int` or `char` literal
fn constant_int(expr: &Expression) -> Option<i32> {
    match expr {
        Expression::Literal {
            value: Literal::Int(n),
            ..
        } => Some(*n),
        Expression::Literal {
            value: Literal::Char(c),
            ..
        } => Some(i32::from(*c)),
        _ => None,
    }
}

fn constant_fits(value: i32, to: &TypeDescriptor) -> bool {
    match to {
        TypeDescriptor::Byte => i8::try_from(value).is_ok(),
        TypeDescriptor::Short => i16::try_from(value).is_ok(),
        TypeDescriptor::Char => u16::try_from(value).is_ok(),
        _ => false,
    }
}

fn array_element(element: &TypeDescriptor) -> ArrayElement {
    match element {
        TypeDescriptor::Boolean | TypeDescriptor::Byte => ArrayElement::Byte,
        TypeDescriptor::Char => ArrayElement::Char,
        TypeDescriptor::Short => ArrayElement::Short,
        TypeDescriptor::Int => ArrayElement::Int,
        TypeDescriptor::Long => ArrayElement::Long,
        TypeDescriptor::Float => ArrayElement::Float,
        TypeDescriptor::Double => ArrayElement::Double,
        TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => ArrayElement::Reference,
    }
}

fn primitive_array_type(element: &TypeDescriptor) -> Option<PrimitiveArrayType> {
    Some(match element {
        TypeDescriptor::Boolean => PrimitiveArrayType::Boolean,
        TypeDescriptor::Byte => PrimitiveArrayType::Byte,
        TypeDescriptor::Char => PrimitiveArrayType::Char,
        TypeDescriptor::Short => PrimitiveArrayType::Short,
        TypeDescriptor::Int => PrimitiveArrayType::Int,
        TypeDescriptor::Long => PrimitiveArrayType::Long,
        TypeDescriptor::Float => PrimitiveArrayType::Float,
        TypeDescriptor::Double => PrimitiveArrayType::Double,
        TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use core_types::{ErrorKind, StorageKind};

    /// Host with `System.out`, `PrintStream.println` and a field `count`
    struct TestResolver;

    impl SymbolResolver for TestResolver {
        fn resolve_class(&self, name: &str) -> Option<String> {
            match name {
                "System" | "java.lang.System" => Some("java/lang/System".to_string()),
                "String" => Some("java/lang/String".to_string()),
                "Counter" => Some("demo/Counter".to_string()),
                _ => None,
            }
        }

        fn field(&self, owner: &str, name: &str) -> Option<FieldRef> {
            match (owner, name) {
                ("java/lang/System", "out") => Some(FieldRef {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    descriptor: TypeDescriptor::object("java/io/PrintStream"),
                    is_static: true,
                }),
                ("demo/Counter", "count") => Some(FieldRef {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    descriptor: TypeDescriptor::Long,
                    is_static: false,
                }),
                _ => None,
            }
        }

        fn methods(&self, owner: &str, name: &str) -> Vec<MethodRef> {
            let method = |descriptor: &str| MethodRef {
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
                is_static: false,
                is_private: false,
            };
            match (owner, name) {
                ("java/io/PrintStream", "println") => vec![
                    method("(I)V"),
                    method("(J)V"),
                    method("(Ljava/lang/String;)V"),
                    method("(Ljava/lang/Object;)V"),
                ],
                _ => Vec::new(),
            }
        }
    }

    fn compile(source: &str) -> Result<BytecodeGenerator, SourceError> {
        let mut generator = BytecodeGenerator::new();
        let mut scope = SymbolTable::new();
        let statements = Parser::new(source).parse(&mut scope)?;
        generator.generate(&statements, &mut scope)?;
        Ok(generator)
    }

    fn compile_in_counter(source: &str) -> Result<BytecodeGenerator, SourceError> {
        let context = MethodContext::new(
            "demo/Counter",
            "tick",
            MethodDescriptor::parse("()V").unwrap(),
            false,
        );
        let mut generator =
            BytecodeGenerator::with_resolver(context, Box::new(TestResolver), ConstPool::new());
        let mut scope = SymbolTable::new();
        let statements = Parser::new(source).parse(&mut scope)?;
        generator.generate(&statements, &mut scope)?;
        Ok(generator)
    }

    fn opcodes(generator: &BytecodeGenerator) -> Vec<Opcode> {
        generator
            .chunk()
            .instructions
            .iter()
            .map(|inst| inst.opcode.clone())
            .collect()
    }

    #[test]
    fn test_generate_int_declaration() {
        let generator = compile("int x = 5;").unwrap();
        assert_eq!(
            opcodes(&generator),
            vec![
                Opcode::Iconst(5),
                Opcode::Store(StorageKind::Int, LocalSlot(0))
            ]
        );
        assert_eq!(generator.chunk().to_bytes().unwrap(), vec![0x08, 0x3b]);
        assert_eq!(generator.max_locals(), 1);
        assert_eq!(generator.max_stack(), 1);
    }

    #[test]
    fn test_generate_patched_slot() {
        let mut scope = SymbolTable::new();
        let mut statements = Parser::new("int x = 5;").parse(&mut scope).unwrap();
        statements[0]
            .visit_declarators_mut(&mut |d: &mut Declarator| {
                d.local_slot = Some(LocalSlot(3));
                d.resolved_class_name = Some("int".to_string());
                Ok::<(), ()>(())
            })
            .unwrap();

        let mut generator = BytecodeGenerator::new();
        generator.emit(&statements[0], &mut scope).unwrap();
        assert_eq!(generator.chunk().to_bytes().unwrap(), vec![0x08, 0x3e]);
        assert_eq!(generator.max_locals(), 4);
        assert_eq!(scope.lookup("x").and_then(|s| s.slot), Some(LocalSlot(3)));
    }

    #[test]
    fn test_generate_wide_slot() {
        let mut scope = SymbolTable::new();
        let mut statements = Parser::new("long big = 7L;").parse(&mut scope).unwrap();
        statements[0]
            .visit_declarators_mut(&mut |d: &mut Declarator| {
                d.local_slot = Some(LocalSlot(300));
                Ok::<(), ()>(())
            })
            .unwrap();
        let mut generator = BytecodeGenerator::new();
        generator.emit(&statements[0], &mut scope).unwrap();
        let bytes = generator.chunk().to_bytes().unwrap();
        // ldc2_w #idx, wide lstore 300
        assert_eq!(bytes[0], 0x14);
        assert_eq!(&bytes[3..], &[0xc4, 0x37, 0x01, 0x2c]);
        assert_eq!(generator.max_locals(), 302);
    }

    #[test]
    fn test_generate_widening_and_promotion() {
        let generator = compile("int i = 2; long l = i; double d = l * 1.5;").unwrap();
        let ops = opcodes(&generator);
        assert!(ops.contains(&Opcode::Convert(NumericKind::Int, NumericKind::Long)));
        assert!(ops.contains(&Opcode::Convert(NumericKind::Long, NumericKind::Double)));
        assert!(ops.contains(&Opcode::Mul(NumericKind::Double)));
        assert_eq!(generator.max_locals(), 5);
    }

    #[test]
    fn test_generate_byte_constant_narrowing() {
        assert!(compile("byte b = 10; char c = 65; short s = -1;").is_ok());
        let err = compile("int i = 300; byte b = i;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.contains("lossy"));
    }

    #[test]
    fn test_generate_type_mismatch() {
        let err = compile("int x = \"text\";").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.source_position.map(|p| p.line), Some(1));
    }

    #[test]
    fn test_generate_undefined_reference() {
        let err = compile("int x = 1;\nx = missing + 1;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReferenceError);
        assert!(err.message.contains("missing"));
        assert_eq!(err.source_position.map(|p| p.line), Some(2));
    }

    #[test]
    fn test_generate_while_loop() {
        let generator = compile("int i = 0; while (i < 10) { i++; }").unwrap();
        assert_eq!(
            opcodes(&generator),
            vec![
                Opcode::Iconst(0),
                Opcode::Store(StorageKind::Int, LocalSlot(0)),
                Opcode::Load(StorageKind::Int, LocalSlot(0)),
                Opcode::Bipush(10),
                Opcode::IfIcmp(Condition::Ge, 7),
                Opcode::Iinc(LocalSlot(0), 1),
                Opcode::Goto(2),
            ]
        );
        let bytes = generator.chunk().to_bytes().unwrap();
        // if_icmpge jumps past the goto to the end of the code
        assert_eq!(&bytes[5..8], &[0xa2, 0x00, 0x09]);
    }

    #[test]
    fn test_generate_for_with_break() {
        let generator =
            compile("int total = 0; for (int i = 0; i < 5; i++) { if (i == 3) break; total += i; }")
                .unwrap();
        assert!(generator.chunk().to_bytes().is_ok());
        assert_eq!(generator.max_locals(), 2);
    }

    #[test]
    fn test_generate_boolean_materialisation() {
        let generator = compile("int a = 1; boolean b = a < 2 && a != 0;").unwrap();
        let ops = opcodes(&generator);
        assert_eq!(
            ops.last(),
            Some(&Opcode::Store(StorageKind::Int, LocalSlot(1)))
        );
        assert!(ops.contains(&Opcode::If(Condition::Eq, ops.len() - 2)));
        assert_eq!(generator.max_stack(), 2);
    }

    #[test]
    fn test_generate_string_concat() {
        let generator = compile("int n = 3; String s = \"n=\" + n;").unwrap();
        let text = generator.chunk().disassemble();
        assert!(text.contains("java/lang/StringBuilder.<init>:()V"));
        assert!(text.contains("append:(Ljava/lang/String;)Ljava/lang/StringBuilder;"));
        assert!(text.contains("append:(I)Ljava/lang/StringBuilder;"));
        assert!(text.contains("toString:()Ljava/lang/String;"));
    }

    #[test]
    fn test_generate_arithmetic_before_concat() {
        let generator = compile("String s = 1 + 2 + \"x\";").unwrap();
        let ops = opcodes(&generator);
        assert!(ops.contains(&Opcode::Add(NumericKind::Int)));
    }

    #[test]
    fn test_generate_host_call() {
        let generator = compile_in_counter("System.out.println(count);").unwrap();
        let text = generator.chunk().disassemble();
        assert!(text.contains("getstatic"));
        assert!(text.contains("java/io/PrintStream.println:(J)V"));
        let ops = opcodes(&generator);
        assert_eq!(ops[1], Opcode::Load(StorageKind::Reference, LocalSlot(0)));
    }

    #[test]
    fn test_generate_field_compound_assignment() {
        let generator = compile_in_counter("count += 2;").unwrap();
        let ops = opcodes(&generator);
        assert_eq!(ops[0], Opcode::Load(StorageKind::Reference, LocalSlot(0)));
        assert_eq!(ops[1], Opcode::Dup);
        assert!(ops.contains(&Opcode::Convert(NumericKind::Int, NumericKind::Long)));
        assert!(ops.contains(&Opcode::Add(NumericKind::Long)));
        assert!(matches!(ops.last(), Some(Opcode::PutField { width: 2, .. })));
    }

    #[test]
    fn test_generate_unknown_method() {
        let err = compile_in_counter("System.out.flush();").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReferenceError);
    }

    #[test]
    fn test_generate_static_context_rejects_field() {
        let context = MethodContext::new(
            "demo/Counter",
            "main",
            MethodDescriptor::parse("()V").unwrap(),
            true,
        );
        let mut generator =
            BytecodeGenerator::with_resolver(context, Box::new(TestResolver), ConstPool::new());
        let mut scope = SymbolTable::new();
        let statements = Parser::new("long c = count;").parse(&mut scope).unwrap();
        let err = generator.generate(&statements, &mut scope).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.contains("static context"));
    }

    #[test]
    fn test_generate_arrays() {
        let generator = compile("int[] a = new int[4]; a[1] = a.length; a[0]++;").unwrap();
        let ops = opcodes(&generator);
        assert!(ops.contains(&Opcode::NewArray(PrimitiveArrayType::Int)));
        assert!(ops.contains(&Opcode::ArrayLength));
        assert!(ops.contains(&Opcode::Dup2));
        assert!(ops.contains(&Opcode::ArrayStore(ArrayElement::Int)));
    }

    #[test]
    fn test_generate_expression_type() {
        let mut generator = BytecodeGenerator::new();
        let mut scope = SymbolTable::new();
        scope.bind("d", TypeDescriptor::Double, LocalSlot(0));
        let expr = Parser::new("d * 2 > 1 ? \"big\" : null")
            .parse_expression_source()
            .unwrap();
        let ty = generator.expression_type(&expr, &scope).unwrap();
        assert_eq!(ty, ValueType::Value(TypeDescriptor::string()));
        assert!(generator.chunk().is_empty());
        assert!(generator.constant_pool().is_empty());
    }

    #[test]
    fn test_generate_return_checks_method_type() {
        let err = compile("return 1;").unwrap_err();
        assert!(err.message.contains("unexpected return value"));
        let generator = compile("return;").unwrap();
        assert_eq!(opcodes(&generator), vec![Opcode::Return(None)]);
    }

    #[test]
    fn test_generate_cast() {
        let generator = compile("double d = 3.7; int i = (int) d; byte b = (byte) i;").unwrap();
        let ops = opcodes(&generator);
        assert!(ops.contains(&Opcode::Convert(NumericKind::Double, NumericKind::Int)));
        assert!(ops.contains(&Opcode::I2b));
    }

    #[test]
    fn test_reset_keeps_pool() {
        let mut generator = compile("String s = \"kept\";").unwrap();
        let entries = generator.constant_pool().len();
        generator.reset();
        assert!(generator.chunk().is_empty());
        assert_eq!(generator.constant_pool().len(), entries);
        assert_eq!(generator.max_locals(), 0);
    }
}

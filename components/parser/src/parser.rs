//! Recursive descent parser for Java statement fragments

use crate::ast::{
    BaseType, BinaryOperator, Declarator, Expression, Literal, LogicalOperator, Statement,
    TypeRef, UnaryOperator, UpdateOperator,
};
use crate::error::{syntax_error, unexpected_eof, unexpected_token};
use crate::lexer::{Keyword, Lexer, Punctuator, Token};
use crate::scope::{Symbol, SymbolTable};
use core_types::{SourceError, SourcePosition, TypeDescriptor};

/// Binding power of `instanceof` (same level as relational operators)
const RELATIONAL_PRECEDENCE: u8 = 5;

/// Java statement parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    last_position: Option<SourcePosition>,
    /// Track loop depth for break/continue validation
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            last_position: None,
            loop_depth: 0,
        }
    }

    /// Parse the whole source into statements
    ///
    /// Every local declaration is recorded in `scope` (type as written, no
    /// slot yet). An empty or comment-only source yields no statements.
    pub fn parse(&mut self, scope: &mut SymbolTable<'_>) -> Result<Vec<Statement>, SourceError> {
        let mut statements = Vec::new();
        while !self.is_at_end()? {
            statements.push(self.parse_statement(scope)?);
        }
        Ok(statements)
    }

    /// Parse a single expression spanning the whole source
    pub fn parse_expression_source(&mut self) -> Result<Expression, SourceError> {
        let expression = self.parse_expression()?;
        if !self.is_at_end()? {
            let token = self.lexer.next_token()?;
            return Err(unexpected_token(
                "end of input",
                &token.describe(),
                Some(self.lexer.token_position()),
            ));
        }
        Ok(expression)
    }

    fn is_at_end(&mut self) -> Result<bool, SourceError> {
        Ok(matches!(self.lexer.peek_token()?, Token::EOF))
    }

    /// Position of the next token
    fn update_position(&mut self) -> Result<SourcePosition, SourceError> {
        self.lexer.peek_token()?;
        let position = self.lexer.token_position();
        self.last_position = Some(position);
        Ok(position)
    }

    fn parse_statement(&mut self, scope: &mut SymbolTable<'_>) -> Result<Statement, SourceError> {
        let token = self.lexer.peek_token()?.clone();

        match token {
            Token::Keyword(Keyword::If) => self.parse_if_statement(scope),
            Token::Keyword(Keyword::While) => self.parse_while_statement(scope),
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(scope),
            Token::Keyword(Keyword::For) => self.parse_for_statement(scope),
            Token::Keyword(Keyword::Return) => self.parse_return_statement(),
            Token::Keyword(Keyword::Break) => self.parse_jump_statement(true),
            Token::Keyword(Keyword::Continue) => self.parse_jump_statement(false),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Punctuator(Punctuator::LBrace) => self.parse_block_statement(scope),
            Token::Punctuator(Punctuator::Semicolon) => {
                let position = self.update_position()?;
                self.lexer.next_token()?;
                Ok(Statement::EmptyStatement {
                    position: Some(position),
                })
            }
            _ if self.is_declaration_start()? => {
                let statement = self.parse_variable_declaration(scope)?;
                self.consume_semicolon()?;
                Ok(statement)
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Check if the upcoming tokens form `Type identifier`
    fn is_declaration_start(&mut self) -> Result<bool, SourceError> {
        match self.lexer.peek_token()? {
            Token::Keyword(Keyword::Final) => return Ok(true),
            Token::Keyword(k) if k.is_primitive_type() => return Ok(true),
            Token::Identifier(_) => {}
            _ => return Ok(false),
        }

        let state = self.lexer.save();
        let is_declaration = match self.parse_type() {
            Ok(_) => matches!(self.lexer.peek_token(), Ok(Token::Identifier(_))),
            Err(_) => false,
        };
        self.lexer.restore(state);
        Ok(is_declaration)
    }

    /// Parse `[final] Type name [= init] {, name [= init]}` without the `;`
    fn parse_variable_declaration(
        &mut self,
        scope: &mut SymbolTable<'_>,
    ) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        let is_final = if self.check_keyword(Keyword::Final)? {
            self.lexer.next_token()?;
            true
        } else {
            false
        };
        let type_ref = self.parse_type()?;

        let mut declarations = Vec::new();
        loop {
            let name_position = self.update_position()?;
            let name = self.expect_identifier()?;

            let mut declared_type = type_ref.clone();
            while self.check_punctuator(Punctuator::LBracket)? {
                self.lexer.next_token()?;
                self.expect_punctuator(Punctuator::RBracket)?;
                declared_type = declared_type.array_of();
            }

            let init = if self.check_punctuator(Punctuator::Assign)? {
                self.lexer.next_token()?;
                if self.check_punctuator(Punctuator::LBrace)? {
                    return Err(syntax_error(
                        "Array initializers are not supported",
                        Some(self.update_position()?),
                    ));
                }
                Some(self.parse_expression()?)
            } else {
                None
            };

            scope.declare(Symbol::declared(name.clone(), declared_type.clone()));
            declarations.push(Declarator {
                name,
                type_ref: declared_type,
                init,
                local_slot: None,
                resolved_class_name: None,
                position: Some(name_position),
            });

            if !self.check_punctuator(Punctuator::Comma)? {
                break;
            }
            self.lexer.next_token()?;
        }

        Ok(Statement::VariableDeclaration {
            is_final,
            declarations,
            position: Some(position),
        })
    }

    /// Parse a type: primitive keyword or dotted name, then `[]` pairs
    fn parse_type(&mut self) -> Result<TypeRef, SourceError> {
        let position = self.update_position()?;
        let base = self.parse_base_type()?;
        let mut type_ref = TypeRef {
            base,
            dimensions: 0,
            position: Some(position),
        };
        while self.check_punctuator(Punctuator::LBracket)? {
            self.lexer.next_token()?;
            self.expect_punctuator(Punctuator::RBracket)?;
            type_ref = type_ref.array_of();
        }
        Ok(type_ref)
    }

    fn parse_base_type(&mut self) -> Result<BaseType, SourceError> {
        let token = self.lexer.next_token()?;
        match token {
            Token::Keyword(keyword) if keyword.is_primitive_type() => {
                Ok(BaseType::Primitive(primitive_descriptor(keyword)))
            }
            Token::Identifier(first) => {
                let mut name = first;
                while self.check_punctuator(Punctuator::Dot)? {
                    let state = self.lexer.save();
                    self.lexer.next_token()?;
                    match self.lexer.next_token()? {
                        Token::Identifier(part) => {
                            name.push('.');
                            name.push_str(&part);
                        }
                        _ => {
                            self.lexer.restore(state);
                            break;
                        }
                    }
                }
                Ok(BaseType::Named(name))
            }
            Token::EOF => Err(unexpected_eof(Some(self.lexer.token_position()))),
            other => Err(unexpected_token(
                "type",
                &other.describe(),
                Some(self.lexer.token_position()),
            )),
        }
    }

    fn parse_if_statement(&mut self, scope: &mut SymbolTable<'_>) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::If)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;

        let consequent = Box::new(self.parse_substatement(scope)?);

        let alternate = if self.check_keyword(Keyword::Else)? {
            self.lexer.next_token()?;
            Some(Box::new(self.parse_substatement(scope)?))
        } else {
            None
        };

        Ok(Statement::IfStatement {
            test,
            consequent,
            alternate,
            position: Some(position),
        })
    }

    fn parse_while_statement(
        &mut self,
        scope: &mut SymbolTable<'_>,
    ) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::While)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;

        self.loop_depth += 1;
        let body = self.parse_substatement(scope);
        self.loop_depth -= 1;

        Ok(Statement::WhileStatement {
            test,
            body: Box::new(body?),
            position: Some(position),
        })
    }

    fn parse_do_while_statement(
        &mut self,
        scope: &mut SymbolTable<'_>,
    ) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::Do)?;
        self.loop_depth += 1;
        let body = self.parse_substatement(scope);
        self.loop_depth -= 1;
        let body = body?;
        self.expect_keyword(Keyword::While)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        self.consume_semicolon()?;

        Ok(Statement::DoWhileStatement {
            body: Box::new(body),
            test,
            position: Some(position),
        })
    }

    fn parse_for_statement(&mut self, scope: &mut SymbolTable<'_>) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::For)?;
        self.expect_punctuator(Punctuator::LParen)?;

        let mut init = Vec::new();
        if !self.check_punctuator(Punctuator::Semicolon)? {
            if self.is_declaration_start()? {
                init.push(self.parse_variable_declaration(scope)?);
            } else {
                for expression in self.parse_expression_list(Punctuator::Semicolon)? {
                    self.check_statement_expression(&expression)?;
                    init.push(Statement::ExpressionStatement {
                        position: expression.position(),
                        expression,
                    });
                }
            }
        }
        self.expect_punctuator(Punctuator::Semicolon)?;

        let test = if self.check_punctuator(Punctuator::Semicolon)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(Punctuator::Semicolon)?;

        let update = if self.check_punctuator(Punctuator::RParen)? {
            Vec::new()
        } else {
            self.parse_expression_list(Punctuator::RParen)?
        };
        for expression in &update {
            self.check_statement_expression(expression)?;
        }
        self.expect_punctuator(Punctuator::RParen)?;

        self.loop_depth += 1;
        let body = self.parse_substatement(scope);
        self.loop_depth -= 1;

        Ok(Statement::ForStatement {
            init,
            test,
            update,
            body: Box::new(body?),
            position: Some(position),
        })
    }

    /// Comma-separated expressions ending before `terminator`
    fn parse_expression_list(
        &mut self,
        terminator: Punctuator,
    ) -> Result<Vec<Expression>, SourceError> {
        let mut expressions = vec![self.parse_expression()?];
        while self.check_punctuator(Punctuator::Comma)? {
            self.lexer.next_token()?;
            expressions.push(self.parse_expression()?);
        }
        if !self.check_punctuator(terminator)? {
            let token = self.lexer.next_token()?;
            return Err(unexpected_token(
                &format!("{:?}", terminator),
                &token.describe(),
                Some(self.lexer.token_position()),
            ));
        }
        Ok(expressions)
    }

    /// Statement in a loop or branch body; a bare declaration is not allowed there
    fn parse_substatement(&mut self, scope: &mut SymbolTable<'_>) -> Result<Statement, SourceError> {
        if self.check_keyword(Keyword::Final)? {
            return Err(syntax_error(
                "Declaration not allowed here",
                Some(self.update_position()?),
            ));
        }
        let statement = self.parse_statement(scope)?;
        if let Statement::VariableDeclaration { position, .. } = &statement {
            return Err(syntax_error("Declaration not allowed here", *position));
        }
        Ok(statement)
    }

    fn parse_block_statement(
        &mut self,
        scope: &mut SymbolTable<'_>,
    ) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut body = Vec::new();
        while !self.check_punctuator(Punctuator::RBrace)? {
            if self.is_at_end()? {
                return Err(unexpected_eof(Some(self.lexer.token_position())));
            }
            body.push(self.parse_statement(scope)?);
        }
        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(Statement::BlockStatement {
            body,
            position: Some(position),
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::Return)?;

        let argument = if self.check_punctuator(Punctuator::Semicolon)? || self.is_at_end()? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;

        Ok(Statement::ReturnStatement {
            argument,
            position: Some(position),
        })
    }

    fn parse_jump_statement(&mut self, is_break: bool) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.lexer.next_token()?;
        if self.loop_depth == 0 {
            let keyword = if is_break { "break" } else { "continue" };
            return Err(syntax_error(
                format!("'{}' outside of loop", keyword),
                Some(position),
            ));
        }
        if matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            return Err(syntax_error(
                "Labeled jumps are not supported",
                Some(self.update_position()?),
            ));
        }
        self.consume_semicolon()?;
        let position = Some(position);
        Ok(if is_break {
            Statement::BreakStatement { position }
        } else {
            Statement::ContinueStatement { position }
        })
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        self.expect_keyword(Keyword::Throw)?;
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::ThrowStatement {
            argument,
            position: Some(position),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, SourceError> {
        let position = self.update_position()?;
        let expression = self.parse_expression()?;
        self.check_statement_expression(&expression)?;
        self.consume_semicolon()?;
        Ok(Statement::ExpressionStatement {
            expression,
            position: Some(position),
        })
    }

    /// Only assignments, increments, calls and instance creation may stand alone
    fn check_statement_expression(&self, expression: &Expression) -> Result<(), SourceError> {
        match expression {
            Expression::AssignmentExpression { .. }
            | Expression::UpdateExpression { .. }
            | Expression::CallExpression { .. }
            | Expression::NewExpression { .. } => Ok(()),
            other => Err(syntax_error("Not a statement", other.position())),
        }
    }

    // Expressions

    fn parse_expression(&mut self) -> Result<Expression, SourceError> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, SourceError> {
        let position = self.update_position()?;
        let target = self.parse_conditional_expression()?;

        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(p) => match assignment_operator(*p) {
                Some(operator) => operator,
                None => return Ok(target),
            },
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(syntax_error(
                "Invalid assignment target",
                Some(self.update_position()?),
            ));
        }
        self.lexer.next_token()?;
        let value = self.parse_assignment_expression()?;

        Ok(Expression::AssignmentExpression {
            target: Box::new(target),
            operator,
            value: Box::new(value),
            position: Some(position),
        })
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, SourceError> {
        let position = self.update_position()?;
        let test = self.parse_logical_or_expression()?;

        if !self.check_punctuator(Punctuator::Question)? {
            return Ok(test);
        }
        self.lexer.next_token()?;
        let consequent = self.parse_expression()?;
        self.expect_punctuator(Punctuator::Colon)?;
        let alternate = self.parse_conditional_expression()?;

        Ok(Expression::ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            position: Some(position),
        })
    }

    fn parse_logical_or_expression(&mut self) -> Result<Expression, SourceError> {
        let mut left = self.parse_logical_and_expression()?;

        while self.check_punctuator(Punctuator::OrOr)? {
            let position = left.position();
            self.lexer.next_token()?;
            let right = self.parse_logical_and_expression()?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator: LogicalOperator::Or,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> Result<Expression, SourceError> {
        let mut left = self.parse_binary_expression(1)?;

        while self.check_punctuator(Punctuator::AndAnd)? {
            let position = left.position();
            self.lexer.next_token()?;
            let right = self.parse_binary_expression(1)?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    /// Precedence climbing over `|` .. `*`, including `instanceof`
    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, SourceError> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let token = self.lexer.peek_token()?.clone();
            if token == Token::Keyword(Keyword::Instanceof) {
                if RELATIONAL_PRECEDENCE < min_precedence {
                    break;
                }
                self.lexer.next_token()?;
                let type_ref = self.parse_type()?;
                let position = left.position();
                left = Expression::InstanceOfExpression {
                    argument: Box::new(left),
                    type_ref,
                    position,
                };
                continue;
            }

            let operator = match token {
                Token::Punctuator(p) => match binary_operator(p) {
                    Some(operator) => operator,
                    None => break,
                },
                _ => break,
            };
            let precedence = binary_precedence(operator);
            if precedence < min_precedence {
                break;
            }
            self.lexer.next_token()?;
            let right = self.parse_binary_expression(precedence + 1)?;
            let position = left.position();
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, SourceError> {
        let position = self.update_position()?;
        let token = self.lexer.peek_token()?.clone();

        let operator = match token {
            Token::Punctuator(Punctuator::Minus) => {
                self.lexer.next_token()?;
                return self.parse_negation(position);
            }
            Token::Punctuator(Punctuator::PlusPlus) | Token::Punctuator(Punctuator::MinusMinus) => {
                self.lexer.next_token()?;
                let argument = self.parse_unary_expression()?;
                if !argument.is_assignable() {
                    return Err(syntax_error("Invalid increment target", Some(position)));
                }
                let operator = if token == Token::Punctuator(Punctuator::PlusPlus) {
                    UpdateOperator::Increment
                } else {
                    UpdateOperator::Decrement
                };
                return Ok(Expression::UpdateExpression {
                    operator,
                    prefix: true,
                    argument: Box::new(argument),
                    position: Some(position),
                });
            }
            Token::Punctuator(Punctuator::Plus) => UnaryOperator::Plus,
            Token::Punctuator(Punctuator::Not) => UnaryOperator::Not,
            Token::Punctuator(Punctuator::Tilde) => UnaryOperator::BitNot,
            Token::Punctuator(Punctuator::LParen) => {
                if let Some(type_ref) = self.try_parse_cast_prefix()? {
                    let argument = self.parse_unary_expression()?;
                    return Ok(Expression::CastExpression {
                        type_ref,
                        argument: Box::new(argument),
                        position: Some(position),
                    });
                }
                return self.parse_postfix_expression();
            }
            _ => return self.parse_postfix_expression(),
        };

        self.lexer.next_token()?;
        let argument = self.parse_unary_expression()?;
        Ok(Expression::UnaryExpression {
            operator,
            argument: Box::new(argument),
            position: Some(position),
        })
    }

    /// Unary minus; negated numeric literals are folded into the literal
    fn parse_negation(&mut self, position: SourcePosition) -> Result<Expression, SourceError> {
        let literal = match self.lexer.peek_token()? {
            Token::IntLiteral(n) if *n == 1i64 << 31 => Some(Literal::Int(i32::MIN)),
            Token::LongLiteral(n) if *n == 1i128 << 63 => Some(Literal::Long(i64::MIN)),
            _ => None,
        };
        if let Some(value) = literal {
            self.lexer.next_token()?;
            return Ok(Expression::Literal {
                value,
                position: Some(position),
            });
        }

        let argument = self.parse_unary_expression()?;
        let folded = match &argument {
            Expression::Literal { value, .. } => match value {
                Literal::Int(n) => Some(Literal::Int(n.wrapping_neg())),
                Literal::Long(n) => Some(Literal::Long(n.wrapping_neg())),
                Literal::Float(n) => Some(Literal::Float(-n)),
                Literal::Double(n) => Some(Literal::Double(-n)),
                _ => None,
            },
            _ => None,
        };
        Ok(match folded {
            Some(value) => Expression::Literal {
                value,
                position: Some(position),
            },
            None => Expression::UnaryExpression {
                operator: UnaryOperator::Minus,
                argument: Box::new(argument),
                position: Some(position),
            },
        })
    }

    /// If the tokens at `(` form a cast prefix `(Type)`, consume it
    fn try_parse_cast_prefix(&mut self) -> Result<Option<TypeRef>, SourceError> {
        let state = self.lexer.save();
        self.lexer.next_token()?;

        let is_primitive = matches!(
            self.lexer.peek_token()?,
            Token::Keyword(k) if k.is_primitive_type()
        );
        if !is_primitive && !matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            self.lexer.restore(state);
            return Ok(None);
        }

        let type_ref = match self.parse_type() {
            Ok(type_ref) => type_ref,
            Err(_) => {
                self.lexer.restore(state);
                return Ok(None);
            }
        };
        if !self.check_punctuator(Punctuator::RParen)? {
            self.lexer.restore(state);
            return Ok(None);
        }
        self.lexer.next_token()?;

        // `(a) + b` is a parenthesized name; a reference cast must be followed
        // by an operand that cannot continue a binary expression
        if is_primitive || self.starts_cast_operand()? {
            Ok(Some(type_ref))
        } else {
            self.lexer.restore(state);
            Ok(None)
        }
    }

    fn starts_cast_operand(&mut self) -> Result<bool, SourceError> {
        Ok(matches!(
            self.lexer.peek_token()?,
            Token::Identifier(_)
                | Token::IntLiteral(_)
                | Token::LongLiteral(_)
                | Token::FloatLiteral(_)
                | Token::DoubleLiteral(_)
                | Token::CharLiteral(_)
                | Token::StringLiteral(_)
                | Token::Keyword(Keyword::This)
                | Token::Keyword(Keyword::New)
                | Token::Keyword(Keyword::True)
                | Token::Keyword(Keyword::False)
                | Token::Keyword(Keyword::Null)
                | Token::Punctuator(Punctuator::LParen)
                | Token::Punctuator(Punctuator::Not)
                | Token::Punctuator(Punctuator::Tilde)
        ))
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, SourceError> {
        let mut expression = self.parse_primary_expression()?;

        loop {
            if self.check_punctuator(Punctuator::Dot)? {
                self.lexer.next_token()?;
                let position = self.update_position()?;
                let name = self.expect_identifier()?;
                if self.check_punctuator(Punctuator::LParen)? {
                    let arguments = self.parse_arguments()?;
                    expression = Expression::CallExpression {
                        callee: Some(Box::new(expression)),
                        method: name,
                        arguments,
                        position: Some(position),
                    };
                } else {
                    expression = Expression::MemberExpression {
                        object: Box::new(expression),
                        property: name,
                        position: Some(position),
                    };
                }
            } else if self.check_punctuator(Punctuator::LBracket)? {
                let position = self.update_position()?;
                self.lexer.next_token()?;
                let index = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RBracket)?;
                expression = Expression::IndexExpression {
                    array: Box::new(expression),
                    index: Box::new(index),
                    position: Some(position),
                };
            } else {
                break;
            }
        }

        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::PlusPlus) => UpdateOperator::Increment,
            Token::Punctuator(Punctuator::MinusMinus) => UpdateOperator::Decrement,
            _ => return Ok(expression),
        };
        if !expression.is_assignable() {
            return Err(syntax_error(
                "Invalid increment target",
                Some(self.update_position()?),
            ));
        }
        self.lexer.next_token()?;
        let position = expression.position();
        Ok(Expression::UpdateExpression {
            operator,
            prefix: false,
            argument: Box::new(expression),
            position,
        })
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, SourceError> {
        let position = self.update_position()?;
        let token = self.lexer.next_token()?;
        let literal = |value: Literal| -> Result<Expression, SourceError> {
            Ok(Expression::Literal {
                value,
                position: Some(position),
            })
        };

        match token {
            Token::IntLiteral(n) => match i32::try_from(n) {
                Ok(value) => literal(Literal::Int(value)),
                Err(_) => Err(syntax_error("Integer number too large", Some(position))),
            },
            Token::LongLiteral(n) => match i64::try_from(n) {
                Ok(value) => literal(Literal::Long(value)),
                Err(_) => Err(syntax_error("Long number too large", Some(position))),
            },
            Token::FloatLiteral(n) => literal(Literal::Float(n)),
            Token::DoubleLiteral(n) => literal(Literal::Double(n)),
            Token::CharLiteral(c) => literal(Literal::Char(c)),
            Token::StringLiteral(s) => literal(Literal::String(s)),
            Token::Keyword(Keyword::True) => literal(Literal::Boolean(true)),
            Token::Keyword(Keyword::False) => literal(Literal::Boolean(false)),
            Token::Keyword(Keyword::Null) => literal(Literal::Null),
            Token::Keyword(Keyword::This) => Ok(Expression::ThisExpression {
                position: Some(position),
            }),
            Token::Keyword(Keyword::New) => self.parse_new_expression(position),
            Token::Identifier(name) => {
                if self.check_punctuator(Punctuator::LParen)? {
                    let arguments = self.parse_arguments()?;
                    Ok(Expression::CallExpression {
                        callee: None,
                        method: name,
                        arguments,
                        position: Some(position),
                    })
                } else {
                    Ok(Expression::Identifier {
                        name,
                        position: Some(position),
                    })
                }
            }
            Token::Punctuator(Punctuator::LParen) => {
                let expression = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Ok(expression)
            }
            Token::Keyword(Keyword::Super) => Err(syntax_error(
                "'super' is not supported in a statement fragment",
                Some(position),
            )),
            Token::EOF => Err(unexpected_eof(Some(position))),
            other => Err(unexpected_token(
                "expression",
                &other.describe(),
                Some(position),
            )),
        }
    }

    fn parse_new_expression(&mut self, position: SourcePosition) -> Result<Expression, SourceError> {
        let type_position = self.update_position()?;
        let base = self.parse_base_type()?;
        let element = TypeRef {
            base,
            dimensions: 0,
            position: Some(type_position),
        };

        if self.check_punctuator(Punctuator::LBracket)? {
            self.lexer.next_token()?;
            let length = self.parse_expression()?;
            self.expect_punctuator(Punctuator::RBracket)?;

            let mut element = element;
            while self.check_punctuator(Punctuator::LBracket)? {
                self.lexer.next_token()?;
                if !self.check_punctuator(Punctuator::RBracket)? {
                    return Err(syntax_error(
                        "Multi-dimensional array creation is not supported",
                        Some(self.update_position()?),
                    ));
                }
                self.lexer.next_token()?;
                element = element.array_of();
            }
            return Ok(Expression::NewArrayExpression {
                element,
                length: Box::new(length),
                position: Some(position),
            });
        }

        if let BaseType::Primitive(_) = element.base {
            return Err(syntax_error(
                "Primitive types cannot be instantiated",
                Some(type_position),
            ));
        }
        let arguments = self.parse_arguments()?;
        Ok(Expression::NewExpression {
            class: element,
            arguments,
            position: Some(position),
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, SourceError> {
        self.expect_punctuator(Punctuator::LParen)?;
        let mut arguments = Vec::new();
        if self.check_punctuator(Punctuator::RParen)? {
            self.lexer.next_token()?;
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.check_punctuator(Punctuator::Comma)? {
                self.lexer.next_token()?;
                continue;
            }
            self.expect_punctuator(Punctuator::RParen)?;
            return Ok(arguments);
        }
    }

    // Token helpers

    fn check_punctuator(&mut self, p: Punctuator) -> Result<bool, SourceError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Punctuator(x) if *x == p))
    }

    fn check_keyword(&mut self, k: Keyword) -> Result<bool, SourceError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Keyword(x) if *x == k))
    }

    fn expect_punctuator(&mut self, p: Punctuator) -> Result<(), SourceError> {
        let token = self.lexer.next_token()?;
        if let Token::Punctuator(x) = token {
            if x == p {
                return Ok(());
            }
        }
        Err(unexpected_token(
            &format!("{:?}", p),
            &token.describe(),
            Some(self.lexer.token_position()),
        ))
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), SourceError> {
        let token = self.lexer.next_token()?;
        if let Token::Keyword(x) = token {
            if x == k {
                return Ok(());
            }
        }
        Err(unexpected_token(
            &format!("{:?}", k),
            &token.describe(),
            Some(self.lexer.token_position()),
        ))
    }

    fn expect_identifier(&mut self) -> Result<String, SourceError> {
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            token => Err(unexpected_token(
                "identifier",
                &token.describe(),
                Some(self.lexer.token_position()),
            )),
        }
    }

    /// Require `;`, tolerating its absence at the very end of the fragment
    fn consume_semicolon(&mut self) -> Result<(), SourceError> {
        if self.check_punctuator(Punctuator::Semicolon)? {
            self.lexer.next_token()?;
            return Ok(());
        }
        if self.is_at_end()? {
            return Ok(());
        }
        let token = self.lexer.next_token()?;
        Err(unexpected_token(
            "';'",
            &token.describe(),
            Some(self.lexer.token_position()),
        ))
    }
}

fn primitive_descriptor(keyword: Keyword) -> TypeDescriptor {
    match keyword {
        Keyword::Boolean => TypeDescriptor::Boolean,
        Keyword::Byte => TypeDescriptor::Byte,
        Keyword::Char => TypeDescriptor::Char,
        Keyword::Short => TypeDescriptor::Short,
        Keyword::Long => TypeDescriptor::Long,
        Keyword::Float => TypeDescriptor::Float,
        Keyword::Double => TypeDescriptor::Double,
        _ => TypeDescriptor::Int,
    }
}

/// `Some(None)` for `=`, `Some(Some(op))` for compound assignment
fn assignment_operator(p: Punctuator) -> Option<Option<BinaryOperator>> {
    let operator = match p {
        Punctuator::Assign => None,
        Punctuator::PlusEq => Some(BinaryOperator::Add),
        Punctuator::MinusEq => Some(BinaryOperator::Sub),
        Punctuator::StarEq => Some(BinaryOperator::Mul),
        Punctuator::SlashEq => Some(BinaryOperator::Div),
        Punctuator::PercentEq => Some(BinaryOperator::Rem),
        Punctuator::AndEq => Some(BinaryOperator::BitAnd),
        Punctuator::OrEq => Some(BinaryOperator::BitOr),
        Punctuator::XorEq => Some(BinaryOperator::BitXor),
        Punctuator::LtLtEq => Some(BinaryOperator::Shl),
        Punctuator::GtGtEq => Some(BinaryOperator::Shr),
        Punctuator::GtGtGtEq => Some(BinaryOperator::Ushr),
        _ => return None,
    };
    Some(operator)
}

fn binary_operator(p: Punctuator) -> Option<BinaryOperator> {
    Some(match p {
        Punctuator::Or => BinaryOperator::BitOr,
        Punctuator::Xor => BinaryOperator::BitXor,
        Punctuator::And => BinaryOperator::BitAnd,
        Punctuator::EqEq => BinaryOperator::Eq,
        Punctuator::NotEq => BinaryOperator::Ne,
        Punctuator::Lt => BinaryOperator::Lt,
        Punctuator::LtEq => BinaryOperator::Le,
        Punctuator::Gt => BinaryOperator::Gt,
        Punctuator::GtEq => BinaryOperator::Ge,
        Punctuator::LtLt => BinaryOperator::Shl,
        Punctuator::GtGt => BinaryOperator::Shr,
        Punctuator::GtGtGt => BinaryOperator::Ushr,
        Punctuator::Plus => BinaryOperator::Add,
        Punctuator::Minus => BinaryOperator::Sub,
        Punctuator::Star => BinaryOperator::Mul,
        Punctuator::Slash => BinaryOperator::Div,
        Punctuator::Percent => BinaryOperator::Rem,
        _ => return None,
    })
}

fn binary_precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::BitOr => 1,
        BinaryOperator::BitXor => 2,
        BinaryOperator::BitAnd => 3,
        BinaryOperator::Eq | BinaryOperator::Ne => 4,
        BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => {
            RELATIONAL_PRECEDENCE
        }
        BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::Ushr => 6,
        BinaryOperator::Add | BinaryOperator::Sub => 7,
        BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Rem => 8,
    }
}

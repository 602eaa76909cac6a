//! Java Statement Parser Component
//!
//! Provides lexer, parser, AST construction, symbol tables and bytecode
//! generation for the Java statement subset accepted in method-body patches.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes Java source code
//! - [`Token`] - Token types including identifiers, literals, keywords
//! - [`Parser`] - Recursive descent parser producing AST
//! - [`Statement`] / [`Expression`] - Abstract Syntax Tree node types
//! - [`SymbolTable`] - Chained tables of local variables
//! - [`BytecodeGenerator`] - Converts AST to JVM bytecode
//! - [`SymbolResolver`] - Host lookup of classes, fields and methods
//!
//! # Example
//!
//! ```
//! use parser::{BytecodeGenerator, Parser, SymbolTable};
//!
//! let mut scope = SymbolTable::new();
//! let statements = Parser::new("int x = 42;").parse(&mut scope).unwrap();
//!
//! let mut gen = BytecodeGenerator::new();
//! gen.generate(&statements, &mut scope).unwrap();
//! assert_eq!(gen.chunk().to_bytes().unwrap(), vec![0x10, 42, 0x3b]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bytecode_gen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod scope;

pub use ast::{Declarator, Expression, Statement, TypeRef};
pub use bytecode_gen::{BytecodeGenerator, ValueType};
pub use lexer::{Keyword, Lexer, Punctuator, Token};
pub use parser::Parser;
pub use resolver::{DetachedResolver, FieldRef, MethodContext, MethodRef, SymbolResolver};
pub use scope::{Symbol, SymbolTable};

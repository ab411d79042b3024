//! Dart source code recognizer
//!
//! This module checks Dart source text against the language grammar:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser core, backtracking and the root production
//! - [`token`]: Token kinds and keyword classification
//! - [`source`]: Source units, locations and spans
//!
//! Grammar rules live in private modules that extend [`parse::Parser`]:
//! declarations, statements, expressions and types.
//!
//! # Supported Dart
//!
//! Dart 2 with null safety: libraries and part files, classes, mixins,
//! extensions, enums, typedefs, generics, function types, collection
//! literals with spreads and `if` / `for` elements, string interpolation,
//! cascades and `async` / generator functions.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies. The first error ends the parse.

mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
pub mod source;
mod statements;
pub mod token;
mod types;

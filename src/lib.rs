//! # Introduction
//!
//! A conformance checker for the Dart grammar. Each source unit is lexed and
//! then recognized by a hand-written recursive-descent parser; the result is
//! either acceptance or the first error, reported as
//! `<source>:<line>:<column>: <message>`.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Tokens → Parser → Verdict
//! ```
//!
//! 1. [`parser::lexer`] tokenises the source with maximal munch, including
//!    string interpolation and nested block comments.
//! 2. [`parser::parse`] applies the grammar top-down from the compilation
//!    unit, backtracking only over bounded prefixes.
//! 3. [`check`] wraps both stages into [`Verdict`]s carrying at most one
//!    [`Diagnostic`].
//!
//! No syntax tree is built and there is no error recovery.
//!
//! ```
//! use dart_spec_parser::{check, SourceUnit};
//!
//! let unit = SourceUnit::new("hello.dart", "void main() { print('hello'); }");
//! assert!(check(&unit).is_accepted());
//! ```

pub mod check;
pub mod parser;

pub use check::{check, check_all, check_bytes, check_with_options, Diagnostic, DiagnosticKind, Verdict};
pub use parser::parse::{ParseOptions, DEFAULT_MAX_NESTING_DEPTH};
pub use parser::source::{SourceLocation, SourceUnit, Span};

//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the root production.
//!
//! # Parser Architecture
//!
//! The Parser is a recognizer: productions consume tokens and either succeed
//! or return the first [`ParseError`]; no syntax tree is built.
//! - This module: Parser struct, cursor helpers, backtracking, coordination
//! - `declarations`: library directives, top-level and class members
//! - `statements`: statements and blocks
//! - `expressions`: expressions with precedence climbing
//! - `types`: types, type parameters and type arguments
//!
//! # Backtracking
//!
//! Where two alternatives share a prefix, each alternative has a probe that
//! runs the real productions from a [`Checkpoint`] and reports whether they
//! matched. The cursor is always restored afterwards; the parser then
//! commits to the first viable alternative and parses it again for real, so
//! diagnostics only ever come from a committed path.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use thiserror::Error;
use tracing::debug;

use crate::parser::lexer::{LexError, Lexer};
use crate::parser::source::SourceLocation;
use crate::parser::token::{Token, TokenKind};

/// Default bound on nested expressions, statements and types.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Per-invocation parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest nesting of expressions, statements and types accepted before
    /// the unit is rejected.
    pub max_nesting_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at line {}, column {}: {message}", location.line, location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

/// Either kind of failure that ends the recognition of a source unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RecognitionError {
    pub fn message(&self) -> &str {
        match self {
            RecognitionError::Lex(err) => &err.message,
            RecognitionError::Parse(err) => &err.message,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            RecognitionError::Lex(err) => err.location,
            RecognitionError::Parse(err) => err.location,
        }
    }
}

pub(crate) type PResult<T> = Result<T, ParseError>;

/// A lookahead probe for one alternative of a production.
pub(crate) type Probe = fn(&mut Parser) -> bool;

/// Saved cursor state for backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    position: usize,
    split: u8,
}

/// The kind of function body currently being parsed; decides whether
/// `await` and `yield` are keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BodyKind {
    pub is_async: bool,
    pub is_generator: bool,
}

impl BodyKind {
    /// Bodies marked `async`, `async*` or `sync*`.
    pub fn is_marked(self) -> bool {
        self.is_async || self.is_generator
    }
}

/// Recursive descent recognizer for Dart
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Leading `>` characters of the current token already consumed by
    /// closing type brackets.
    pub(crate) split: u8,
    depth: usize,
    max_depth: usize,
    pub(crate) bodies: Vec<BodyKind>,
    /// Set while parsing the type operand of `is` / `as`.
    pub(crate) type_test: bool,
    /// Type brackets opened since the outermost type started.
    pub(crate) type_nesting: usize,
    /// Set during lookahead: annotation arguments and parameter default
    /// values are stepped over by bracket matching instead of recognized.
    pub(crate) skimming: bool,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, LexError> {
        Self::with_options(source, &ParseOptions::default())
    }

    pub fn with_options(source: &str, options: &ParseOptions) -> Result<Self, LexError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self::from_tokens(tokens, options))
    }

    /// Build a parser over an already lexed token sequence, which must end
    /// with exactly one end-of-file token.
    pub fn from_tokens(tokens: Vec<Token>, options: &ParseOptions) -> Self {
        assert!(
            tokens.last().is_some_and(|t| t.kind == TokenKind::Eof),
            "token sequence must end with Eof"
        );
        Self {
            tokens,
            position: 0,
            split: 0,
            depth: 0,
            max_depth: options.max_nesting_depth,
            bodies: Vec::new(),
            type_test: false,
            type_nesting: 0,
            skimming: false,
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Parse the entire unit: a library, or a part file.
    ///
    /// Succeeds only when every token up to end of file has been consumed.
    pub fn parse_compilation_unit(&mut self) -> Result<(), ParseError> {
        self.match_token(TokenKind::ScriptTag);

        if self.speculate(|p| p.scan_part_header()) {
            self.parse_metadata()?;
            self.parse_part_header()?;
            while !self.is_at_end() {
                self.parse_metadata()?;
                self.parse_top_level_definition()?;
            }
        } else {
            self.parse_library_definition()?;
        }

        if !self.is_at_end() {
            return Err(self.expected("end of file"));
        }
        Ok(())
    }

    // ===== Cursor =====

    pub(crate) fn peek_kind(&self) -> TokenKind {
        let kind = self.tokens[self.position].kind;
        kind.split_gt(self.split).unwrap_or(kind)
    }

    /// Kind of the token `n` places ahead; `0` is the current token.
    ///
    /// Only the current token sees a partly consumed `>>`; tokens further
    /// ahead are reported whole.
    pub(crate) fn peek_kind_at(&self, n: usize) -> TokenKind {
        if n == 0 {
            return self.peek_kind();
        }
        self.tokens
            .get(self.position + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn check_at(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_kind_at(n) == kind
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
            self.split = 0;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.tokens[self.position].kind == TokenKind::Eof
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.tokens[self.position]
            .location
            .shifted(self.split as usize)
    }

    /// Whether the current token and the next one touch, with no whitespace
    /// or comment between them.
    pub(crate) fn next_is_adjacent(&self) -> bool {
        match self.tokens.get(self.position + 1) {
            Some(next) => self.tokens[self.position].span.end == next.span.start,
            None => false,
        }
    }

    /// Human-readable description of the current token for diagnostics.
    pub(crate) fn describe_current(&self) -> String {
        if self.split == 0 {
            self.tokens[self.position].to_string()
        } else {
            self.peek_kind().to_string()
        }
    }

    // ===== Backtracking =====

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
            split: self.split,
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
        self.split = checkpoint.split;
    }

    /// Run `attempt` in lookahead mode and put the cursor back afterwards.
    pub(crate) fn look_ahead<T>(&mut self, attempt: impl FnOnce(&mut Self) -> T) -> T {
        let checkpoint = self.checkpoint();
        let skimming = std::mem::replace(&mut self.skimming, true);
        let result = attempt(self);
        self.skimming = skimming;
        self.restore(checkpoint);
        result
    }

    /// Run `attempt` and report whether it succeeded. The cursor is restored
    /// either way.
    pub(crate) fn speculate<T>(&mut self, attempt: impl FnOnce(&mut Self) -> PResult<T>) -> bool {
        self.look_ahead(|p| attempt(p).is_ok())
    }

    /// Index of the first probe that matches at the cursor, trying them in
    /// order. Earlier probes win when several would match.
    pub(crate) fn first_viable(&mut self, probes: &[Probe]) -> Option<usize> {
        probes.iter().position(|probe| self.look_ahead(|p| probe(p)))
    }

    /// Step over the bracketed group that opens at the cursor.
    pub(crate) fn skip_group(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Eof => return Err(self.expected("a closing bracket")),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Step over an expression that ends at the first `,` or closing
    /// bracket outside brackets. Fails without moving when the run is
    /// empty or has a `<` outside brackets, since type arguments may hide
    /// commas.
    pub(crate) fn skip_delimited_expression(&mut self) -> bool {
        let mut depth = 0usize;
        let mut end = self.position;
        loop {
            match self.tokens[end].kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Comma
                    if depth == 0 =>
                {
                    break
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth -= 1,
                TokenKind::Lt if depth == 0 => return false,
                TokenKind::Eof => return false,
                _ => {}
            }
            end += 1;
        }
        if end == self.position {
            return false;
        }
        self.position = end;
        self.split = 0;
        true
    }

    // ===== Context =====

    /// Run a production one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(self.error_here(format!(
                "Nesting depth exceeds the limit of {}",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    /// Run a function body production with `kind` as the innermost body.
    pub(crate) fn with_body<T>(
        &mut self,
        kind: BodyKind,
        production: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        self.bodies.push(kind);
        let result = production(self);
        self.bodies.pop();
        result
    }

    pub(crate) fn in_async(&self) -> bool {
        self.bodies.last().is_some_and(|b| b.is_async)
    }

    pub(crate) fn in_generator(&self) -> bool {
        self.bodies.last().is_some_and(|b| b.is_generator)
    }

    // ===== Identifiers =====

    /// Identifiers, built-in identifiers and contextual keywords; `await`
    /// and `yield` are excluded inside marked function bodies.
    pub(crate) fn is_identifier_kind(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Identifier => true,
            TokenKind::Await | TokenKind::Yield => {
                !self.bodies.last().is_some_and(|b| b.is_marked())
            }
            other => other.is_builtin_identifier() || other.is_contextual_keyword(),
        }
    }

    /// Names usable as types: built-in identifiers are excluded, except
    /// `dynamic`.
    pub(crate) fn is_type_identifier_kind(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Identifier | TokenKind::Dynamic => true,
            other => other.is_contextual_keyword() && self.is_identifier_kind(other),
        }
    }

    pub(crate) fn at_identifier(&self) -> bool {
        self.is_identifier_kind(self.peek_kind())
    }

    pub(crate) fn at_type_identifier(&self) -> bool {
        self.is_type_identifier_kind(self.peek_kind())
    }

    // ===== Errors =====

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.current_location(),
        }
    }

    /// "Expected <what>, found <current token>" at the current token.
    pub(crate) fn expected(&self, what: &str) -> ParseError {
        self.error_here(format!("Expected {}, found {}", what, self.describe_current()))
    }

    pub(crate) fn expect_token(&mut self, kind: TokenKind, message: &str) -> PResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!("{}, found {}", message, self.describe_current())))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> PResult<()> {
        self.expect_token(TokenKind::LParen, &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> PResult<()> {
        self.expect_token(TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> PResult<()> {
        self.expect_token(TokenKind::LBrace, &format!("Expected '{{' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> PResult<()> {
        self.expect_token(TokenKind::RBrace, &format!("Expected '}}' {ctx}"))
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> PResult<()> {
        self.expect_token(TokenKind::Semicolon, &format!("Expected ';' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> PResult<()> {
        if self.at_identifier() {
            self.advance();
            Ok(())
        } else {
            Err(self.expected("an identifier"))
        }
    }

    pub(crate) fn expect_type_identifier(&mut self) -> PResult<()> {
        if self.at_type_identifier() {
            self.advance();
            Ok(())
        } else {
            Err(self.expected("a type name"))
        }
    }

    /// Consume one `>` closing a type bracket, splitting `>>`, `>=` and
    /// friends when necessary.
    pub(crate) fn close_angle(&mut self, ctx: &str) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Gt => {
                self.advance();
                Ok(())
            }
            TokenKind::GtGt
            | TokenKind::GtGtGt
            | TokenKind::GtEq
            | TokenKind::GtGtEq
            | TokenKind::GtGtGtEq => {
                self.split += 1;
                Ok(())
            }
            _ => Err(self.error_here(format!(
                "Expected '>' {ctx}, found {}",
                self.describe_current()
            ))),
        }
    }
}

/// Lex and parse one source text.
pub fn recognize(source: &str, options: &ParseOptions) -> Result<(), RecognitionError> {
    let mut parser = Parser::with_options(source, options)?;
    debug!(tokens = parser.token_count(), "lexed");
    parser.parse_compilation_unit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<(), RecognitionError> {
        recognize(source, &ParseOptions::default())
    }

    #[test]
    fn test_parse_simple_function() {
        assert!(parse("int main() { return 0; }").is_ok());
    }

    #[test]
    fn test_parse_empty_library() {
        assert!(parse("").is_ok());
        assert!(parse("// nothing here\n").is_ok());
    }

    #[test]
    fn test_trailing_token_is_reported() {
        let err = parse("void main() {}\n}").unwrap_err();
        assert_eq!(err.location(), SourceLocation::new(2, 1));
        assert_eq!(
            err.message(),
            "Expected a top-level declaration, found '}'"
        );
    }

    #[test]
    fn test_first_viable_prefers_earlier_alternative() {
        let mut parser = Parser::new("a b c").unwrap();
        let probes: [Probe; 2] = [
            |p| {
                p.advance();
                p.at_identifier()
            },
            |p| {
                p.advance();
                p.advance();
                p.at_identifier()
            },
        ];
        assert_eq!(parser.first_viable(&probes), Some(0));
        // Probes never move the cursor.
        assert_eq!(parser.position, 0);
    }

    #[test]
    fn test_first_viable_skips_failing_alternative() {
        let mut parser = Parser::new("a ;").unwrap();
        let probes: [Probe; 2] = [
            |p| {
                p.advance();
                p.at_identifier()
            },
            |p| {
                p.advance();
                p.check(TokenKind::Semicolon)
            },
        ];
        assert_eq!(parser.first_viable(&probes), Some(1));
        assert_eq!(parser.first_viable(&probes[..1]), None);
    }

    #[test]
    fn test_speculate_restores_cursor() {
        let mut parser = Parser::new("a b c").unwrap();
        assert!(parser.speculate(|p| {
            p.expect_identifier()?;
            p.expect_identifier()
        }));
        assert_eq!(parser.position, 0);
        assert!(!parser.speculate(|p| {
            p.expect_identifier()?;
            p.expect_semicolon("after a")
        }));
        assert_eq!(parser.position, 0);
    }

    #[test]
    fn test_look_ahead_skims_and_restores() {
        let mut parser = Parser::new("a b").unwrap();
        let skimmed = parser.look_ahead(|p| {
            p.advance();
            p.skimming
        });
        assert!(skimmed);
        assert!(!parser.skimming);
        assert_eq!(parser.position, 0);
    }

    #[test]
    fn test_skip_group_matches_brackets() {
        let mut parser = Parser::new("(a, [b], () { c; }) d").unwrap();
        parser.skip_group().unwrap();
        assert_eq!(parser.describe_current(), "identifier 'd'");

        let mut parser = Parser::new("(a, [b)").unwrap();
        assert!(parser.skip_group().is_err());
    }

    #[test]
    fn test_skip_delimited_expression() {
        let mut parser = Parser::new("f(1, 2) + {3: 4}, b").unwrap();
        assert!(parser.skip_delimited_expression());
        assert_eq!(parser.peek_kind(), TokenKind::Comma);

        // `<` may open type arguments whose commas belong to the value.
        let mut parser = Parser::new("const <int, int>{}]").unwrap();
        assert!(!parser.skip_delimited_expression());
        assert_eq!(parser.position, 0);

        let mut parser = Parser::new("]").unwrap();
        assert!(!parser.skip_delimited_expression());
    }

    #[test]
    fn test_close_angle_splits_shift_tokens() {
        let mut parser = Parser::new(">>= x").unwrap();
        parser.close_angle("to close").unwrap();
        assert_eq!(parser.peek_kind(), TokenKind::GtEq);
        assert_eq!(parser.current_location(), SourceLocation::new(1, 2));
        parser.close_angle("to close").unwrap();
        assert_eq!(parser.peek_kind(), TokenKind::Eq);
        assert_eq!(parser.describe_current(), "'='");

        let checkpoint = parser.checkpoint();
        parser.advance();
        assert!(parser.at_identifier());
        parser.restore(checkpoint);
        assert_eq!(parser.peek_kind(), TokenKind::Eq);
    }

    #[test]
    fn test_nested_generic_types() {
        assert!(parse("Map<String, List<List<int>>> m = {};").is_ok());
        assert!(parse("List<List<List<int>>> deep;").is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions { max_nesting_depth: 16 };
        let source = format!("var x = {}1{};", "(".repeat(40), ")".repeat(40));
        let err = recognize(&source, &options).unwrap_err();
        assert!(err.message().starts_with("Nesting depth exceeds the limit of 16"));
        assert!(recognize("var x = ((1));", &options).is_ok());
    }

    #[test]
    fn test_await_is_identifier_outside_async() {
        assert!(parse("void f() { var await = 1; }").is_ok());
        assert!(parse("f() async { await g(); }").is_ok());
        assert!(parse("f() async { var await = 1; }").is_err());
    }

    #[test]
    fn test_part_file() {
        assert!(parse("part of my.library;\nclass A {}").is_ok());
        assert!(parse("@meta\npart of 'lib.dart';").is_ok());
    }

    #[test]
    fn test_lex_errors_surface_as_recognition_errors() {
        let err = parse("var s = 'oops;").unwrap_err();
        assert!(matches!(err, RecognitionError::Lex(_)));
    }
}

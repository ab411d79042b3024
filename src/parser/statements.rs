//! Statement parsing implementation
//!
//! This module handles parsing of all Dart statement types:
//!
//! - Local declarations: `var x = 42;`, `int f() => 1;`
//! - Control flow: `if`, `while`, `for`, `for-in`, `do-while`, `switch`, `try`
//! - Jump statements: `return`, `break`, `continue`, `rethrow`
//! - Generator statements: `yield`, `yield*`
//! - Blocks, labels, assertions and expression statements
//!
//! # Grammar
//!
//! ```text
//! statement ::= label* nonLabelledStatement
//! nonLabelledStatement ::= block | localVariableDeclaration | forStatement
//!             | whileStatement | doStatement | switchStatement | ifStatement
//!             | rethrowStatement | tryStatement | breakStatement
//!             | continueStatement | returnStatement | yieldStatement
//!             | yieldEachStatement | expressionStatement | assertStatement
//!             | localFunctionDeclaration
//! ```
//!
//! A statement that starts like a declaration is tried as a local variable
//! declaration, then as a local function declaration, and only then as an
//! expression statement.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::parse::{PResult, Parser, Probe};
use crate::parser::token::TokenKind;

impl Parser {
    pub(crate) fn parse_block(&mut self) -> PResult<()> {
        self.expect_lbrace("to start a block")?;
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            self.parse_statement()?;
        }
        self.expect_rbrace("to close the block")
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> PResult<()> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> PResult<()> {
        while self.at_identifier() && self.check_at(1, TokenKind::Colon) {
            self.advance();
            self.advance();
        }

        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Await if self.in_async() && self.check_at(1, TokenKind::For) => {
                self.advance();
                self.parse_for_statement()
            }
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Break | TokenKind::Continue => {
                let keyword = self.peek_kind();
                self.advance();
                if self.at_identifier() {
                    self.advance();
                }
                self.expect_semicolon(&format!("after {keyword}"))
            }
            TokenKind::Return => {
                self.advance();
                if !self.check(TokenKind::Semicolon) {
                    self.parse_expression()?;
                }
                self.expect_semicolon("after return statement")
            }
            TokenKind::Rethrow => {
                self.advance();
                self.expect_semicolon("after 'rethrow'")
            }
            TokenKind::Yield if self.in_generator() => {
                self.advance();
                self.match_token(TokenKind::Star);
                self.parse_expression()?;
                self.expect_semicolon("after yield statement")
            }
            TokenKind::Assert => {
                self.parse_assertion()?;
                self.expect_semicolon("after assert statement")
            }
            _ => self.parse_declaration_or_expression_statement(),
        }
    }

    fn parse_declaration_or_expression_statement(&mut self) -> PResult<()> {
        const LOCAL_DECLARATIONS: [Probe; 2] = [
            Parser::probe_local_variable_declaration,
            Parser::probe_local_function_declaration,
        ];

        match self.first_viable(&LOCAL_DECLARATIONS) {
            Some(0) => {
                self.parse_local_variable_head()?;
                self.parse_local_variable_tail()?;
                self.expect_semicolon("after variable declaration")
            }
            Some(_) => {
                self.parse_local_function_head()?;
                self.parse_function_body(false)
            }
            None => {
                self.parse_expression()?;
                self.expect_semicolon("after expression")
            }
        }
    }

    // ===== Local declarations =====

    /// Everything up to and including the first declared name:
    /// `@meta late final List<int> name`.
    fn parse_local_variable_head(&mut self) -> PResult<()> {
        self.parse_metadata()?;
        if self.check(TokenKind::Late) && !self.check_at(1, TokenKind::Eq) {
            self.advance();
        }
        if matches!(
            self.peek_kind(),
            TokenKind::Final | TokenKind::Const | TokenKind::Var
        ) {
            self.advance();
            if self.speculate(|p| {
                p.parse_type()?;
                p.expect_identifier()
            }) {
                self.parse_type()?;
            }
        } else {
            self.parse_type()?;
        }
        self.expect_identifier()
    }

    fn parse_local_variable_tail(&mut self) -> PResult<()> {
        loop {
            if self.match_token(TokenKind::Eq) {
                self.parse_expression()?;
            }
            if !self.match_token(TokenKind::Comma) {
                return Ok(());
            }
            self.expect_identifier()?;
        }
    }

    fn probe_local_variable_declaration(&mut self) -> bool {
        self.parse_local_variable_head().is_ok()
            && matches!(
                self.peek_kind(),
                TokenKind::Eq | TokenKind::Comma | TokenKind::Semicolon
            )
    }

    /// Return type, name, type parameters and parameters of a local function.
    fn parse_local_function_head(&mut self) -> PResult<()> {
        self.parse_metadata()?;
        if self.speculate(|p| {
            p.parse_type()?;
            p.expect_identifier()
        }) {
            self.parse_type()?;
        }
        self.expect_identifier()?;
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.parse_formal_parameter_list()
    }

    fn probe_local_function_declaration(&mut self) -> bool {
        self.parse_local_function_head().is_ok()
            && matches!(
                self.peek_kind(),
                TokenKind::LBrace | TokenKind::Arrow | TokenKind::Async | TokenKind::Sync
            )
    }

    // ===== Control flow =====

    fn parse_if_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::If, "Expected 'if'")?;
        self.expect_lparen("after 'if'")?;
        self.parse_expression()?;
        self.expect_rparen("after if condition")?;
        self.parse_statement()?;
        if self.match_token(TokenKind::Else) {
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_for_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::For, "Expected 'for'")?;
        self.expect_lparen("after 'for'")?;
        self.parse_for_loop_parts()?;
        self.expect_rparen("after for loop clauses")?;
        self.parse_statement()
    }

    /// The parenthesized part of a `for` statement or collection element.
    pub(crate) fn parse_for_loop_parts(&mut self) -> PResult<()> {
        let for_in_heads: [Probe; 2] = [
            |p| p.parse_local_variable_head().is_ok() && p.check(TokenKind::In),
            |p| p.expect_identifier().is_ok() && p.check(TokenKind::In),
        ];

        if let Some(head) = self.first_viable(&for_in_heads) {
            if head == 0 {
                self.parse_local_variable_head()?;
            } else {
                self.expect_identifier()?;
            }
            self.expect_token(TokenKind::In, "Expected 'in'")?;
            return self.parse_expression();
        }

        let declaration: Probe = Parser::probe_local_variable_declaration;
        if self.first_viable(&[declaration]).is_some() {
            self.parse_local_variable_head()?;
            self.parse_local_variable_tail()?;
        } else if !self.check(TokenKind::Semicolon) {
            self.parse_expression()?;
        }
        self.expect_semicolon("after for loop initializer")?;

        if !self.check(TokenKind::Semicolon) {
            self.parse_expression()?;
        }
        self.expect_semicolon("after for loop condition")?;

        if !self.check(TokenKind::RParen) {
            self.parse_expression()?;
            while self.match_token(TokenKind::Comma) {
                self.parse_expression()?;
            }
        }
        Ok(())
    }

    fn parse_while_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::While, "Expected 'while'")?;
        self.expect_lparen("after 'while'")?;
        self.parse_expression()?;
        self.expect_rparen("after while condition")?;
        self.parse_statement()
    }

    fn parse_do_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Do, "Expected 'do'")?;
        self.parse_statement()?;
        self.expect_token(TokenKind::While, "Expected 'while' after do body")?;
        self.expect_lparen("after 'while'")?;
        self.parse_expression()?;
        self.expect_rparen("after do-while condition")?;
        self.expect_semicolon("after do-while statement")
    }

    fn parse_switch_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Switch, "Expected 'switch'")?;
        self.expect_lparen("after 'switch'")?;
        self.parse_expression()?;
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("to start the switch body")?;

        let mut seen_default = false;
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            while self.at_identifier() && self.check_at(1, TokenKind::Colon) {
                self.advance();
                self.advance();
            }
            match self.peek_kind() {
                TokenKind::Case if !seen_default => {
                    self.advance();
                    self.parse_expression()?;
                    self.expect_token(TokenKind::Colon, "Expected ':' after case expression")?;
                }
                TokenKind::Default if !seen_default => {
                    self.advance();
                    self.expect_token(TokenKind::Colon, "Expected ':' after 'default'")?;
                    seen_default = true;
                }
                _ if seen_default => {
                    return Err(self.expected("'}' after the default case"));
                }
                _ => return Err(self.expected("'case' or 'default'")),
            }
            while !self.at_switch_clause_end() {
                self.parse_statement()?;
            }
        }
        self.expect_rbrace("to close the switch body")
    }

    fn at_switch_clause_end(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof => true,
            _ => {
                self.at_identifier()
                    && self.check_at(1, TokenKind::Colon)
                    && matches!(self.peek_kind_at(2), TokenKind::Case | TokenKind::Default)
            }
        }
    }

    fn parse_try_statement(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Try, "Expected 'try'")?;
        self.parse_block()?;

        let mut handled = false;
        loop {
            if self.match_token(TokenKind::On) {
                self.parse_type_not_void()?;
                if self.check(TokenKind::Catch) {
                    self.parse_catch_part()?;
                }
            } else if self.check(TokenKind::Catch) {
                self.parse_catch_part()?;
            } else {
                break;
            }
            self.parse_block()?;
            handled = true;
        }

        if self.match_token(TokenKind::Finally) {
            return self.parse_block();
        }
        if !handled {
            return Err(self.expected("'on', 'catch' or 'finally' after the try block"));
        }
        Ok(())
    }

    fn parse_catch_part(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Catch, "Expected 'catch'")?;
        self.expect_lparen("after 'catch'")?;
        self.expect_identifier()?;
        if self.match_token(TokenKind::Comma) {
            self.expect_identifier()?;
        }
        self.expect_rparen("to close the catch clause")
    }

    /// `assert(condition, message?)`, shared by statements and constructor
    /// initializer lists.
    pub(crate) fn parse_assertion(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Assert, "Expected 'assert'")?;
        self.expect_lparen("after 'assert'")?;
        self.parse_expression()?;
        if self.match_token(TokenKind::Comma) && !self.check(TokenKind::RParen) {
            self.parse_expression()?;
            self.match_token(TokenKind::Comma);
        }
        self.expect_rparen("to close the assertion")
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse::{recognize, ParseOptions, RecognitionError};
    use crate::parser::source::SourceLocation;

    fn parse_body(body: &str) -> Result<(), RecognitionError> {
        recognize(&format!("void main() {{\n{body}\n}}"), &ParseOptions::default())
    }

    #[test]
    fn test_local_declarations() {
        let body = r#"
var a = 1, b;
final int c = 2;
late String d;
const e = [1];
List<Map<String, int>> f = [];
int? g;
prefix.Type h;
void local(int x) { print(x); }
int twice(int x) => x * 2;
T generic<T>(T t) => t;
"#;
        assert!(parse_body(body).is_ok(), "{:?}", parse_body(body));
    }

    #[test]
    fn test_expression_statements_are_not_declarations() {
        let body = r#"
a = 5;
a < b;
foo(a, b);
a.b.c();
x ? y : z;
const [1, 2];
"#;
        assert!(parse_body(body).is_ok(), "{:?}", parse_body(body));
    }

    #[test]
    fn test_control_flow() {
        let body = r#"
if (a) b(); else { c(); }
while (i < 10) i++;
do { i--; } while (i > 0);
for (var i = 0; i < 10; i++) {}
for (int i = 0, j = 1; ; i++, j++) break;
for (;;) { continue; }
for (final x in xs) print(x);
for (x in xs) {}
outer: for (var y in ys) { break outer; }
switch (v) {
  case 1:
  case 2:
    a();
    break;
  label: case 3:
    continue label;
  default:
    b();
}
try { a(); } on FormatException catch (e, s) { rethrow; } catch (e) {} finally {}
try {} on Exception {}
assert(x != null, 'x must be set',);
return;
"#;
        assert!(parse_body(body).is_ok(), "{:?}", parse_body(body));
    }

    #[test]
    fn test_async_statements() {
        let source = r#"
Future<void> f(Stream<int> s) async {
  await for (var x in s) { await g(x); }
}
"#;
        assert!(recognize(source, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_missing_semicolon_location() {
        let err = parse_body("var x = 1\nvar y = 2;").unwrap_err();
        assert_eq!(err.location(), SourceLocation::new(3, 1));
        assert_eq!(
            err.message(),
            "Expected ';' after variable declaration, found 'var'"
        );
    }

    #[test]
    fn test_try_without_handler() {
        let err = parse_body("try {}\n").unwrap_err();
        assert!(err.message().starts_with("Expected 'on', 'catch' or 'finally'"));
    }

    #[test]
    fn test_case_after_default() {
        let err = parse_body("switch (x) { default: break; case 1: break; }").unwrap_err();
        assert_eq!(
            err.message(),
            "Expected '}' after the default case, found 'case'"
        );
    }

    #[test]
    fn test_yield_outside_generator() {
        assert!(parse_body("yield 1;").is_err());
        let source = "Iterable<int> f() sync* { yield 1; }";
        assert!(recognize(source, &ParseOptions::default()).is_ok());
    }
}

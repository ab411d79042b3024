//! Expression parsing implementation
//!
//! This module implements expression parsing using precedence climbing for
//! binary operators. Prefix operators and postfix selectors are consumed in
//! loops, so long chains such as `a.b.c.d` or `!!!x` do not deepen the
//! recursion.
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Assignment: `=`, `+=`, `??=`, ... (right-associative)
//! 2. Conditional: `? :`
//! 3. If-null: `??`
//! 4. Logical OR: `||`
//! 5. Logical AND: `&&`
//! 6. Equality: `==`, `!=` (non-associative)
//! 7. Relational: `<`, `>`, `<=`, `>=`, `is`, `is!`, `as` (non-associative)
//! 8. Bitwise OR: `|`
//! 9. Bitwise XOR: `^`
//! 10. Bitwise AND: `&`
//! 11. Shift: `<<`, `>>`, `>>>`
//! 12. Additive: `+`, `-`
//! 13. Multiplicative: `*`, `/`, `%`, `~/`
//! 14. Unary prefix: `-`, `!`, `~`, `++`, `--`, `await`
//! 15. Postfix: `.`, `?.`, `[]`, `?[]`, `!`, calls, `++`, `--`
//!
//! Cascades (`..`, `?..`) attach to a whole conditional expression.

use crate::parser::parse::{PResult, ParseError, Parser};
use crate::parser::token::TokenKind;

/// Whether an expression may appear on the left of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Assignable,
    Value,
}

/// Binding power of a binary operator and whether it is non-associative.
fn binary_precedence(kind: TokenKind) -> Option<(u8, bool)> {
    use TokenKind::*;
    let entry = match kind {
        QuestionQuestion => (1, false),
        PipePipe => (2, false),
        AmpAmp => (3, false),
        EqEq | BangEq => (4, true),
        Lt | Gt | LtEq | GtEq | Is | As => (5, true),
        Pipe => (6, false),
        Caret => (7, false),
        Amp => (8, false),
        LtLt | GtGt | GtGtGt => (9, false),
        Plus | Minus => (10, false),
        Star | Slash | Percent | TildeSlash => (11, false),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> PResult<()> {
        self.nested(|p| p.expression(true)).map(|_| ())
    }

    pub(crate) fn parse_expression_without_cascade(&mut self) -> PResult<()> {
        self.nested(|p| p.expression(false)).map(|_| ())
    }

    fn expression(&mut self, allow_cascade: bool) -> PResult<Shape> {
        if self.match_token(TokenKind::Throw) {
            self.nested(|p| p.expression(allow_cascade))?;
            return Ok(Shape::Value);
        }

        if self.scan_function_expression() == Some(TokenKind::Arrow) {
            self.parse_function_expression(allow_cascade)?;
            return Ok(Shape::Value);
        }

        let start = self.current_location();
        let shape = self.parse_conditional()?;

        if self.peek_kind().is_assignment_operator() {
            if shape != Shape::Assignable {
                return Err(ParseError {
                    message: format!(
                        "Expected an assignable expression before {}",
                        self.describe_current()
                    ),
                    location: start,
                });
            }
            self.advance();
            self.nested(|p| p.expression(allow_cascade))?;
            return Ok(Shape::Value);
        }

        if allow_cascade && self.at_cascade() {
            self.parse_cascade()?;
            return Ok(Shape::Value);
        }
        Ok(shape)
    }

    /// Tokens that can begin an expression.
    pub(crate) fn can_start_expression(&self, kind: TokenKind) -> bool {
        use TokenKind::*;
        self.is_identifier_kind(kind)
            || matches!(
                kind,
                Number
                    | String
                    | StringBegin
                    | This
                    | Super
                    | Null
                    | True
                    | False
                    | New
                    | Const
                    | Throw
                    | LParen
                    | LBracket
                    | LBrace
                    | Lt
                    | Hash
                    | Minus
                    | Bang
                    | Tilde
                    | PlusPlus
                    | MinusMinus
                    | Await
            )
    }

    // ===== Function expressions =====

    /// If a function expression starts here, the token that begins its
    /// body: `=>` or `{`.
    ///
    /// Arrow-bodied function expressions are whole expressions; block-bodied
    /// ones are primaries and may be followed by selectors.
    fn scan_function_expression(&mut self) -> Option<TokenKind> {
        if !self.check(TokenKind::LParen) && !self.check(TokenKind::Lt) {
            return None;
        }
        let body = self.look_ahead(|p| p.scan_function_signature().ok());
        body.filter(|kind| matches!(kind, TokenKind::Arrow | TokenKind::LBrace))
    }

    fn scan_function_signature(&mut self) -> PResult<TokenKind> {
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.parse_formal_parameter_list()?;
        self.parse_body_modifier();
        Ok(self.peek_kind())
    }

    fn parse_function_expression(&mut self, allow_cascade: bool) -> PResult<()> {
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.parse_formal_parameter_list()?;
        let kind = self.parse_body_modifier();
        match self.peek_kind() {
            TokenKind::Arrow => {
                if kind.is_generator {
                    return Err(self.error_here("Generator functions cannot use '=>'"));
                }
                self.advance();
                self.with_body(kind, |p| {
                    if allow_cascade {
                        p.parse_expression()
                    } else {
                        p.parse_expression_without_cascade()
                    }
                })
            }
            TokenKind::LBrace => self.with_body(kind, |p| p.parse_block()),
            _ => Err(self.expected("a function body")),
        }
    }

    // ===== Cascades =====

    fn at_cascade(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::DotDot | TokenKind::QuestionDotDot
        )
    }

    fn parse_cascade(&mut self) -> PResult<()> {
        while self.at_cascade() {
            self.advance();
            let mut shape = Shape::Assignable;
            if self.match_token(TokenKind::LBracket) {
                self.parse_expression()?;
                self.expect_token(TokenKind::RBracket, "Expected ']' after index expression")?;
            } else {
                self.expect_identifier()?;
            }

            loop {
                match self.peek_kind() {
                    TokenKind::Dot | TokenKind::QuestionDot => {
                        self.advance();
                        self.expect_identifier()?;
                        shape = Shape::Assignable;
                    }
                    TokenKind::LBracket => {
                        self.parse_index_selector()?;
                        shape = Shape::Assignable;
                    }
                    TokenKind::LParen => {
                        self.parse_arguments()?;
                        shape = Shape::Value;
                    }
                    TokenKind::Lt if self.at_generic_selector() => {
                        self.parse_type_arguments()?;
                        if self.check(TokenKind::LParen) {
                            self.parse_arguments()?;
                        }
                        shape = Shape::Value;
                    }
                    TokenKind::Bang => {
                        self.advance();
                        shape = Shape::Value;
                    }
                    _ => break,
                }
            }

            if self.peek_kind().is_assignment_operator() {
                if shape != Shape::Assignable {
                    return Err(self.error_here(format!(
                        "Expected an assignable expression before {}",
                        self.describe_current()
                    )));
                }
                self.advance();
                self.parse_expression_without_cascade()?;
            }
        }
        Ok(())
    }

    // ===== Operators =====

    fn parse_conditional(&mut self) -> PResult<Shape> {
        let shape = self.parse_binary(1)?;
        if !self.match_token(TokenKind::Question) {
            return Ok(shape);
        }
        self.parse_expression_without_cascade()?;
        self.expect_token(TokenKind::Colon, "Expected ':' in conditional expression")?;
        self.parse_expression_without_cascade()?;
        Ok(Shape::Value)
    }

    /// Precedence climbing over every operator of binding power at least
    /// `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> PResult<Shape> {
        let mut shape = self.parse_unary()?;
        let mut closed_levels: u16 = 0;

        loop {
            let kind = self.peek_kind();
            let Some((precedence, non_associative)) = binary_precedence(kind) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            if non_associative && closed_levels & (1 << precedence) != 0 {
                break;
            }
            self.advance();

            match kind {
                TokenKind::Is => {
                    self.match_token(TokenKind::Bang);
                    self.parse_type_in_expression()?;
                }
                TokenKind::As => self.parse_type_in_expression()?,
                _ => {
                    self.nested(|p| p.parse_binary(precedence + 1))?;
                }
            }
            if non_associative {
                closed_levels |= 1 << precedence;
            }
            shape = Shape::Value;
        }
        Ok(shape)
    }

    fn parse_unary(&mut self) -> PResult<Shape> {
        let mut prefixed = false;
        loop {
            match self.peek_kind() {
                TokenKind::Minus | TokenKind::Tilde
                    if self.check_at(1, TokenKind::Super) && !self.at_selector_after(2) =>
                {
                    self.advance();
                    self.advance();
                    return Ok(Shape::Value);
                }
                TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde => {
                    self.advance();
                    prefixed = true;
                }
                TokenKind::Await if self.in_async() => {
                    self.advance();
                    prefixed = true;
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let operator = self.describe_current();
                    self.advance();
                    let operand = self.current_location();
                    if self.parse_postfix()? != Shape::Assignable {
                        return Err(ParseError {
                            message: format!("Expected an assignable expression after {operator}"),
                            location: operand,
                        });
                    }
                    return Ok(Shape::Value);
                }
                _ => break,
            }
        }
        let shape = self.parse_postfix()?;
        Ok(if prefixed { Shape::Value } else { shape })
    }

    fn at_selector_after(&self, n: usize) -> bool {
        matches!(
            self.peek_kind_at(n),
            TokenKind::Dot
                | TokenKind::QuestionDot
                | TokenKind::LBracket
                | TokenKind::LParen
                | TokenKind::Lt
        )
    }

    // ===== Selectors =====

    fn parse_postfix(&mut self) -> PResult<Shape> {
        let mut shape = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::QuestionDot => {
                    self.advance();
                    self.expect_identifier()?;
                    shape = Shape::Assignable;
                }
                TokenKind::LBracket => {
                    self.parse_index_selector()?;
                    shape = Shape::Assignable;
                }
                TokenKind::Question
                    if self.check_at(1, TokenKind::LBracket) && self.next_is_adjacent() =>
                {
                    self.advance();
                    self.parse_index_selector()?;
                    shape = Shape::Assignable;
                }
                TokenKind::Bang => {
                    self.advance();
                    shape = Shape::Value;
                }
                TokenKind::LParen => {
                    self.parse_arguments()?;
                    shape = Shape::Value;
                }
                TokenKind::Lt if self.at_generic_selector() => {
                    self.parse_type_arguments()?;
                    if self.check(TokenKind::LParen) {
                        self.parse_arguments()?;
                    }
                    shape = Shape::Value;
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus if shape == Shape::Assignable => {
                    self.advance();
                    return Ok(Shape::Value);
                }
                _ => break,
            }
        }
        Ok(shape)
    }

    fn parse_index_selector(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::LBracket, "Expected '['")?;
        self.parse_expression()?;
        self.expect_token(TokenKind::RBracket, "Expected ']' after index expression")
    }

    /// `<` starts type arguments of a generic call or tear-off only when the
    /// closing `>` is followed by `(` or `.`; otherwise it is less-than.
    fn at_generic_selector(&mut self) -> bool {
        self.speculate(|p| {
            p.parse_type_arguments()?;
            match p.peek_kind() {
                TokenKind::LParen | TokenKind::Dot => Ok(()),
                _ => Err(p.expected("'(' after type arguments")),
            }
        })
    }

    /// `(a, name: b, c,)`
    pub(crate) fn parse_arguments(&mut self) -> PResult<()> {
        self.expect_lparen("to start an argument list")?;
        while !self.check(TokenKind::RParen) {
            if self.at_identifier() && self.check_at(1, TokenKind::Colon) {
                self.advance();
                self.advance();
            }
            self.parse_expression()?;
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect_rparen("to close the argument list")
    }

    // ===== Primaries =====

    fn parse_primary(&mut self) -> PResult<Shape> {
        match self.peek_kind() {
            TokenKind::This
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Number => {
                self.advance();
                Ok(Shape::Value)
            }
            TokenKind::Super => {
                self.advance();
                let next = self.peek_kind();
                if self.at_selector_after(0) || binary_precedence(next).is_some() {
                    Ok(Shape::Value)
                } else {
                    Err(self.expected("a selector or an operator after 'super'"))
                }
            }
            TokenKind::String | TokenKind::StringBegin => {
                self.parse_string_literal()?;
                Ok(Shape::Value)
            }
            TokenKind::Hash => {
                self.parse_symbol_literal()?;
                Ok(Shape::Value)
            }
            TokenKind::LBracket => {
                self.parse_list_literal()?;
                Ok(Shape::Value)
            }
            TokenKind::LBrace => {
                self.parse_set_or_map_literal()?;
                Ok(Shape::Value)
            }
            TokenKind::Lt => {
                if self.scan_function_expression() == Some(TokenKind::LBrace) {
                    self.parse_function_expression(true)?;
                } else {
                    self.parse_typed_collection_literal()?;
                }
                Ok(Shape::Value)
            }
            TokenKind::LParen => {
                if self.scan_function_expression() == Some(TokenKind::LBrace) {
                    self.parse_function_expression(true)?;
                } else {
                    self.advance();
                    self.parse_expression()?;
                    self.expect_rparen("to close the parenthesized expression")?;
                }
                Ok(Shape::Value)
            }
            TokenKind::Const => {
                self.parse_const_expression()?;
                Ok(Shape::Value)
            }
            TokenKind::New => {
                self.advance();
                self.parse_constructor_invocation()?;
                Ok(Shape::Value)
            }
            _ if self.at_identifier() => {
                self.advance();
                Ok(Shape::Assignable)
            }
            _ => Err(self.expected("an expression")),
        }
    }

    /// Adjacent string pieces, with interpolations, form one literal.
    pub(crate) fn parse_string_literal(&mut self) -> PResult<()> {
        if !self.peek_kind().is_string_start() {
            return Err(self.expected("a string literal"));
        }
        while self.peek_kind().is_string_start() {
            if self.match_token(TokenKind::String) {
                continue;
            }
            self.advance();
            loop {
                self.parse_expression()?;
                if self.match_token(TokenKind::StringMiddle) {
                    continue;
                }
                self.expect_token(
                    TokenKind::StringEnd,
                    "Expected '}' to close the string interpolation",
                )?;
                break;
            }
        }
        Ok(())
    }

    /// `#name`, `#a.b.c`, `#+`, `#[]=` or `#void`.
    fn parse_symbol_literal(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Hash, "Expected '#'")?;
        if self.peek_kind().is_user_definable_operator() || self.check(TokenKind::Void) {
            self.advance();
            return Ok(());
        }
        if self.match_token(TokenKind::LBracket) {
            self.expect_token(TokenKind::RBracket, "Expected ']' in symbol literal")?;
            self.match_token(TokenKind::Eq);
            return Ok(());
        }
        self.expect_identifier()?;
        while self.check(TokenKind::Dot) && self.is_identifier_kind(self.peek_kind_at(1)) {
            self.advance();
            self.advance();
        }
        Ok(())
    }

    fn parse_const_expression(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Const, "Expected 'const'")?;
        match self.peek_kind() {
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_set_or_map_literal(),
            TokenKind::Lt => self.parse_typed_collection_literal(),
            _ => self.parse_constructor_invocation(),
        }
    }

    /// `Type<Args>.name(arguments)` after `new` or `const`.
    fn parse_constructor_invocation(&mut self) -> PResult<()> {
        self.parse_type_name()?;
        if self.check(TokenKind::Lt) {
            self.parse_type_arguments()?;
        }
        if self.match_token(TokenKind::Dot) {
            self.expect_identifier()?;
        }
        self.parse_arguments()
    }

    // ===== Collections =====

    fn parse_typed_collection_literal(&mut self) -> PResult<()> {
        self.parse_type_arguments()?;
        match self.peek_kind() {
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_set_or_map_literal(),
            _ => Err(self.expected("'[' or '{' after type arguments")),
        }
    }

    fn parse_list_literal(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::LBracket, "Expected '['")?;
        self.parse_elements(TokenKind::RBracket)?;
        self.expect_token(TokenKind::RBracket, "Expected ']' to close the list literal")
    }

    fn parse_set_or_map_literal(&mut self) -> PResult<()> {
        self.expect_lbrace("to start a set or map literal")?;
        self.parse_elements(TokenKind::RBrace)?;
        self.expect_rbrace("to close the set or map literal")
    }

    fn parse_elements(&mut self, close: TokenKind) -> PResult<()> {
        while !self.check(close) {
            self.parse_element()?;
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// Expressions, map entries, spreads and `if` / `for` elements.
    fn parse_element(&mut self) -> PResult<()> {
        self.nested(|p| match p.peek_kind() {
            TokenKind::Ellipsis | TokenKind::EllipsisQuestion => {
                p.advance();
                p.parse_expression()
            }
            TokenKind::If => {
                p.advance();
                p.expect_lparen("after 'if'")?;
                p.parse_expression()?;
                p.expect_rparen("after if condition")?;
                p.parse_element()?;
                if p.match_token(TokenKind::Else) {
                    p.parse_element()?;
                }
                Ok(())
            }
            TokenKind::Await if p.in_async() && p.check_at(1, TokenKind::For) => {
                p.advance();
                p.parse_for_element()
            }
            TokenKind::For => p.parse_for_element(),
            _ => {
                p.parse_expression()?;
                if p.match_token(TokenKind::Colon) {
                    p.parse_expression()?;
                }
                Ok(())
            }
        })
    }

    fn parse_for_element(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::For, "Expected 'for'")?;
        self.expect_lparen("after 'for'")?;
        self.parse_for_loop_parts()?;
        self.expect_rparen("after for loop clauses")?;
        self.parse_element()
    }
}

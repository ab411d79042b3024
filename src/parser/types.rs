//! Type parsing implementation
//!
//! # Grammar
//!
//! ```text
//! type            ::= functionTypeTails | typeNotFunction functionTypeTails?
//! typeNotFunction ::= 'void' | 'Function' '?'? | typeName typeArguments? '?'?
//! typeName        ::= typeIdentifier ('.' typeIdentifier)?
//! functionType    ::= 'Function' typeParameters? parameterTypeList '?'?
//! typeArguments   ::= '<' type (',' type)* '>'
//! typeParameters  ::= '<' typeParameter (',' typeParameter)* '>'
//! typeParameter   ::= metadata typeIdentifier ('extends' typeNotVoid)?
//! ```
//!
//! Closing brackets accept the first `>` of `>>`, `>>>`, `>=` and the
//! compound assignments built from them.

use crate::parser::parse::{PResult, Parser};
use crate::parser::token::TokenKind;

impl Parser {
    pub(crate) fn parse_type(&mut self) -> PResult<()> {
        self.nested(|p| {
            if p.at_function_type_tail() {
                p.parse_function_type_tail()?;
            } else {
                p.parse_type_not_function()?;
            }
            while p.at_function_type_tail() {
                p.parse_function_type_tail()?;
            }
            Ok(())
        })
    }

    /// A type other than plain `void`; `void Function()` is allowed.
    pub(crate) fn parse_type_not_void(&mut self) -> PResult<()> {
        if self.check(TokenKind::Void) && !self.check_at(1, TokenKind::Function) {
            return Err(self.expected("a type other than 'void'"));
        }
        self.parse_type()
    }

    /// The type operand of `is` and `as`.
    ///
    /// A `?` directly after the type is the nullable suffix unless the token
    /// after it can start an expression, in which case it begins a
    /// conditional expression.
    pub(crate) fn parse_type_in_expression(&mut self) -> PResult<()> {
        let saved = (self.type_test, self.type_nesting);
        self.type_test = true;
        self.type_nesting = 0;
        let result = self.parse_type_not_void();
        (self.type_test, self.type_nesting) = saved;
        result
    }

    fn at_function_type_tail(&self) -> bool {
        self.check(TokenKind::Function)
            && matches!(self.peek_kind_at(1), TokenKind::LParen | TokenKind::Lt)
    }

    fn parse_type_not_function(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Void => {
                self.advance();
                Ok(())
            }
            TokenKind::Function => {
                self.advance();
                self.eat_nullable_suffix();
                Ok(())
            }
            _ if self.at_type_identifier() => {
                self.parse_type_name()?;
                if self.check(TokenKind::Lt) {
                    self.parse_type_arguments()?;
                }
                self.eat_nullable_suffix();
                Ok(())
            }
            _ => Err(self.expected("a type")),
        }
    }

    /// `Name` or `prefix.Name`.
    pub(crate) fn parse_type_name(&mut self) -> PResult<()> {
        self.expect_type_identifier()?;
        if self.check(TokenKind::Dot) && self.is_type_identifier_kind(self.peek_kind_at(1)) {
            self.advance();
            self.advance();
        }
        Ok(())
    }

    fn parse_function_type_tail(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Function, "Expected 'Function'")?;
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.parse_parameter_type_list()?;
        self.eat_nullable_suffix();
        Ok(())
    }

    fn eat_nullable_suffix(&mut self) {
        if !self.check(TokenKind::Question) {
            return;
        }
        if self.type_test && self.type_nesting == 0 && self.can_start_expression(self.peek_kind_at(1)) {
            return;
        }
        self.advance();
    }

    /// Run `production` inside a pair of type brackets.
    fn within_type_brackets(&mut self, production: impl FnOnce(&mut Self) -> PResult<()>) -> PResult<()> {
        self.type_nesting += 1;
        let result = production(self);
        self.type_nesting -= 1;
        result
    }

    pub(crate) fn parse_type_arguments(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Lt, "Expected '<' to start type arguments")?;
        self.within_type_brackets(|p| {
            p.parse_type()?;
            while p.match_token(TokenKind::Comma) {
                p.parse_type()?;
            }
            p.close_angle("to close type arguments")
        })
    }

    pub(crate) fn parse_type_parameters(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Lt, "Expected '<' to start type parameters")?;
        self.within_type_brackets(|p| {
            loop {
                p.parse_metadata()?;
                p.expect_type_identifier()?;
                if p.match_token(TokenKind::Extends) {
                    p.parse_type_not_void()?;
                }
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            p.close_angle("to close type parameters")
        })
    }

    /// Comma-separated types after `implements`, `with` and `on`.
    pub(crate) fn parse_type_list(&mut self) -> PResult<()> {
        self.parse_type_not_void()?;
        while self.match_token(TokenKind::Comma) {
            self.parse_type_not_void()?;
        }
        Ok(())
    }

    /// Parameters of a function type: names are optional.
    fn parse_parameter_type_list(&mut self) -> PResult<()> {
        self.expect_lparen("to start a parameter type list")?;
        self.within_type_brackets(|p| {
            while !p.check(TokenKind::RParen) {
                match p.peek_kind() {
                    TokenKind::LBracket => {
                        p.advance();
                        p.parse_parameter_type_group(TokenKind::RBracket, false)?;
                        p.expect_token(
                            TokenKind::RBracket,
                            "Expected ']' to close optional parameter types",
                        )?;
                        break;
                    }
                    TokenKind::LBrace => {
                        p.advance();
                        p.parse_parameter_type_group(TokenKind::RBrace, true)?;
                        p.expect_rbrace("to close named parameter types")?;
                        break;
                    }
                    _ => p.parse_normal_parameter_type()?,
                }
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            p.expect_rparen("to close the parameter type list")
        })
    }

    fn parse_parameter_type_group(&mut self, close: TokenKind, named: bool) -> PResult<()> {
        loop {
            if named {
                self.parse_metadata()?;
                self.match_token(TokenKind::Required);
                self.parse_type()?;
                self.expect_identifier()?;
            } else {
                self.parse_normal_parameter_type()?;
            }
            if !self.match_token(TokenKind::Comma) || self.check(close) {
                return Ok(());
            }
        }
    }

    fn parse_normal_parameter_type(&mut self) -> PResult<()> {
        self.parse_metadata()?;
        self.parse_type()?;
        if self.at_identifier() {
            self.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse::{recognize, ParseOptions};

    fn accepts(source: &str) -> bool {
        recognize(source, &ParseOptions::default()).is_ok()
    }

    #[test]
    fn test_function_types() {
        assert!(accepts("void Function(int, String name)? callback;"));
        assert!(accepts("int Function<T>(T value, [int? extra]) f;"));
        assert!(accepts("void Function({required int a, String b}) g;"));
        assert!(accepts("Function h;"));
        assert!(accepts("void Function() Function(int) curried;"));
    }

    #[test]
    fn test_prefixed_and_nullable_types() {
        assert!(accepts("async.Future<int?>? f;"));
        assert!(accepts("Map<String, dynamic> json = {};"));
    }

    #[test]
    fn test_type_parameters() {
        assert!(accepts("class Box<T extends Comparable<T>> {}"));
        assert!(accepts("T first<T, @meta U extends List<T>>(U items) => items[0];"));
    }

    #[test]
    fn test_unclosed_type_arguments() {
        let err = recognize("var m = <int, String x;", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.message(), "Expected '>' to close type arguments, found identifier 'x'");
    }

    #[test]
    fn test_void_is_not_a_supertype() {
        assert!(!accepts("class A extends void {}"));
    }

    #[test]
    fn test_nullable_type_test_before_conditional() {
        assert!(accepts("var a = x is int? ? 1 : 2;"));
        assert!(accepts("var b = x is int ? 1 : 2;"));
        assert!(accepts("var c = x as String?;"));
        assert!(accepts("var d = x is List<int?> ? y : z;"));
    }
}

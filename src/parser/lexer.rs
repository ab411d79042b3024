//! Lexer (tokenizer) for Dart source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. Whitespace and comments are discarded; they never reach the
//! parser. String interpolation is handled here: a string containing `${`
//! is split into [`TokenKind::StringBegin`] / [`TokenKind::StringMiddle`] /
//! [`TokenKind::StringEnd`] pieces with the interpolated expressions lexed
//! as ordinary tokens in between.
//!
//! The lexer is an [`Iterator`] over `Result<Token, LexError>` that yields a
//! single [`TokenKind::Eof`] at the end and stops after the first error.

use thiserror::Error;

use super::source::{SourceLocation, Span};
use super::token::{Token, TokenKind};

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer error at line {}, column {}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Where a token started: enough to build its lexeme, span and location.
#[derive(Debug, Clone, Copy)]
struct Mark {
    position: usize,
    offset: usize,
    location: SourceLocation,
}

/// A string literal whose `${` interpolation is currently being lexed.
#[derive(Debug, Clone, Copy)]
struct OpenString {
    quote: char,
    triple: bool,
    start: SourceLocation,
    /// Unmatched `{` inside the interpolated expression.
    brace_depth: usize,
}

/// Lexer for Dart source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
    column: usize,
    open_strings: Vec<OpenString>,
    finished: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            offset: 0,
            line: 1,
            column: 1,
            open_strings: Vec::new(),
            finished: false,
        };
        // A byte-order mark is invisible: it moves neither line nor column.
        if lexer.peek() == Some('\u{feff}') {
            lexer.position = 1;
            lexer.offset = '\u{feff}'.len_utf8();
        }
        lexer
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        self.collect()
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        if self.line == 1 && self.column == 1 && self.peek() == Some('#')
            && self.peek_ahead(1) == Some('!')
        {
            return Ok(self.script_tag());
        }

        self.skip_whitespace_and_comments()?;

        let mark = self.mark();
        let ch = match self.advance() {
            Some(ch) => ch,
            None => {
                if let Some(open) = self.open_strings.last() {
                    return Err(LexError::new(
                        "Unterminated string interpolation",
                        open.start,
                    ));
                }
                return Ok(self.make_token(TokenKind::Eof, mark));
            }
        };

        let kind = match ch {
            '"' | '\'' => return self.string_literal(ch, false, mark),
            'r' if matches!(self.peek(), Some('"') | Some('\'')) => {
                let quote = self.advance().unwrap_or(ch);
                return self.string_literal(quote, true, mark);
            }
            '0'..='9' => return self.number_literal(ch, mark),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return self.number_literal(ch, mark);
            }
            c if is_identifier_start(c) => return Ok(self.identifier_or_keyword(mark)),

            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => {
                if let Some(open) = self.open_strings.last_mut() {
                    open.brace_depth += 1;
                }
                TokenKind::LBrace
            }
            '}' => {
                match self.open_strings.last_mut() {
                    Some(open) if open.brace_depth == 0 => {
                        let open = *open;
                        return self.string_body(open.quote, open.triple, false, true, open.start, mark);
                    }
                    Some(open) => open.brace_depth -= 1,
                    None => {}
                }
                TokenKind::RBrace
            }
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '@' => TokenKind::At,
            '#' => TokenKind::Hash,
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqEq
                } else if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        TokenKind::LtLtEq
                    } else {
                        TokenKind::LtLt
                    }
                } else if self.match_char('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        if self.match_char('=') {
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    } else if self.match_char('=') {
                        TokenKind::GtGtEq
                    } else {
                        TokenKind::GtGt
                    }
                } else if self.match_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '+' => {
                if self.match_char('+') {
                    TokenKind::PlusPlus
                } else if self.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    TokenKind::MinusMinus
                } else if self.match_char('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.match_char('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '~' => {
                if self.match_char('/') {
                    if self.match_char('=') {
                        TokenKind::TildeSlashEq
                    } else {
                        TokenKind::TildeSlash
                    }
                } else {
                    TokenKind::Tilde
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::AmpAmp
                } else if self.match_char('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::PipePipe
                } else if self.match_char('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.match_char('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            '?' => {
                if self.match_char('?') {
                    if self.match_char('=') {
                        TokenKind::QuestionQuestionEq
                    } else {
                        TokenKind::QuestionQuestion
                    }
                } else if self.peek() == Some('.') {
                    if self.peek_ahead(1) == Some('.') {
                        self.advance();
                        self.advance();
                        TokenKind::QuestionDotDot
                    } else if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                        // `c ?.5 : x` is a conditional, not a null-aware access.
                        TokenKind::Question
                    } else {
                        self.advance();
                        TokenKind::QuestionDot
                    }
                } else {
                    TokenKind::Question
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    if self.match_char('.') {
                        if self.match_char('?') {
                            TokenKind::EllipsisQuestion
                        } else {
                            TokenKind::Ellipsis
                        }
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }

            _ => {
                return Err(LexError::new(
                    format!("Unexpected character '{}'", ch.escape_debug()),
                    mark.location,
                ));
            }
        };

        Ok(self.make_token(kind, mark))
    }

    /// `#!` up to (not including) the end of the first line
    fn script_tag(&mut self) -> Token {
        let mark = self.mark();
        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
        self.make_token(TokenKind::ScriptTag, mark)
    }

    /// Parse a string literal whose opening quote (and `r` prefix, if raw)
    /// has been consumed.
    fn string_literal(
        &mut self,
        quote: char,
        raw: bool,
        mark: Mark,
    ) -> Result<Token, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }
        self.string_body(quote, triple, raw, false, mark.location, mark)
    }

    /// Scan string content up to the closing quote or the next `${`.
    ///
    /// `continuation` is set when resuming after the `}` that closed an
    /// interpolation; it selects the Middle/End token kinds over Begin/String.
    fn string_body(
        &mut self,
        quote: char,
        triple: bool,
        raw: bool,
        continuation: bool,
        start: SourceLocation,
        mark: Mark,
    ) -> Result<Token, LexError> {
        loop {
            let ch = match self.peek() {
                Some(ch) => ch,
                None => return Err(LexError::new("Unterminated string literal", start)),
            };

            if ch == quote {
                if !triple {
                    self.advance();
                    return Ok(self.close_string(continuation, mark));
                }
                if self.peek_ahead(1) == Some(quote) && self.peek_ahead(2) == Some(quote) {
                    self.advance();
                    self.advance();
                    self.advance();
                    return Ok(self.close_string(continuation, mark));
                }
                self.advance();
                continue;
            }

            if !triple && (ch == '\n' || ch == '\r') {
                return Err(LexError::new("Unterminated string literal", start));
            }

            if raw {
                self.advance();
                continue;
            }

            match ch {
                '\\' => {
                    let escape_loc = self.current_location();
                    self.advance();
                    self.escape_sequence(triple, start, escape_loc)?;
                }
                '$' => {
                    let dollar_loc = self.current_location();
                    self.advance();
                    if self.match_char('{') {
                        if continuation {
                            if let Some(open) = self.open_strings.last_mut() {
                                open.brace_depth = 0;
                            }
                        } else {
                            self.open_strings.push(OpenString {
                                quote,
                                triple,
                                start,
                                brace_depth: 0,
                            });
                        }
                        let kind = if continuation {
                            TokenKind::StringMiddle
                        } else {
                            TokenKind::StringBegin
                        };
                        return Ok(self.make_token(kind, mark));
                    }
                    match self.peek() {
                        Some(c) if is_identifier_start(c) && c != '$' => {
                            while self
                                .peek()
                                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                            {
                                self.advance();
                            }
                        }
                        _ => {
                            return Err(LexError::new(
                                "A '$' in a string must be followed by an identifier or '{'",
                                dollar_loc,
                            ));
                        }
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn close_string(&mut self, continuation: bool, mark: Mark) -> Token {
        if continuation {
            self.open_strings.pop();
            self.make_token(TokenKind::StringEnd, mark)
        } else {
            self.make_token(TokenKind::String, mark)
        }
    }

    /// Validate the escape following a backslash (already consumed).
    fn escape_sequence(
        &mut self,
        triple: bool,
        start: SourceLocation,
        escape_loc: SourceLocation,
    ) -> Result<(), LexError> {
        let escaped = match self.peek() {
            Some(ch) => ch,
            None => return Err(LexError::new("Unterminated string literal", start)),
        };

        match escaped {
            '\n' | '\r' if !triple => {
                Err(LexError::new("Unterminated string literal", start))
            }
            'x' => {
                self.advance();
                if self.take_hex_digits(2) != 2 {
                    return Err(LexError::new(
                        "Invalid hexadecimal escape sequence",
                        escape_loc,
                    ));
                }
                Ok(())
            }
            'u' => {
                self.advance();
                if self.match_char('{') {
                    let digits = self.take_hex_digits(6);
                    if digits == 0 || !self.match_char('}') {
                        return Err(LexError::new(
                            "Invalid Unicode escape sequence",
                            escape_loc,
                        ));
                    }
                } else if self.take_hex_digits(4) != 4 {
                    return Err(LexError::new(
                        "Invalid Unicode escape sequence",
                        escape_loc,
                    ));
                }
                Ok(())
            }
            _ => {
                self.advance();
                Ok(())
            }
        }
    }

    /// Consume up to `max` hex digits, returning how many were taken.
    fn take_hex_digits(&mut self, max: usize) -> usize {
        let mut taken = 0;
        while taken < max && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
            taken += 1;
        }
        taken
    }

    /// Parse numeric literal: decimal, double with optional exponent, or hex
    fn number_literal(&mut self, first: char, mark: Mark) -> Result<Token, LexError> {
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            if self.take_hex_digits(usize::MAX) == 0 {
                return Err(LexError::new(
                    "Hexadecimal literal needs at least one digit",
                    mark.location,
                ));
            }
            return Ok(self.make_token(TokenKind::Number, mark));
        }

        self.skip_digits();
        if first != '.'
            && self.peek() == Some('.')
            && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            self.skip_digits();
        }

        // The exponent belongs to the number only when digits follow it.
        if matches!(self.peek(), Some('e') | Some('E')) {
            let digits_at = if matches!(self.peek_ahead(1), Some('+') | Some('-')) {
                2
            } else {
                1
            };
            if self.peek_ahead(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        Ok(self.make_token(TokenKind::Number, mark))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Parse identifier or keyword; the first character is already consumed.
    fn identifier_or_keyword(&mut self, mark: Mark) -> Token {
        while self.peek().is_some_and(is_identifier_part) {
            self.advance();
        }

        let word: String = self.input[mark.position..self.position].iter().collect();
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, mark)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...), leaving the line terminator
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */); these nest.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'
        let mut depth = 1;

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if self.peek() == Some('/') && self.peek_ahead(1) == Some('*') {
                self.advance();
                self.advance();
                depth += 1;
            } else {
                self.advance();
            }
        }

        Err(LexError::new("Unterminated block comment", start_loc))
    }

    fn make_token(&self, kind: TokenKind, mark: Mark) -> Token {
        let lexeme: String = self.input[mark.position..self.position].iter().collect();
        Token::new(
            kind,
            lexeme,
            Span::new(mark.offset, self.offset),
            mark.location,
        )
    }

    fn mark(&self) -> Mark {
        Mark {
            position: self.position,
            offset: self.offset,
            location: self.current_location(),
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Consume the current character if it is `expected`.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        self.offset += ch.len_utf8();

        match ch {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // `\r\n` is one terminator, counted when the `\n` is consumed.
            '\r' if self.peek() != Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer {}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { return 0; }");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "int");
        assert_eq!(tokens[1].lexeme, "main");
        assert_eq!(tokens[2].kind, TokenKind::LParen);
        assert_eq!(tokens[3].kind, TokenKind::RParen);
        assert_eq!(tokens[4].kind, TokenKind::LBrace);
        assert_eq!(tokens[5].kind, TokenKind::Return);
        assert_eq!(tokens[6].kind, TokenKind::Number);
        assert_eq!(tokens[7].kind, TokenKind::Semicolon);
        assert_eq!(tokens[8].kind, TokenKind::RBrace);
        assert_eq!(tokens[9].kind, TokenKind::Eof);
        assert_eq!(tokens.len(), 10);
    }

    #[test]
    fn test_maximal_munch_shift_assign() {
        let tokens = Lexer::new(">>=").tokenize().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::GtGtEq);
        assert_eq!(tokens[0].lexeme, ">>=");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("++ -- += -= == != && || ?? ??= ?. ?.. ... ...? => ~/ ~/= >>> >>>= <<= .."),
            vec![
                PlusPlus, MinusMinus, PlusEq, MinusEq, EqEq, BangEq, AmpAmp, PipePipe,
                QuestionQuestion, QuestionQuestionEq, QuestionDot, QuestionDotDot,
                Ellipsis, EllipsisQuestion, Arrow, TildeSlash, TildeSlashEq, GtGtGt,
                GtGtGtEq, LtLtEq, DotDot, Eof,
            ]
        );
    }

    #[test]
    fn test_question_dot_before_digit() {
        use TokenKind::*;
        assert_eq!(kinds("c ?.5 : 1"), vec![Identifier, Question, Number, Colon, Number, Eof]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("class Function dynamic await foo_bar $x"),
            vec![Class, Function, Dynamic, Await, Identifier, Identifier, Eof]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = Lexer::new("var x; // comment\nvar y; /* block /* nested */\ncomment */ var z;")
            .tokenize()
            .unwrap();

        let names: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(names, vec!["var", "x", ";", "var", "y", ";", "var", "z", ";", ""]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = Lexer::new("var x;\n/* /* */").tokenize().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 1));
        assert_eq!(err.message, "Unterminated block comment");
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("1 1.5 .5 1e10 1.5E-3 0xFF 1.foo").tokenize().unwrap();
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(
            lexemes,
            vec!["1", "1.5", ".5", "1e10", "1.5E-3", "0xFF", "1", ".", "foo", ""]
        );
    }

    #[test]
    fn test_exponent_needs_digits() {
        let tokens = Lexer::new("1e").tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_string_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"'a' "b" r'\d$' '''x
y''' 'it\'s' "\x41A\u{1F600}""#),
            vec![String, String, String, String, String, String, Eof]
        );
    }

    #[test]
    fn test_string_interpolation() {
        use TokenKind::*;
        let tokens = Lexer::new(r#"'a ${b + "c${d}"} e $f ${ {1: 2} }'"#).tokenize().unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StringBegin, Identifier, Plus, StringBegin, Identifier, StringEnd,
                StringMiddle, LBrace, Number, Colon, Number, RBrace, StringEnd, Eof,
            ]
        );
        assert_eq!(tokens[0].lexeme, "'a ${");
        assert_eq!(tokens[6].lexeme, "} e $f ${");
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("var s = 'abc\n';").tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.location, SourceLocation::new(1, 9));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let err = Lexer::new("var s = '${a").tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated string interpolation");
        assert_eq!(err.location, SourceLocation::new(1, 9));
    }

    #[test]
    fn test_bad_dollar() {
        let err = Lexer::new("'cost: $5'").tokenize().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 8));
    }

    #[test]
    fn test_bad_escape() {
        let err = Lexer::new(r"'\x4'").tokenize().unwrap_err();
        assert_eq!(err.message, "Invalid hexadecimal escape sequence");
        assert_eq!(err.location, SourceLocation::new(1, 2));
    }

    #[test]
    fn test_illegal_character_position() {
        let err = Lexer::new("var a;\nvar § = 1;").tokenize().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 5));
        assert_eq!(err.message, "Unexpected character '§'");
    }

    #[test]
    fn test_crlf_positions() {
        let tokens = Lexer::new("a\r\nb\rc").tokenize().unwrap();
        assert_eq!(tokens[1].location, SourceLocation::new(2, 1));
        assert_eq!(tokens[2].location, SourceLocation::new(3, 1));
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = Lexer::new("'é' x").tokenize().unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 4));
        assert_eq!(tokens[1].span, Span::new(5, 6));
        assert_eq!(tokens[1].location, SourceLocation::new(1, 5));
        assert_eq!(tokens[2].span, Span::new(6, 6));
    }

    #[test]
    fn test_script_tag_and_bom() {
        use TokenKind::*;
        let tokens = Lexer::new("\u{feff}#!/usr/bin/env dart\nmain() {}").tokenize().unwrap();
        assert_eq!(tokens[0].kind, ScriptTag);
        assert_eq!(tokens[0].lexeme, "#!/usr/bin/env dart");
        assert_eq!(tokens[0].location, SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location, SourceLocation::new(2, 1));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut lexer = Lexer::new("a ` b");
        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_single_eof() {
        let tokens = Lexer::new("   // only a comment").tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(tokens[0].span.is_empty());
    }
}

//! Token definitions for Dart source text
//!
//! Tokens are a fieldless [`TokenKind`] plus the exact lexeme, its byte
//! [`Span`] and the [`SourceLocation`] of its first character. Keywords are
//! split into three groups, as Dart does: reserved words can
//! never be identifiers, built-in identifiers can be identifiers but not type
//! names, and contextual keywords are ordinary identifiers outside the
//! constructs that give them meaning.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

use super::source::{SourceLocation, Span};

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals and names
    Identifier,
    Number,
    /// A complete string literal piece with no `${` interpolation.
    String,
    /// Opening quote up to the first `${`.
    StringBegin,
    /// `}` of one interpolation up to the next `${`.
    StringMiddle,
    /// `}` of the last interpolation up to the closing quote.
    StringEnd,
    /// `#!` line at the very start of a script.
    ScriptTag,

    // Reserved words
    Assert,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Default,
    Do,
    Else,
    Enum,
    Extends,
    False,
    Final,
    Finally,
    For,
    If,
    In,
    Is,
    New,
    Null,
    Rethrow,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Var,
    Void,
    While,
    With,

    // Built-in identifiers
    Abstract,
    As,
    Covariant,
    Deferred,
    Dynamic,
    Export,
    External,
    Extension,
    Factory,
    Function,
    Get,
    Implements,
    Import,
    Interface,
    Late,
    Library,
    Mixin,
    Operator,
    Part,
    Required,
    Set,
    Static,
    Typedef,

    // Contextual keywords
    Async,
    Await,
    Hide,
    Of,
    On,
    Show,
    Sync,
    Yield,

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Semicolon, // ;
    Comma,     // ,
    Colon,     // :
    At,        // @
    Hash,      // #
    Arrow,     // =>

    // Member access and spreads
    Dot,              // .
    DotDot,           // ..
    Ellipsis,         // ...
    EllipsisQuestion, // ...?

    // Null-aware
    Question,           // ?
    QuestionDot,        // ?.
    QuestionDotDot,     // ?..
    QuestionQuestion,   // ??
    QuestionQuestionEq, // ??=

    // Equality and logic
    Eq,       // =
    EqEq,     // ==
    Bang,     // !
    BangEq,   // !=
    AmpAmp,   // &&
    PipePipe, // ||

    // Relational and shifts
    Lt,       // <
    LtEq,     // <=
    LtLt,     // <<
    LtLtEq,   // <<=
    Gt,       // >
    GtEq,     // >=
    GtGt,     // >>
    GtGtEq,   // >>=
    GtGtGt,   // >>>
    GtGtGtEq, // >>>=

    // Arithmetic
    Plus,         // +
    PlusEq,       // +=
    PlusPlus,     // ++
    Minus,        // -
    MinusEq,      // -=
    MinusMinus,   // --
    Star,         // *
    StarEq,       // *=
    Slash,        // /
    SlashEq,      // /=
    Percent,      // %
    PercentEq,    // %=
    TildeSlash,   // ~/
    TildeSlashEq, // ~/=

    // Bitwise
    Tilde,   // ~
    Amp,     // &
    AmpEq,   // &=
    Pipe,    // |
    PipeEq,  // |=
    Caret,   // ^
    CaretEq, // ^=

    // End of file
    Eof,
}

/// Every keyword of the language, in the order the lexer table is built.
const KEYWORDS: &[TokenKind] = &[
    TokenKind::Assert,
    TokenKind::Break,
    TokenKind::Case,
    TokenKind::Catch,
    TokenKind::Class,
    TokenKind::Const,
    TokenKind::Continue,
    TokenKind::Default,
    TokenKind::Do,
    TokenKind::Else,
    TokenKind::Enum,
    TokenKind::Extends,
    TokenKind::False,
    TokenKind::Final,
    TokenKind::Finally,
    TokenKind::For,
    TokenKind::If,
    TokenKind::In,
    TokenKind::Is,
    TokenKind::New,
    TokenKind::Null,
    TokenKind::Rethrow,
    TokenKind::Return,
    TokenKind::Super,
    TokenKind::Switch,
    TokenKind::This,
    TokenKind::Throw,
    TokenKind::True,
    TokenKind::Try,
    TokenKind::Var,
    TokenKind::Void,
    TokenKind::While,
    TokenKind::With,
    TokenKind::Abstract,
    TokenKind::As,
    TokenKind::Covariant,
    TokenKind::Deferred,
    TokenKind::Dynamic,
    TokenKind::Export,
    TokenKind::External,
    TokenKind::Extension,
    TokenKind::Factory,
    TokenKind::Function,
    TokenKind::Get,
    TokenKind::Implements,
    TokenKind::Import,
    TokenKind::Interface,
    TokenKind::Late,
    TokenKind::Library,
    TokenKind::Mixin,
    TokenKind::Operator,
    TokenKind::Part,
    TokenKind::Required,
    TokenKind::Set,
    TokenKind::Static,
    TokenKind::Typedef,
    TokenKind::Async,
    TokenKind::Await,
    TokenKind::Hide,
    TokenKind::Of,
    TokenKind::On,
    TokenKind::Show,
    TokenKind::Sync,
    TokenKind::Yield,
];

static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, TokenKind>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .filter_map(|&kind| kind.fixed_text().map(|text| (text, kind)))
        .collect()
});

impl TokenKind {
    /// Look up the keyword spelled `word`, if any.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        KEYWORD_TABLE.get(word).copied()
    }

    /// The exact spelling of tokens whose text never varies.
    pub fn fixed_text(self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            Identifier | Number | String | StringBegin | StringMiddle
            | StringEnd | ScriptTag | Eof => return None,
            Assert => "assert",
            Break => "break",
            Case => "case",
            Catch => "catch",
            Class => "class",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Do => "do",
            Else => "else",
            Enum => "enum",
            Extends => "extends",
            False => "false",
            Final => "final",
            Finally => "finally",
            For => "for",
            If => "if",
            In => "in",
            Is => "is",
            New => "new",
            Null => "null",
            Rethrow => "rethrow",
            Return => "return",
            Super => "super",
            Switch => "switch",
            This => "this",
            Throw => "throw",
            True => "true",
            Try => "try",
            Var => "var",
            Void => "void",
            While => "while",
            With => "with",
            Abstract => "abstract",
            As => "as",
            Covariant => "covariant",
            Deferred => "deferred",
            Dynamic => "dynamic",
            Export => "export",
            External => "external",
            Extension => "extension",
            Factory => "factory",
            Function => "Function",
            Get => "get",
            Implements => "implements",
            Import => "import",
            Interface => "interface",
            Late => "late",
            Library => "library",
            Mixin => "mixin",
            Operator => "operator",
            Part => "part",
            Required => "required",
            Set => "set",
            Static => "static",
            Typedef => "typedef",
            Async => "async",
            Await => "await",
            Hide => "hide",
            Of => "of",
            On => "on",
            Show => "show",
            Sync => "sync",
            Yield => "yield",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Semicolon => ";",
            Comma => ",",
            Colon => ":",
            At => "@",
            Hash => "#",
            Arrow => "=>",
            Dot => ".",
            DotDot => "..",
            Ellipsis => "...",
            EllipsisQuestion => "...?",
            Question => "?",
            QuestionDot => "?.",
            QuestionDotDot => "?..",
            QuestionQuestion => "??",
            QuestionQuestionEq => "??=",
            Eq => "=",
            EqEq => "==",
            Bang => "!",
            BangEq => "!=",
            AmpAmp => "&&",
            PipePipe => "||",
            Lt => "<",
            LtEq => "<=",
            LtLt => "<<",
            LtLtEq => "<<=",
            Gt => ">",
            GtEq => ">=",
            GtGt => ">>",
            GtGtEq => ">>=",
            GtGtGt => ">>>",
            GtGtGtEq => ">>>=",
            Plus => "+",
            PlusEq => "+=",
            PlusPlus => "++",
            Minus => "-",
            MinusEq => "-=",
            MinusMinus => "--",
            Star => "*",
            StarEq => "*=",
            Slash => "/",
            SlashEq => "/=",
            Percent => "%",
            PercentEq => "%=",
            TildeSlash => "~/",
            TildeSlashEq => "~/=",
            Tilde => "~",
            Amp => "&",
            AmpEq => "&=",
            Pipe => "|",
            PipeEq => "|=",
            Caret => "^",
            CaretEq => "^=",
        };
        Some(text)
    }

    /// Words that can never be used as identifiers.
    pub fn is_reserved_word(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Assert
                | Break
                | Case
                | Catch
                | Class
                | Const
                | Continue
                | Default
                | Do
                | Else
                | Enum
                | Extends
                | False
                | Final
                | Finally
                | For
                | If
                | In
                | Is
                | New
                | Null
                | Rethrow
                | Return
                | Super
                | Switch
                | This
                | Throw
                | True
                | Try
                | Var
                | Void
                | While
                | With
        )
    }

    /// Identifiers with a fixed meaning in some declarations; they cannot
    /// name types but are otherwise ordinary identifiers.
    pub fn is_builtin_identifier(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Abstract
                | As
                | Covariant
                | Deferred
                | Dynamic
                | Export
                | External
                | Extension
                | Factory
                | Function
                | Get
                | Implements
                | Import
                | Interface
                | Late
                | Library
                | Mixin
                | Operator
                | Part
                | Required
                | Set
                | Static
                | Typedef
        )
    }

    /// Keywords only inside specific constructs; identifiers everywhere else.
    pub fn is_contextual_keyword(self) -> bool {
        use TokenKind::*;
        matches!(self, Async | Await | Hide | Of | On | Show | Sync | Yield)
    }

    pub fn is_string_start(self) -> bool {
        matches!(self, TokenKind::String | TokenKind::StringBegin)
    }

    pub fn is_assignment_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Eq | StarEq
                | SlashEq
                | TildeSlashEq
                | PercentEq
                | PlusEq
                | MinusEq
                | LtLtEq
                | GtGtEq
                | GtGtGtEq
                | AmpEq
                | CaretEq
                | PipeEq
                | QuestionQuestionEq
        )
    }

    /// Operators a class may declare with `operator`.
    pub fn is_user_definable_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Lt | Gt
                | LtEq
                | GtEq
                | EqEq
                | Minus
                | Plus
                | Slash
                | TildeSlash
                | Star
                | Percent
                | Pipe
                | Caret
                | Amp
                | LtLt
                | GtGt
                | GtGtGt
                | Tilde
        )
    }

    /// What remains of a `>`-prefixed token once `consumed` leading `>`
    /// characters have been taken by closing type brackets.
    pub fn split_gt(self, consumed: u8) -> Option<TokenKind> {
        use TokenKind::*;
        let remaining = match self {
            Gt => [Some(Gt), None, None, None],
            GtEq => [Some(GtEq), Some(Eq), None, None],
            GtGt => [Some(GtGt), Some(Gt), None, None],
            GtGtEq => [Some(GtGtEq), Some(GtEq), Some(Eq), None],
            GtGtGt => [Some(GtGtGt), Some(GtGt), Some(Gt), None],
            GtGtGtEq => [Some(GtGtGtEq), Some(GtGtEq), Some(GtEq), Some(Eq)],
            _ if consumed == 0 => return Some(self),
            _ => return None,
        };
        remaining.get(consumed as usize).copied().flatten()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::String
            | TokenKind::StringBegin
            | TokenKind::StringMiddle
            | TokenKind::StringEnd => write!(f, "string literal"),
            TokenKind::ScriptTag => write!(f, "script tag"),
            TokenKind::Eof => write!(f, "end of file"),
            other => match other.fixed_text() {
                Some(text) => write!(f, "'{}'", text),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

/// A classified, positioned piece of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: std::string::String,
    pub span: Span,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<std::string::String>,
        span: Span,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier => write!(f, "identifier '{}'", self.lexeme),
            TokenKind::Number => write!(f, "number '{}'", self.lexeme),
            _ => write!(f, "{}", self.kind),
        }
    }
}

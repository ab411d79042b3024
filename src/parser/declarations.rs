//! Declaration parsing implementation
//!
//! This module handles everything outside function bodies:
//!
//! - Library directives: `library`, `import`, `export`, `part`, `part of`
//! - Metadata annotations: `@deprecated`, `@Foo.bar(1)`
//! - Top-level definitions: classes, mixins, extensions, enums, typedefs,
//!   functions, getters, setters and variables
//! - Class members: fields, methods, operators, constructors
//! - Formal parameter lists and function bodies
//!
//! # Grammar
//!
//! ```text
//! libraryDefinition ::= scriptTag? libraryName? importOrExport* partDirective*
//!                       (metadata topLevelDefinition)* EOF
//! partDeclaration   ::= scriptTag? partHeader (metadata topLevelDefinition)* EOF
//! classDeclaration  ::= 'abstract'? 'class' typeIdentifier typeParameters?
//!                       (superclass? mixins? interfaces? classBody | '=' mixinApplication)
//! functionBody      ::= 'async'? '=>' expression ';' | ('async' '*'? | 'sync' '*')? block
//! ```

use crate::parser::parse::{BodyKind, PResult, ParseError, Parser};
use crate::parser::token::TokenKind;

/// Directive ordering inside a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DirectivePhase {
    Start,
    Imports,
    Parts,
    Declarations,
}

/// Modifiers seen before a top-level or member declaration.
#[derive(Debug, Clone, Copy, Default)]
struct Modifiers {
    external: bool,
}

impl Parser {
    // ===== Libraries =====

    pub(crate) fn parse_library_definition(&mut self) -> PResult<()> {
        let mut phase = DirectivePhase::Start;

        while !self.is_at_end() {
            self.parse_metadata()?;
            match self.peek_kind() {
                TokenKind::Library if self.at_library_directive() => {
                    if phase != DirectivePhase::Start {
                        return Err(self.error_here(
                            "The library directive must come before all other directives",
                        ));
                    }
                    self.parse_library_name()?;
                    phase = DirectivePhase::Imports;
                }
                TokenKind::Import | TokenKind::Export
                    if self.peek_kind_at(1).is_string_start() =>
                {
                    if phase > DirectivePhase::Imports {
                        return Err(self.directive_out_of_order(phase));
                    }
                    if self.check(TokenKind::Import) {
                        self.parse_import()?;
                    } else {
                        self.parse_export()?;
                    }
                    phase = DirectivePhase::Imports;
                }
                TokenKind::Part if self.peek_kind_at(1).is_string_start() => {
                    if phase > DirectivePhase::Parts {
                        return Err(self.directive_out_of_order(phase));
                    }
                    self.parse_part_directive()?;
                    phase = DirectivePhase::Parts;
                }
                TokenKind::Part if self.check_at(1, TokenKind::Of) => {
                    return Err(self.error_here(
                        "A 'part of' directive must be the first directive of a part file",
                    ));
                }
                _ => {
                    self.parse_top_level_definition()?;
                    phase = DirectivePhase::Declarations;
                }
            }
        }
        Ok(())
    }

    fn directive_out_of_order(&self, phase: DirectivePhase) -> ParseError {
        if phase == DirectivePhase::Declarations {
            self.error_here(format!(
                "Directives must appear before any declarations, found {}",
                self.describe_current()
            ))
        } else {
            self.error_here(format!(
                "Import and export directives must appear before part directives, found {}",
                self.describe_current()
            ))
        }
    }

    fn at_library_directive(&self) -> bool {
        let next = self.peek_kind_at(1);
        next == TokenKind::Semicolon || self.is_identifier_kind(next)
    }

    fn parse_library_name(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Library, "Expected 'library'")?;
        if !self.check(TokenKind::Semicolon) {
            self.parse_dotted_identifier_list()?;
        }
        self.expect_semicolon("after library name")
    }

    fn parse_import(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Import, "Expected 'import'")?;
        self.parse_configurable_uri()?;
        if self.match_token(TokenKind::Deferred) {
            self.expect_token(TokenKind::As, "Expected 'as' after 'deferred'")?;
            self.expect_identifier()?;
        } else if self.match_token(TokenKind::As) {
            self.expect_identifier()?;
        }
        self.parse_combinators()?;
        self.expect_semicolon("after import directive")
    }

    fn parse_export(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Export, "Expected 'export'")?;
        self.parse_configurable_uri()?;
        self.parse_combinators()?;
        self.expect_semicolon("after export directive")
    }

    fn parse_combinators(&mut self) -> PResult<()> {
        while self.match_token(TokenKind::Show) || self.match_token(TokenKind::Hide) {
            self.parse_identifier_list()?;
        }
        Ok(())
    }

    /// A URI with optional `if (name == 'value') 'uri'` configurations.
    fn parse_configurable_uri(&mut self) -> PResult<()> {
        self.parse_uri()?;
        while self.match_token(TokenKind::If) {
            self.expect_lparen("after 'if' in a configurable URI")?;
            self.parse_dotted_identifier_list()?;
            if self.match_token(TokenKind::EqEq) {
                self.parse_string_literal()?;
            }
            self.expect_rparen("to close the URI condition")?;
            self.parse_uri()?;
        }
        Ok(())
    }

    fn parse_uri(&mut self) -> PResult<()> {
        if !self.peek_kind().is_string_start() {
            return Err(self.expected("a URI string"));
        }
        self.parse_string_literal()
    }

    fn parse_part_directive(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Part, "Expected 'part'")?;
        self.parse_uri()?;
        self.expect_semicolon("after part directive")
    }

    /// Lookahead for a part file: metadata followed by `part of`.
    pub(crate) fn scan_part_header(&mut self) -> PResult<()> {
        self.parse_metadata()?;
        self.expect_token(TokenKind::Part, "Expected 'part'")?;
        self.expect_token(TokenKind::Of, "Expected 'of'")
    }

    pub(crate) fn parse_part_header(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Part, "Expected 'part'")?;
        self.expect_token(TokenKind::Of, "Expected 'of' after 'part'")?;
        if self.peek_kind().is_string_start() {
            self.parse_string_literal()?;
        } else {
            self.parse_dotted_identifier_list()?;
        }
        self.expect_semicolon("after part-of directive")
    }

    fn parse_dotted_identifier_list(&mut self) -> PResult<()> {
        self.expect_identifier()?;
        while self.match_token(TokenKind::Dot) {
            self.expect_identifier()?;
        }
        Ok(())
    }

    fn parse_identifier_list(&mut self) -> PResult<()> {
        self.expect_identifier()?;
        while self.match_token(TokenKind::Comma) {
            self.expect_identifier()?;
        }
        Ok(())
    }

    /// Zero or more annotations: `@name`, `@prefix.name`, `@Type<T>.ctor(args)`.
    pub(crate) fn parse_metadata(&mut self) -> PResult<()> {
        while self.match_token(TokenKind::At) {
            self.expect_identifier()?;
            for _ in 0..2 {
                if !self.check(TokenKind::Dot) {
                    break;
                }
                self.advance();
                self.expect_identifier()?;
            }
            if self.check(TokenKind::Lt)
                && self.speculate(|p| {
                    p.parse_type_arguments()?;
                    p.expect_lparen("after annotation type arguments")
                })
            {
                self.parse_type_arguments()?;
            }
            if self.check(TokenKind::LParen) {
                if self.skimming {
                    self.skip_group()?;
                } else {
                    self.parse_arguments()?;
                }
            }
        }
        Ok(())
    }

    // ===== Top-level definitions =====

    pub(crate) fn parse_top_level_definition(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Abstract if self.check_at(1, TokenKind::Class) => {
                self.advance();
                self.parse_class_declaration()
            }
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::Mixin if self.is_identifier_kind(self.peek_kind_at(1)) => {
                self.parse_mixin_declaration()
            }
            TokenKind::Extension
                if self.check_at(1, TokenKind::Lt) || self.is_identifier_kind(self.peek_kind_at(1)) =>
            {
                self.parse_extension_declaration()
            }
            TokenKind::Enum => self.parse_enum_declaration(),
            TokenKind::Typedef => self.parse_type_alias(),
            _ if self.at_directive() => Err(self.expected("a top-level declaration")),
            _ => self.parse_declaration(false),
        }
    }

    /// Directives reaching this point are misplaced: part files have none
    /// after their header.
    fn at_directive(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Import | TokenKind::Export | TokenKind::Part => {
                self.peek_kind_at(1).is_string_start() || self.check_at(1, TokenKind::Of)
            }
            TokenKind::Library => self.at_library_directive(),
            _ => false,
        }
    }

    fn parse_class_declaration(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Class, "Expected 'class'")?;
        self.expect_type_identifier()?;
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }

        if self.match_token(TokenKind::Eq) {
            self.parse_type_not_void()?;
            self.expect_token(TokenKind::With, "Expected 'with' in a mixin application")?;
            self.parse_type_list()?;
            if self.match_token(TokenKind::Implements) {
                self.parse_type_list()?;
            }
            return self.expect_semicolon("after mixin application");
        }

        if self.match_token(TokenKind::Extends) {
            self.parse_type_not_void()?;
        }
        if self.match_token(TokenKind::With) {
            self.parse_type_list()?;
        }
        if self.match_token(TokenKind::Implements) {
            self.parse_type_list()?;
        }
        self.parse_class_body("to start the class body")
    }

    fn parse_mixin_declaration(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Mixin, "Expected 'mixin'")?;
        self.expect_type_identifier()?;
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        if self.match_token(TokenKind::On) {
            self.parse_type_list()?;
        }
        if self.match_token(TokenKind::Implements) {
            self.parse_type_list()?;
        }
        self.parse_class_body("to start the mixin body")
    }

    fn parse_extension_declaration(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Extension, "Expected 'extension'")?;
        if !self.check(TokenKind::On) && !self.check(TokenKind::Lt) {
            self.expect_identifier()?;
        }
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.expect_token(TokenKind::On, "Expected 'on' in an extension declaration")?;
        self.parse_type()?;
        self.parse_class_body("to start the extension body")
    }

    fn parse_class_body(&mut self, ctx: &str) -> PResult<()> {
        self.expect_lbrace(ctx)?;
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            self.parse_metadata()?;
            self.parse_declaration(true)?;
        }
        self.expect_rbrace("to close the class body")
    }

    fn parse_enum_declaration(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Enum, "Expected 'enum'")?;
        self.expect_identifier()?;
        self.expect_lbrace("to start the enum body")?;
        loop {
            self.parse_metadata()?;
            self.expect_identifier()?;
            if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RBrace) {
                break;
            }
        }
        self.expect_rbrace("to close the enum body")
    }

    /// `typedef Name<T> = Type;` or the older `typedef R Name<T>(params);`.
    fn parse_type_alias(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Typedef, "Expected 'typedef'")?;

        let aliased = self.speculate(|p| {
            p.expect_type_identifier()?;
            if p.check(TokenKind::Lt) {
                p.parse_type_parameters()?;
            }
            p.expect_token(TokenKind::Eq, "Expected '='")
        });
        if aliased {
            self.expect_type_identifier()?;
            if self.check(TokenKind::Lt) {
                self.parse_type_parameters()?;
            }
            self.expect_token(TokenKind::Eq, "Expected '=' in type alias")?;
            self.parse_type()?;
            return self.expect_semicolon("after type alias");
        }

        if self.speculate(|p| {
            p.parse_type()?;
            p.expect_type_identifier()
        }) {
            self.parse_type()?;
        }
        self.expect_type_identifier()?;
        if self.check(TokenKind::Lt) {
            self.parse_type_parameters()?;
        }
        self.parse_formal_parameter_list()?;
        self.expect_semicolon("after type alias")
    }

    // ===== Functions, variables and members =====

    /// A modifier keyword only counts as one when something other than the
    /// end of a declaration follows it.
    fn at_modifier(&self) -> bool {
        !matches!(
            self.peek_kind_at(1),
            TokenKind::LParen
                | TokenKind::Lt
                | TokenKind::Eq
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::LBrace
                | TokenKind::Arrow
                | TokenKind::RParen
                | TokenKind::Eof
        )
    }

    /// Functions, getters, setters and variables at the top level, or any
    /// member inside a class, mixin or extension body.
    fn parse_declaration(&mut self, in_class: bool) -> PResult<()> {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek_kind() {
                TokenKind::External if self.at_modifier() => modifiers.external = true,
                TokenKind::Static | TokenKind::Covariant | TokenKind::Abstract
                    if in_class && self.at_modifier() => {}
                TokenKind::Late if self.at_modifier() => {}
                _ => break,
            }
            self.advance();
        }

        if in_class {
            if self.check(TokenKind::Factory) && self.at_identifier_after(1) {
                return self.parse_factory_constructor();
            }
            if self.check(TokenKind::Const) && self.check_at(1, TokenKind::Factory) {
                self.advance();
                return self.parse_factory_constructor();
            }
            if self.check(TokenKind::Const) && self.at_constructor_name_after(1) {
                self.advance();
                return self.parse_generative_constructor();
            }
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
            return self.parse_initialized_identifiers();
        }

        let typed = self.speculate(|p| {
            p.parse_type()?;
            p.expect_identifier()
        });
        if typed {
            self.parse_type()?;
        }
        let allow_empty_body = in_class || modifiers.external;

        match self.peek_kind() {
            TokenKind::Get if self.at_identifier_after(1) => {
                self.advance();
                self.expect_identifier()?;
                self.parse_function_body(allow_empty_body)
            }
            TokenKind::Set if self.at_identifier_after(1) => {
                self.advance();
                self.expect_identifier()?;
                self.parse_formal_parameter_list()?;
                self.parse_function_body(allow_empty_body)
            }
            TokenKind::Operator if in_class && self.at_operator_after(1) => {
                self.advance();
                self.parse_operator_name()?;
                self.parse_formal_parameter_list()?;
                self.parse_function_body(allow_empty_body)
            }
            _ if self.at_identifier() => {
                if !typed && in_class && self.at_constructor_name_after(0) {
                    return self.parse_generative_constructor();
                }
                self.advance();
                if self.check(TokenKind::LParen) || self.check(TokenKind::Lt) {
                    if self.check(TokenKind::Lt) {
                        self.parse_type_parameters()?;
                    }
                    self.parse_formal_parameter_list()?;
                    return self.parse_function_body(allow_empty_body);
                }
                if !typed {
                    return Err(self.expected("a parameter list or a variable type before the name"));
                }
                self.parse_initializer_tail()
            }
            _ if in_class => Err(self.expected("a class member")),
            _ => Err(self.expected("a top-level declaration")),
        }
    }

    fn at_identifier_after(&self, n: usize) -> bool {
        self.is_identifier_kind(self.peek_kind_at(n))
    }

    /// `Name(` or `Name.named(` starting `n` tokens ahead.
    fn at_constructor_name_after(&self, n: usize) -> bool {
        if !self.at_identifier_after(n) {
            return false;
        }
        match self.peek_kind_at(n + 1) {
            TokenKind::LParen => true,
            TokenKind::Dot => {
                self.at_identifier_after(n + 2) && self.check_at(n + 3, TokenKind::LParen)
            }
            _ => false,
        }
    }

    fn at_operator_after(&self, n: usize) -> bool {
        let kind = self.peek_kind_at(n);
        kind.is_user_definable_operator() || kind == TokenKind::LBracket
    }

    /// `+`, `==`, `[]`, `[]=`, `~` and the other definable operators.
    fn parse_operator_name(&mut self) -> PResult<()> {
        if self.match_token(TokenKind::LBracket) {
            self.expect_token(TokenKind::RBracket, "Expected ']' in operator name")?;
            self.match_token(TokenKind::Eq);
            return Ok(());
        }
        if self.peek_kind().is_user_definable_operator() {
            self.advance();
            return Ok(());
        }
        Err(self.expected("an operator"))
    }

    /// The rest of a variable declaration after its first name.
    fn parse_initializer_tail(&mut self) -> PResult<()> {
        loop {
            if self.match_token(TokenKind::Eq) {
                self.parse_expression()?;
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
            self.expect_identifier()?;
        }
        self.expect_semicolon("after variable declaration")
    }

    fn parse_initialized_identifiers(&mut self) -> PResult<()> {
        self.expect_identifier()?;
        self.parse_initializer_tail()
    }

    // ===== Constructors =====

    fn parse_generative_constructor(&mut self) -> PResult<()> {
        self.expect_identifier()?;
        if self.match_token(TokenKind::Dot) {
            self.expect_identifier()?;
        }
        self.parse_formal_parameter_list()?;
        if self.match_token(TokenKind::Colon) {
            self.parse_initializers()?;
        }
        self.parse_function_body(true)
    }

    fn parse_factory_constructor(&mut self) -> PResult<()> {
        self.expect_token(TokenKind::Factory, "Expected 'factory'")?;
        self.expect_identifier()?;
        if self.match_token(TokenKind::Dot) {
            self.expect_identifier()?;
        }
        self.parse_formal_parameter_list()?;
        if self.match_token(TokenKind::Eq) {
            self.parse_type_name()?;
            if self.check(TokenKind::Lt) {
                self.parse_type_arguments()?;
            }
            if self.match_token(TokenKind::Dot) {
                self.expect_identifier()?;
            }
            return self.expect_semicolon("after redirecting factory constructor");
        }
        self.parse_function_body(true)
    }

    fn parse_initializers(&mut self) -> PResult<()> {
        loop {
            self.parse_initializer()?;
            if !self.match_token(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    fn parse_initializer(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Super => {
                self.advance();
                if self.match_token(TokenKind::Dot) {
                    self.expect_identifier()?;
                }
                self.parse_arguments()
            }
            TokenKind::This => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    return self.parse_arguments();
                }
                self.expect_token(TokenKind::Dot, "Expected '.' or '(' after 'this'")?;
                self.expect_identifier()?;
                if self.check(TokenKind::LParen) {
                    return self.parse_arguments();
                }
                self.expect_token(TokenKind::Eq, "Expected '=' in field initializer")?;
                self.parse_expression_without_cascade()
            }
            TokenKind::Assert => self.parse_assertion(),
            _ if self.at_identifier() => {
                self.advance();
                self.expect_token(TokenKind::Eq, "Expected '=' in field initializer")?;
                self.parse_expression_without_cascade()
            }
            _ => Err(self.expected("an initializer")),
        }
    }

    // ===== Parameters and bodies =====

    pub(crate) fn parse_formal_parameter_list(&mut self) -> PResult<()> {
        self.nested(|p| {
            p.expect_lparen("to start a parameter list")?;
            while !p.check(TokenKind::RParen) {
                match p.peek_kind() {
                    TokenKind::LBracket => {
                        p.advance();
                        p.parse_optional_parameters(TokenKind::RBracket, false)?;
                        p.expect_token(
                            TokenKind::RBracket,
                            "Expected ']' to close optional parameters",
                        )?;
                        break;
                    }
                    TokenKind::LBrace => {
                        p.advance();
                        p.parse_optional_parameters(TokenKind::RBrace, true)?;
                        p.expect_rbrace("to close named parameters")?;
                        break;
                    }
                    _ => p.parse_normal_formal_parameter()?,
                }
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            p.expect_rparen("to close the parameter list")
        })
    }

    fn parse_optional_parameters(&mut self, close: TokenKind, named: bool) -> PResult<()> {
        loop {
            if named {
                self.parse_metadata()?;
                if self.check(TokenKind::Required) && self.at_modifier() {
                    self.advance();
                }
            }
            self.parse_normal_formal_parameter()?;
            let has_default = self.match_token(TokenKind::Eq)
                || (named && self.match_token(TokenKind::Colon));
            if has_default && !(self.skimming && self.skip_delimited_expression()) {
                self.parse_expression()?;
            }
            if !self.match_token(TokenKind::Comma) || self.check(close) {
                return Ok(());
            }
        }
    }

    /// Simple, field (`this.x`), super (`super.x`) and function-typed
    /// parameters.
    fn parse_normal_formal_parameter(&mut self) -> PResult<()> {
        self.parse_metadata()?;
        if self.check(TokenKind::Covariant) && self.at_modifier() {
            self.advance();
        }
        if matches!(
            self.peek_kind(),
            TokenKind::Final | TokenKind::Const | TokenKind::Var
        ) {
            self.advance();
        }

        if self.speculate(|p| {
            p.parse_type()?;
            if p.check(TokenKind::This) || p.check(TokenKind::Super) {
                Ok(())
            } else {
                p.expect_identifier()
            }
        }) {
            self.parse_type()?;
        }

        if self.check(TokenKind::This) || self.check(TokenKind::Super) {
            self.advance();
            self.expect_token(TokenKind::Dot, "Expected '.' in field parameter")?;
            self.expect_identifier()?;
        } else {
            self.expect_identifier()?;
        }

        if self.check(TokenKind::LParen) || self.check(TokenKind::Lt) {
            if self.check(TokenKind::Lt) {
                self.parse_type_parameters()?;
            }
            self.parse_formal_parameter_list()?;
            self.match_token(TokenKind::Question);
        }
        Ok(())
    }

    /// `async`, `async*` or `sync*` before a function body.
    pub(crate) fn parse_body_modifier(&mut self) -> BodyKind {
        if self.check(TokenKind::Async) {
            self.advance();
            let is_generator = self.match_token(TokenKind::Star);
            return BodyKind {
                is_async: true,
                is_generator,
            };
        }
        if self.check(TokenKind::Sync) && self.check_at(1, TokenKind::Star) {
            self.advance();
            self.advance();
            return BodyKind {
                is_async: false,
                is_generator: true,
            };
        }
        BodyKind::default()
    }

    /// Body of a declared function, method or constructor. With
    /// `allow_empty`, a lone `;` stands for an abstract or external body.
    pub(crate) fn parse_function_body(&mut self, allow_empty: bool) -> PResult<()> {
        if allow_empty && self.match_token(TokenKind::Semicolon) {
            return Ok(());
        }
        let kind = self.parse_body_modifier();
        match self.peek_kind() {
            TokenKind::Arrow => {
                if kind.is_generator {
                    return Err(self.error_here("Generator functions cannot use '=>'"));
                }
                self.advance();
                self.with_body(kind, |p| p.parse_expression())?;
                self.expect_semicolon("after expression body")
            }
            TokenKind::LBrace => self.with_body(kind, |p| p.parse_block()),
            _ => Err(self.expected("a function body")),
        }
    }
}

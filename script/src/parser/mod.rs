//! Recursive-descent parser.
//!
//! Errors are reported to the script's [`Diagnostics`] and unwound to the
//! nearest statement or declaration boundary with [`ParseError`], after which
//! parsing resumes.

mod decl;
mod expr;
mod stmt;


use std::collections::VecDeque;

use hashbrown::HashSet;
use rollkit_shared::config::ScriptConfig;

use crate::ast::{Ast, Comment, DeclId, comment_text};
use crate::diagnostic::{DiagnosticType, Diagnostics};
use crate::lexer::Lexer;
use crate::token::{SourcePosition, SourceRange, Token, TokenKind};

/// Parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Errors reported before further diagnostics are dropped (0: unlimited)
    pub error_limit: usize,
    /// Maximum expression and statement nesting
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from_config(&ScriptConfig::default())
    }
}

impl ParseOptions {
    pub fn from_config(config: &ScriptConfig) -> Self {
        Self {
            error_limit: config.error_limit,
            max_depth: config.max_depth,
        }
    }
}

/// Marker for an error that has already been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError;

pub type PResult<T> = Result<T, ParseError>;

/// Parses `source` into a syntax tree.
pub fn parse(name: &str, source: &str, options: ParseOptions) -> (Ast, Diagnostics) {
    let mut parser = Parser::new(name, source, Lexer::new(source), options);
    parser.parse_program();
    parser.finish()
}

pub(crate) struct Parser<'a> {
    name: &'a str,
    src: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    /// End of the last consumed token
    prev_end: SourcePosition,
    /// Tokens consumed so far, used to force progress after recovery
    consumed: usize,
    ast: Ast,
    diags: Diagnostics,
    options: ParseOptions,
    depth: usize,
    /// Import aliases declared so far
    aliases: HashSet<String>,
    /// Enclosing function, for `__FUNCTION__`
    function: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(name: &'a str, src: &'a str, lexer: Lexer<'a>, options: ParseOptions) -> Self {
        Self {
            name,
            src,
            lexer,
            lookahead: VecDeque::new(),
            prev_end: SourcePosition::default(),
            consumed: 0,
            ast: Ast::default(),
            diags: Diagnostics::new(name, options.error_limit),
            options,
            depth: 0,
            aliases: HashSet::new(),
            function: None,
        }
    }

    fn finish(mut self) -> (Ast, Diagnostics) {
        // Drain so trailing lexical errors are reported.
        while self.current().kind != TokenKind::End {
            self.bump();
        }
        self.ast.line_map = self.lexer.line_map().to_vec();
        self.ast.attach_comments();
        (self.ast, self.diags)
    }

    fn parse_program(&mut self) {
        while !self.at(TokenKind::End) {
            let before = self.consumed;
            match self.parse_top_level() {
                Ok(Some(decl)) => self.ast.top.push(decl),
                Ok(None) => {}
                Err(ParseError) => self.recover(before),
            }
        }
    }

    /// Skips to a synchronization point, consuming at least one token.
    fn recover(&mut self, before: usize) {
        self.synchronize();
        if self.consumed == before && !self.at(TokenKind::End) {
            self.bump();
        }
    }

    /// Skips tokens until `;` (consumed), `}` or the start of a statement or
    /// declaration.
    fn synchronize(&mut self) {
        loop {
            let kind = self.current().kind;
            match kind {
                TokenKind::End | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Const
                | TokenKind::Struct
                | TokenKind::Type
                | TokenKind::Import
                | TokenKind::From
                | TokenKind::Pound => return,
                k if k.is_type_keyword() => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    // -- Tokens ---------------------------------------------------------------

    /// Next non-comment token from the lexer. Comments are collected and
    /// lexical errors reported as they occur.
    fn fetch(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            for err in self.lexer.take_errors() {
                self.diags.error(DiagnosticType::Lexical, err.message, err.range);
            }
            if token.kind == TokenKind::Comment {
                self.ast.comments.push(Comment {
                    range: token.range,
                    text: comment_text(token.text(self.src)),
                });
                continue;
            }
            return token;
        }
    }

    fn peek_nth(&mut self, n: usize) -> Token {
        while self.lookahead.len() <= n {
            let token = self.fetch();
            self.lookahead.push_back(token);
        }
        self.lookahead[n]
    }

    fn current(&mut self) -> Token {
        self.peek_nth(0)
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::End {
            self.lookahead.pop_front();
            self.consumed += 1;
            self.prev_end = token.range.end;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, SourceRange)> {
        let token = self.expect(TokenKind::Identifier, "identifier")?;
        Ok((token.text(self.src).to_string(), token.range))
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.src)
    }

    // -- Errors ---------------------------------------------------------------

    fn error(&mut self, message: impl Into<String>, range: SourceRange) -> ParseError {
        self.diags.error(DiagnosticType::Parse, message, range);
        ParseError
    }

    fn unexpected(&mut self, what: &str) -> ParseError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::End => "end of file".to_string(),
            _ => format!("'{}'", self.text(&token)),
        };
        self.error(format!("expected {what}, found {found}"), token.range)
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            let range = self.current().range;
            self.depth -= 1;
            return Err(self.error("expression too deep", range));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn range_from(&self, start: SourcePosition) -> SourceRange {
        SourceRange::new(start, self.prev_end.max(start))
    }

    /// Parses one top-level item. `Ok(None)` for stray semicolons.
    fn parse_top_level(&mut self) -> PResult<Option<DeclId>> {
        let token = self.current();
        let decl = match token.kind {
            TokenKind::Semicolon => {
                self.bump();
                return Ok(None);
            }
            TokenKind::Pound => self.parse_directive()?,
            TokenKind::Import => self.parse_import()?,
            TokenKind::From => self.parse_from_import()?,
            TokenKind::Type => self.parse_type_decl()?,
            TokenKind::Struct
                if self.peek_nth(1).kind == TokenKind::Identifier
                    && self.peek_nth(2).kind == TokenKind::LBrace =>
            {
                self.parse_struct_decl()?
            }
            _ => self.parse_declaration(true)?,
        };
        Ok(Some(decl))
    }
}

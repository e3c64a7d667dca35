//! Declarations, types and preprocessor lines.

use super::{PResult, Parser};
use crate::ast::{DeclId, DeclKind, Dependency, DependencyKind, ExprKind, Literal, TypeName, TypeRef};
use crate::lexer::unescape;
use crate::token::{SourcePosition, SourceRange, TokenKind};
use crate::types::TypeId;

impl Parser<'_> {
    /// True if the current token starts a local declaration.
    pub(super) fn at_decl_start(&mut self) -> bool {
        let kind = self.current().kind;
        kind.is_type_keyword()
            || matches!(kind, TokenKind::Const | TokenKind::Struct)
            || (kind == TokenKind::Identifier && self.peek_nth(1).kind == TokenKind::Identifier)
    }

    /// `[const] type name ...` followed by a function or a variable list.
    pub(super) fn parse_declaration(&mut self, top_level: bool) -> PResult<DeclId> {
        let start = self.current().range.start;
        let is_const = self.eat(TokenKind::Const);
        let ty = self.parse_type(top_level)?;
        let (name, name_range) = self.expect_ident()?;

        if top_level && self.at(TokenKind::LParen) {
            return self.parse_function(start, ty, name, name_range);
        }
        let decl = self.parse_var_list(start, ty, is_const, name, name_range)?;
        self.expect(TokenKind::Semicolon, "';'")?;
        self.extend_range(decl);
        Ok(decl)
    }

    /// Parses the rest of `type a [= e], b [= e]` after the first name.
    pub(super) fn parse_var_list(
        &mut self,
        start: SourcePosition,
        ty: TypeRef,
        is_const: bool,
        name: String,
        name_range: SourceRange,
    ) -> PResult<DeclId> {
        let mut items = Vec::new();
        let (mut name, mut name_range) = (name, name_range);
        loop {
            let item_start = if items.is_empty() { start } else { name_range.start };
            let init = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let kind = DeclKind::Var {
                ty: ty.clone(),
                is_const,
                init,
            };
            let range = self.range_from(item_start);
            items.push(self.ast.add_decl(kind, name, name_range, range));
            if !self.eat(TokenKind::Comma) {
                break;
            }
            (name, name_range) = self.expect_ident()?;
        }

        if items.len() == 1 {
            return Ok(items[0]);
        }
        let range = self.range_from(start);
        Ok(self.ast.add_decl(DeclKind::DeclList(items), String::new(), range, range))
    }

    fn extend_range(&mut self, decl: DeclId) {
        let end = self.prev_end;
        self.ast.decl_mut(decl).range.end = end;
    }

    fn parse_function(
        &mut self,
        start: SourcePosition,
        ret: TypeRef,
        name: String,
        name_range: SourceRange,
    ) -> PResult<DeclId> {
        let params = self.parse_params()?;
        let body = if self.eat(TokenKind::Semicolon) {
            None
        } else {
            let outer = self.function.replace(name.clone());
            let body = self.parse_block();
            self.function = outer;
            Some(body?)
        };
        let range = self.range_from(start);
        let kind = DeclKind::Function { ret, params, body };
        Ok(self.ast.add_decl(kind, name, name_range, range))
    }

    /// `( [const] type name [= default], ... )`
    pub(super) fn parse_params(&mut self) -> PResult<Vec<DeclId>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(params);
        }
        // `f(void)`
        if self.at(TokenKind::Void) && self.peek_nth(1).kind == TokenKind::RParen {
            self.bump();
            self.bump();
            return Ok(params);
        }
        loop {
            let start = self.current().range.start;
            let is_const = self.eat(TokenKind::Const);
            let ty = self.parse_type(false)?;
            let (name, name_range) = self.expect_ident()?;
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let range = self.range_from(start);
            let kind = DeclKind::Param { ty, is_const, default };
            params.push(self.ast.add_decl(kind, name, name_range, range));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    /// `struct Name { fields };`
    pub(super) fn parse_struct_decl(&mut self) -> PResult<DeclId> {
        let start = self.bump().range.start;
        let (name, name_range) = self.expect_ident()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::End) {
            let field_start = self.current().range.start;
            self.eat(TokenKind::Const);
            let ty = self.parse_type(false)?;
            loop {
                let (field, field_range) = self.expect_ident()?;
                let range = self.range_from(field_start);
                let kind = DeclKind::Field { ty: ty.clone() };
                fields.push(self.ast.add_decl(kind, field, field_range, range));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon, "';'")?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        self.eat(TokenKind::Semicolon);
        let range = self.range_from(start);
        Ok(self.ast.add_decl(DeclKind::Struct { fields }, name, name_range, range))
    }

    /// `type N = T;`, `type N(T);`, `type N;` or `type N = A | B(T);`
    pub(super) fn parse_type_decl(&mut self) -> PResult<DeclId> {
        let start = self.bump().range.start;
        let (name, name_range) = self.expect_ident()?;

        let kind = if self.eat(TokenKind::LParen) {
            let inner = self.parse_type(true)?;
            self.expect(TokenKind::RParen, "')'")?;
            DeclKind::Newtype { inner }
        } else if self.eat(TokenKind::Eq) {
            let is_sum = self.at(TokenKind::Identifier)
                && matches!(self.peek_nth(1).kind, TokenKind::Pipe | TokenKind::LParen);
            if is_sum {
                self.parse_sum_variants()?
            } else {
                DeclKind::TypeAlias {
                    target: self.parse_type(true)?,
                }
            }
        } else {
            DeclKind::Opaque
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let range = self.range_from(start);
        Ok(self.ast.add_decl(kind, name, name_range, range))
    }

    fn parse_sum_variants(&mut self) -> PResult<DeclKind> {
        let mut variants = Vec::new();
        loop {
            let (name, name_range) = self.expect_ident()?;
            let mut payload = Vec::new();
            if self.eat(TokenKind::LParen) {
                loop {
                    payload.push(self.parse_type(true)?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
            }
            let range = self.range_from(name_range.start);
            variants.push(self.ast.add_decl(DeclKind::Variant { payload }, name, name_range, range));
            if !self.eat(TokenKind::Pipe) {
                break;
            }
        }
        Ok(DeclKind::Sum { variants })
    }

    /// A type name. Tuple types are accepted only where `allow_tuple` is set.
    pub(super) fn parse_type(&mut self, allow_tuple: bool) -> PResult<TypeRef> {
        let token = self.current();
        let builtin = match token.kind {
            TokenKind::Void => Some(TypeId::VOID),
            TokenKind::Int => Some(TypeId::INT),
            TokenKind::Float => Some(TypeId::FLOAT),
            TokenKind::String => Some(TypeId::STRING),
            TokenKind::Object => Some(TypeId::OBJECT),
            TokenKind::Vector => Some(TypeId::VECTOR),
            TokenKind::Action => Some(TypeId::ACTION),
            _ => None,
        };
        if let Some(id) = builtin {
            self.bump();
            return Ok(TypeRef::builtin(id, token.range));
        }

        match token.kind {
            TokenKind::Struct => {
                self.bump();
                let (name, range) = self.expect_ident()?;
                Ok(TypeRef {
                    name: TypeName::Struct(name),
                    range: token.range.merge(range),
                })
            }
            TokenKind::Identifier => {
                self.bump();
                Ok(TypeRef {
                    name: TypeName::Named(self.text(&token).to_string()),
                    range: token.range,
                })
            }
            TokenKind::LParen if allow_tuple => {
                self.bump();
                let mut elems = Vec::new();
                loop {
                    elems.push(self.parse_type(true)?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(TypeRef {
                    name: TypeName::Tuple(elems),
                    range: self.range_from(token.range.start),
                })
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// `import a.b [as x];`
    pub(super) fn parse_import(&mut self) -> PResult<DeclId> {
        let start = self.bump().range.start;
        let path = self.parse_module_path()?;
        let (alias, alias_range) = if self.eat(TokenKind::As) {
            self.expect_ident()?
        } else {
            let last = path.last().cloned().unwrap_or_default();
            (last, self.range_from(start))
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let range = self.range_from(start);
        self.aliases.insert(alias.clone());
        let name = path.join("_");
        let decl = self.ast.add_decl(DeclKind::Import { path }, alias, alias_range, range);
        self.add_dependency(DependencyKind::Import, name, range, decl);
        Ok(decl)
    }

    /// `from a.b import f, g;` with optional braces around the names.
    pub(super) fn parse_from_import(&mut self) -> PResult<DeclId> {
        let start = self.bump().range.start;
        let path = self.parse_module_path()?;
        self.expect(TokenKind::Import, "'import'")?;
        let braced = self.eat(TokenKind::LBrace);
        let mut names = Vec::new();
        loop {
            names.push(self.expect_ident()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if braced {
            self.expect(TokenKind::RBrace, "'}'")?;
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        let range = self.range_from(start);
        let name = path.join("_");
        let decl = self.ast.add_decl(DeclKind::FromImport { path, names }, String::new(), range, range);
        self.add_dependency(DependencyKind::Import, name, range, decl);
        Ok(decl)
    }

    fn parse_module_path(&mut self) -> PResult<Vec<String>> {
        let mut path = vec![self.expect_ident()?.0];
        while self.eat(TokenKind::Dot) {
            path.push(self.expect_ident()?.0);
        }
        Ok(path)
    }

    fn add_dependency(&mut self, kind: DependencyKind, name: String, range: SourceRange, decl: DeclId) {
        self.ast.dependencies.push(Dependency {
            kind,
            name,
            range,
            decl,
        });
    }

    /// `#include "name"` or `#define NAME value`
    pub(super) fn parse_directive(&mut self) -> PResult<DeclId> {
        let start = self.bump().range.start;
        let (directive, directive_range) = self.expect_ident()?;
        match directive.as_str() {
            "include" => {
                let token = self.expect(TokenKind::StringLiteral, "include file name")?;
                let raw = self.text(&token);
                let target = unescape(raw.trim_start_matches('"').trim_end_matches('"'));
                let target = target.strip_suffix(".nss").unwrap_or(&target).to_string();
                let range = self.range_from(start);
                let decl = self.ast.add_decl(
                    DeclKind::Include { target: target.clone() },
                    String::new(),
                    token.range,
                    range,
                );
                self.add_dependency(DependencyKind::Include, target, range, decl);
                Ok(decl)
            }
            "define" => {
                let (name, name_range) = self.expect_ident()?;
                let value = self.parse_define_value()?;
                let range = self.range_from(start);
                Ok(self.ast.add_decl(DeclKind::Define { value }, name, name_range, range))
            }
            _ => Err(self.error(
                format!("unknown preprocessor directive '{directive}'"),
                directive_range,
            )),
        }
    }

    /// A single token, optionally negated.
    fn parse_define_value(&mut self) -> PResult<crate::ast::ExprId> {
        let start = self.current().range.start;
        let negate = self.eat(TokenKind::Minus);
        let value = self.parse_primary()?;
        if negate {
            let range = self.range_from(start);
            let folded = match self.ast.expr(value).kind {
                ExprKind::Literal(Literal::Int(v)) => Literal::Int(v.wrapping_neg()),
                ExprKind::Literal(Literal::Float(v)) => Literal::Float(-v),
                _ => return Err(self.error("expected numeric value after '-'", range)),
            };
            let expr = self.ast.expr_mut(value);
            expr.kind = ExprKind::Literal(folded);
            expr.range = range;
        }
        Ok(value)
    }
}

//! Statements.

use super::{PResult, ParseError, Parser};
use crate::ast::{DeclKind, ForInit, Jump, Label, StmtId, StmtKind, TypeRef};
use crate::token::TokenKind;

impl Parser<'_> {
    pub(super) fn parse_statement(&mut self) -> PResult<StmtId> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> PResult<StmtId> {
        let token = self.current();
        let start = token.range.start;
        let kind = match token.kind {
            TokenKind::LBrace => return self.parse_block(),
            TokenKind::Semicolon => {
                self.bump();
                StmtKind::Empty
            }
            TokenKind::If => {
                self.bump();
                let cond = self.parse_condition()?;
                let then = self.parse_statement()?;
                let otherwise = if self.eat(TokenKind::Else) {
                    Some(self.parse_statement()?)
                } else {
                    None
                };
                StmtKind::If { cond, then, otherwise }
            }
            TokenKind::While => {
                self.bump();
                let cond = self.parse_condition()?;
                let body = self.parse_statement()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Do => {
                self.bump();
                let body = self.parse_statement()?;
                self.expect(TokenKind::While, "'while'")?;
                let cond = self.parse_condition()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::DoWhile { body, cond }
            }
            TokenKind::For => return self.parse_for(),
            TokenKind::Switch => {
                self.bump();
                let target = self.parse_condition()?;
                let body = self.parse_statement()?;
                StmtKind::Switch { target, body }
            }
            TokenKind::Case => {
                self.bump();
                let label = self.parse_case()?;
                self.expect(TokenKind::Colon, "':'")?;
                StmtKind::Label(label)
            }
            TokenKind::Default => {
                self.bump();
                self.expect(TokenKind::Colon, "':'")?;
                StmtKind::Label(Label::Default)
            }
            TokenKind::Break => {
                self.bump();
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Jump(Jump::Break)
            }
            TokenKind::Continue => {
                self.bump();
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Jump(Jump::Continue)
            }
            TokenKind::Return => {
                self.bump();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Jump(Jump::Return(value))
            }
            TokenKind::Struct
                if self.peek_nth(1).kind == TokenKind::Identifier
                    && self.peek_nth(2).kind == TokenKind::LBrace =>
            {
                let range = token.range;
                return Err(self.error("struct declarations are only allowed at file scope", range));
            }
            _ if self.at_decl_start() => StmtKind::Decl(self.parse_declaration(false)?),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Expr(expr)
            }
        };
        let range = self.range_from(start);
        Ok(self.ast.add_stmt(kind, range))
    }

    /// `{ statements }` with recovery inside the block.
    pub(super) fn parse_block(&mut self) -> PResult<StmtId> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.range.start;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::End) {
            let before = self.consumed;
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(ParseError) => self.recover_in_block(before),
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        let range = self.range_from(start);
        Ok(self.ast.add_stmt(StmtKind::Block(stmts), range))
    }

    /// Like `recover`, but never consumes the block's closing brace.
    fn recover_in_block(&mut self, before: usize) {
        self.synchronize();
        if self.consumed == before && !self.at(TokenKind::End) && !self.at(TokenKind::RBrace) {
            self.bump();
        }
    }

    fn parse_condition(&mut self) -> PResult<crate::ast::ExprId> {
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(cond)
    }

    /// `case expr` or `case Variant(a, b)`.
    fn parse_case(&mut self) -> PResult<Label> {
        if self.at(TokenKind::Identifier) && self.peek_nth(1).kind == TokenKind::LParen {
            let (variant, variant_range) = self.expect_ident()?;
            self.bump();
            let mut bindings = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    let (name, range) = self.expect_ident()?;
                    let kind = DeclKind::Var {
                        ty: TypeRef::inferred(range),
                        is_const: false,
                        init: None,
                    };
                    bindings.push(self.ast.add_decl(kind, name, range, range));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(Label::Pattern {
                variant,
                variant_range,
                bindings,
            });
        }
        Ok(Label::Case(self.parse_expr()?))
    }

    /// `for (init; cond; step)` or `for (T x in e)`.
    fn parse_for(&mut self) -> PResult<StmtId> {
        let start = self.bump().range.start;
        self.expect(TokenKind::LParen, "'('")?;

        let mut init = None;
        if self.at_decl_start() {
            let decl_start = self.current().range.start;
            let is_const = self.eat(TokenKind::Const);
            let ty = self.parse_type(false)?;
            let (name, name_range) = self.expect_ident()?;
            if self.eat(TokenKind::In) {
                let range = self.range_from(decl_start);
                let kind = DeclKind::Var { ty, is_const, init: None };
                let var = self.ast.add_decl(kind, name, name_range, range);
                let iterable = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_statement()?;
                let range = self.range_from(start);
                return Ok(self.ast.add_stmt(StmtKind::ForEach { var, iterable, body }, range));
            }
            init = Some(ForInit::Decl(self.parse_var_list(decl_start, ty, is_const, name, name_range)?));
        } else if !self.at(TokenKind::Semicolon) {
            init = Some(ForInit::Expr(self.parse_expr()?));
        }
        self.expect(TokenKind::Semicolon, "';'")?;

        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let step = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_statement()?;
        let range = self.range_from(start);
        Ok(self.ast.add_stmt(StmtKind::For { init, cond, step, body }, range))
    }
}

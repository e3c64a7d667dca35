//! Expressions, by precedence climbing.

use smallvec::SmallVec;

use super::{PResult, Parser};
use crate::ast::{BinaryOp, BraceEntry, ExprId, ExprKind, FStringPart, JsonConst, Literal, PostfixOp, TypeRef, UnaryOp};
use crate::lexer::{Lexer, unescape};
use crate::token::{SourceRange, Token, TokenKind};
use crate::types::TypeId;

/// Binary operators with their binding power. Higher binds tighter.
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    use TokenKind::*;
    let op = match kind {
        OrOr => (BinaryOp::Or, 1),
        AndAnd => (BinaryOp::And, 2),
        Pipe => (BinaryOp::BitOr, 3),
        Caret => (BinaryOp::BitXor, 4),
        Amp => (BinaryOp::BitAnd, 5),
        EqEq => (BinaryOp::Eq, 6),
        NotEq => (BinaryOp::Ne, 6),
        Lt => (BinaryOp::Lt, 7),
        LtEq => (BinaryOp::Le, 7),
        Gt => (BinaryOp::Gt, 7),
        GtEq => (BinaryOp::Ge, 7),
        Shl => (BinaryOp::Shl, 8),
        Shr => (BinaryOp::Shr, 8),
        UShr => (BinaryOp::UShr, 8),
        Plus => (BinaryOp::Add, 9),
        Minus => (BinaryOp::Sub, 9),
        Star => (BinaryOp::Mul, 10),
        Slash => (BinaryOp::Div, 10),
        Percent => (BinaryOp::Mod, 10),
        _ => return None,
    };
    Some(op)
}

/// Operator applied by a compound assignment, `None` for `=`.
fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind::*;
    match kind {
        PlusEq => Some(BinaryOp::Add),
        MinusEq => Some(BinaryOp::Sub),
        StarEq => Some(BinaryOp::Mul),
        SlashEq => Some(BinaryOp::Div),
        PercentEq => Some(BinaryOp::Mod),
        AmpEq => Some(BinaryOp::BitAnd),
        PipeEq => Some(BinaryOp::BitOr),
        CaretEq => Some(BinaryOp::BitXor),
        ShlEq => Some(BinaryOp::Shl),
        ShrEq => Some(BinaryOp::Shr),
        UShrEq => Some(BinaryOp::UShr),
        _ => None,
    }
}

/// Folds a unary operator applied to a numeric literal.
fn fold_unary(op: UnaryOp, operand: &ExprKind) -> Option<Literal> {
    let ExprKind::Literal(lit) = operand else {
        return None;
    };
    match (op, lit) {
        (UnaryOp::Neg, Literal::Int(v)) => Some(Literal::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Plus, Literal::Int(_) | Literal::Float(_)) => Some(lit.clone()),
        (UnaryOp::Not, Literal::Int(v)) => Some(Literal::Int(i64::from(*v == 0))),
        (UnaryOp::BitNot, Literal::Int(v)) => Some(Literal::Int(!v)),
        _ => None,
    }
}

/// Parses an integer literal. Prefixed literals wrap to 32 bits.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let lower = text.get(..2).map(str::to_ascii_lowercase);
    let radix = match lower.as_deref() {
        Some("0x") => 16,
        Some("0b") => 2,
        Some("0o") => 8,
        _ => return text.parse().ok(),
    };
    let value = i64::from_str_radix(&text[2..], radix).ok()?;
    if value <= i64::from(u32::MAX) {
        Some(i64::from(value as u32 as i32))
    } else {
        None
    }
}

impl Parser<'_> {
    pub(super) fn parse_expr(&mut self) -> PResult<ExprId> {
        self.enter()?;
        let expr = self.parse_assign();
        self.leave();
        expr
    }

    fn span(&self, a: ExprId, b: ExprId) -> SourceRange {
        self.ast.expr(a).range.merge(self.ast.expr(b).range)
    }

    fn parse_assign(&mut self) -> PResult<ExprId> {
        let lhs = self.parse_conditional()?;
        let token = self.current();
        if !token.kind.is_assignment() {
            return Ok(lhs);
        }
        self.bump();
        let rhs = self.parse_expr()?;
        let range = self.span(lhs, rhs);
        let op = compound_op(token.kind);
        Ok(self.ast.add_expr(ExprKind::Assign { op, lhs, rhs }, range))
    }

    fn parse_conditional(&mut self) -> PResult<ExprId> {
        let cond = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':'")?;
        self.enter()?;
        let otherwise = self.parse_conditional();
        self.leave();
        let otherwise = otherwise?;
        let range = self.span(cond, otherwise);
        Ok(self.ast.add_expr(ExprKind::Conditional { cond, then, otherwise }, range))
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<ExprId> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = binary_op(self.current().kind) {
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            let range = self.span(lhs, rhs);
            lhs = self.ast.add_expr(ExprKind::Binary { op, lhs, rhs }, range);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<ExprId> {
        let token = self.current();
        let op = match token.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus => UnaryOp::PreInc,
            TokenKind::MinusMinus => UnaryOp::PreDec,
            _ => return self.parse_postfix(),
        };
        self.bump();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let expr = operand?;

        let range = token.range.merge(self.ast.expr(expr).range);
        if let Some(folded) = fold_unary(op, &self.ast.expr(expr).kind) {
            let node = self.ast.expr_mut(expr);
            node.kind = ExprKind::Literal(folded);
            node.range = range;
            return Ok(expr);
        }
        Ok(self.ast.add_expr(ExprKind::Unary { op, expr }, range))
    }

    fn parse_postfix(&mut self) -> PResult<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.current();
            let start = self.ast.expr(expr).range.start;
            let kind = match token.kind {
                TokenKind::LParen => self.parse_call(expr)?,
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    ExprKind::Index { base: expr, index }
                }
                TokenKind::Dot => {
                    self.bump();
                    let (member, member_range) = self.expect_ident()?;
                    match &self.ast.expr(expr).kind {
                        ExprKind::Ident(module) if self.aliases.contains(module) => ExprKind::Path {
                            module: module.clone(),
                            name: member,
                            name_range: member_range,
                        },
                        _ => ExprKind::Dot {
                            lhs: expr,
                            member,
                            member_range,
                        },
                    }
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    self.bump();
                    let op = if token.kind == TokenKind::PlusPlus {
                        PostfixOp::Inc
                    } else {
                        PostfixOp::Dec
                    };
                    ExprKind::Postfix { op, expr }
                }
                TokenKind::As => {
                    self.bump();
                    let ty = self.parse_type(false)?;
                    ExprKind::Cast { expr, ty }
                }
                _ => return Ok(expr),
            };
            let range = self.range_from(start);
            expr = self.ast.add_expr(kind, range);
        }
    }

    fn parse_call(&mut self, callee: ExprId) -> PResult<ExprKind> {
        let open = self.bump().range.start;
        let mut args = SmallVec::new();
        let mut commas = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                commas.push(self.bump().range.start);
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(ExprKind::Call {
            callee,
            args,
            commas,
            open,
        })
    }

    pub(super) fn parse_primary(&mut self) -> PResult<ExprId> {
        let token = self.current();
        let text = self.text(&token);
        let literal = match token.kind {
            TokenKind::IntLiteral => match parse_int(text) {
                Some(v) => Literal::Int(v),
                None => {
                    self.bump();
                    return Err(self.error(format!("invalid integer literal '{text}'"), token.range));
                }
            },
            TokenKind::FloatLiteral => match text.trim_end_matches(['f', 'F']).parse::<f32>() {
                Ok(v) => Literal::Float(v),
                Err(_) => {
                    self.bump();
                    return Err(self.error(format!("invalid float literal '{text}'"), token.range));
                }
            },
            TokenKind::StringLiteral => Literal::String(unescape(quoted_body(text, 1))),
            TokenKind::RawStringLiteral => Literal::String(quoted_body(text, 2).to_string()),
            TokenKind::ObjectSelf => Literal::ObjectSelf,
            TokenKind::ObjectInvalid => Literal::ObjectInvalid,
            TokenKind::LocationInvalid => Literal::LocationInvalid,
            TokenKind::JsonNull => Literal::Json(JsonConst::Null),
            TokenKind::JsonFalse => Literal::Json(JsonConst::False),
            TokenKind::JsonTrue => Literal::Json(JsonConst::True),
            TokenKind::JsonObject => Literal::Json(JsonConst::Object),
            TokenKind::JsonArray => Literal::Json(JsonConst::Array),
            TokenKind::JsonString => Literal::Json(JsonConst::String),
            TokenKind::MacroLine => Literal::Int(token.range.start.line as i64 + 1),
            TokenKind::MacroFunction => Literal::String(self.function.clone().unwrap_or_default()),
            TokenKind::MacroFile => Literal::String(self.name.to_string()),
            TokenKind::MacroDate => Literal::String(chrono::Local::now().format("%b %e %Y").to_string()),
            TokenKind::MacroTime => Literal::String(chrono::Local::now().format("%H:%M:%S").to_string()),
            TokenKind::FStringLiteral => {
                self.bump();
                return self.parse_fstring(token);
            }
            TokenKind::Identifier => {
                self.bump();
                return Ok(self.ast.add_expr(ExprKind::Ident(text.to_string()), token.range));
            }
            TokenKind::LParen => return self.parse_paren(),
            TokenKind::LBrace => return self.parse_brace_init(),
            TokenKind::LBracket => return self.parse_vector(),
            TokenKind::Fn => return self.parse_lambda(),
            _ => return Err(self.unexpected("expression")),
        };
        self.bump();
        Ok(self.ast.add_expr(ExprKind::Literal(literal), token.range))
    }

    /// `(e)` or `(a, b, ...)`
    fn parse_paren(&mut self) -> PResult<ExprId> {
        let start = self.bump().range.start;
        let first = self.parse_expr()?;
        if !self.at(TokenKind::Comma) {
            self.expect(TokenKind::RParen, "')'")?;
            let range = self.range_from(start);
            return Ok(self.ast.add_expr(ExprKind::Grouping(first), range));
        }
        let mut elems = vec![first];
        while self.eat(TokenKind::Comma) {
            elems.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        let range = self.range_from(start);
        Ok(self.ast.add_expr(ExprKind::Tuple(elems), range))
    }

    /// `{a, b}`, `{x = 1}` or `{"k": v}`
    fn parse_brace_init(&mut self) -> PResult<ExprId> {
        let start = self.bump().range.start;
        let mut entries = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let entry = if self.at(TokenKind::Identifier) && self.peek_nth(1).kind == TokenKind::Eq {
                let (name, range) = self.expect_ident()?;
                self.bump();
                BraceEntry::Designated {
                    name,
                    range,
                    value: self.parse_expr()?,
                }
            } else {
                let value = self.parse_expr()?;
                if self.eat(TokenKind::Colon) {
                    BraceEntry::Keyed {
                        key: value,
                        value: self.parse_expr()?,
                    }
                } else {
                    BraceEntry::Positional(value)
                }
            };
            entries.push(entry);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        let range = self.range_from(start);
        Ok(self.ast.add_expr(ExprKind::BraceInit(entries), range))
    }

    /// `[x, y, z]`
    fn parse_vector(&mut self) -> PResult<ExprId> {
        let start = self.bump().range.start;
        let mut elems = Vec::new();
        if !self.at(TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        let range = self.range_from(start);
        match <[ExprId; 3]>::try_from(elems) {
            Ok(xyz) => Ok(self.ast.add_expr(ExprKind::VectorLit(xyz), range)),
            Err(_) => Err(self.error("vector literal needs three components", range)),
        }
    }

    /// `fn(params) [: type] { body }`
    fn parse_lambda(&mut self) -> PResult<ExprId> {
        let token = self.bump();
        let params = self.parse_params()?;
        let ret = if self.eat(TokenKind::Colon) {
            self.parse_type(true)?
        } else {
            TypeRef::builtin(TypeId::VOID, token.range)
        };
        let body = self.parse_block()?;
        let range = self.range_from(token.range.start);
        Ok(self.ast.add_expr(ExprKind::Lambda { params, ret, body }, range))
    }

    /// Splits `f"..."` into text and embedded expressions. `{{` and `}}`
    /// are literal braces.
    fn parse_fstring(&mut self, token: Token) -> PResult<ExprId> {
        let src = self.src;
        let bytes = src.as_bytes();
        let body_start = token.start + 2;
        let raw = self.text(&token);
        let body_end = if raw.len() >= 3 && raw.ends_with('"') {
            token.end - 1
        } else {
            token.end
        };
        let line_start = token.start - token.range.start.column;

        let mut parts = Vec::new();
        let mut text = String::new();
        let mut segment = body_start;
        let mut i = body_start;
        while i < body_end {
            match bytes[i] {
                b'\\' => i += 2,
                b @ (b'{' | b'}') if bytes.get(i + 1) == Some(&b) => {
                    text.push_str(&unescape(&src[segment..i]));
                    text.push(b as char);
                    i += 2;
                    segment = i;
                }
                b'{' => {
                    text.push_str(&unescape(&src[segment..i]));
                    if !text.is_empty() {
                        parts.push(FStringPart::Text(std::mem::take(&mut text)));
                    }
                    let close = matching_brace(bytes, i + 1, body_end)
                        .ok_or_else(|| self.error("unterminated interpolation", token.range))?;
                    let expr = self.parse_embedded(i + 1, close, token.range.start.line, line_start)?;
                    parts.push(FStringPart::Expr(expr));
                    i = close + 1;
                    segment = i;
                }
                _ => i += 1,
            }
        }
        if segment < body_end {
            text.push_str(&unescape(&src[segment..body_end]));
        }
        if !text.is_empty() {
            parts.push(FStringPart::Text(text));
        }
        Ok(self.ast.add_expr(ExprKind::FString(parts), token.range))
    }

    /// Parses `src[start..end]` as a single expression into this tree.
    fn parse_embedded(&mut self, start: usize, end: usize, line: usize, line_start: usize) -> PResult<ExprId> {
        let lexer = Lexer::with_span(self.src, start, end, line, line_start);
        let mut sub = Parser::new(self.name, self.src, lexer, self.options);
        sub.ast = std::mem::take(&mut self.ast);
        sub.diags = std::mem::take(&mut self.diags);
        sub.aliases = self.aliases.clone();
        sub.function = self.function.clone();
        sub.depth = self.depth;

        let result = match sub.parse_expr() {
            Ok(expr) if sub.at(TokenKind::End) => Ok(expr),
            Ok(_) => Err(sub.unexpected("'}'")),
            Err(e) => Err(e),
        };
        self.ast = std::mem::take(&mut sub.ast);
        self.diags = std::mem::take(&mut sub.diags);
        result
    }
}

/// Text between the opening quote (`prefix` bytes) and the closing quote.
fn quoted_body(text: &str, prefix: usize) -> &str {
    let body = text.get(prefix..).unwrap_or("");
    if text.len() > prefix && body.ends_with('"') {
        &body[..body.len() - 1]
    } else {
        body
    }
}

/// Offset of the `}` closing an interpolation that starts at `from`.
fn matching_brace(bytes: &[u8], from: usize, end: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut j = from;
    while j < end {
        match bytes[j] {
            b'"' => {
                j += 1;
                while j < end && bytes[j] != b'"' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

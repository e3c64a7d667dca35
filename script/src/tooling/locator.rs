//! Symbol lookup at a cursor position.

use crate::ast::{Ast, DeclId, DeclKind, DeclRef, ExprId, ExprKind, Label, ScriptId, StmtId, StmtKind, TypeName, TypeRef};
use crate::context::Context;
use crate::env::{Env, SymbolKind};
use crate::script::Script;
use crate::token::SourcePosition;
use crate::types::{TypeKind, TypeTable};
use crate::visit::{Visitor, walk_ast};

use super::SymbolInfo;

/// Finds the innermost node at `pos` whose identifier is `symbol`.
struct AstLocator<'a> {
    script: ScriptId,
    symbol: &'a str,
    pos: SourcePosition,
    types: &'a TypeTable,
    found: Option<DeclRef>,
}

impl AstLocator<'_> {
    /// A written type naming `symbol`, looked up in `env`.
    fn check_type(&mut self, ty: &TypeRef, env: Option<&Env>) {
        if !ty.range.contains(self.pos) {
            return;
        }
        let name = match &ty.name {
            TypeName::Struct(name) | TypeName::Named(name) => name,
            TypeName::Tuple(elems) => {
                for elem in elems {
                    self.check_type(elem, env);
                }
                return;
            }
            TypeName::Builtin(_) | TypeName::Inferred => return,
        };
        if name != self.symbol {
            return;
        }
        if let Some(symbol) = env.and_then(|e| e.lookup(name)) {
            if symbol.kind == SymbolKind::Type {
                self.found = Some(symbol.decl);
            }
        }
    }
}

impl Visitor for AstLocator<'_> {
    fn visit_decl(&mut self, ast: &Ast, id: DeclId) -> bool {
        let decl = ast.decl(id);
        if !decl.range.contains(self.pos) {
            return false;
        }
        if decl.name == self.symbol {
            self.found = Some(DeclRef { script: self.script, id });
        }
        let env = decl.env.as_ref();
        match &decl.kind {
            DeclKind::Var { ty, .. } | DeclKind::Param { ty, .. } | DeclKind::Field { ty } => self.check_type(ty, env),
            DeclKind::Function { ret, .. } => self.check_type(ret, env),
            DeclKind::TypeAlias { target } => self.check_type(target, env),
            DeclKind::Newtype { inner } => self.check_type(inner, env),
            DeclKind::Variant { payload } => {
                for ty in payload {
                    self.check_type(ty, env);
                }
            }
            _ => {}
        }
        true
    }

    fn visit_stmt(&mut self, ast: &Ast, id: StmtId) -> bool {
        let stmt = ast.stmt(id);
        if !stmt.range.contains(self.pos) {
            return false;
        }
        if let StmtKind::Label(Label::Pattern {
            variant, variant_range, ..
        }) = &stmt.kind
        {
            if variant == self.symbol && variant_range.contains(self.pos) {
                if let Some(symbol) = stmt.env.as_ref().and_then(|e| e.lookup(variant)) {
                    self.found = Some(symbol.decl);
                }
            }
        }
        true
    }

    fn visit_expr(&mut self, ast: &Ast, id: ExprId) -> bool {
        let expr = ast.expr(id);
        if !expr.range.contains(self.pos) {
            return false;
        }
        match &expr.kind {
            ExprKind::Ident(name) if name == self.symbol => {
                if expr.decl.is_some() {
                    self.found = expr.decl;
                }
            }
            ExprKind::Path { name, name_range, .. } if name == self.symbol && name_range.contains(self.pos) => {
                if expr.decl.is_some() {
                    self.found = expr.decl;
                }
            }
            ExprKind::Dot {
                lhs,
                member,
                member_range,
            } if member == self.symbol && member_range.contains(self.pos) => {
                let field = expr.decl.or_else(|| {
                    let fields = self.types.struct_fields(ast.expr(*lhs).type_id)?;
                    fields.iter().find(|f| &f.name == member).map(|f| f.decl)
                });
                if field.is_some() {
                    self.found = field;
                }
                // The member is the innermost name here; skip the lhs.
                return false;
            }
            ExprKind::Cast { ty, .. } if ty.range.contains(self.pos) => {
                let named = matches!(&ty.name, TypeName::Struct(n) | TypeName::Named(n) if n == self.symbol);
                if let Some(decl) = named.then(|| self.types.kind(expr.type_id)).flatten().and_then(user_type_decl) {
                    self.found = Some(decl);
                }
            }
            _ => {}
        }
        true
    }
}

fn user_type_decl(kind: &TypeKind) -> Option<DeclRef> {
    match kind {
        TypeKind::Struct { decl, .. }
        | TypeKind::Newtype { decl, .. }
        | TypeKind::Opaque { decl }
        | TypeKind::Sum { decl, .. } => Some(*decl),
        _ => None,
    }
}

impl Script {
    /// The declaration of `symbol` as used at `line`:`column`.
    pub fn locate_symbol(&self, ctx: &Context, symbol: &str, line: usize, column: usize) -> Option<SymbolInfo> {
        let mut locator = AstLocator {
            script: self.id,
            symbol,
            pos: SourcePosition::new(line, column),
            types: ctx.types(),
            found: None,
        };
        walk_ast(&mut locator, &self.ast);
        locator.found.map(|decl| self.declaration_to_symbol(ctx, decl))
    }
}

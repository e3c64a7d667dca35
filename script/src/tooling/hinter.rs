//! Parameter-name inlay hints at call sites.

use crate::ast::{Ast, DeclKind, ExprId, ExprKind};
use crate::context::Context;
use crate::script::Script;
use crate::token::{SourcePosition, SourceRange};
use crate::visit::{Visitor, walk_ast};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlayHint {
    pub position: SourcePosition,
    /// Parameter name followed by a colon
    pub label: String,
}

struct AstHinter<'a> {
    ctx: &'a Context,
    range: SourceRange,
    hints: Vec<InlayHint>,
}

impl AstHinter<'_> {
    fn param_names(&self, ast: &Ast, callee: ExprId) -> Option<Vec<String>> {
        let decl = ast.expr(callee).decl?;
        let (owner, decl) = self.ctx.declaration(decl);
        let DeclKind::Function { params, .. } = &decl.kind else {
            return None;
        };
        Some(params.iter().map(|&p| owner.ast.decl(p).name.clone()).collect())
    }
}

impl Visitor for AstHinter<'_> {
    fn visit_expr(&mut self, ast: &Ast, id: ExprId) -> bool {
        let expr = ast.expr(id);
        if !expr.range.intersects(&self.range) {
            return false;
        }
        let ExprKind::Call { callee, args, .. } = &expr.kind else {
            return true;
        };
        let Some(names) = self.param_names(ast, *callee) else {
            return true;
        };
        for (&arg, name) in args.iter().zip(&names) {
            let arg = ast.expr(arg);
            if name.is_empty() || !self.range.contains(arg.range.start) {
                continue;
            }
            if matches!(&arg.kind, ExprKind::Ident(ident) if ident == name) {
                continue;
            }
            self.hints.push(InlayHint {
                position: arg.range.start,
                label: format!("{name}:"),
            });
        }
        true
    }
}

impl Script {
    /// Hints for every call argument that starts inside `range`.
    pub fn inlay_hints(&self, ctx: &Context, range: SourceRange) -> Vec<InlayHint> {
        let mut hinter = AstHinter {
            ctx,
            range,
            hints: Vec::new(),
        };
        walk_ast(&mut hinter, &self.ast);
        hinter.hints.sort_by_key(|h| h.position);
        hinter.hints
    }
}

//! Read-only tree walks.
//!
//! A [`Visitor`] sees every declaration, statement and expression in source
//! order. Returning `false` from a `visit_*` method skips that node's
//! children.

use crate::ast::{Ast, BraceEntry, DeclId, DeclKind, ExprId, ExprKind, FStringPart, ForInit, Jump, Label, StmtId, StmtKind};

pub trait Visitor {
    fn visit_decl(&mut self, _ast: &Ast, _id: DeclId) -> bool {
        true
    }

    fn visit_stmt(&mut self, _ast: &Ast, _id: StmtId) -> bool {
        true
    }

    fn visit_expr(&mut self, _ast: &Ast, _id: ExprId) -> bool {
        true
    }
}

/// Walks every top-level declaration.
pub fn walk_ast<V: Visitor + ?Sized>(v: &mut V, ast: &Ast) {
    for &id in &ast.top {
        walk_decl(v, ast, id);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(v: &mut V, ast: &Ast, id: DeclId) {
    if !v.visit_decl(ast, id) {
        return;
    }
    match &ast.decl(id).kind {
        DeclKind::Var { init, .. } => {
            if let Some(init) = init {
                walk_expr(v, ast, *init);
            }
        }
        DeclKind::Param { default, .. } => {
            if let Some(default) = default {
                walk_expr(v, ast, *default);
            }
        }
        DeclKind::Function { params, body, .. } => {
            for &param in params {
                walk_decl(v, ast, param);
            }
            if let Some(body) = body {
                walk_stmt(v, ast, *body);
            }
        }
        DeclKind::Struct { fields } => {
            for &field in fields {
                walk_decl(v, ast, field);
            }
        }
        DeclKind::DeclList(items) => {
            for &item in items {
                walk_decl(v, ast, item);
            }
        }
        DeclKind::Sum { variants } => {
            for &variant in variants {
                walk_decl(v, ast, variant);
            }
        }
        DeclKind::Define { value } => walk_expr(v, ast, *value),
        DeclKind::Field { .. }
        | DeclKind::TypeAlias { .. }
        | DeclKind::Newtype { .. }
        | DeclKind::Opaque
        | DeclKind::Variant { .. }
        | DeclKind::Import { .. }
        | DeclKind::FromImport { .. }
        | DeclKind::Include { .. } => {}
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, ast: &Ast, id: StmtId) {
    if !v.visit_stmt(ast, id) {
        return;
    }
    match &ast.stmt(id).kind {
        StmtKind::Block(stmts) => {
            for &stmt in stmts {
                walk_stmt(v, ast, stmt);
            }
        }
        StmtKind::Expr(expr) => walk_expr(v, ast, *expr),
        StmtKind::If { cond, then, otherwise } => {
            walk_expr(v, ast, *cond);
            walk_stmt(v, ast, *then);
            if let Some(otherwise) = otherwise {
                walk_stmt(v, ast, *otherwise);
            }
        }
        StmtKind::For { init, cond, step, body } => {
            match init {
                Some(ForInit::Expr(expr)) => walk_expr(v, ast, *expr),
                Some(ForInit::Decl(decl)) => walk_decl(v, ast, *decl),
                None => {}
            }
            if let Some(cond) = cond {
                walk_expr(v, ast, *cond);
            }
            if let Some(step) = step {
                walk_expr(v, ast, *step);
            }
            walk_stmt(v, ast, *body);
        }
        StmtKind::ForEach { var, iterable, body } => {
            walk_decl(v, ast, *var);
            walk_expr(v, ast, *iterable);
            walk_stmt(v, ast, *body);
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            walk_expr(v, ast, *cond);
            walk_stmt(v, ast, *body);
        }
        StmtKind::Switch { target, body } => {
            walk_expr(v, ast, *target);
            walk_stmt(v, ast, *body);
        }
        StmtKind::Label(Label::Case(expr)) => walk_expr(v, ast, *expr),
        StmtKind::Label(Label::Pattern { bindings, .. }) => {
            for &binding in bindings {
                walk_decl(v, ast, binding);
            }
        }
        StmtKind::Jump(Jump::Return(Some(value))) => walk_expr(v, ast, *value),
        StmtKind::Decl(decl) => walk_decl(v, ast, *decl),
        StmtKind::Label(Label::Default) | StmtKind::Jump(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, ast: &Ast, id: ExprId) {
    if !v.visit_expr(ast, id) {
        return;
    }
    match &ast.expr(id).kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::Path { .. } => {}
        ExprKind::Call { callee, args, .. } => {
            walk_expr(v, ast, *callee);
            for &arg in args {
                walk_expr(v, ast, arg);
            }
        }
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs, .. } => {
            walk_expr(v, ast, *lhs);
            walk_expr(v, ast, *rhs);
        }
        ExprKind::Unary { expr, .. }
        | ExprKind::Postfix { expr, .. }
        | ExprKind::Grouping(expr)
        | ExprKind::Cast { expr, .. } => walk_expr(v, ast, *expr),
        ExprKind::Dot { lhs, .. } => walk_expr(v, ast, *lhs),
        ExprKind::Tuple(elems) => {
            for &elem in elems {
                walk_expr(v, ast, elem);
            }
        }
        ExprKind::Index { base, index } => {
            walk_expr(v, ast, *base);
            walk_expr(v, ast, *index);
        }
        ExprKind::Lambda { params, body, .. } => {
            for &param in params {
                walk_decl(v, ast, param);
            }
            walk_stmt(v, ast, *body);
        }
        ExprKind::FString(parts) => {
            for part in parts {
                if let FStringPart::Expr(expr) = part {
                    walk_expr(v, ast, *expr);
                }
            }
        }
        ExprKind::BraceInit(entries) => {
            for entry in entries {
                match entry {
                    BraceEntry::Positional(value) | BraceEntry::Designated { value, .. } => walk_expr(v, ast, *value),
                    BraceEntry::Keyed { key, value } => {
                        walk_expr(v, ast, *key);
                        walk_expr(v, ast, *value);
                    }
                }
            }
        }
        ExprKind::Conditional { cond, then, otherwise } => {
            walk_expr(v, ast, *cond);
            walk_expr(v, ast, *then);
            walk_expr(v, ast, *otherwise);
        }
        ExprKind::VectorLit(xyz) => {
            for &e in xyz {
                walk_expr(v, ast, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    #[derive(Default)]
    struct Counter {
        decls: usize,
        stmts: usize,
        exprs: usize,
    }

    impl Visitor for Counter {
        fn visit_decl(&mut self, _ast: &Ast, _id: DeclId) -> bool {
            self.decls += 1;
            true
        }

        fn visit_stmt(&mut self, _ast: &Ast, _id: StmtId) -> bool {
            self.stmts += 1;
            true
        }

        fn visit_expr(&mut self, _ast: &Ast, _id: ExprId) -> bool {
            self.exprs += 1;
            true
        }
    }

    #[test]
    fn test_walk_counts_every_node() {
        let (ast, _) = parse("test", "int x = 1; void f(int a) { x = a + 2; }", ParseOptions::default());
        let mut counter = Counter::default();
        walk_ast(&mut counter, &ast);
        assert_eq!(counter.decls, 3);
        assert_eq!(counter.stmts, 2);
        // 1, x = a + 2, x, a + 2, a, 2
        assert_eq!(counter.exprs, 6);
    }

    #[test]
    fn test_skip_children() {
        struct TopOnly(usize);
        impl Visitor for TopOnly {
            fn visit_decl(&mut self, _ast: &Ast, _id: DeclId) -> bool {
                self.0 += 1;
                false
            }
        }
        let (ast, _) = parse("test", "void f(int a, int b) {} int y;", ParseOptions::default());
        let mut v = TopOnly(0);
        walk_ast(&mut v, &ast);
        assert_eq!(v.0, 2);
    }
}

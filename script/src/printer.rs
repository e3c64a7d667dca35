//! Source printer.
//!
//! Prints a tree back to script source with four-space indentation.
//! Comments are not kept. Parsing the output and printing again gives the
//! same text.

use std::fmt::Write as _;

use crate::ast::{
    Ast, BraceEntry, DeclId, DeclKind, ExprId, ExprKind, FStringPart, ForInit, Jump, Label, Literal, PostfixOp,
    StmtId, StmtKind, TypeName, TypeRef, UnaryOp,
};
use crate::types::TypeId;

pub struct AstPrinter<'a> {
    ast: &'a Ast,
    out: String,
    indent: usize,
}

impl<'a> AstPrinter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: String::new(),
            indent: 0,
        }
    }

    /// Prints the whole script.
    pub fn print(ast: &Ast) -> String {
        let mut printer = AstPrinter::new(ast);
        let mut previous_was_function = false;
        for (i, &id) in ast.top.iter().enumerate() {
            let is_function = matches!(ast.decl(id).kind, DeclKind::Function { body: Some(_), .. });
            if i > 0 && (is_function || previous_was_function) {
                printer.out.push('\n');
            }
            printer.top_level(id);
            previous_was_function = is_function;
        }
        printer.out
    }

    /// Prints a single expression.
    pub fn expr_to_string(ast: &Ast, id: ExprId) -> String {
        let mut printer = AstPrinter::new(ast);
        printer.expr(id);
        printer.out
    }

    /// Prints a declaration on one line. Function bodies are left out.
    pub fn signature(ast: &Ast, id: DeclId) -> String {
        let mut printer = AstPrinter::new(ast);
        match &ast.decl(id).kind {
            DeclKind::Function { ret, params, .. } => {
                printer.type_ref(ret);
                let _ = write!(printer.out, " {}", ast.decl(id).name);
                printer.params(params);
            }
            DeclKind::Struct { .. } => {
                let _ = write!(printer.out, "struct {}", ast.decl(id).name);
            }
            _ => printer.decl(id),
        }
        printer.out
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn top_level(&mut self, id: DeclId) {
        let ast = self.ast;
        self.line_start();
        self.decl(id);
        if needs_semicolon(&ast.decl(id).kind) {
            self.out.push(';');
        }
        self.out.push('\n');
    }

    // -- Declarations ---------------------------------------------------------

    fn decl(&mut self, id: DeclId) {
        let ast = self.ast;
        let decl = ast.decl(id);
        match &decl.kind {
            DeclKind::Var { ty, is_const, init } => {
                if *is_const {
                    self.out.push_str("const ");
                }
                self.type_ref(ty);
                let _ = write!(self.out, " {}", decl.name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(*init);
                }
            }
            DeclKind::DeclList(items) => {
                for (i, &item) in items.iter().enumerate() {
                    if i == 0 {
                        self.decl(item);
                        continue;
                    }
                    let item = ast.decl(item);
                    let _ = write!(self.out, ", {}", item.name);
                    if let DeclKind::Var { init: Some(init), .. } = item.kind {
                        self.out.push_str(" = ");
                        self.expr(init);
                    }
                }
            }
            DeclKind::Param { ty, is_const, default } => {
                if *is_const {
                    self.out.push_str("const ");
                }
                self.type_ref(ty);
                let _ = write!(self.out, " {}", decl.name);
                if let Some(default) = default {
                    self.out.push_str(" = ");
                    self.expr(*default);
                }
            }
            DeclKind::Function { ret, params, body } => {
                self.type_ref(ret);
                let _ = write!(self.out, " {}", decl.name);
                self.params(params);
                if let Some(body) = body {
                    self.out.push(' ');
                    self.block(*body);
                }
            }
            DeclKind::Struct { fields } => {
                let _ = writeln!(self.out, "struct {} {{", decl.name);
                self.indent += 1;
                for &field in fields {
                    let field = ast.decl(field);
                    if let DeclKind::Field { ty } = &field.kind {
                        self.line_start();
                        self.type_ref(ty);
                        let _ = writeln!(self.out, " {};", field.name);
                    }
                }
                self.indent -= 1;
                self.line_start();
                self.out.push('}');
            }
            DeclKind::Field { ty } => {
                self.type_ref(ty);
                let _ = write!(self.out, " {}", decl.name);
            }
            DeclKind::TypeAlias { target } => {
                let _ = write!(self.out, "type {} = ", decl.name);
                self.type_ref(target);
            }
            DeclKind::Newtype { inner } => {
                let _ = write!(self.out, "type {}(", decl.name);
                self.type_ref(inner);
                self.out.push(')');
            }
            DeclKind::Opaque => {
                let _ = write!(self.out, "type {}", decl.name);
            }
            DeclKind::Sum { variants } => {
                let _ = write!(self.out, "type {} = ", decl.name);
                for (i, &variant) in variants.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" | ");
                    }
                    self.decl(variant);
                }
            }
            DeclKind::Variant { payload } => {
                self.out.push_str(&decl.name);
                if !payload.is_empty() {
                    self.out.push('(');
                    self.type_list(payload);
                    self.out.push(')');
                }
            }
            DeclKind::Import { path } => {
                let _ = write!(self.out, "import {}", path.join("."));
                if path.last() != Some(&decl.name) {
                    let _ = write!(self.out, " as {}", decl.name);
                }
            }
            DeclKind::FromImport { path, names } => {
                let names: Vec<&str> = names.iter().map(|(n, _)| n.as_str()).collect();
                let _ = write!(self.out, "from {} import {}", path.join("."), names.join(", "));
            }
            DeclKind::Define { value } => {
                let _ = write!(self.out, "#define {} ", decl.name);
                self.expr(*value);
            }
            DeclKind::Include { target } => {
                let _ = write!(self.out, "#include \"{}\"", escape(target));
            }
        }
    }

    fn params(&mut self, params: &[DeclId]) {
        self.out.push('(');
        for (i, &param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.decl(param);
        }
        self.out.push(')');
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        match &ty.name {
            TypeName::Builtin(id) => self.out.push_str(builtin_name(*id)),
            TypeName::Struct(name) => {
                let _ = write!(self.out, "struct {name}");
            }
            TypeName::Named(name) => self.out.push_str(name),
            TypeName::Tuple(elems) => {
                self.out.push('(');
                self.type_list(elems);
                self.out.push(')');
            }
            TypeName::Inferred => {}
        }
    }

    fn type_list(&mut self, types: &[TypeRef]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.type_ref(ty);
        }
    }

    // -- Statements -----------------------------------------------------------

    fn block(&mut self, id: StmtId) {
        let ast = self.ast;
        let StmtKind::Block(stmts) = &ast.stmt(id).kind else {
            self.stmt_inline(id);
            return;
        };
        self.out.push_str("{\n");
        self.indent += 1;
        for &stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    /// A statement on its own line.
    fn stmt(&mut self, id: StmtId) {
        let ast = self.ast;
        let unindent = matches!(ast.stmt(id).kind, StmtKind::Label(_)) && self.indent > 0;
        if unindent {
            self.indent -= 1;
        }
        self.line_start();
        self.stmt_inline(id);
        self.out.push('\n');
        if unindent {
            self.indent += 1;
        }
    }

    /// The body of `if`, `while` and friends: blocks stay on the same line,
    /// anything else goes on the next line one level deeper.
    fn body(&mut self, id: StmtId) {
        let ast = self.ast;
        if matches!(ast.stmt(id).kind, StmtKind::Block(_)) {
            self.out.push(' ');
            self.block(id);
        } else {
            self.out.push('\n');
            self.indent += 1;
            self.line_start();
            self.stmt_inline(id);
            self.indent -= 1;
        }
    }

    fn stmt_inline(&mut self, id: StmtId) {
        let ast = self.ast;
        match &ast.stmt(id).kind {
            StmtKind::Block(_) => self.block(id),
            StmtKind::Expr(expr) => {
                self.expr(*expr);
                self.out.push(';');
            }
            StmtKind::If { cond, then, otherwise } => {
                self.out.push_str("if (");
                self.expr(*cond);
                self.out.push(')');
                self.body(*then);
                if let Some(otherwise) = otherwise {
                    if matches!(ast.stmt(*then).kind, StmtKind::Block(_)) {
                        self.out.push(' ');
                    } else {
                        self.out.push('\n');
                        self.line_start();
                    }
                    self.out.push_str("else");
                    if matches!(ast.stmt(*otherwise).kind, StmtKind::If { .. }) {
                        self.out.push(' ');
                        self.stmt_inline(*otherwise);
                    } else {
                        self.body(*otherwise);
                    }
                }
            }
            StmtKind::For { init, cond, step, body } => {
                self.out.push_str("for (");
                match init {
                    Some(ForInit::Expr(expr)) => self.expr(*expr),
                    Some(ForInit::Decl(decl)) => self.decl(*decl),
                    None => {}
                }
                self.out.push(';');
                if let Some(cond) = cond {
                    self.out.push(' ');
                    self.expr(*cond);
                }
                self.out.push(';');
                if let Some(step) = step {
                    self.out.push(' ');
                    self.expr(*step);
                }
                self.out.push(')');
                self.body(*body);
            }
            StmtKind::ForEach { var, iterable, body } => {
                self.out.push_str("for (");
                self.decl(*var);
                self.out.push_str(" in ");
                self.expr(*iterable);
                self.out.push(')');
                self.body(*body);
            }
            StmtKind::While { cond, body } => {
                self.out.push_str("while (");
                self.expr(*cond);
                self.out.push(')');
                self.body(*body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.out.push_str("do");
                self.body(*body);
                if matches!(ast.stmt(*body).kind, StmtKind::Block(_)) {
                    self.out.push(' ');
                } else {
                    self.out.push('\n');
                    self.line_start();
                }
                self.out.push_str("while (");
                self.expr(*cond);
                self.out.push_str(");");
            }
            StmtKind::Switch { target, body } => {
                self.out.push_str("switch (");
                self.expr(*target);
                self.out.push(')');
                self.body(*body);
            }
            StmtKind::Label(label) => match label {
                Label::Case(expr) => {
                    self.out.push_str("case ");
                    self.expr(*expr);
                    self.out.push(':');
                }
                Label::Pattern { variant, bindings, .. } => {
                    let names: Vec<&str> = bindings.iter().map(|&b| ast.decl(b).name.as_str()).collect();
                    let _ = write!(self.out, "case {variant}({}):", names.join(", "));
                }
                Label::Default => self.out.push_str("default:"),
            },
            StmtKind::Jump(jump) => match jump {
                Jump::Break => self.out.push_str("break;"),
                Jump::Continue => self.out.push_str("continue;"),
                Jump::Return(None) => self.out.push_str("return;"),
                Jump::Return(Some(value)) => {
                    self.out.push_str("return ");
                    self.expr(*value);
                    self.out.push(';');
                }
            },
            StmtKind::Decl(decl) => {
                self.decl(*decl);
                self.out.push(';');
            }
            StmtKind::Empty => self.out.push(';'),
        }
    }

    // -- Expressions ----------------------------------------------------------

    fn expr(&mut self, id: ExprId) {
        let ast = self.ast;
        match &ast.expr(id).kind {
            ExprKind::Literal(lit) => self.literal(lit),
            ExprKind::Ident(name) => self.out.push_str(name),
            ExprKind::Path { module, name, .. } => {
                let _ = write!(self.out, "{module}.{name}");
            }
            ExprKind::Call { callee, args, .. } => {
                self.expr(*callee);
                self.out.push('(');
                self.expr_list(args);
                self.out.push(')');
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(*lhs);
                let _ = write!(self.out, " {} ", op.symbol());
                self.expr(*rhs);
            }
            ExprKind::Unary { op, expr } => {
                self.out.push_str(op.symbol());
                let operand = AstPrinter::expr_to_string(self.ast, *expr);
                let sign = matches!(op, UnaryOp::Neg | UnaryOp::Plus | UnaryOp::PreInc | UnaryOp::PreDec);
                if sign && operand.starts_with(['-', '+']) {
                    self.out.push(' ');
                }
                self.out.push_str(&operand);
            }
            ExprKind::Postfix { op, expr } => {
                self.expr(*expr);
                self.out.push_str(match op {
                    PostfixOp::Inc => "++",
                    PostfixOp::Dec => "--",
                });
            }
            ExprKind::Assign { op, lhs, rhs } => {
                self.expr(*lhs);
                match op {
                    Some(op) => {
                        let _ = write!(self.out, " {}= ", op.symbol());
                    }
                    None => self.out.push_str(" = "),
                }
                self.expr(*rhs);
            }
            ExprKind::Grouping(inner) => {
                self.out.push('(');
                self.expr(*inner);
                self.out.push(')');
            }
            ExprKind::Dot { lhs, member, .. } => {
                self.expr(*lhs);
                let _ = write!(self.out, ".{member}");
            }
            ExprKind::Tuple(elems) => {
                self.out.push('(');
                self.expr_list(elems);
                self.out.push(')');
            }
            ExprKind::Index { base, index } => {
                self.expr(*base);
                self.out.push('[');
                self.expr(*index);
                self.out.push(']');
            }
            ExprKind::Lambda { params, ret, body } => {
                self.out.push_str("fn");
                self.params(params);
                if !matches!(ret.name, TypeName::Builtin(TypeId::VOID)) {
                    self.out.push_str(": ");
                    self.type_ref(ret);
                }
                self.out.push(' ');
                self.block(*body);
            }
            ExprKind::FString(parts) => {
                self.out.push_str("f\"");
                for part in parts {
                    match part {
                        FStringPart::Text(text) => {
                            let text = escape(text).replace('{', "{{").replace('}', "}}");
                            self.out.push_str(&text);
                        }
                        FStringPart::Expr(expr) => {
                            self.out.push('{');
                            self.expr(*expr);
                            self.out.push('}');
                        }
                    }
                }
                self.out.push('"');
            }
            ExprKind::BraceInit(entries) => {
                self.out.push('{');
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match entry {
                        BraceEntry::Positional(value) => self.expr(*value),
                        BraceEntry::Designated { name, value, .. } => {
                            let _ = write!(self.out, "{name} = ");
                            self.expr(*value);
                        }
                        BraceEntry::Keyed { key, value } => {
                            self.expr(*key);
                            self.out.push_str(": ");
                            self.expr(*value);
                        }
                    }
                }
                self.out.push('}');
            }
            ExprKind::Cast { expr, ty } => {
                self.expr(*expr);
                self.out.push_str(" as ");
                self.type_ref(ty);
            }
            ExprKind::Conditional { cond, then, otherwise } => {
                self.expr(*cond);
                self.out.push_str(" ? ");
                self.expr(*then);
                self.out.push_str(" : ");
                self.expr(*otherwise);
            }
            ExprKind::VectorLit(xyz) => {
                self.out.push('[');
                self.expr_list(xyz);
                self.out.push(']');
            }
        }
    }

    fn expr_list(&mut self, exprs: &[ExprId]) {
        for (i, &expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(expr);
        }
    }

    fn literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Int(v) => {
                let _ = write!(self.out, "{v}");
            }
            Literal::Float(v) => self.out.push_str(&float_text(*v)),
            Literal::String(s) => {
                let _ = write!(self.out, "\"{}\"", escape(s));
            }
            Literal::ObjectSelf => self.out.push_str("OBJECT_SELF"),
            Literal::ObjectInvalid => self.out.push_str("OBJECT_INVALID"),
            Literal::LocationInvalid => self.out.push_str("LOCATION_INVALID"),
            Literal::Json(c) => self.out.push_str(c.name()),
        }
    }
}

fn needs_semicolon(kind: &DeclKind) -> bool {
    !matches!(
        kind,
        DeclKind::Function { body: Some(_), .. } | DeclKind::Define { .. } | DeclKind::Include { .. }
    )
}

fn builtin_name(id: TypeId) -> &'static str {
    match id {
        TypeId::VOID => "void",
        TypeId::INT => "int",
        TypeId::FLOAT => "float",
        TypeId::STRING => "string",
        TypeId::OBJECT => "object",
        TypeId::VECTOR => "vector",
        TypeId::ACTION => "action",
        _ => "invalid",
    }
}

/// Shortest text that reads back as the same float, always with a point.
fn float_text(v: f32) -> String {
    let text = format!("{v}");
    if text.contains(['.', 'e', 'i', 'N']) {
        text
    } else {
        format!("{text}.0")
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

//! Name resolution and type checking.
//!
//! A single ordered walk over the tree. Each name is entered into its scope
//! before its initializer is resolved and marked defined afterwards, so a
//! use inside its own initializer is caught. Every statement and declaration
//! keeps a snapshot of the environment it was resolved in.

mod expr;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::ast::{
    Ast, DeclId, DeclKind, DeclRef, ExprKind, ForInit, Jump, Label, Literal, ScriptId, StmtId, StmtKind, TypeName,
    TypeRef,
};
use crate::diagnostic::{DiagnosticType, Diagnostics};
use crate::env::{Env, Exports, ParamInfo, Signature, Symbol, SymbolKind};
use crate::printer::AstPrinter;
use crate::token::SourceRange;
use crate::types::{FieldInfo, TypeId, TypeKind, TypeTable, VariantInfo};

/// What a script can see besides its own declarations.
pub struct ResolveScope<'a> {
    pub script: ScriptId,
    /// Command script and include exports
    pub outer: Rc<Exports>,
    /// Imported module exports by module name
    pub modules: &'a HashMap<String, Rc<Exports>>,
}

/// Resolves `ast` in place and returns the script's own top-level symbols.
pub fn resolve(ast: &mut Ast, diags: &mut Diagnostics, types: &mut TypeTable, scope: ResolveScope<'_>) -> Exports {
    let mut resolver = Resolver {
        ast,
        diags,
        types,
        script: scope.script,
        env: Env::with_outer(scope.outer.clone()),
        outer: scope.outer,
        modules: scope.modules,
        aliases: HashMap::new(),
        scopes: vec![Scope::default()],
        function: None,
        loops: 0,
        breakable: 0,
        switches: Vec::new(),
        initializing: Vec::new(),
        exports: Exports::new(),
    };
    for id in resolver.ast.top.clone() {
        resolver.resolve_decl(id);
    }
    resolver.exports
}

#[derive(Debug, Clone)]
struct Declared {
    kind: SymbolKind,
    /// Functions only: a body has been seen
    has_body: bool,
}

#[derive(Debug, Default)]
struct Scope {
    names: HashMap<String, Declared>,
}

struct FunctionContext {
    name: String,
    ret: TypeId,
}

struct SwitchContext {
    target: TypeId,
    has_default: bool,
}

pub(crate) struct Resolver<'a> {
    ast: &'a mut Ast,
    diags: &'a mut Diagnostics,
    types: &'a mut TypeTable,
    script: ScriptId,
    outer: Rc<Exports>,
    modules: &'a HashMap<String, Rc<Exports>>,
    /// Import alias to module name
    aliases: HashMap<String, String>,
    env: Env,
    scopes: Vec<Scope>,
    function: Option<FunctionContext>,
    loops: usize,
    breakable: usize,
    switches: Vec<SwitchContext>,
    /// Variables whose initializer is being resolved
    initializing: Vec<String>,
    exports: Exports,
}

impl Resolver<'_> {
    fn error(&mut self, message: impl Into<String>, range: SourceRange) {
        self.diags.error(DiagnosticType::Semantic, message, range);
    }

    fn warning(&mut self, message: impl Into<String>, range: SourceRange) {
        self.diags.warning(DiagnosticType::Semantic, message, range);
    }

    fn decl_ref(&self, id: DeclId) -> DeclRef {
        DeclRef {
            script: self.script,
            id,
        }
    }

    fn type_name(&self, id: TypeId) -> String {
        self.types.name(id)
    }

    fn is_global(&self) -> bool {
        self.scopes.len() == 1 && self.function.is_none()
    }

    // -- Scopes ---------------------------------------------------------------

    fn push_scope(&mut self) -> Env {
        self.scopes.push(Scope::default());
        self.env.clone()
    }

    fn pop_scope(&mut self, saved: Env) {
        self.scopes.pop();
        self.env = saved;
    }

    /// Enters `name` into the current scope, reporting duplicates and, at
    /// file scope, collisions with include or command-script symbols.
    fn declare(&mut self, name: &str, kind: SymbolKind, range: SourceRange) -> bool {
        if name.is_empty() {
            return false;
        }
        let global = self.is_global();
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.names.contains_key(name) {
            self.error(format!("'{name}' is already declared in this scope"), range);
            return false;
        }
        scope.names.insert(
            name.to_string(),
            Declared {
                kind,
                has_body: false,
            },
        );
        if global && self.outer.contains_key(name) {
            self.error(format!("'{name}' redeclares a symbol from an include"), range);
        }
        true
    }

    /// Binds a resolved symbol. File-scope symbols are exported.
    fn bind(&mut self, symbol: Symbol) {
        if self.is_global() {
            self.exports.insert(symbol.name.clone(), symbol.clone());
        }
        self.env.push(symbol);
    }

    fn symbol(&self, id: DeclId, kind: SymbolKind, type_id: TypeId) -> Symbol {
        Symbol {
            name: self.ast.decl(id).name.clone(),
            kind,
            decl: self.decl_ref(id),
            type_id,
            signature: None,
            is_constant: false,
        }
    }

    /// Resolves a written type to a type id. Unknown names are reported and
    /// become invalid.
    pub(crate) fn resolve_type(&mut self, ty: &TypeRef) -> TypeId {
        match &ty.name {
            TypeName::Builtin(id) => *id,
            TypeName::Inferred => TypeId::INVALID,
            TypeName::Tuple(elems) => {
                let ids = elems.iter().map(|e| self.resolve_type(e)).collect();
                self.types.tuple(ids)
            }
            TypeName::Struct(name) => match self.env.lookup(name) {
                Some(sym) if sym.kind == SymbolKind::Type
                    && matches!(self.types.kind(sym.type_id), Some(TypeKind::Struct { .. })) =>
                {
                    sym.type_id
                }
                _ => {
                    self.error(format!("unknown struct '{name}'"), ty.range);
                    TypeId::INVALID
                }
            },
            TypeName::Named(name) => {
                if let Some(id) = self.types.lookup(name) {
                    return id;
                }
                match self.env.lookup(name) {
                    Some(sym) if sym.kind == SymbolKind::Type => sym.type_id,
                    _ => {
                        self.error(format!("unknown type '{name}'"), ty.range);
                        TypeId::INVALID
                    }
                }
            }
        }
    }

    // -- Declarations ---------------------------------------------------------

    pub(crate) fn resolve_decl(&mut self, id: DeclId) {
        self.ast.decl_mut(id).env = Some(self.env.clone());
        let decl = self.ast.decl(id);
        let (name, name_range) = (decl.name.clone(), decl.name_range);

        match decl.kind.clone() {
            DeclKind::Var { ty, is_const, init } => self.resolve_var(id, &ty, is_const, init),
            DeclKind::DeclList(items) => {
                for item in items {
                    self.resolve_decl(item);
                }
            }
            DeclKind::Function { ret, params, body } => self.resolve_function(id, &ret, &params, body),
            DeclKind::Struct { fields } => self.resolve_struct(id, &fields),
            DeclKind::TypeAlias { target } => {
                let target = self.resolve_type(&target);
                self.declare_type(id, target);
            }
            DeclKind::Newtype { inner } => {
                let inner = self.resolve_type(&inner);
                let decl = self.decl_ref(id);
                let tid = self.types.add_user(&name, TypeKind::Newtype { decl, inner });
                self.declare_type(id, tid);
            }
            DeclKind::Opaque => {
                let decl = self.decl_ref(id);
                let tid = self.types.add_user(&name, TypeKind::Opaque { decl });
                self.declare_type(id, tid);
            }
            DeclKind::Sum { variants } => self.resolve_sum(id, &variants),
            DeclKind::Import { path } => {
                let module = path.join("_");
                if self.declare(&name, SymbolKind::Module, name_range) {
                    let symbol = self.symbol(id, SymbolKind::Module, TypeId::INVALID);
                    self.env.push(symbol);
                }
                self.aliases.insert(name, module);
            }
            DeclKind::FromImport { path, names } => {
                let module = path.join("_");
                let Some(exports) = self.modules.get(&module).cloned() else {
                    return;
                };
                for (member, range) in names {
                    match exports.get(&member) {
                        Some(symbol) => {
                            if self.declare(&member, symbol.kind, range) {
                                self.env.push(symbol.clone());
                            }
                        }
                        None => self.error(format!("module '{}' has no member '{member}'", path.join(".")), range),
                    }
                }
            }
            DeclKind::Define { value } => self.resolve_define(id, value),
            DeclKind::Include { .. } => {}
            DeclKind::Param { .. } | DeclKind::Field { .. } | DeclKind::Variant { .. } => {
                self.error("declaration is not allowed here", name_range);
            }
        }
    }

    fn declare_type(&mut self, id: DeclId, tid: TypeId) {
        self.ast.decl_mut(id).type_id = tid;
        let name_range = self.ast.decl(id).name_range;
        let name = self.ast.decl(id).name.clone();
        if self.declare(&name, SymbolKind::Type, name_range) {
            let symbol = self.symbol(id, SymbolKind::Type, tid);
            self.bind(symbol);
        }
    }

    fn resolve_var(&mut self, id: DeclId, ty: &TypeRef, is_const: bool, init: Option<crate::ast::ExprId>) {
        let tid = self.resolve_type(ty);
        let (name, name_range) = {
            let decl = self.ast.decl(id);
            (decl.name.clone(), decl.name_range)
        };
        if tid == TypeId::VOID {
            self.error(format!("variable '{name}' cannot be void"), name_range);
        }
        self.ast.decl_mut(id).type_id = tid;
        let declared = self.declare(&name, SymbolKind::Variable, name_range);

        if let Some(init) = init {
            self.initializing.push(name.clone());
            let value = self.resolve_expr(init, Some(tid));
            self.initializing.pop();
            if !self.types.is_convertible(value, tid) {
                let range = self.ast.expr(init).range;
                let message = format!(
                    "cannot initialize '{name}' of type {} with {}",
                    self.type_name(tid),
                    self.type_name(value)
                );
                self.error(message, range);
            }
            if is_const && !self.is_constant(init) && self.is_global() {
                let range = self.ast.expr(init).range;
                self.error(format!("initializer of constant '{name}' is not constant"), range);
            }
        } else if is_const {
            self.error(format!("constant '{name}' needs an initializer"), name_range);
        }

        if declared {
            let mut symbol = self.symbol(id, SymbolKind::Variable, tid);
            symbol.is_constant = is_const;
            self.bind(symbol);
        }
    }

    fn resolve_define(&mut self, id: DeclId, value: crate::ast::ExprId) {
        let name = self.ast.decl(id).name.clone();
        if let Some(index) = name.strip_prefix("ENGINE_STRUCTURE_") {
            match (index.parse::<u32>(), &self.ast.expr(value).kind) {
                (Ok(index), ExprKind::Ident(engine)) => {
                    let engine = engine.clone();
                    let tid = self.types.add_engine(index, &engine);
                    self.ast.decl_mut(id).type_id = tid;
                }
                _ => {
                    let range = self.ast.decl(id).range;
                    self.error(format!("malformed engine structure '{name}'"), range);
                }
            }
            return;
        }

        let tid = self.resolve_expr(value, None);
        if !matches!(self.ast.expr(value).kind, ExprKind::Literal(_)) {
            let range = self.ast.expr(value).range;
            self.error(format!("value of '{name}' must be a literal"), range);
        }
        self.ast.decl_mut(id).type_id = tid;
        let name_range = self.ast.decl(id).name_range;
        if self.declare(&name, SymbolKind::Variable, name_range) {
            let mut symbol = self.symbol(id, SymbolKind::Variable, tid);
            symbol.is_constant = true;
            self.bind(symbol);
        }
    }

    fn resolve_struct(&mut self, id: DeclId, fields: &[DeclId]) {
        let decl = self.decl_ref(id);
        let name = self.ast.decl(id).name.clone();
        let tid = self.types.add_user(&name, TypeKind::Struct { decl, fields: Vec::new() });
        self.declare_type(id, tid);

        let mut infos: Vec<FieldInfo> = Vec::with_capacity(fields.len());
        for &field in fields {
            self.ast.decl_mut(field).env = Some(self.env.clone());
            let DeclKind::Field { ty } = self.ast.decl(field).kind.clone() else {
                continue;
            };
            let ftid = self.resolve_type(&ty);
            let field_decl = self.ast.decl(field);
            let (field_name, range) = (field_decl.name.clone(), field_decl.name_range);
            if ftid == tid {
                self.error(format!("struct '{name}' cannot contain itself"), range);
            }
            if infos.iter().any(|f| f.name == field_name) {
                self.error(format!("duplicate field '{field_name}' in struct '{name}'"), range);
                continue;
            }
            self.ast.decl_mut(field).type_id = ftid;
            infos.push(FieldInfo {
                name: field_name,
                type_id: ftid,
                decl: self.decl_ref(field),
            });
        }
        self.types.set_kind(tid, TypeKind::Struct { decl, fields: infos });
    }

    fn resolve_sum(&mut self, id: DeclId, variants: &[DeclId]) {
        let decl = self.decl_ref(id);
        let name = self.ast.decl(id).name.clone();
        let tid = self.types.add_user(&name, TypeKind::Sum { decl, variants: Vec::new() });
        self.declare_type(id, tid);

        let mut infos: Vec<VariantInfo> = Vec::with_capacity(variants.len());
        for &variant in variants {
            self.ast.decl_mut(variant).env = Some(self.env.clone());
            let DeclKind::Variant { payload } = self.ast.decl(variant).kind.clone() else {
                continue;
            };
            let payload: Vec<TypeId> = payload.iter().map(|t| self.resolve_type(t)).collect();
            let (vname, range) = {
                let d = self.ast.decl(variant);
                (d.name.clone(), d.name_range)
            };
            self.ast.decl_mut(variant).type_id = tid;
            infos.push(VariantInfo {
                name: vname.clone(),
                payload: payload.clone(),
                decl: self.decl_ref(variant),
            });
            if self.declare(&vname, SymbolKind::Variant, range) {
                let params = payload
                    .iter()
                    .enumerate()
                    .map(|(i, &type_id)| ParamInfo {
                        name: format!("_{i}"),
                        type_id,
                        is_const: false,
                        default: None,
                    })
                    .collect();
                let mut symbol = self.symbol(variant, SymbolKind::Variant, tid);
                symbol.signature = Some(Rc::new(Signature { params, ret: tid }));
                symbol.is_constant = payload.is_empty();
                self.bind(symbol);
            }
        }
        self.types.set_kind(tid, TypeKind::Sum { decl, variants: infos });
    }

    /// Resolves parameter types and defaults. Names are not bound.
    fn resolve_params(&mut self, params: &[DeclId]) -> SmallVec<[ParamInfo; 4]> {
        let mut infos = SmallVec::new();
        let mut seen_default = false;
        for &param in params {
            self.ast.decl_mut(param).env = Some(self.env.clone());
            let DeclKind::Param { ty, is_const, default } = self.ast.decl(param).kind.clone() else {
                continue;
            };
            let tid = self.resolve_type(&ty);
            let (name, range) = {
                let d = self.ast.decl(param);
                (d.name.clone(), d.name_range)
            };
            if tid == TypeId::VOID {
                self.error(format!("parameter '{name}' cannot be void"), range);
            }
            self.ast.decl_mut(param).type_id = tid;

            let default_text = match default {
                Some(value) => {
                    seen_default = true;
                    let vt = self.resolve_expr(value, Some(tid));
                    let vrange = self.ast.expr(value).range;
                    if !self.is_constant(value) {
                        self.error(format!("default value of '{name}' must be constant"), vrange);
                    } else if !self.types.is_convertible(vt, tid) {
                        let message = format!(
                            "default value of '{name}' has type {}, expected {}",
                            self.type_name(vt),
                            self.type_name(tid)
                        );
                        self.error(message, vrange);
                    }
                    Some(AstPrinter::expr_to_string(self.ast, value))
                }
                None => {
                    if seen_default {
                        self.error(format!("parameter '{name}' without default follows a defaulted parameter"), range);
                    }
                    None
                }
            };
            infos.push(ParamInfo {
                name,
                type_id: tid,
                is_const,
                default: default_text,
            });
        }
        infos
    }

    /// Binds parameters in the current (function) scope.
    fn bind_params(&mut self, params: &[DeclId]) {
        for &param in params {
            let (name, range, tid, is_const) = {
                let d = self.ast.decl(param);
                let is_const = matches!(d.kind, DeclKind::Param { is_const: true, .. });
                (d.name.clone(), d.name_range, d.type_id, is_const)
            };
            if self.declare(&name, SymbolKind::Param, range) {
                let mut symbol = self.symbol(param, SymbolKind::Param, tid);
                symbol.is_constant = is_const;
                self.env.push(symbol);
            }
        }
    }

    fn resolve_function(&mut self, id: DeclId, ret: &TypeRef, params: &[DeclId], body: Option<StmtId>) {
        let ret = self.resolve_type(ret);
        let infos = self.resolve_params(params);
        let fn_type = self.types.function(infos.iter().map(|p| p.type_id).collect(), ret);
        self.ast.decl_mut(id).type_id = fn_type;
        let signature = Rc::new(Signature { params: infos, ret });
        let (name, name_range) = {
            let d = self.ast.decl(id);
            (d.name.clone(), d.name_range)
        };

        let local = self.scopes[0].names.get(&name).cloned();
        let previous = self.env.lookup(&name).cloned();
        let bind = match (&local, &previous) {
            (Some(Declared { kind: SymbolKind::Function, has_body }), Some(prev)) => {
                if *has_body && body.is_some() {
                    self.error(format!("function '{name}' is already defined"), name_range);
                }
                if let Some(prev_sig) = &prev.signature {
                    self.match_signatures(&name, prev_sig, &signature, name_range);
                }
                true
            }
            (Some(_), _) => {
                self.error(format!("'{name}' is already declared in this scope"), name_range);
                false
            }
            (None, Some(prev)) if prev.kind == SymbolKind::Function && self.outer.contains_key(&name) => {
                if let Some(prev_sig) = &prev.signature {
                    self.match_signatures(&name, prev_sig, &signature, name_range);
                }
                self.scopes[0].names.insert(
                    name.clone(),
                    Declared {
                        kind: SymbolKind::Function,
                        has_body: false,
                    },
                );
                true
            }
            (None, _) => self.declare(&name, SymbolKind::Function, name_range),
        };

        if body.is_some() {
            if let Some(declared) = self.scopes[0].names.get_mut(&name) {
                declared.has_body = true;
            }
        }
        if bind {
            let mut symbol = self.symbol(id, SymbolKind::Function, fn_type);
            symbol.signature = Some(signature);
            self.bind(symbol);
        }

        if let Some(body) = body {
            let saved = self.push_scope();
            let outer_fn = self.function.replace(FunctionContext { name: name.clone(), ret });
            self.bind_params(params);
            self.resolve_body(body);
            self.function = outer_fn;
            self.pop_scope(saved);

            if ret != TypeId::VOID && ret != TypeId::INVALID && !self.always_returns(body) {
                self.error(format!("not all control paths of '{name}' return a value"), name_range);
            }
        }
    }

    /// Resolves a function or lambda body in the scope holding its params.
    pub(crate) fn resolve_body(&mut self, body: StmtId) {
        let (saved_loops, saved_breakable) = (self.loops, self.breakable);
        let saved_switches = std::mem::take(&mut self.switches);
        self.loops = 0;
        self.breakable = 0;

        self.ast.stmt_mut(body).env = Some(self.env.clone());
        match self.ast.stmt(body).kind.clone() {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.resolve_stmt(stmt);
                }
            }
            _ => self.resolve_stmt(body),
        }

        self.loops = saved_loops;
        self.breakable = saved_breakable;
        self.switches = saved_switches;
    }

    /// Compares a function declaration against an earlier one.
    fn match_signatures(&mut self, name: &str, prev: &Signature, next: &Signature, range: SourceRange) {
        if prev.ret != next.ret {
            let message = format!(
                "return type of '{name}' differs from its declaration: {} vs {}",
                self.type_name(next.ret),
                self.type_name(prev.ret)
            );
            self.error(message, range);
        }
        if prev.params.len() != next.params.len() {
            let message = format!(
                "parameter count of '{name}' differs from its declaration: {} vs {}",
                next.params.len(),
                prev.params.len()
            );
            self.error(message, range);
            return;
        }
        for (a, b) in prev.params.iter().zip(&next.params) {
            if a.type_id != b.type_id {
                let message = format!(
                    "type of parameter '{}' of '{name}' differs from its declaration: {} vs {}",
                    b.name,
                    self.type_name(b.type_id),
                    self.type_name(a.type_id)
                );
                self.error(message, range);
            }
            if a.name != b.name {
                self.warning(
                    format!("parameter '{}' of '{name}' was declared as '{}'", b.name, a.name),
                    range,
                );
            }
            if a.is_const != b.is_const {
                self.error(format!("const qualifier of parameter '{}' of '{name}' differs from its declaration", b.name), range);
            }
            if a.default != b.default {
                self.error(format!("default value of parameter '{}' of '{name}' differs from its declaration", b.name), range);
            }
        }
    }

    // -- Statements -----------------------------------------------------------

    fn scoped_stmt(&mut self, id: StmtId) {
        let saved = self.push_scope();
        self.resolve_stmt(id);
        self.pop_scope(saved);
    }

    fn resolve_condition(&mut self, cond: crate::ast::ExprId) {
        let tid = self.resolve_expr(cond, Some(TypeId::INT));
        if !self.types.is_convertible(tid, TypeId::INT) {
            let range = self.ast.expr(cond).range;
            let message = format!("condition must be int, found {}", self.type_name(tid));
            self.error(message, range);
        }
    }

    fn resolve_loop_body(&mut self, body: StmtId) {
        self.loops += 1;
        self.breakable += 1;
        self.scoped_stmt(body);
        self.loops -= 1;
        self.breakable -= 1;
    }

    pub(crate) fn resolve_stmt(&mut self, id: StmtId) {
        self.ast.stmt_mut(id).env = Some(self.env.clone());
        let range = self.ast.stmt(id).range;

        match self.ast.stmt(id).kind.clone() {
            StmtKind::Block(stmts) => {
                let saved = self.push_scope();
                for stmt in stmts {
                    self.resolve_stmt(stmt);
                }
                self.pop_scope(saved);
            }
            StmtKind::Expr(expr) => {
                self.resolve_expr(expr, None);
            }
            StmtKind::If { cond, then, otherwise } => {
                self.resolve_condition(cond);
                self.scoped_stmt(then);
                if let Some(otherwise) = otherwise {
                    self.scoped_stmt(otherwise);
                }
            }
            StmtKind::For { init, cond, step, body } => {
                let saved = self.push_scope();
                match init {
                    Some(ForInit::Decl(decl)) => self.resolve_decl(decl),
                    Some(ForInit::Expr(expr)) => {
                        self.resolve_expr(expr, None);
                    }
                    None => {}
                }
                if let Some(cond) = cond {
                    self.resolve_condition(cond);
                }
                if let Some(step) = step {
                    self.resolve_expr(step, None);
                }
                self.resolve_loop_body(body);
                self.pop_scope(saved);
            }
            StmtKind::ForEach { var, iterable, body } => {
                let saved = self.push_scope();
                self.resolve_expr(iterable, None);
                self.ast.decl_mut(var).env = Some(self.env.clone());
                if let DeclKind::Var { ty, .. } = self.ast.decl(var).kind.clone() {
                    let tid = self.resolve_type(&ty);
                    self.ast.decl_mut(var).type_id = tid;
                    let (name, name_range) = (self.ast.decl(var).name.clone(), self.ast.decl(var).name_range);
                    if self.declare(&name, SymbolKind::Variable, name_range) {
                        let symbol = self.symbol(var, SymbolKind::Variable, tid);
                        self.env.push(symbol);
                    }
                }
                self.resolve_loop_body(body);
                self.pop_scope(saved);
            }
            StmtKind::While { cond, body } => {
                self.resolve_condition(cond);
                self.resolve_loop_body(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.resolve_loop_body(body);
                self.resolve_condition(cond);
            }
            StmtKind::Switch { target, body } => {
                let tid = self.resolve_expr(target, None);
                let switchable = tid == TypeId::INT
                    || tid == TypeId::STRING
                    || tid == TypeId::INVALID
                    || matches!(self.types.kind(tid), Some(TypeKind::Sum { .. }));
                if !switchable {
                    let message = format!("cannot switch on a value of type {}", self.type_name(tid));
                    let range = self.ast.expr(target).range;
                    self.error(message, range);
                }
                self.switches.push(SwitchContext {
                    target: tid,
                    has_default: false,
                });
                self.breakable += 1;
                self.scoped_stmt(body);
                self.breakable -= 1;
                self.switches.pop();
            }
            StmtKind::Label(label) => self.resolve_label(label, range),
            StmtKind::Jump(Jump::Break) => {
                if self.breakable == 0 {
                    self.error("'break' outside of a loop or switch", range);
                }
            }
            StmtKind::Jump(Jump::Continue) => {
                if self.loops == 0 {
                    self.error("'continue' outside of a loop", range);
                }
            }
            StmtKind::Jump(Jump::Return(value)) => self.resolve_return(value, range),
            StmtKind::Decl(decl) => self.resolve_decl(decl),
            StmtKind::Empty => {}
        }
    }

    fn resolve_return(&mut self, value: Option<crate::ast::ExprId>, range: SourceRange) {
        let Some((name, ret)) = self.function.as_ref().map(|f| (f.name.clone(), f.ret)) else {
            self.error("'return' outside of a function", range);
            return;
        };
        match value {
            None if ret != TypeId::VOID && ret != TypeId::INVALID => {
                self.error(format!("'{name}' must return a value of type {}", self.type_name(ret)), range);
            }
            None => {}
            Some(value) => {
                let tid = self.resolve_expr(value, Some(ret));
                if ret == TypeId::VOID {
                    self.error(format!("void function '{name}' cannot return a value"), range);
                } else if !self.types.is_convertible(tid, ret) {
                    let message = format!(
                        "cannot return {} from '{name}', which returns {}",
                        self.type_name(tid),
                        self.type_name(ret)
                    );
                    self.error(message, range);
                }
            }
        }
    }

    fn resolve_label(&mut self, label: Label, range: SourceRange) {
        let Some(target) = self.switches.last().map(|s| s.target) else {
            let what = match label {
                Label::Default => "'default'",
                _ => "'case'",
            };
            self.error(format!("{what} label outside of a switch"), range);
            return;
        };
        let variants = self.types.variants(target).map(<[VariantInfo]>::to_vec);

        match label {
            Label::Default => {
                let had_default = self.switches.last().is_some_and(|s| s.has_default);
                if had_default {
                    self.error("multiple 'default' labels in one switch", range);
                }
                if let Some(switch) = self.switches.last_mut() {
                    switch.has_default = true;
                }
            }
            Label::Case(expr) => {
                if let (Some(variants), ExprKind::Ident(name)) = (&variants, &self.ast.expr(expr).kind) {
                    let name = name.clone();
                    match variants.iter().find(|v| v.name == name) {
                        Some(variant) => {
                            if !variant.payload.is_empty() {
                                let message = format!(
                                    "variant '{name}' expects {} bindings, found 0",
                                    variant.payload.len()
                                );
                                self.error(message, range);
                            }
                            let e = self.ast.expr_mut(expr);
                            e.decl = Some(variant.decl);
                            e.type_id = target;
                        }
                        None => {
                            let message = format!("'{name}' is not a variant of {}", self.type_name(target));
                            self.error(message, range);
                        }
                    }
                    return;
                }
                let tid = self.resolve_expr(expr, Some(target));
                let erange = self.ast.expr(expr).range;
                if !self.is_constant(expr) {
                    self.error("case label must be a constant expression", erange);
                } else if !self.types.is_convertible(tid, target) {
                    let message = format!(
                        "case label of type {} does not match switch type {}",
                        self.type_name(tid),
                        self.type_name(target)
                    );
                    self.error(message, erange);
                }
            }
            Label::Pattern {
                variant,
                variant_range,
                bindings,
            } => {
                let Some(variants) = variants else {
                    if target != TypeId::INVALID {
                        self.error("pattern labels require a switch on a sum type", variant_range);
                    }
                    return;
                };
                let Some(info) = variants.iter().find(|v| v.name == variant) else {
                    let message = format!("'{variant}' is not a variant of {}", self.type_name(target));
                    self.error(message, variant_range);
                    return;
                };
                if info.payload.len() != bindings.len() {
                    let message = format!(
                        "variant '{variant}' expects {} bindings, found {}",
                        info.payload.len(),
                        bindings.len()
                    );
                    self.error(message, variant_range);
                }
                for (i, &binding) in bindings.iter().enumerate() {
                    let tid = info.payload.get(i).copied().unwrap_or(TypeId::INVALID);
                    let decl = self.ast.decl_mut(binding);
                    decl.type_id = tid;
                    decl.env = Some(self.env.clone());
                    let symbol = self.symbol(binding, SymbolKind::Variable, tid);
                    self.env.push(symbol);
                }
            }
        }
    }

    /// True if every path through `id` ends in a `return`.
    fn always_returns(&self, id: StmtId) -> bool {
        match &self.ast.stmt(id).kind {
            StmtKind::Jump(Jump::Return(_)) => true,
            StmtKind::Block(stmts) => stmts.iter().any(|&s| self.always_returns(s)),
            StmtKind::If {
                then,
                otherwise: Some(otherwise),
                ..
            } => self.always_returns(*then) && self.always_returns(*otherwise),
            StmtKind::DoWhile { body, .. } => self.always_returns(*body) && !self.breaks_out(*body),
            StmtKind::For { cond: None, body, .. } => !self.breaks_out(*body),
            StmtKind::While { cond, body } => {
                matches!(self.ast.expr(*cond).kind, ExprKind::Literal(Literal::Int(v)) if v != 0)
                    && !self.breaks_out(*body)
            }
            StmtKind::Switch { body, .. } => {
                let StmtKind::Block(stmts) = &self.ast.stmt(*body).kind else {
                    return false;
                };
                let has_default = stmts
                    .iter()
                    .any(|&s| matches!(self.ast.stmt(s).kind, StmtKind::Label(Label::Default)));
                has_default
                    && stmts.last().is_some_and(|&s| self.always_returns(s))
                    && !self.breaks_out(*body)
            }
            _ => false,
        }
    }

    /// True if `id` holds a `break` that leaves the enclosing loop or switch.
    fn breaks_out(&self, id: StmtId) -> bool {
        match &self.ast.stmt(id).kind {
            StmtKind::Jump(Jump::Break) => true,
            StmtKind::Block(stmts) => stmts.iter().any(|&s| self.breaks_out(s)),
            StmtKind::If { then, otherwise, .. } => {
                self.breaks_out(*then) || otherwise.is_some_and(|o| self.breaks_out(o))
            }
            _ => false,
        }
    }
}

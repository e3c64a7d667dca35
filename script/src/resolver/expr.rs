//! Expression typing.

use std::rc::Rc;

use crate::ast::{BinaryOp, BraceEntry, ExprId, ExprKind, FStringPart, Literal, UnaryOp};
use crate::env::{Signature, SymbolKind};
use crate::token::SourceRange;
use crate::types::{TypeId, TypeKind};

use super::{FunctionContext, Resolver};

impl Resolver<'_> {
    fn set_type(&mut self, id: ExprId, tid: TypeId) -> TypeId {
        self.ast.expr_mut(id).type_id = tid;
        tid
    }

    fn expr_range(&self, id: ExprId) -> SourceRange {
        self.ast.expr(id).range
    }

    /// Resolves an expression and returns its type. `expected` is used for
    /// brace initializers, which take their type from context.
    pub(crate) fn resolve_expr(&mut self, id: ExprId, expected: Option<TypeId>) -> TypeId {
        let range = self.expr_range(id);
        let tid = match self.ast.expr(id).kind.clone() {
            ExprKind::Literal(lit) => self.literal_type(&lit, range),
            ExprKind::Ident(name) => self.resolve_ident(id, &name, range),
            ExprKind::Path { module, name, name_range } => self.resolve_path(id, &module, &name, name_range),
            ExprKind::Call { callee, args, .. } => self.resolve_call(callee, &args, range),
            ExprKind::Binary { op, lhs, rhs } => {
                let lt = self.resolve_expr(lhs, None);
                let rt = self.resolve_expr(rhs, None);
                self.check_binary(op, lt, rt, range)
            }
            ExprKind::Unary { op, expr } => self.resolve_unary(op, expr, range),
            ExprKind::Postfix { expr, .. } => {
                let tid = self.resolve_expr(expr, None);
                self.check_mutable(expr);
                if tid != TypeId::INT && tid != TypeId::INVALID {
                    self.error(format!("cannot increment a value of type {}", self.type_name(tid)), range);
                }
                tid
            }
            ExprKind::Assign { op, lhs, rhs } => self.resolve_assign(op, lhs, rhs, range),
            ExprKind::Grouping(inner) => self.resolve_expr(inner, expected),
            ExprKind::Dot {
                lhs,
                member,
                member_range,
            } => self.resolve_member(id, lhs, &member, member_range),
            ExprKind::Tuple(elems) => {
                let expected_elems = expected.and_then(|t| match self.types.kind(t) {
                    Some(TypeKind::Tuple(e)) if e.len() == elems.len() => Some(e.clone()),
                    _ => None,
                });
                let ids = elems
                    .iter()
                    .enumerate()
                    .map(|(i, &e)| {
                        let hint = expected_elems.as_ref().map(|t| t[i]);
                        self.resolve_expr(e, hint)
                    })
                    .collect();
                self.types.tuple(ids)
            }
            ExprKind::Index { base, index } => self.resolve_index(base, index, range),
            ExprKind::Lambda { params, ret, body } => {
                let ret = self.resolve_type(&ret);
                let infos = self.resolve_params(&params);
                let saved = self.push_scope();
                let outer_fn = self.function.replace(FunctionContext {
                    name: "<lambda>".to_string(),
                    ret,
                });
                self.bind_params(&params);
                self.resolve_body(body);
                self.function = outer_fn;
                self.pop_scope(saved);
                if ret != TypeId::VOID && ret != TypeId::INVALID && !self.always_returns(body) {
                    self.error("not all control paths of lambda return a value", range);
                }
                self.types.function(infos.iter().map(|p| p.type_id).collect(), ret)
            }
            ExprKind::FString(parts) => {
                for part in parts {
                    if let FStringPart::Expr(e) = part {
                        let tid = self.resolve_expr(e, None);
                        if tid == TypeId::VOID {
                            let range = self.expr_range(e);
                            self.error("cannot interpolate a void value", range);
                        }
                    }
                }
                TypeId::STRING
            }
            ExprKind::BraceInit(entries) => self.resolve_brace_init(&entries, expected, range),
            ExprKind::Cast { expr, ty } => {
                let from = self.resolve_expr(expr, None);
                let to = self.resolve_type(&ty);
                if !self.can_cast(from, to) {
                    let message = format!("cannot cast {} to {}", self.type_name(from), self.type_name(to));
                    self.error(message, range);
                }
                to
            }
            ExprKind::Conditional { cond, then, otherwise } => {
                let ct = self.resolve_expr(cond, Some(TypeId::INT));
                if !self.types.is_convertible(ct, TypeId::INT) {
                    let crange = self.expr_range(cond);
                    self.error(format!("condition must be int, found {}", self.type_name(ct)), crange);
                }
                let a = self.resolve_expr(then, expected);
                let b = self.resolve_expr(otherwise, expected);
                if self.types.is_convertible(b, a) {
                    if a == TypeId::INVALID { b } else { a }
                } else if self.types.is_convertible(a, b) {
                    b
                } else {
                    let message = format!(
                        "branches of conditional have different types: {} and {}",
                        self.type_name(a),
                        self.type_name(b)
                    );
                    self.error(message, range);
                    TypeId::INVALID
                }
            }
            ExprKind::VectorLit(xyz) => {
                for e in xyz {
                    let tid = self.resolve_expr(e, Some(TypeId::FLOAT));
                    if !self.types.is_convertible(tid, TypeId::FLOAT) {
                        let erange = self.expr_range(e);
                        self.error(format!("vector component must be float, found {}", self.type_name(tid)), erange);
                    }
                }
                TypeId::VECTOR
            }
        };
        self.set_type(id, tid)
    }

    fn literal_type(&mut self, lit: &Literal, range: SourceRange) -> TypeId {
        match lit {
            Literal::Int(v) => {
                if i32::try_from(*v).is_err() {
                    self.error("integer literal out of range", range);
                }
                TypeId::INT
            }
            Literal::Float(_) => TypeId::FLOAT,
            Literal::String(_) => TypeId::STRING,
            Literal::ObjectSelf | Literal::ObjectInvalid => TypeId::OBJECT,
            Literal::LocationInvalid => self.types.lookup("location").unwrap_or(TypeId::INVALID),
            Literal::Json(_) => self.types.lookup("json").unwrap_or(TypeId::INVALID),
        }
    }

    fn resolve_ident(&mut self, id: ExprId, name: &str, range: SourceRange) -> TypeId {
        if self.initializing.iter().any(|n| n == name) {
            self.error(format!("'{name}' is used in its own initializer"), range);
            return TypeId::INVALID;
        }
        let Some(symbol) = self.env.lookup(name) else {
            self.error(format!("undeclared identifier '{name}'"), range);
            return TypeId::INVALID;
        };
        let (decl, tid, kind) = (symbol.decl, symbol.type_id, symbol.kind);
        self.ast.expr_mut(id).decl = Some(decl);
        match kind {
            SymbolKind::Type | SymbolKind::Module => {
                self.error(format!("'{name}' is not a value"), range);
                TypeId::INVALID
            }
            _ => tid,
        }
    }

    fn resolve_path(&mut self, id: ExprId, module: &str, name: &str, range: SourceRange) -> TypeId {
        let exports = self.aliases.get(module).and_then(|m| self.modules.get(m)).cloned();
        let Some(exports) = exports else {
            // Missing modules are reported when loading dependencies.
            return TypeId::INVALID;
        };
        match exports.get(name) {
            Some(symbol) => {
                self.ast.expr_mut(id).decl = Some(symbol.decl);
                symbol.type_id
            }
            None => {
                self.error(format!("module '{module}' has no member '{name}'"), range);
                TypeId::INVALID
            }
        }
    }

    /// Signature of a callee, looked up without resolving it as a value.
    fn callee_signature(&self, callee: ExprId) -> Option<(String, Rc<Signature>)> {
        match &self.ast.expr(callee).kind {
            ExprKind::Ident(name) => {
                let symbol = self.env.lookup(name)?;
                Some((name.clone(), symbol.signature.clone()?))
            }
            ExprKind::Path { module, name, .. } => {
                let module = self.aliases.get(module)?;
                let symbol = self.modules.get(module)?.get(name)?;
                Some((name.clone(), symbol.signature.clone()?))
            }
            _ => None,
        }
    }

    fn resolve_call(&mut self, callee: ExprId, args: &[ExprId], range: SourceRange) -> TypeId {
        let callee_type = self.resolve_expr(callee, None);
        let (name, params, required, ret) = match self.callee_signature(callee) {
            Some((name, sig)) => {
                let params: Vec<TypeId> = sig.params.iter().map(|p| p.type_id).collect();
                (name, params, sig.required(), sig.ret)
            }
            None => match self.types.kind(callee_type) {
                Some(TypeKind::Function { params, ret }) => ("function".to_string(), params.clone(), params.len(), *ret),
                _ => {
                    for &arg in args {
                        self.resolve_expr(arg, None);
                    }
                    if callee_type != TypeId::INVALID {
                        let message = format!("value of type {} is not callable", self.type_name(callee_type));
                        self.error(message, range);
                    }
                    return TypeId::INVALID;
                }
            },
        };

        let argc = args.len();
        if argc < required || argc > params.len() {
            let expects = if required == params.len() {
                format!("{required}")
            } else {
                format!("{required} to {}", params.len())
            };
            self.error(format!("'{name}' expects {expects} arguments, found {argc}"), range);
        }

        for (i, &arg) in args.iter().enumerate() {
            let Some(&param) = params.get(i) else {
                self.resolve_expr(arg, None);
                continue;
            };
            let at = self.resolve_expr(arg, Some(param));
            let arange = self.expr_range(arg);
            if param == TypeId::ACTION {
                let is_call = matches!(self.ast.expr(arg).kind, ExprKind::Call { .. });
                if !is_call && !self.types.is_convertible(at, TypeId::ACTION) {
                    self.error(format!("argument {} of '{name}' must be an action", i + 1), arange);
                }
            } else if !self.types.is_convertible(at, param) {
                let message = format!(
                    "argument {} of '{name}': cannot convert {} to {}",
                    i + 1,
                    self.type_name(at),
                    self.type_name(param)
                );
                self.error(message, arange);
            }
        }
        ret
    }

    /// Result type of a binary operator, or `None` if the operands don't fit.
    pub(crate) fn binary_result(&self, op: BinaryOp, lt: TypeId, rt: TypeId) -> Option<TypeId> {
        use BinaryOp::*;
        let numeric = lt.is_numeric() && rt.is_numeric();
        let arith = if lt == TypeId::INT && rt == TypeId::INT {
            TypeId::INT
        } else {
            TypeId::FLOAT
        };
        match op {
            And | Or => (lt == TypeId::INT && rt == TypeId::INT).then_some(TypeId::INT),
            Eq | Ne => (self.types.is_convertible(lt, rt) || self.types.is_convertible(rt, lt)).then_some(TypeId::INT),
            Lt | Le | Gt | Ge => numeric.then_some(TypeId::INT),
            Add if lt == TypeId::STRING && rt == TypeId::STRING => Some(TypeId::STRING),
            Add | Sub if lt == TypeId::VECTOR && rt == TypeId::VECTOR => Some(TypeId::VECTOR),
            Mul if lt == TypeId::VECTOR && rt.is_numeric() => Some(TypeId::VECTOR),
            Mul if lt.is_numeric() && rt == TypeId::VECTOR => Some(TypeId::VECTOR),
            Div if lt == TypeId::VECTOR && rt.is_numeric() => Some(TypeId::VECTOR),
            Add | Sub | Mul | Div => numeric.then_some(arith),
            Mod | BitAnd | BitOr | BitXor | Shl | Shr | UShr => {
                (lt == TypeId::INT && rt == TypeId::INT).then_some(TypeId::INT)
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lt: TypeId, rt: TypeId, range: SourceRange) -> TypeId {
        if lt == TypeId::INVALID || rt == TypeId::INVALID {
            return if op.is_comparison() || op.is_logical() {
                TypeId::INT
            } else {
                TypeId::INVALID
            };
        }
        match self.binary_result(op, lt, rt) {
            Some(tid) => tid,
            None => {
                let message = format!(
                    "invalid operands to '{}': {} and {}",
                    op.symbol(),
                    self.type_name(lt),
                    self.type_name(rt)
                );
                self.error(message, range);
                TypeId::INVALID
            }
        }
    }

    fn resolve_unary(&mut self, op: UnaryOp, expr: ExprId, range: SourceRange) -> TypeId {
        let tid = self.resolve_expr(expr, None);
        if tid == TypeId::INVALID {
            return tid;
        }
        let ok = match op {
            UnaryOp::Neg => tid.is_numeric() || tid == TypeId::VECTOR,
            UnaryOp::Plus => tid.is_numeric(),
            UnaryOp::Not | UnaryOp::BitNot => tid == TypeId::INT,
            UnaryOp::PreInc | UnaryOp::PreDec => {
                self.check_mutable(expr);
                tid == TypeId::INT
            }
        };
        if !ok {
            let message = format!("invalid operand to '{}': {}", op.symbol(), self.type_name(tid));
            self.error(message, range);
            return TypeId::INVALID;
        }
        tid
    }

    fn resolve_assign(&mut self, op: Option<BinaryOp>, lhs: ExprId, rhs: ExprId, range: SourceRange) -> TypeId {
        let lt = self.resolve_expr(lhs, None);
        self.check_mutable(lhs);
        let rt = self.resolve_expr(rhs, Some(lt));
        let value = match op {
            Some(op) => self.check_binary(op, lt, rt, range),
            None => rt,
        };
        if !self.types.is_convertible(value, lt) {
            let message = format!("cannot assign {} to {}", self.type_name(value), self.type_name(lt));
            self.error(message, range);
        }
        lt
    }

    /// Reports assignment to something that is not a mutable variable.
    fn check_mutable(&mut self, id: ExprId) {
        let range = self.expr_range(id);
        match self.ast.expr(id).kind.clone() {
            ExprKind::Ident(name) => {
                if let Some(symbol) = self.env.lookup(&name) {
                    let (kind, constant) = (symbol.kind, symbol.is_constant);
                    if !matches!(kind, SymbolKind::Variable | SymbolKind::Param) {
                        self.error(format!("cannot assign to '{name}'"), range);
                    } else if constant {
                        self.error(format!("cannot assign to constant '{name}'"), range);
                    }
                }
            }
            ExprKind::Dot { lhs, .. } => self.check_mutable(lhs),
            ExprKind::Grouping(inner) => self.check_mutable(inner),
            ExprKind::Index { base, .. } => self.check_mutable(base),
            _ => self.error("expression is not assignable", range),
        }
    }

    fn resolve_member(&mut self, id: ExprId, lhs: ExprId, member: &str, range: SourceRange) -> TypeId {
        let lt = self.resolve_expr(lhs, None);
        if lt == TypeId::INVALID {
            return lt;
        }
        if lt == TypeId::VECTOR {
            if matches!(member, "x" | "y" | "z") {
                return TypeId::FLOAT;
            }
        } else if let Some(fields) = self.types.struct_fields(lt) {
            if let Some(field) = fields.iter().find(|f| f.name == member) {
                let (decl, tid) = (field.decl, field.type_id);
                self.ast.expr_mut(id).decl = Some(decl);
                return tid;
            }
        }
        let message = format!("{} has no member '{member}'", self.type_name(lt));
        self.error(message, range);
        TypeId::INVALID
    }

    fn resolve_index(&mut self, base: ExprId, index: ExprId, range: SourceRange) -> TypeId {
        let bt = self.resolve_expr(base, None);
        let it = self.resolve_expr(index, Some(TypeId::INT));
        if it != TypeId::INT && it != TypeId::INVALID {
            let irange = self.expr_range(index);
            self.error(format!("index must be int, found {}", self.type_name(it)), irange);
        }
        if bt == TypeId::INVALID {
            return bt;
        }
        if bt == TypeId::STRING {
            return TypeId::STRING;
        }
        if bt == TypeId::VECTOR {
            return TypeId::FLOAT;
        }
        if let Some(TypeKind::Tuple(elems)) = self.types.kind(bt) {
            let elems = elems.clone();
            let constant = match &self.ast.expr(index).kind {
                ExprKind::Literal(Literal::Int(i)) => Some(*i),
                _ => None,
            };
            return match constant {
                Some(i) if i >= 0 && (i as usize) < elems.len() => elems[i as usize],
                Some(i) => {
                    self.error(format!("tuple index {i} out of range"), range);
                    TypeId::INVALID
                }
                None => {
                    self.error("tuple index must be a constant", range);
                    TypeId::INVALID
                }
            };
        }
        self.error(format!("type {} cannot be indexed", self.type_name(bt)), range);
        TypeId::INVALID
    }

    fn resolve_brace_init(&mut self, entries: &[BraceEntry], expected: Option<TypeId>, range: SourceRange) -> TypeId {
        let Some(target) = expected.filter(|&t| t != TypeId::INVALID) else {
            for entry in entries {
                self.resolve_entry_values(entry);
            }
            if expected.is_none() {
                self.error("cannot infer the type of a brace initializer", range);
            }
            return TypeId::INVALID;
        };

        if let Some(fields) = self.types.struct_fields(target).map(<[_]>::to_vec) {
            let mut next = 0usize;
            for entry in entries {
                let (field, value, erange) = match entry {
                    BraceEntry::Positional(value) => {
                        let field = fields.get(next).cloned();
                        next += 1;
                        (field, *value, self.expr_range(*value))
                    }
                    BraceEntry::Designated { name, range, value } => {
                        let field = fields.iter().find(|f| &f.name == name).cloned();
                        if field.is_none() {
                            let message = format!("{} has no member '{name}'", self.type_name(target));
                            self.error(message, *range);
                        }
                        (field, *value, *range)
                    }
                    BraceEntry::Keyed { key, value } => {
                        self.resolve_expr(*key, None);
                        let krange = self.expr_range(*key);
                        self.error("keyed entries are only allowed for json", krange);
                        (None, *value, krange)
                    }
                };
                let field_type = field.as_ref().map(|f| f.type_id);
                let vt = self.resolve_expr(value, field_type);
                match field {
                    Some(field) if !self.types.is_convertible(vt, field.type_id) => {
                        let message = format!(
                            "member '{}' has type {}, found {}",
                            field.name,
                            self.type_name(field.type_id),
                            self.type_name(vt)
                        );
                        self.error(message, erange);
                    }
                    None if matches!(entry, BraceEntry::Positional(_)) => {
                        self.error(format!("too many initializers for {}", self.type_name(target)), erange);
                    }
                    _ => {}
                }
            }
            return target;
        }

        if self.types.lookup("json") == Some(target) {
            for entry in entries {
                if let BraceEntry::Keyed { key, value } = entry {
                    let kt = self.resolve_expr(*key, Some(TypeId::STRING));
                    if kt != TypeId::STRING && kt != TypeId::INVALID {
                        let krange = self.expr_range(*key);
                        self.error("json object keys must be strings", krange);
                    }
                    self.resolve_expr(*value, None);
                } else {
                    self.resolve_entry_values(entry);
                }
            }
            return target;
        }

        let elems = match self.types.kind(target) {
            Some(TypeKind::Tuple(elems)) => Some(elems.clone()),
            _ if target == TypeId::VECTOR => Some(vec![TypeId::FLOAT; 3]),
            _ => None,
        };
        let Some(elems) = elems else {
            for entry in entries {
                self.resolve_entry_values(entry);
            }
            self.error(format!("type {} cannot be brace-initialized", self.type_name(target)), range);
            return TypeId::INVALID;
        };
        if entries.len() != elems.len() {
            let message = format!(
                "{} needs {} initializers, found {}",
                self.type_name(target),
                elems.len(),
                entries.len()
            );
            self.error(message, range);
        }
        for (i, entry) in entries.iter().enumerate() {
            let BraceEntry::Positional(value) = entry else {
                self.resolve_entry_values(entry);
                self.error("only positional initializers are allowed here", range);
                continue;
            };
            let hint = elems.get(i).copied();
            let vt = self.resolve_expr(*value, hint);
            if let Some(et) = hint {
                if !self.types.is_convertible(vt, et) {
                    let vrange = self.expr_range(*value);
                    let message = format!("expected {}, found {}", self.type_name(et), self.type_name(vt));
                    self.error(message, vrange);
                }
            }
        }
        target
    }

    fn resolve_entry_values(&mut self, entry: &BraceEntry) {
        match entry {
            BraceEntry::Positional(value) | BraceEntry::Designated { value, .. } => {
                self.resolve_expr(*value, None);
            }
            BraceEntry::Keyed { key, value } => {
                self.resolve_expr(*key, None);
                self.resolve_expr(*value, None);
            }
        }
    }

    fn can_cast(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || from == TypeId::INVALID || to == TypeId::INVALID {
            return true;
        }
        if from.is_numeric() && to.is_numeric() {
            return true;
        }
        let newtype_of = |t: TypeId| match self.types.kind(t) {
            Some(TypeKind::Newtype { inner, .. }) => Some(*inner),
            _ => None,
        };
        newtype_of(from) == Some(to) || newtype_of(to) == Some(from)
    }

    /// True for literals, constants and operators applied to them.
    pub(crate) fn is_constant(&self, id: ExprId) -> bool {
        match &self.ast.expr(id).kind {
            ExprKind::Literal(_) => true,
            ExprKind::Grouping(inner) => self.is_constant(*inner),
            ExprKind::Unary { op, expr } => {
                !matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) && self.is_constant(*expr)
            }
            ExprKind::Binary { lhs, rhs, .. } => self.is_constant(*lhs) && self.is_constant(*rhs),
            ExprKind::VectorLit(xyz) => xyz.iter().all(|&e| self.is_constant(e)),
            ExprKind::Ident(name) => self
                .env
                .lookup(name)
                .is_some_and(|s| s.is_constant && s.kind != SymbolKind::Function),
            ExprKind::Path { .. } => self.ast.expr(id).decl.is_some_and(|decl| {
                self.modules
                    .values()
                    .flat_map(|m| m.values())
                    .any(|s| s.decl == decl && s.is_constant)
            }),
            _ => false,
        }
    }
}

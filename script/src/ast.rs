//! Script syntax tree.
//!
//! Nodes live in per-script arenas and refer to each other by index. The
//! resolver fills in `type_id`, `decl` and `env` in place; tooling only reads.

use smallvec::SmallVec;

use crate::env::Env;
use crate::token::{SourcePosition, SourceRange};
use crate::types::TypeId;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(ExprId);
arena_id!(StmtId);
arena_id!(DeclId);
arena_id!(ScriptId);

/// A declaration in a particular script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub script: ScriptId,
    pub id: DeclId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f32),
    String(String),
    ObjectSelf,
    ObjectInvalid,
    LocationInvalid,
    Json(JsonConst),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonConst {
    Null,
    False,
    True,
    Object,
    Array,
    String,
}

impl JsonConst {
    pub fn name(self) -> &'static str {
        match self {
            JsonConst::Null => "JSON_NULL",
            JsonConst::False => "JSON_FALSE",
            JsonConst::True => "JSON_TRUE",
            JsonConst::Object => "JSON_OBJECT",
            JsonConst::Array => "JSON_ARRAY",
            JsonConst::String => "JSON_STRING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            UShr => ">>>",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            And => "&&",
            Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Text(String),
    Expr(ExprId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceEntry {
    Positional(ExprId),
    /// `name = value`
    Designated { name: String, range: SourceRange, value: ExprId },
    /// `"key": value`
    Keyed { key: ExprId, value: ExprId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    /// `alias.name` where `alias` names an import
    Path {
        module: String,
        name: String,
        name_range: SourceRange,
    },
    Call {
        callee: ExprId,
        args: SmallVec<[ExprId; 4]>,
        /// Positions of the separating commas
        commas: Vec<SourcePosition>,
        open: SourcePosition,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Postfix {
        op: PostfixOp,
        expr: ExprId,
    },
    /// `op` is `None` for plain `=`
    Assign {
        op: Option<BinaryOp>,
        lhs: ExprId,
        rhs: ExprId,
    },
    Grouping(ExprId),
    Dot {
        lhs: ExprId,
        member: String,
        member_range: SourceRange,
    },
    Tuple(Vec<ExprId>),
    Index {
        base: ExprId,
        index: ExprId,
    },
    Lambda {
        params: Vec<DeclId>,
        ret: TypeRef,
        body: StmtId,
    },
    FString(Vec<FStringPart>),
    BraceInit(Vec<BraceEntry>),
    Cast {
        expr: ExprId,
        ty: TypeRef,
    },
    Conditional {
        cond: ExprId,
        then: ExprId,
        otherwise: ExprId,
    },
    VectorLit([ExprId; 3]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
    pub type_id: TypeId,
    /// Declaration an identifier, path or member resolved to
    pub decl: Option<DeclRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Builtin(TypeId),
    /// `struct Name`
    Struct(String),
    /// Engine structure, alias, newtype, opaque or sum type
    Named(String),
    Tuple(Vec<TypeRef>),
    /// Pattern bindings take their type from the variant
    Inferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    pub range: SourceRange,
}

impl TypeRef {
    pub fn builtin(id: TypeId, range: SourceRange) -> Self {
        Self {
            name: TypeName::Builtin(id),
            range,
        }
    }

    pub fn inferred(range: SourceRange) -> Self {
        Self {
            name: TypeName::Inferred,
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Expr(ExprId),
    Decl(DeclId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Case(ExprId),
    /// `case Variant(a, b):`
    Pattern {
        variant: String,
        variant_range: SourceRange,
        bindings: Vec<DeclId>,
    },
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Jump {
    Break,
    Continue,
    Return(Option<ExprId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
    If {
        cond: ExprId,
        then: StmtId,
        otherwise: Option<StmtId>,
    },
    For {
        init: Option<ForInit>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    ForEach {
        var: DeclId,
        iterable: ExprId,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    Switch {
        target: ExprId,
        body: StmtId,
    },
    Label(Label),
    Jump(Jump),
    Decl(DeclId),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
    /// Names visible at this statement
    pub env: Option<Env>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Var {
        ty: TypeRef,
        is_const: bool,
        init: Option<ExprId>,
    },
    Param {
        ty: TypeRef,
        is_const: bool,
        default: Option<ExprId>,
    },
    Function {
        ret: TypeRef,
        params: Vec<DeclId>,
        body: Option<StmtId>,
    },
    Struct {
        fields: Vec<DeclId>,
    },
    Field {
        ty: TypeRef,
    },
    /// `int a, b = 2;`
    DeclList(Vec<DeclId>),
    TypeAlias {
        target: TypeRef,
    },
    Newtype {
        inner: TypeRef,
    },
    Opaque,
    Sum {
        variants: Vec<DeclId>,
    },
    Variant {
        payload: Vec<TypeRef>,
    },
    Import {
        path: Vec<String>,
    },
    FromImport {
        path: Vec<String>,
        names: Vec<(String, SourceRange)>,
    },
    Define {
        value: ExprId,
    },
    Include {
        target: String,
    },
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub range: SourceRange,
    /// Empty for decl lists, includes and from-imports
    pub name: String,
    pub name_range: SourceRange,
    /// Comment lines directly above the declaration
    pub comment: Option<String>,
    pub type_id: TypeId,
    pub env: Option<Env>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Include,
    Import,
}

/// An `#include` or `import` to be loaded before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub kind: DependencyKind,
    /// Resource name of the target script
    pub name: String,
    pub range: SourceRange,
    pub decl: DeclId,
}

/// A source comment, kept for attachment to declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub range: SourceRange,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub decls: Vec<Decl>,
    /// Top-level declarations in source order
    pub top: Vec<DeclId>,
    pub dependencies: Vec<Dependency>,
    pub comments: Vec<Comment>,
    /// Byte offset of each line start
    pub line_map: Vec<usize>,
}

impl Ast {
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn add_expr(&mut self, kind: ExprKind, range: SourceRange) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind,
            range,
            type_id: TypeId::INVALID,
            decl: None,
        });
        id
    }

    pub fn add_stmt(&mut self, kind: StmtKind, range: SourceRange) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt {
            kind,
            range,
            env: None,
        });
        id
    }

    pub fn add_decl(&mut self, kind: DeclKind, name: String, name_range: SourceRange, range: SourceRange) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl {
            kind,
            range,
            name,
            name_range,
            comment: None,
            type_id: TypeId::INVALID,
            env: None,
        });
        id
    }

    /// Declarations with a name a user can refer to, flattening decl lists.
    pub fn named_top_level(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.top.iter().flat_map(move |&id| match &self.decl(id).kind {
            DeclKind::DeclList(items) => items.clone(),
            _ => vec![id],
        })
    }

    /// Attaches runs of comment lines that end on the line right above a
    /// declaration.
    pub fn attach_comments(&mut self) {
        if self.comments.is_empty() {
            return;
        }
        for i in 0..self.decls.len() {
            let decl_line = self.decls[i].range.start.line;
            let mut idx = self.comments.partition_point(|c| c.range.end.line < decl_line);
            let mut line = decl_line;
            let mut parts = Vec::new();
            while idx > 0 {
                let comment = &self.comments[idx - 1];
                if comment.range.end.line + 1 != line {
                    break;
                }
                parts.push(comment.text.as_str());
                line = comment.range.start.line;
                idx -= 1;
            }
            if !parts.is_empty() {
                parts.reverse();
                self.decls[i].comment = Some(parts.join("\n"));
            }
        }
    }
}

/// Strips comment markers and surrounding whitespace.
pub fn comment_text(raw: &str) -> String {
    let body = if let Some(rest) = raw.strip_prefix("//") {
        rest
    } else {
        raw.strip_prefix("/*")
            .map(|r| r.strip_suffix("*/").unwrap_or(r))
            .unwrap_or(raw)
    };
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(line: usize) -> SourceRange {
        SourceRange::new(SourcePosition::new(line, 0), SourcePosition::new(line, 5))
    }

    #[test]
    fn test_attach_comments() {
        let mut ast = Ast::default();
        ast.comments = vec![
            Comment { range: range(0), text: "stray".into() },
            Comment { range: range(2), text: "first".into() },
            Comment { range: range(3), text: "second".into() },
        ];
        let decl = ast.add_decl(DeclKind::Opaque, "T".into(), range(4), range(4));
        let bare = ast.add_decl(DeclKind::Opaque, "U".into(), range(6), range(6));
        ast.attach_comments();
        assert_eq!(ast.decl(decl).comment.as_deref(), Some("first\nsecond"));
        assert_eq!(ast.decl(bare).comment, None);
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(comment_text("// hello "), "hello");
        assert_eq!(comment_text("/* block */"), "block");
    }
}

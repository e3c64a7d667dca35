//! Script toolchain.
//!
//! Source text goes through the [`lexer`] and [`parser`] into an arena
//! [`ast::Ast`]. A [`Context`] loads scripts through the resource manager,
//! follows `#include` and `import` edges and runs the [`resolver`], which
//! binds names, checks types and leaves an environment snapshot on every
//! node. The [`tooling`] module answers editor queries from those
//! snapshots without touching the tree.

pub mod ast;
pub mod context;
pub mod diagnostic;
pub mod env;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod resolver;
pub mod script;
pub mod token;
pub mod tooling;
pub mod types;
pub mod visit;

pub use context::{Context, DiagnosticSink};
pub use diagnostic::{Diagnostic, DiagnosticType, Diagnostics, Severity};
pub use env::{Env, Symbol, SymbolKind};
pub use parser::{ParseOptions, parse};
pub use printer::AstPrinter;
pub use script::Script;
pub use token::{SourcePosition, SourceRange};
pub use tooling::{CompletionItem, InlayHint, SignatureHelp, SymbolInfo};
pub use types::{TypeId, TypeTable};

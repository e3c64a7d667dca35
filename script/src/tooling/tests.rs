use tempfile::TempDir;

use super::*;
use crate::ast::{DeclRef, ScriptId};
use crate::token::{SourcePosition, SourceRange};
use rollkit_shared::Config;

fn context_with(files: &[(&str, &str)]) -> (TempDir, Context) {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        std::fs::write(dir.path().join(name), text).unwrap();
    }
    let ctx = Context::new(&Config::default(), &[dir.path().to_path_buf()]);
    (dir, ctx)
}

fn resolved(ctx: &mut Context, src: &str) -> ScriptId {
    let id = ctx.parse_source("test", src);
    ctx.resolve(id);
    let script = ctx.script(id);
    assert_eq!(script.errors(), 0, "{:?}", script.diagnostics.as_slice());
    id
}

fn everything() -> SourceRange {
    SourceRange::new(SourcePosition::new(0, 0), SourcePosition::new(100, 0))
}

#[test]
fn test_locate_global_from_function_body() {
    let (_dir, mut ctx) = context_with(&[]);
    let id = resolved(&mut ctx, "int x; void main(){ x = 1; }");
    let script = ctx.script(id);

    let info = script.locate_symbol(&ctx, "x", 0, 20).unwrap();
    assert_eq!(info.kind, SymbolKind::Variable);
    assert_eq!(info.decl, DeclRef { script: id, id: script.ast.top[0] });
    assert_eq!(info.type_name, "int");
    assert_eq!(info.provider, "test");
    assert!(info.view.contains('x'));

    assert!(script.locate_symbol(&ctx, "y", 0, 20).is_none());
}

#[test]
fn test_locate_declaration_names_itself() {
    let (_dir, mut ctx) = context_with(&[]);
    let src = "struct Point { int a; int b; };\n\
               int Add(int x, int y) { return x + y; }\n\
               void main() { struct Point p; int total = Add(p.a, p.b); }";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    let mut checked = 0;
    for (i, decl) in script.ast.decls.iter().enumerate() {
        if decl.name.is_empty() {
            continue;
        }
        let at = decl.name_range.start;
        let info = script.locate_symbol(&ctx, &decl.name, at.line, at.column).unwrap();
        assert_eq!(info.decl.id.index(), i, "locating '{}'", decl.name);
        checked += 1;
    }
    assert_eq!(checked, 9);
}

#[test]
fn test_locate_members_and_includes() {
    let (_dir, mut ctx) = context_with(&[("inc_math.nss", "// Doubles a value.\nint Double(int x) { return x * 2; }")]);
    let src = "#include \"inc_math\"\n\
               struct P { int a; };\n\
               void main() { struct P p; int d = Double(p.a); }";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    // "void main() { struct P p; int d = " is 34 columns.
    let double = script.locate_symbol(&ctx, "Double", 2, 34).unwrap();
    assert_eq!(double.kind, SymbolKind::Function);
    assert_eq!(double.provider, "inc_math");
    assert_eq!(double.type_name, "int");
    assert_eq!(double.comment.as_deref(), Some("Doubles a value."));

    let field = script.locate_symbol(&ctx, "a", 2, 43).unwrap();
    assert_eq!(field.kind, SymbolKind::Field);
    assert_eq!(field.provider, "test");
}

#[test]
fn test_inlay_hints() {
    let (_dir, mut ctx) = context_with(&[]);
    let src = "int Add(int x, int y) { return x + y; }\n\
               void main() { int y = 1; int t = Add(2, y); }";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    let hints = script.inlay_hints(&ctx, everything());
    assert_eq!(
        hints,
        vec![InlayHint {
            position: SourcePosition::new(1, 37),
            label: "x:".into(),
        }]
    );

    let first_line = SourceRange::new(SourcePosition::new(0, 0), SourcePosition::new(0, 40));
    assert!(script.inlay_hints(&ctx, first_line).is_empty());
}

#[test]
fn test_complete_locals_and_globals() {
    let (_dir, mut ctx) = context_with(&[]);
    let src = "int g_count;\nvoid main() {\n    int local = 1;\n    \n}\n";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    let labels = |items: Vec<CompletionItem>| items.into_iter().map(|i| i.label).collect::<Vec<_>>();

    assert_eq!(labels(script.complete_at(&ctx, "lo", 3, 4, false)), vec!["local"]);
    assert_eq!(labels(script.complete_at(&ctx, "gc", 3, 4, false)), vec!["g_count"]);
    assert_eq!(
        labels(script.complete_at(&ctx, "", 3, 4, true)),
        vec!["g_count", "local", "main"]
    );
    // Before the declaration the local is not visible yet.
    assert!(labels(script.complete_at(&ctx, "local", 2, 0, false)).is_empty());
    // Outside any function only file-scope names are.
    assert_eq!(labels(script.complete_at(&ctx, "", 0, 0, true)), vec!["g_count", "main"]);

    let main = script.complete_at(&ctx, "mai", 3, 4, false);
    assert_eq!(main[0].kind, SymbolKind::Function);
    assert_eq!(main[0].detail, "void main()");
}

#[test]
fn test_complete_members() {
    let (_dir, mut ctx) = context_with(&[("util_text.nss", "string Shout(string s) { return s + \"!\"; }")]);
    let src = "import util.text as t;\n\
               struct P { int x; float y; };\n\
               void main() {\n    struct P p;\n    vector v;\n    \n}\n";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    let fields = script.complete_at(&ctx, "p.", 5, 4, false);
    assert_eq!(fields.iter().map(|i| i.label.as_str()).collect::<Vec<_>>(), vec!["x", "y"]);
    assert_eq!(fields[1].detail, "float");
    assert!(fields.iter().all(|i| i.kind == SymbolKind::Field && i.decl.is_some()));

    let components = script.complete_at(&ctx, "v.", 5, 4, false);
    assert_eq!(components.len(), 3);
    assert!(components.iter().all(|i| i.decl.is_none()));

    let exports = script.complete_at(&ctx, "t.Sh", 5, 4, false);
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].label, "Shout");
    assert_eq!(exports[0].detail, "string Shout(string s)");
}

#[test]
fn test_signature_help() {
    let (_dir, mut ctx) = context_with(&[]);
    let src = "int Add(int x, int y = 2) { return x + y; }\n\
               void main() { int t = Add(Add(1, 2), 3); }";
    let id = resolved(&mut ctx, src);
    let script = ctx.script(id);

    let inner = script.signature_help(&ctx, 1, 30).unwrap();
    assert_eq!(inner.active_parameter, 0);
    assert!(inner.label.starts_with("int Add("), "{}", inner.label);
    assert_eq!(inner.parameters.len(), 2);
    assert!(inner.parameters[1].contains('y'));

    assert_eq!(script.signature_help(&ctx, 1, 33).unwrap().active_parameter, 1);
    let outer = script.signature_help(&ctx, 1, 37).unwrap();
    assert_eq!(outer.active_parameter, 1);
    assert_eq!(outer.decl, inner.decl);

    assert!(script.signature_help(&ctx, 1, 5).is_none());
}

#[test]
fn test_fuzzy_match() {
    assert!(fuzzy_match("", "anything"));
    assert!(fuzzy_match("gtg", "GetTag"));
    assert!(!fuzzy_match("tg", "Get"));
    assert!(!fuzzy_match("gett", "Get"));
}

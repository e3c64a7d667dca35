//! End-to-end script checks through a [`Context`].

use anyhow::{Result, ensure};
use rollkit_script::ast::DeclRef;
use rollkit_script::{AstPrinter, Context, DiagnosticType, ParseOptions, SymbolKind, parse};
use rollkit_shared::Config;
use tempfile::TempDir;

fn context() -> Result<(TempDir, Context)> {
    let dir = TempDir::new()?;
    let ctx = Context::new(&Config::default(), &[dir.path().to_path_buf()]);
    Ok((dir, ctx))
}

#[test]
fn test_lexer_error_recovery() {
    let (ast, diags) = parse("test", "int x = 1; @ int y = 2;", ParseOptions::default());
    assert_eq!(diags.errors(), 1);
    let diag = &diags.as_slice()[0];
    assert_eq!(diag.kind, DiagnosticType::Lexical);
    assert_eq!(diag.range.start.column, 11);
    let names: Vec<_> = ast.named_top_level().map(|id| ast.decl(id).name.as_str()).collect();
    assert_eq!(names, ["x", "y"]);
}

#[test]
fn test_resolver_redefinition() -> Result<()> {
    let (_dir, mut ctx) = context()?;
    let id = ctx.parse_source("test", "int f(); int f(int x); void main(){}");
    ctx.resolve(id);
    let diags = ctx.script(id).diagnostics.as_slice();
    ensure!(diags.len() == 1, "expected one diagnostic, got {diags:?}");
    assert_eq!(diags[0].kind, DiagnosticType::Semantic);
    assert!(diags[0].message.contains("parameter count"));
    Ok(())
}

#[test]
fn test_locator() -> Result<()> {
    let (_dir, mut ctx) = context()?;
    let id = ctx.parse_source("test", "int x; void main(){ x = 1; }");
    ctx.resolve(id);
    let script = ctx.script(id);
    let info = script.locate_symbol(&ctx, "x", 0, 20).expect("x resolves");
    assert_eq!(
        info.decl,
        DeclRef {
            script: id,
            id: script.ast.top[0]
        }
    );
    assert_eq!(info.kind, SymbolKind::Variable);
    Ok(())
}

#[test]
fn test_call_arity_bounds() -> Result<()> {
    let (_dir, mut ctx) = context()?;
    for required in 0..3usize {
        for defaults in 0..3usize {
            let params: Vec<String> = (0..required)
                .map(|i| format!("int r{i}"))
                .chain((0..defaults).map(|i| format!("int d{i} = {i}")))
                .collect();
            for args in 0..=required + defaults + 1 {
                let call_args = vec!["1"; args].join(", ");
                let src = format!("void f({}) {{}}\nvoid main() {{ f({call_args}); }}", params.join(", "));
                let id = ctx.parse_source("arity", src.as_str());
                ctx.resolve(id);
                let accepted = ctx.script(id).errors() == 0;
                let expected = (required..=required + defaults).contains(&args);
                ensure!(
                    accepted == expected,
                    "required={required} defaults={defaults} args={args}: {:?}",
                    ctx.script(id).diagnostics.as_slice()
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_printed_source_reparses_to_same_text() {
    let sources = [
        "int x = 1, y;\nconst float PI = 3.14159;\n",
        "// header\nstruct Point { int x; int y; };\nint Sum(struct Point p) { return p.x + p.y; }\n",
        "void main() {\n    int i;\n    for (i = 0; i < 10; i++) {\n        if (i % 2 == 0) continue;\n        else break;\n    }\n    switch (i) { case 1: default: break; }\n}\n",
        "void main() { vector v = [1.0, 2.0, 3.0]; string s = f\"v={v.x}\"; int n = -(-1); }\n",
    ];
    for src in sources {
        let (ast, diags) = parse("test", src, ParseOptions::default());
        assert_eq!(diags.errors(), 0, "{src}: {:?}", diags.as_slice());
        let printed = AstPrinter::print(&ast);
        let (reparsed, diags) = parse("test", &printed, ParseOptions::default());
        assert_eq!(diags.errors(), 0, "{printed}: {:?}", diags.as_slice());
        assert_eq!(AstPrinter::print(&reparsed), printed);
    }
}

use super::*;
use crate::diagnostic::Severity;
use crate::parser::{ParseOptions, parse};

struct Resolved {
    ast: Ast,
    diags: Diagnostics,
    types: TypeTable,
    exports: Exports,
}

fn resolve_src(src: &str) -> Resolved {
    let (mut ast, mut diags) = parse("test", src, ParseOptions::default());
    assert_eq!(diags.errors(), 0, "parse errors: {:?}", diags.as_slice());
    let mut types = TypeTable::new();
    let modules = HashMap::new();
    let scope = ResolveScope {
        script: ScriptId(0),
        outer: Rc::new(Exports::new()),
        modules: &modules,
    };
    let exports = resolve(&mut ast, &mut diags, &mut types, scope);
    Resolved {
        ast,
        diags,
        types,
        exports,
    }
}

fn messages(r: &Resolved) -> Vec<String> {
    r.diags.as_slice().iter().map(|d| d.message.clone()).collect()
}

fn assert_clean(src: &str) -> Resolved {
    let r = resolve_src(src);
    assert!(r.diags.is_empty(), "unexpected diagnostics: {:?}", messages(&r));
    r
}

fn assert_error(src: &str, needle: &str) {
    let r = resolve_src(src);
    let msgs = messages(&r);
    assert!(
        msgs.iter().any(|m| m.contains(needle)),
        "expected a diagnostic containing {needle:?}, got {msgs:?}"
    );
}

#[test]
fn test_redeclaration_with_different_arity() {
    let r = resolve_src("int f(); int f(int x); void main(){}");
    assert_eq!(r.diags.len(), 1);
    let diag = &r.diags.as_slice()[0];
    assert_eq!(diag.kind, DiagnosticType::Semantic);
    assert!(diag.message.contains("parameter count"), "{}", diag.message);
}

#[test]
fn test_declaration_then_definition() {
    let r = assert_clean("int add(int a, int b = 2); int add(int a, int b = 2) { return a + b; }");
    let add = &r.exports["add"];
    assert_eq!(add.kind, SymbolKind::Function);
    let sig = add.signature.as_ref().unwrap();
    assert_eq!(sig.required(), 1);
    assert_eq!(sig.params[1].default.as_deref(), Some("2"));
}

#[test]
fn test_signature_mismatches() {
    assert_error("int f(int a); float f(int a) { return 1.0; }", "return type of 'f'");
    assert_error("void f(int a); void f(float a) {}", "type of parameter 'a'");
    assert_error("void f(int a = 1); void f(int a = 2) {}", "default value of parameter 'a'");
    assert_error("void f() {} void f() {}", "already defined");

    let r = resolve_src("void f(int a); void f(int b) {}");
    assert_eq!(r.diags.errors(), 0);
    assert_eq!(r.diags.warnings(), 1);
    assert_eq!(r.diags.as_slice()[0].severity, Severity::Warning);
}

#[test]
fn test_own_initializer() {
    assert_error("void main() { int x = x + 1; }", "'x' is used in its own initializer");
    assert_clean("int x = 1; void main() { int y = x; }");
}

#[test]
fn test_undeclared_and_duplicates() {
    assert_error("void main() { y = 2; }", "undeclared identifier 'y'");
    assert_error("void main() { int a; float a; }", "'a' is already declared in this scope");
    assert_clean("void main() { int a; { float a; } }");
}

#[test]
fn test_control_paths() {
    assert_error("int f(int a) { if (a) return 1; }", "not all control paths of 'f'");
    assert_clean("int f(int a) { if (a) return 1; else return 2; }");
    assert_clean("int f() { while (1) { } }");
    assert_clean("int f(int a) { switch (a) { case 1: return 1; default: return 0; } }");
    assert_error("int f() { while (1) { break; } }", "not all control paths");
}

#[test]
fn test_jumps_and_labels() {
    assert_error("void main() { break; }", "'break' outside of a loop or switch");
    assert_error("void main() { switch (1) { case 1: continue; } }", "'continue' outside of a loop");
    assert_error("void main() { case 1: ; }", "'case' label outside of a switch");
    assert_error("void main() { int b = 2; switch (1) { case b: break; } }", "case label must be a constant");
    assert_error(
        "void main() { switch (1) { default: break; default: break; } }",
        "multiple 'default' labels",
    );
    assert_clean("const int TWO = 2; void main() { for (int i = 0; i < 3; i++) { switch (i) { case TWO: continue; } } }");
}

#[test]
fn test_call_arity() {
    let src = "void f(int a, int b = 1, int c = 2) {}";
    assert_clean(&format!("{src} void main() {{ f(1); f(1, 2); f(1, 2, 3); }}"));
    assert_error(&format!("{src} void main() {{ f(); }}"), "'f' expects 1 to 3 arguments, found 0");
    assert_error(&format!("{src} void main() {{ f(1, 2, 3, 4); }}"), "found 4");
}

#[test]
fn test_action_parameters() {
    let src = "void DelayCommand(float f, action a) {} void g() {}";
    assert_clean(&format!("{src} void main() {{ DelayCommand(1.0, g()); }}"));
    assert_error(&format!("{src} void main() {{ DelayCommand(1.0, 5); }}"), "must be an action");
}

#[test]
fn test_operator_types() {
    let r = assert_clean(
        "vector v = [1.0, 2.0, 3.0]; vector w = v * 2.0; float f = 1 + 2.5; string s = \"a\" + \"b\"; int c = f < 3;",
    );
    assert_eq!(r.exports["w"].type_id, TypeId::VECTOR);
    assert_error("int x = \"a\" * 2;", "invalid operands to '*'");
    assert_error("vector v; vector w = 2.0 / v;", "invalid operands to '/'");
    assert_error("int x = 1.5;", "cannot initialize 'x' of type int with float");
    assert_error("void main() { int a = 1 ? 2 : \"s\"; }", "branches of conditional");
}

#[test]
fn test_structs_and_members() {
    let r = assert_clean(
        "struct P { int x; float y; }; void main() { struct P p; p.x = 1; float y = p.y; vector v; float z = v.z; }",
    );
    assert!(matches!(r.types.kind(r.exports["P"].type_id), Some(TypeKind::Struct { fields, .. }) if fields.len() == 2));
    assert_error("struct P { int x; }; void main() { struct P p; p.q = 1; }", "has no member 'q'");
    assert_error("void main() { struct Q q; }", "unknown struct 'Q'");
    assert_error("struct P { int x; int x; };", "duplicate field 'x'");
}

#[test]
fn test_constants() {
    assert_error("const int C = 1; void main() { C = 2; }", "cannot assign to constant 'C'");
    assert_error("int f() { return 1; } const int C = f();", "initializer of constant 'C' is not constant");
    assert_error("const int C;", "constant 'C' needs an initializer");
    assert_error("int x = 3000000000;", "integer literal out of range");
}

#[test]
fn test_sum_types_and_patterns() {
    let src = "type Shape = Circle(float) | Square(float, float) | Empty;";
    assert_clean(&format!(
        "{src} float area(Shape s) {{ switch (s) {{ case Circle(r): return r * r; case Square(w, h): return w * h; \
         case Empty: return 0.0; default: return 0.0; }} }}"
    ));
    assert_error(
        &format!("{src} void main() {{ Shape s = Empty; switch (s) {{ case Square(w): break; }} }}"),
        "variant 'Square' expects 2 bindings, found 1",
    );
    assert_error(
        &format!("{src} void main() {{ Shape s = Empty; switch (s) {{ case Triangle(a): break; }} }}"),
        "'Triangle' is not a variant",
    );
}

#[test]
fn test_defines_and_engine_structures() {
    let r = assert_clean("#define ENGINE_STRUCTURE_0 effect\n#define PI 3.14\neffect e; float p = PI;");
    let effect = r.types.lookup("effect").unwrap();
    assert_eq!(r.exports["e"].type_id, effect);
    assert!(r.exports["PI"].is_constant);
}

#[test]
fn test_include_collision() {
    let (mut ast, mut diags) = parse("test", "int shared; void main() {}", ParseOptions::default());
    let mut types = TypeTable::new();
    let mut outer = Exports::new();
    outer.insert(
        "shared".to_string(),
        Symbol {
            name: "shared".to_string(),
            kind: SymbolKind::Variable,
            decl: DeclRef {
                script: ScriptId(1),
                id: DeclId(0),
            },
            type_id: TypeId::INT,
            signature: None,
            is_constant: false,
        },
    );
    let modules = HashMap::new();
    let scope = ResolveScope {
        script: ScriptId(0),
        outer: Rc::new(outer),
        modules: &modules,
    };
    resolve(&mut ast, &mut diags, &mut types, scope);
    assert_eq!(diags.len(), 1);
    assert!(diags.as_slice()[0].message.contains("redeclares a symbol from an include"));
}

#[test]
fn test_environment_snapshots() {
    let r = assert_clean("int a; void main() { int b; b = a; }");
    let main = r.ast.named_top_level().find(|&id| r.ast.decl(id).name == "main").unwrap();
    let DeclKind::Function { body: Some(body), .. } = &r.ast.decl(main).kind else {
        panic!("main has no body");
    };
    let StmtKind::Block(stmts) = &r.ast.stmt(*body).kind else {
        panic!("body is not a block");
    };
    let env = r.ast.stmt(stmts[1]).env.as_ref().unwrap();
    assert!(env.lookup("a").is_some());
    assert!(env.lookup("b").is_some());
    let first = r.ast.stmt(stmts[0]).env.as_ref().unwrap();
    assert!(first.lookup("b").is_none());
}

#[test]
fn test_lambdas_and_tuples() {
    assert_clean("(int, float) t = (1, 2.0); float y = t[1];");
    assert_error("(int, float) t = (1, 2.0); int i = 0; float y = t[i];", "tuple index must be a constant");
    assert_clean("void main() { int k = fn(int a): int { return a * 2; }(2); }");
    assert_error("void main() { int k = fn(int a): int { return a * 2; }(); }", "expects 1 arguments, found 0");
}

//! Script context: owns scripts, the shared type table and the resource
//! manager scripts are loaded through.

use std::path::PathBuf;
use std::rc::Rc;

use hashbrown::HashMap;
use rollkit_resources::{Directory, ResourceManager};
use rollkit_shared::{Config, Resource, ResourceType};

use crate::ast::{DeclRef, DependencyKind, ScriptId};
use crate::diagnostic::{Diagnostic, DiagnosticType, Diagnostics};
use crate::env::Exports;
use crate::parser::{self, ParseOptions};
use crate::resolver::{self, ResolveScope};
use crate::script::Script;
use crate::types::TypeTable;

pub type DiagnosticSink = Box<dyn FnMut(&Diagnostic)>;

pub struct Context {
    resman: ResourceManager,
    options: ParseOptions,
    error_limit: usize,
    scripts: Vec<Script>,
    by_name: HashMap<String, ScriptId>,
    command_script: Option<ScriptId>,
    types: TypeTable,
    /// Scripts currently being resolved, innermost last
    resolving: Vec<ScriptId>,
    sink: DiagnosticSink,
}

impl Context {
    /// Creates a context that finds scripts in `include_paths` and the
    /// configured include paths, then loads the command script.
    pub fn new(config: &Config, include_paths: &[PathBuf]) -> Self {
        let mut resman = ResourceManager::new(config);
        for path in include_paths.iter().chain(&config.script.include_paths) {
            let dir = Directory::new(path);
            if !resman.add_custom_container(Box::new(dir), ResourceType::NSS) {
                tracing::warn!(path = %path.display(), "script include path not mounted");
            }
        }
        resman.build_registry();

        let mut ctx = Self {
            resman,
            options: ParseOptions::from_config(&config.script),
            error_limit: config.script.error_limit,
            scripts: Vec::new(),
            by_name: HashMap::new(),
            command_script: None,
            types: TypeTable::new(),
            resolving: Vec::new(),
            sink: Box::new(|diag| log::debug!("{diag}")),
        };

        let command = config.script.command_script.as_str();
        if !command.is_empty() {
            match ctx.load(command) {
                Some(id) => {
                    ctx.command_script = Some(id);
                    ctx.resolve(id);
                }
                None => tracing::info!(script = command, "no command script found"),
            }
        }
        ctx
    }

    /// Installs the callback that receives every diagnostic.
    pub fn set_diagnostic_sink(&mut self, sink: impl FnMut(&Diagnostic) + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn resman(&self) -> &ResourceManager {
        &self.resman
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn command_script(&self) -> Option<&Script> {
        self.command_script.map(|id| self.script(id))
    }

    pub fn script(&self, id: ScriptId) -> &Script {
        &self.scripts[id.index()]
    }

    pub fn script_by_name(&self, name: &str) -> Option<&Script> {
        self.by_name.get(&name.to_ascii_lowercase()).map(|&id| self.script(id))
    }

    /// The declaration a reference points at, with the script holding it.
    pub fn declaration(&self, decl: DeclRef) -> (&Script, &crate::ast::Decl) {
        let script = self.script(decl.script);
        (script, script.ast.decl(decl.id))
    }

    /// Parses `text` as script `name`. A cached script of the same name is
    /// replaced and every script must be resolved again.
    pub fn parse_source(&mut self, name: &str, text: impl Into<String>) -> ScriptId {
        let name = name.to_ascii_lowercase();
        let text = text.into();
        let (ast, diags) = parser::parse(&name, &text, self.options);
        for diag in diags.as_slice() {
            (self.sink)(diag);
        }

        match self.by_name.get(&name) {
            Some(&id) => {
                tracing::debug!(script = %name, "replacing cached script");
                self.scripts[id.index()] = Script::new(id, name, text, ast, diags);
                for script in &mut self.scripts {
                    script.resolved = false;
                }
                id
            }
            None => {
                let id = ScriptId(self.scripts.len() as u32);
                self.scripts.push(Script::new(id, name.clone(), text, ast, diags));
                self.by_name.insert(name, id);
                id
            }
        }
    }

    /// Returns the cached script `name`, loading it through the resource
    /// manager on first use.
    pub fn load(&mut self, name: &str) -> Option<ScriptId> {
        let key = name.to_ascii_lowercase();
        if let Some(&id) = self.by_name.get(&key) {
            return Some(id);
        }
        let data = self.resman.demand(Resource::new(key.as_str(), ResourceType::NSS));
        if data.bytes.is_empty() {
            return None;
        }
        let text = match data.bytes.as_str() {
            Some(text) => text.to_string(),
            None => String::from_utf8_lossy(data.bytes.as_slice()).into_owned(),
        };
        Some(self.parse_source(&key, text))
    }

    /// Resolves a script and everything it depends on. Returns false if the
    /// script is part of an include cycle still being resolved.
    pub fn resolve(&mut self, id: ScriptId) -> bool {
        if self.scripts[id.index()].resolved {
            return true;
        }
        if self.resolving.contains(&id) {
            return false;
        }
        self.resolving.push(id);

        let mut outer = Exports::new();
        if let Some(command) = self.command_script.filter(|&c| c != id) {
            self.resolve(command);
            let exports = self.scripts[command.index()].exports.clone();
            outer.extend(exports.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut extra = Diagnostics::new(self.scripts[id.index()].name.clone(), self.error_limit);
        let mut includes = Vec::new();
        let mut modules: HashMap<String, Rc<Exports>> = HashMap::new();
        let dependencies = self.scripts[id.index()].ast.dependencies.clone();
        for dep in dependencies {
            let what = match dep.kind {
                DependencyKind::Include => "include file",
                DependencyKind::Import => "module",
            };
            let Some(dep_id) = self.load(&dep.name) else {
                extra.error(
                    DiagnosticType::Semantic,
                    format!("unable to locate {what} '{}'", dep.name),
                    dep.range,
                );
                continue;
            };
            if dep_id == id || self.resolving.contains(&dep_id) {
                extra.error(DiagnosticType::Semantic, format!("recursive include of '{}'", dep.name), dep.range);
                continue;
            }
            self.resolve(dep_id);
            let exports = self.scripts[dep_id.index()].exports.clone();
            match dep.kind {
                DependencyKind::Include => {
                    outer.extend(exports.iter().map(|(k, v)| (k.clone(), v.clone())));
                    includes.push(dep_id);
                }
                DependencyKind::Import => {
                    modules.insert(dep.name.clone(), exports);
                }
            }
        }

        let script = &mut self.scripts[id.index()];
        let mut ast = std::mem::take(&mut script.ast);
        let mut diags = script.parse_diagnostics.clone();
        for diag in extra.as_slice() {
            diags.error(diag.kind, diag.message.clone(), diag.range);
        }
        let reported = script.parse_diagnostics.len();

        let outer = Rc::new(outer);
        let scope = ResolveScope {
            script: id,
            outer: outer.clone(),
            modules: &modules,
        };
        let mut exports = resolver::resolve(&mut ast, &mut diags, &mut self.types, scope);
        for &include in &includes {
            for (name, symbol) in self.scripts[include.index()].exports.iter() {
                exports.entry(name.clone()).or_insert_with(|| symbol.clone());
            }
        }

        for diag in &diags.as_slice()[reported.min(diags.len())..] {
            (self.sink)(diag);
        }
        tracing::debug!(
            script = %self.scripts[id.index()].name,
            errors = diags.errors(),
            warnings = diags.warnings(),
            "resolved"
        );

        let script = &mut self.scripts[id.index()];
        script.ast = ast;
        script.diagnostics = diags;
        script.includes = includes;
        script.exports = Rc::new(exports);
        script.resolved = true;
        self.resolving.pop();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn context_with(files: &[(&str, &str)]) -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            std::fs::write(dir.path().join(name), text).unwrap();
        }
        let ctx = Context::new(&Config::default(), &[dir.path().to_path_buf()]);
        (dir, ctx)
    }

    #[test]
    fn test_command_script_is_visible() {
        let (_dir, mut ctx) = context_with(&[(
            "nwscript.nss",
            "#define ENGINE_STRUCTURE_0 effect\nint TRUE = 1;\nvoid PrintString(string s);\neffect EffectHeal(int n);",
        )]);
        assert!(ctx.command_script().is_some());
        let id = ctx.parse_source("test", "void main() { PrintString(\"hi\"); effect e = EffectHeal(TRUE); }");
        ctx.resolve(id);
        let script = ctx.script(id);
        assert_eq!(script.errors(), 0, "{:?}", script.diagnostics.as_slice());
    }

    #[test]
    fn test_includes_and_imports() {
        let (_dir, mut ctx) = context_with(&[
            ("inc_math.nss", "int Double(int x) { return x * 2; }"),
            ("util_text.nss", "string Shout(string s) { return s + \"!\"; }"),
        ]);
        let id = ctx.parse_source(
            "main",
            "#include \"inc_math\"\nimport util.text as t;\nvoid main() { int x = Double(2); string s = t.Shout(\"a\"); }",
        );
        ctx.resolve(id);
        let script = ctx.script(id);
        assert_eq!(script.errors(), 0, "{:?}", script.diagnostics.as_slice());
        assert!(script.exports.contains_key("Double"));
        assert!(!script.exports.contains_key("Shout"));
        assert_eq!(script.includes.len(), 1);
    }

    #[test]
    fn test_missing_and_recursive_includes() {
        let (_dir, mut ctx) = context_with(&[
            ("inc_a.nss", "#include \"inc_b\"\nint a;"),
            ("inc_b.nss", "#include \"inc_a\"\nint b;"),
        ]);
        let id = ctx.parse_source("main", "#include \"inc_missing\"\n#include \"inc_a\"\nvoid main() {}");
        ctx.resolve(id);
        let messages: Vec<_> = ctx.script(id).diagnostics.as_slice().iter().map(|d| d.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("unable to locate include file 'inc_missing'")));
        let inc_b = ctx.script_by_name("inc_b").unwrap();
        assert!(inc_b.diagnostics.as_slice().iter().any(|d| d.message.contains("recursive include")));
    }

    #[test]
    fn test_sink_receives_diagnostics() {
        let (_dir, mut ctx) = context_with(&[]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        ctx.set_diagnostic_sink(move |d| sink.borrow_mut().push(d.message.clone()));
        let id = ctx.parse_source("bad", "void main() { undefined_name = 1; }");
        ctx.resolve(id);
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].contains("undeclared identifier"));
    }

    #[test]
    fn test_parse_source_replaces_cached_script() {
        let (_dir, mut ctx) = context_with(&[]);
        let first = ctx.parse_source("Same", "int a;");
        ctx.resolve(first);
        let second = ctx.parse_source("same", "int b;");
        assert_eq!(first, second);
        assert!(!ctx.script(second).resolved);
        ctx.resolve(second);
        assert!(ctx.script(second).exports.contains_key("b"));
        assert!(!ctx.script(second).exports.contains_key("a"));
    }
}

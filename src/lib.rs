//! `less_core`: a sandboxed LESS-to-CSS evaluator (spec §1-§5), plus the
//! host-facing `Compiler` (spec §6.1) that wires the parser, evaluator, and
//! formatter together and adds file/cache plumbing around them.
//!
//! Each module keeps the teacher's one-concern-per-file split: value model,
//! scope stack, parser, block compiler (+ its reducer/expr/mixin siblings),
//! function library, formatter, and cache are all separate files rather
//! than one large evaluator module.

pub mod cache;
pub mod color;
pub mod compiler;
pub mod env;
pub mod error;
pub mod expr;
pub mod formatter;
pub mod functions;
pub mod import;
pub mod mixin;
pub mod output;
pub mod parser;
pub mod reducer;
pub mod trace;
pub mod tree;
pub mod value;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use cache::CacheRecord;
use error::{ErrorKind, EvalError, EvalResult};
use formatter::{Formatter, FormatterStyle};
use functions::{FunctionRegistry, UserFn};
use trace::{EvalTracer, NoopTracer};
use tree::BlockArena;
use value::Value;

/// `compile_file`'s return shape (spec §6.1: `css_or_bytes_written`) — a
/// CSS string when no output path was given, the byte count written
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutput {
    Css(String),
    BytesWritten(usize),
}

impl CompileOutput {
    /// Unwraps the `Css` variant, for callers that know `out_path` was
    /// `None`.
    #[must_use]
    pub fn into_css(self) -> Option<String> {
        match self {
            CompileOutput::Css(s) => Some(s),
            CompileOutput::BytesWritten(_) => None,
        }
    }
}

/// The public entry point (spec §6.1). One instance holds every piece of
/// per-host state a compile needs: registered functions/variables, import
/// search path, output style, and the in-memory half of the cached-compile
/// dependency ledger.
pub struct Compiler {
    pub import_dirs: Vec<PathBuf>,
    pub functions: FunctionRegistry,
    pub variables: HashMap<String, Value>,
    pub formatter: Formatter,
    pub preserve_comments: bool,
    pub imports_enabled: bool,
    all_parsed_files: HashMap<PathBuf, SystemTime>,
    /// In-memory half of the `cached_compile` ledger, keyed by the input
    /// path as given. `checked_cached_compile` additionally persists (and,
    /// on a fresh `Compiler`, reloads) the `<out>.meta` sidecar on disk —
    /// see `cached_compile`'s doc comment for why a bare `cached_compile`
    /// call never touches disk itself.
    cache: HashMap<PathBuf, CacheRecord>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            import_dirs: Vec::new(),
            functions: FunctionRegistry::new(),
            variables: HashMap::new(),
            formatter: Formatter::new(FormatterStyle::default()),
            preserve_comments: false,
            imports_enabled: true,
            all_parsed_files: HashMap::new(),
            cache: HashMap::new(),
        }
    }
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `compile(source, name?) -> css_string` (spec §6.1).
    pub fn compile(&mut self, source: &str, name: Option<&str>) -> EvalResult<String> {
        let name = name.unwrap_or("<input>").to_string();
        let mut arena = BlockArena::new();
        let mut parser = parser::Parser::new(source);
        let root = parser.parse_into(&mut arena, 0)?;

        let mut tracer: NoopTracer = NoopTracer;
        let mut evaluator = compiler::Evaluator::new(
            arena,
            name,
            source.to_string(),
            &self.functions,
            &self.variables,
            self.import_dirs.clone(),
            self.imports_enabled,
            &mut tracer,
            self.preserve_comments,
        );
        let out_root = evaluator.compile_root(root)?;
        self.all_parsed_files = evaluator.all_parsed_files.clone();
        Ok(self.formatter.format(&evaluator.output, out_root))
    }

    /// `compile_file(in_path, out_path?) -> css_or_bytes_written` (spec
    /// §6.1).
    pub fn compile_file(&mut self, in_path: &Path, out_path: Option<&Path>) -> EvalResult<CompileOutput> {
        let source = fs::read_to_string(in_path)
            .map_err(|e| EvalError::new(ErrorKind::Import, format!("could not read {}: {e}", in_path.display())))?;
        let css = self.compile(&source, Some(&in_path.display().to_string()))?;
        self.all_parsed_files.insert(in_path.to_path_buf(), mtime(in_path));

        match out_path {
            Some(p) => {
                fs::write(p, &css)
                    .map_err(|e| EvalError::new(ErrorKind::Import, format!("could not write {}: {e}", p.display())))?;
                Ok(CompileOutput::BytesWritten(css.len()))
            }
            None => Ok(CompileOutput::Css(css)),
        }
    }

    /// `checked_compile(in_path, out_path) -> bool` (spec §6.1): recompiles
    /// iff `in_path` is newer than `out_path` (or `out_path` doesn't exist
    /// yet), returning whether a recompile happened.
    pub fn checked_compile(&mut self, in_path: &Path, out_path: &Path) -> EvalResult<bool> {
        let stale = match (fs::metadata(in_path).and_then(|m| m.modified()), fs::metadata(out_path).and_then(|m| m.modified())) {
            (Ok(input), Ok(output)) => input > output,
            _ => true,
        };
        if !stale {
            return Ok(false);
        }
        self.compile_file(in_path, Some(out_path))?;
        Ok(true)
    }

    /// `cached_compile(input, force?) -> cache_record` (spec §6.1). Checks
    /// the in-memory ledger only — it never reads or writes a `.meta`
    /// sidecar itself, since `cached_compile` has no `out_path` to name one
    /// after; `checked_cached_compile` is the entry point that persists the
    /// ledger to disk and seeds it back from a prior run.
    pub fn cached_compile(&mut self, input: &Path, force: bool) -> EvalResult<CacheRecord> {
        if let Some(existing) = self.cache.get(input) {
            if !existing.is_stale(force) {
                let mut record = existing.clone();
                record.updated = false;
                return Ok(record);
            }
        }

        let css = self.compile_file(input, None)?.into_css().unwrap_or_default();
        let mut files: HashMap<PathBuf, cache::Mtime> = HashMap::new();
        files.insert(input.to_path_buf(), cache::mtime_of(input));
        for path in self.all_parsed_files.keys() {
            files.insert(path.clone(), cache::mtime_of(path));
        }

        let record = CacheRecord { root: input.to_path_buf(), files, compiled: Some(css), updated: true };
        self.cache.insert(input.to_path_buf(), record.clone());
        Ok(record)
    }

    /// `checked_cached_compile(in_path, out_path, force?) -> css` (spec
    /// §6.1): writes the compiled CSS and a `<out>.meta` sidecar holding the
    /// cache record without its `compiled` field.
    pub fn checked_cached_compile(&mut self, in_path: &Path, out_path: &Path, force: bool) -> EvalResult<String> {
        let meta_path = cache::meta_path_for(out_path);
        if !self.cache.contains_key(in_path) {
            if let Some(previous) = cache::load_meta(&meta_path) {
                self.cache.insert(in_path.to_path_buf(), previous);
            }
        }

        let record = self.cached_compile(in_path, force)?;
        let css = record.compiled.clone().unwrap_or_default();
        if record.updated {
            fs::write(out_path, &css)
                .map_err(|e| EvalError::new(ErrorKind::Import, format!("could not write {}: {e}", out_path.display())))?;
            cache::save_meta(&meta_path, &record)
                .map_err(|e| EvalError::new(ErrorKind::Import, format!("could not write {}: {e}", meta_path.display())))?;
        }
        Ok(css)
    }

    /// `set_formatter(name)` (spec §6.1): `"compressed" | "classic" |
    /// "lessjs"`.
    pub fn set_formatter(&mut self, name: &str) -> Result<(), String> {
        self.formatter = Formatter::new(name.parse()?);
        Ok(())
    }

    pub fn set_preserve_comments(&mut self, preserve: bool) {
        self.preserve_comments = preserve;
    }

    pub fn set_imports_enabled(&mut self, enabled: bool) {
        self.imports_enabled = enabled;
    }

    /// `register_function(name, callable)` (spec §6.1).
    pub fn register_function(&mut self, name: impl Into<String>, f: UserFn) {
        self.functions.register(name, f);
    }

    /// `unregister_function(name)` (spec §6.1).
    pub fn unregister_function(&mut self, name: &str) {
        self.functions.unregister(name);
    }

    /// `set_variables(mapping)` (spec §6.1): merges `vars` into the
    /// registered-variable table, overriding any existing entry with the
    /// same name.
    pub fn set_variables(&mut self, vars: HashMap<String, Value>) {
        self.variables.extend(vars);
    }

    /// `unset_variable(name)` (spec §6.1).
    pub fn unset_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// `set_import_dir(list)` (spec §6.1): replaces the whole search path.
    pub fn set_import_dir(&mut self, dirs: Vec<PathBuf>) {
        self.import_dirs = dirs;
    }

    /// `add_import_dir(path)` (spec §6.1): appends to the search path.
    pub fn add_import_dir(&mut self, path: impl Into<PathBuf>) {
        self.import_dirs.push(path.into());
    }

    /// `all_parsed_files() -> {path: mtime}` (spec §6.1): every file read
    /// during the most recent `compile`/`compile_file` call, including
    /// transitively resolved `@import`s.
    #[must_use]
    pub fn all_parsed_files(&self) -> HashMap<PathBuf, SystemTime> {
        self.all_parsed_files.clone()
    }
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).and_then(|m| m.modified()).unwrap_or(UNIX_EPOCH)
}

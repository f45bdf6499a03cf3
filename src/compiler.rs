//! The block compiler (spec §4.5): walks the input tree, produces the
//! output tree. Owns nesting/`&` expansion, `@media` multiplication, prop
//! sorting, import splicing, and dedup.
//!
//! `Evaluator` is the one stateful object alive for the duration of a single
//! `compile()` call — the reducer (`reducer.rs`), expression evaluator
//! (`expr.rs`), and mixin resolver (`mixin.rs`) are all `impl Evaluator`
//! blocks in their own files, following the teacher's one-file-per-concern
//! split while keeping the arena/env/output triple that every one of them
//! needs to touch on a single receiver.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use ahash::AHashSet;

use crate::env::Env;
use crate::error::{EvalError, EvalResult, SourceRef};
use crate::functions::FunctionRegistry;
use crate::output::{OutputArena, OutputBlockType, OutputId, OutputLine};
use crate::trace::EvalTracer;
use crate::tree::{BlockArena, BlockId, BlockType, Prop};
use crate::value::Value;

/// One parsed source text, kept so an error raised while compiling one of
/// its blocks can be reported with a line number and culprit text.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub name: String,
    pub text: String,
}

/// Owns everything alive for one `compile()` call: the input arena (grown
/// in place as `@import`s are spliced in), the environment stack, the
/// output tree under construction, and read-only handles to the host
/// `Compiler`'s registered functions/variables/import dirs.
pub struct Evaluator<'a> {
    pub arena: BlockArena,
    pub env: Env,
    pub output: OutputArena,
    pub functions: &'a FunctionRegistry,
    pub registered_variables: &'a HashMap<String, Value>,
    pub import_dirs: Vec<PathBuf>,
    pub imports_enabled: bool,
    pub tracer: &'a mut dyn EvalTracer,
    pub preserve_comments: bool,
    pub sources: Vec<SourceText>,
    pub all_parsed_files: HashMap<PathBuf, SystemTime>,
    /// Arena ids visited by the current top-level mixin resolution, reset
    /// at the start of each `resolve_mixin` call (spec §4.4.1 step 5).
    pub(crate) visited: AHashSet<BlockId>,
    /// The frame each input block was compiled under, surfaced as a
    /// mixin's captured declaration-site scope (spec §3.2 `scope`).
    pub(crate) scopes: HashMap<BlockId, crate::env::FrameId>,
    /// Stack of output ids for the nearest enclosing *non-media* scope, so
    /// a `@media` block can attach itself to the right parent even when
    /// nested inside other media blocks (spec §4.5).
    non_media_output: Vec<OutputId>,
    current_source_id: u32,
    current_offset: Option<usize>,
    /// Active `!important`-style suffixes from enclosing mixin expansions
    /// (spec §4.5.3), applied to every plain declaration compiled while
    /// non-empty — including ones emitted by further nested rule/mixin
    /// bodies, matching how the suffix propagates through a mixin's whole
    /// subtree rather than just its direct props.
    suffix_stack: Vec<String>,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(
        arena: BlockArena,
        source_name: String,
        source_text: String,
        functions: &'a FunctionRegistry,
        registered_variables: &'a HashMap<String, Value>,
        import_dirs: Vec<PathBuf>,
        imports_enabled: bool,
        tracer: &'a mut dyn EvalTracer,
        preserve_comments: bool,
    ) -> Self {
        Self {
            arena,
            env: Env::new(),
            output: OutputArena::new(),
            functions,
            registered_variables,
            import_dirs,
            imports_enabled,
            tracer,
            preserve_comments,
            sources: vec![SourceText { name: source_name, text: source_text }],
            all_parsed_files: HashMap::new(),
            visited: AHashSet::new(),
            scopes: HashMap::new(),
            non_media_output: Vec::new(),
            current_source_id: 0,
            current_offset: None,
            suffix_stack: Vec::new(),
        }
    }

    /// Builds an [`EvalError`] decorated with the currently tracked source
    /// parser + offset, matching spec §7's error routing. If no offset is
    /// active the error carries no location, which is the documented
    /// fallback rather than a bug.
    pub(crate) fn err(&self, e: EvalError) -> EvalError {
        let Some(offset) = self.current_offset else { return e };
        let Some(src) = self.sources.get(self.current_source_id as usize) else { return e };
        let line = src.text[..offset.min(src.text.len())].matches('\n').count() + 1;
        let culprit = src.text.lines().nth(line - 1).unwrap_or("").to_string();
        e.with_source(SourceRef { name: src.name.clone(), offset, line, culprit })
    }

    /// Entry point: compiles the root block of the main source into a fresh
    /// output tree, returning the output root's id.
    pub fn compile_root(&mut self, root: BlockId) -> EvalResult<OutputId> {
        self.compile_block(root, None)
    }

    /// Dispatches on block type (spec §4.5).
    fn compile_block(&mut self, id: BlockId, out_parent: Option<OutputId>) -> EvalResult<OutputId> {
        match self.arena.get(id).block_type {
            BlockType::Root => self.compile_root_block(id),
            BlockType::Rule => self.compile_rule_block(id, out_parent),
            BlockType::Media => self.compile_media_block(id, out_parent),
            BlockType::Directive => self.compile_directive_block(id, out_parent),
        }
    }

    fn compile_root_block(&mut self, id: BlockId) -> EvalResult<OutputId> {
        self.env.push(Some(id));
        let out = self.output.alloc(OutputBlockType::Root, None);
        self.non_media_output.push(out);
        self.compile_props(id, out)?;
        self.output.dedup_lines(out);
        self.non_media_output.pop();
        self.env.pop();
        Ok(out)
    }

    fn compile_rule_block(&mut self, id: BlockId, out_parent: Option<OutputId>) -> EvalResult<OutputId> {
        let frame = self.env.push(Some(id));
        let parent_selectors = self.env.nearest_selectors();
        let tags = self.arena.get(id).tags.clone();
        let mut rendered = Vec::with_capacity(tags.len());
        for tag in &tags {
            let reduced = self.reduce(tag, false)?;
            rendered.push(reduced.stringify());
        }
        let selectors = multiply_selectors(&parent_selectors, &rendered);
        *self.env.selectors_mut() = selectors.clone();

        let out = self.output.alloc(OutputBlockType::Rule, out_parent);
        self.output.get_mut(out).selectors = selectors;
        if let Some(parent) = out_parent {
            self.output.get_mut(parent).children.push(out);
        }
        self.non_media_output.push(out);
        self.compile_props(id, out)?;
        self.non_media_output.pop();
        self.output.dedup_lines(out);

        // A mixin carries the scope it was defined in (spec §3.2's
        // `scope` field) so a later call can bind `store_parent` to it;
        // `mixin.rs` looks this up via `self.scopes.get(&block_id)`.
        self.scopes.insert(id, frame);
        self.env.pop();
        Ok(out)
    }

    /// Registers a mixin definition (spec §4.4) without reducing its body:
    /// parameters aren't bound into any frame until a call site runs
    /// `mixin.rs::bind_args`, so compiling declarations here would reduce
    /// `@`-parameters that are still undefined. Only the declaration-site
    /// frame is captured, for `expand_mixin`'s `store_parent` lookup.
    fn register_mixin_definition(&mut self, id: BlockId) {
        let frame = self.env.push(Some(id));
        self.scopes.insert(id, frame);
        self.env.pop();
    }

    fn compile_media_block(&mut self, id: BlockId, out_parent: Option<OutputId>) -> EvalResult<OutputId> {
        self.env.push(Some(id));
        let parent_queries = self.env.nearest_media_queries();
        let queries = self.arena.get(id).queries.clone();
        let mut rendered = Vec::with_capacity(queries.len());
        for q in &queries {
            rendered.push(self.reduce(q, false)?.stringify());
        }
        let joined = multiply_media(&parent_queries, &rendered);
        *self.env.media_queries_mut() = joined.clone();

        let fallback = out_parent.unwrap_or(OutputId(0));
        let non_media_scope = *self.non_media_output.last().unwrap_or(&fallback);
        let out = self.output.alloc(OutputBlockType::Media, Some(non_media_scope));
        self.output.get_mut(out).queries = joined;
        self.output.get_mut(non_media_scope).children.push(out);

        self.compile_props(id, out)?;

        // If compiling the media body produced orphan declaration lines
        // directly under the media block (no inner selector block wrapped
        // them), wrap them in an inner rule block using the closest
        // enclosing selectors, matching spec §4.5's media edge case.
        let orphan_lines: Vec<OutputLine> = std::mem::take(&mut self.output.get_mut(out).lines);
        if !orphan_lines.is_empty() {
            let inner = self.output.alloc(OutputBlockType::Rule, Some(out));
            self.output.get_mut(inner).selectors = self.env.nearest_selectors();
            self.output.get_mut(inner).lines = orphan_lines;
            self.output.get_mut(out).children.insert(0, inner);
        }
        self.output.dedup_lines(out);
        self.env.pop();
        Ok(out)
    }

    fn compile_directive_block(&mut self, id: BlockId, out_parent: Option<OutputId>) -> EvalResult<OutputId> {
        self.env.push(Some(id));
        let block = self.arena.get(id);
        let name = block.name.clone().unwrap_or_default();
        let value = block.directive_value.clone();
        let text = match value {
            Some(v) => format!("{name} {}", self.reduce(&v, false)?.stringify()),
            None => name.clone(),
        };
        let parent = out_parent.unwrap_or_else(|| self.output.alloc(OutputBlockType::Root, None));
        let out = self.output.alloc(OutputBlockType::Directive, Some(parent));
        self.output.get_mut(out).directive = Some(text);
        self.output.get_mut(parent).children.push(out);
        self.non_media_output.push(out);
        self.compile_props(id, out)?;
        self.non_media_output.pop();
        self.output.dedup_lines(out);
        self.env.pop();
        Ok(out)
    }

    /// Sorts and compiles every prop of `block_id` against the already
    /// pushed frame, emitting into `out`.
    fn compile_props(&mut self, block_id: BlockId, out: OutputId) -> EvalResult<()> {
        let source_id = self.arena.get(block_id).source_id;
        let offsets = self.arena.get(block_id).prop_offsets.clone();
        let sorted = sort_props(&self.arena.get(block_id).props, &offsets);
        for (prop, offset) in sorted {
            self.current_source_id = source_id;
            self.current_offset = offset;
            self.compile_prop(block_id, &prop, out)?;
        }
        Ok(())
    }

    /// Compiles one statement (spec §4.5.3).
    fn compile_prop(&mut self, owner: BlockId, prop: &Prop, out: OutputId) -> EvalResult<()> {
        match prop {
            Prop::Assign(name, value) if name.starts_with('@') => {
                self.env.set(name, value.clone());
                Ok(())
            }
            Prop::Assign(name, value) => {
                let reduced = self.reduce(value, false)?;
                let rendered = match self.suffix_stack.last() {
                    Some(suffix) => Value::List(" ".to_string(), vec![reduced, Value::Keyword(suffix.clone())]),
                    None => reduced,
                };
                self.output.push_line(out, OutputLine::Declaration(name.clone(), rendered));
                Ok(())
            }
            Prop::Block(child) => {
                // A block declared with an explicit argument list is a
                // mixin definition: it's reachable via `children` for
                // calls but never emitted as CSS on its own (spec §4.5,
                // "ruleset/mixin" row; GLOSSARY "Mixin").
                let is_mixin_def = matches!(self.arena.get(*child).block_type, BlockType::Rule) && self.arena.get(*child).args.is_some();
                if is_mixin_def {
                    self.register_mixin_definition(*child);
                    Ok(())
                } else {
                    self.compile_block(*child, Some(out)).map(|_| ())
                }
            }
            Prop::Call { path, is_ruleset, args, kwargs, suffix } => {
                self.compile_call(owner, path, *is_ruleset, args, kwargs, suffix.as_deref(), out)
            }
            Prop::Raw(text) => {
                self.output.push_line(out, OutputLine::Raw(text.clone()));
                Ok(())
            }
            Prop::Comment(text) => {
                if self.preserve_comments {
                    self.output.push_line(out, OutputLine::Comment(text.clone()));
                }
                Ok(())
            }
            Prop::Directive(name, value) => {
                let reduced = self.reduce(value, false)?;
                let line = format!("{name} {};", reduced.stringify());
                self.output.push_line(out, OutputLine::Raw(line));
                Ok(())
            }
            Prop::Import(path) => self.compile_import(path, out),
        }
    }

    fn compile_import(&mut self, path: &str, out: OutputId) -> EvalResult<()> {
        if !self.imports_enabled {
            self.output.push_line(out, OutputLine::Raw("/* import disabled */".to_string()));
            return Ok(());
        }
        if path.ends_with(".css") {
            self.output.push_line(out, OutputLine::Raw(format!("@import \"{path}\";")));
            return Ok(());
        }

        let resolved = crate::import::find_import(path, &self.import_dirs);
        self.tracer.on_import_resolved(path, resolved.as_deref());
        let Some(found) = resolved else {
            return Err(self.err(EvalError::new(crate::error::ErrorKind::Import, format!("could not find import {path}"))));
        };

        let canonical = found.canonicalize().unwrap_or(found.clone());
        if self.all_parsed_files.contains_key(&canonical) {
            // Import cycle: already parsed, resolve to a no-op (spec §3.4).
            return Ok(());
        }

        let text = std::fs::read_to_string(&found)
            .map_err(|e| self.err(EvalError::new(crate::error::ErrorKind::Import, format!("could not read {}: {e}", found.display()))))?;
        self.all_parsed_files.insert(canonical, std::fs::metadata(&found).and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH));

        let source_id = self.sources.len() as u32;
        self.sources.push(SourceText { name: found.display().to_string(), text: text.clone() });

        let mut parser = crate::parser::Parser::new(&text);
        let imported_root = parser.parse_into(&mut self.arena, source_id).map_err(|e| self.err(e))?;

        let props = self.arena.get(imported_root).props.clone();
        let offsets = self.arena.get(imported_root).prop_offsets.clone();
        let sorted = sort_props(&props, &offsets);

        let is_var = |p: &Prop| matches!(p, Prop::Assign(n, _) if n.starts_with('@'));
        let top: Vec<Prop> = sorted.iter().filter(|(p, _)| is_var(p)).map(|(p, _)| p.clone()).collect();
        let bottom: Vec<Prop> = sorted.into_iter().filter(|(p, _)| !is_var(p)).map(|(p, _)| p).collect();

        let saved_source = self.current_source_id;
        self.current_source_id = source_id;
        for p in &top {
            self.compile_prop(imported_root, p, out)?;
        }
        for p in &bottom {
            self.compile_prop(imported_root, p, out)?;
        }
        self.current_source_id = saved_source;
        Ok(())
    }

    /// Entry point used by `mixin.rs` to compile a matched mixin/ruleset
    /// body into the caller's output block, pushing `suffix` (if any) for
    /// the duration so every declaration compiled — including ones from
    /// further nested blocks reached from this body — picks it up.
    pub(crate) fn compile_props_for_call(&mut self, block_id: BlockId, out: OutputId, suffix: Option<&str>) -> EvalResult<()> {
        if let Some(s) = suffix {
            self.suffix_stack.push(s.to_string());
        }
        let result = self.compile_props(block_id, out);
        if suffix.is_some() {
            self.suffix_stack.pop();
        }
        result
    }
}

/// Reorders `props` so that variable assignments and imports sort ahead of
/// other statements: variables are effectively visited twice (once before
/// imports, once after) so both pre-import and post-import references
/// resolve (spec §4.5.2; DESIGN.md Open Question 1 on why this is kept).
/// Returns pairs of `(prop, source offset)` so the compiler can keep a
/// cursor for error reporting through the reorder.
fn sort_props(props: &[Prop], offsets: &[usize]) -> Vec<(Prop, Option<usize>)> {
    let offset_at = |i: usize| offsets.get(i).copied();
    let is_var_assign = |p: &Prop| matches!(p, Prop::Assign(name, _) if name.starts_with('@'));
    let is_import = |p: &Prop| matches!(p, Prop::Import(_));

    let vars: Vec<(Prop, Option<usize>)> =
        props.iter().enumerate().filter(|(_, p)| is_var_assign(p)).map(|(i, p)| (p.clone(), offset_at(i))).collect();
    let imports: Vec<(Prop, Option<usize>)> =
        props.iter().enumerate().filter(|(_, p)| is_import(p)).map(|(i, p)| (p.clone(), offset_at(i))).collect();
    let rest: Vec<(Prop, Option<usize>)> = props
        .iter()
        .enumerate()
        .filter(|(_, p)| !is_var_assign(p) && !is_import(p))
        .map(|(i, p)| (p.clone(), offset_at(i)))
        .collect();

    let mut out = Vec::with_capacity(vars.len() * 2 + imports.len() + rest.len());
    out.extend(vars.iter().cloned());
    out.extend(imports);
    out.extend(vars);
    out.extend(rest);
    out
}

/// Parent-selector expansion (spec §4.5.1).
fn multiply_selectors(parents: &[String], children: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return children.iter().map(|c| expand_amp(c, "")).collect();
    }
    let mut out = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in children {
            out.push(expand_amp(child, parent));
        }
    }
    out
}

fn expand_amp(child: &str, parent: &str) -> String {
    if child.contains('&') {
        child.replace('&', parent).trim().to_string()
    } else if parent.is_empty() {
        child.trim().to_string()
    } else {
        format!("{} {}", parent.trim(), child.trim())
    }
}

/// `@media` query multiplication: Cartesian `and`-join against any
/// enclosing media ancestor (spec §4.5; DESIGN.md Open Question 3 on the
/// null-parser fallback this mirrors for internally synthesized queries).
fn multiply_media(parents: &[String], children: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return children.to_vec();
    }
    if children.is_empty() {
        return parents.to_vec();
    }
    let mut out = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in children {
            out.push(format!("{parent} and {child}"));
        }
    }
    out
}

//! Mixin/ruleset resolution: name-path search (`findBlocks`), guard-gated
//! pattern matching, and argument binding (spec §4.4), plus the call-site
//! expansion glue spec §4.5.3 describes for `Prop::Call`.
//!
//! Grounded on the teacher's `Signature::bind` (positional-then-keyword
//! binding, defaults, arity-mismatch detection) adapted from heap-tuple/
//! dict call args to the spec's `lit`/`arg`/`rest` parameter kinds.

use indexmap::IndexMap;

use crate::compiler::Evaluator;
use crate::env::FrameId;
use crate::error::{EvalError, EvalResult};
use crate::output::OutputId;
use crate::tree::{ArgSpec, BlockId};
use crate::value::Value;

impl Evaluator<'_> {
    /// Entry point for `Prop::Call`: resolves, then expands every matching
    /// candidate (ruleset calls keep only the last) into `out`.
    pub(crate) fn compile_call(
        &mut self,
        owner: BlockId,
        path: &[String],
        is_ruleset: bool,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
        suffix: Option<&str>,
        out: OutputId,
    ) -> EvalResult<()> {
        let mut reduced_args = Vec::with_capacity(args.len());
        for a in args {
            reduced_args.push(self.reduce(a, false)?);
        }
        let mut reduced_kwargs = IndexMap::new();
        for (k, v) in kwargs {
            reduced_kwargs.insert(k.clone(), self.reduce(v, false)?);
        }

        self.visited.clear();
        let candidates = self.find_blocks(owner, path, &reduced_args, &reduced_kwargs)?;
        if candidates.is_empty() {
            return Err(self.err(EvalError::undefined_mixin(&path.join("."))));
        }
        self.tracer.on_mixin_matched(path, candidates.len(), candidates.len());

        let to_expand: Vec<BlockId> = if is_ruleset { vec![*candidates.last().unwrap()] } else { candidates };

        for cand in to_expand {
            if cand == owner {
                continue;
            }
            self.expand_mixin(cand, owner, &reduced_args, &reduced_kwargs, suffix, out)?;
        }
        Ok(())
    }

    /// `findBlocks` (spec §4.4.1). `args`/`kwargs` are already reduced.
    fn find_blocks(
        &mut self,
        node: BlockId,
        path: &[String],
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> EvalResult<Vec<BlockId>> {
        if !self.visited.insert(node) {
            return Ok(Vec::new());
        }

        let first = &path[0];
        let candidates: Vec<BlockId> = self.arena.get(node).children.get(first).cloned().unwrap_or_default();

        if path.len() == 1 {
            let mut matched = Vec::new();
            for cand in candidates {
                if self.pattern_match(cand, args, kwargs)? {
                    matched.push(cand);
                }
            }
            if !matched.is_empty() {
                return Ok(matched);
            }
        } else {
            let mut union = Vec::new();
            for cand in candidates {
                union.extend(self.find_blocks(cand, &path[1..], args, kwargs)?);
            }
            if !union.is_empty() {
                return Ok(union);
            }
        }

        let block = self.arena.get(node);
        if block.is_root() {
            return Ok(Vec::new());
        }
        let parent = block.parent;
        self.find_blocks(parent, path, args, kwargs)
    }

    /// `patternMatch` (spec §4.4.2): arity/literal-value shape check AND
    /// (if the candidate has guards) at least one guard conjunction.
    fn pattern_match(&mut self, candidate: BlockId, args: &[Value], kwargs: &IndexMap<String, Value>) -> EvalResult<bool> {
        if !self.arg_shape_matches(candidate, args, kwargs) {
            return Ok(false);
        }
        self.guards_pass(candidate, args, kwargs)
    }

    fn arg_shape_matches(&self, candidate: BlockId, args: &[Value], kwargs: &IndexMap<String, Value>) -> bool {
        let block = self.arena.get(candidate);
        let Some(specs) = &block.args else {
            return args.is_empty() || block.is_vararg;
        };

        let mut ordered_idx = 0usize;
        for spec in specs {
            match spec {
                ArgSpec::Lit(expected) => {
                    let Some(actual) = args.get(ordered_idx) else { return false };
                    if actual.stringify() != expected.stringify() {
                        return false;
                    }
                    ordered_idx += 1;
                }
                ArgSpec::Arg(name, default) => {
                    if kwargs.contains_key(name) {
                        continue;
                    }
                    if args.get(ordered_idx).is_none() && default.is_none() {
                        return false;
                    }
                    ordered_idx += 1;
                }
                ArgSpec::Rest(_) => break,
            }
        }

        if !block.is_vararg && specs.len() < args.len() {
            return false;
        }
        true
    }

    fn guards_pass(&mut self, candidate: BlockId, args: &[Value], kwargs: &IndexMap<String, Value>) -> EvalResult<bool> {
        let Some(guards) = self.arena.get(candidate).guards.clone() else { return Ok(true) };
        for conjunction in &guards {
            let frame = self.env.push(None);
            self.bind_args(candidate, frame, args, kwargs)?;
            let mut all_true = true;
            for term in conjunction {
                let reduced = self.reduce(&term.expr, true)?;
                let mut truth = reduced.is_true();
                if term.negate {
                    truth = !truth;
                }
                if !truth {
                    all_true = false;
                }
            }
            self.env.pop();
            if all_true {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `zipSetArgs` (spec §4.4.3): binds each declared parameter on `frame`,
    /// preferring a keyword value, then the next ordered caller value, then
    /// the parameter's default. Records the ordered bindings as
    /// `@arguments`.
    fn bind_args(&mut self, candidate: BlockId, frame: FrameId, ordered: &[Value], kwargs: &IndexMap<String, Value>) -> EvalResult<()> {
        let specs = self.arena.get(candidate).args.clone();
        self.env.set_arguments(ordered.to_vec());

        let Some(specs) = specs else { return Ok(()) };
        let mut idx = 0usize;
        for spec in &specs {
            match spec {
                ArgSpec::Lit(_) => {
                    idx += 1;
                }
                ArgSpec::Arg(name, default) => {
                    let value = if let Some(kv) = kwargs.get(name) {
                        kv.clone()
                    } else if let Some(v) = ordered.get(idx) {
                        idx += 1;
                        v.clone()
                    } else if let Some(d) = default {
                        d.clone()
                    } else {
                        return Err(self.err(EvalError::argument_mismatch(format!("{name} is undefined"))));
                    };
                    let reduced = self.reduce(&value, false)?;
                    self.env.set_on(frame, name, reduced);
                }
                ArgSpec::Rest(name) => {
                    let rest: Vec<Value> = ordered[idx.min(ordered.len())..].to_vec();
                    self.env.set_on(frame, name, Value::List(" ".to_string(), rest));
                    break;
                }
            }
        }
        Ok(())
    }

    /// Expands one matched mixin/ruleset body at the call site (spec
    /// §4.5.3): optional `store_parent` frame for scope capture, the
    /// argument-binding frame, a temporary reparent so nested selectors and
    /// further mixin lookups resolve against the call site, then the body's
    /// props (with `!important`-style `suffix` wrapping if present).
    fn expand_mixin(
        &mut self,
        candidate: BlockId,
        call_site: BlockId,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
        suffix: Option<&str>,
        out: OutputId,
    ) -> EvalResult<()> {
        let original_parent = self.arena.get(candidate).parent;
        self.arena.get_mut(candidate).parent = call_site;

        let captured_scope = self.scopes.get(&candidate).copied();
        let pushed_store_parent = if let Some(scope) = captured_scope {
            let f = self.env.push(None);
            self.env.set_store_parent(f, scope);
            true
        } else {
            false
        };

        let bind_frame = self.env.push(Some(candidate));
        let bind_result = self.bind_args(candidate, bind_frame, args, kwargs);

        let compile_result = bind_result.and_then(|()| self.compile_props_for_call(candidate, out, suffix));

        self.env.pop();
        if pushed_store_parent {
            self.env.pop();
        }
        self.arena.get_mut(candidate).parent = original_parent;
        compile_result
    }
}

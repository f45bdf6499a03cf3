//! Evaluation hook trait used for debugging visibility into the evaluator.
//!
//! Grounded on the teacher's `VmTracer` design: every method has a no-op
//! default so [`NoopTracer`] costs nothing and the compiler can inline it
//! away entirely. Unlike the teacher's single `TraceEvent`-dispatch style,
//! hooks here are one method per call site, since the evaluator's
//! instrumentation points are static (mixin match, variable resolution,
//! import resolution, dedup) rather than a single opcode-dispatch loop.

/// Hook trait for observing the evaluator at its interesting decision points.
/// The crate does not depend on `log`/`tracing` — the teacher's core crate
/// doesn't either, so instrumentation here is a plain trait a host can
/// implement however it likes (print to stderr, collect into a `Vec`, feed
/// a real logging facade upstream).
pub trait EvalTracer: std::fmt::Debug {
    /// A variable lookup resolved (or failed to resolve) to `value`.
    fn on_variable_resolved(&mut self, _name: &str, _value: Option<&crate::value::Value>) {}

    /// A mixin/ruleset call at `path` matched `matched` candidate blocks out
    /// of `candidates` examined in the closest scope that had any match.
    fn on_mixin_matched(&mut self, _path: &[String], _matched: usize, _candidates: usize) {}

    /// An `@import` of `url` resolved to `resolved`, or `None` if it could
    /// not be found in any configured import directory.
    fn on_import_resolved(&mut self, _url: &str, _resolved: Option<&std::path::Path>) {}

    /// A duplicate declaration line was collapsed during dedup, with
    /// `comments` trailing/preceding comment lines folded into the kept copy.
    fn on_dedup_collapsed(&mut self, _line: &str, _comments: usize) {}
}

/// A tracer that does nothing. All methods use the trait's default no-op
/// bodies, so `Compiler<NoopTracer>`-shaped code monomorphizes to zero
/// instrumentation overhead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// A tracer that prints each event to stderr, for ad hoc debugging of a
/// single compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_variable_resolved(&mut self, name: &str, value: Option<&crate::value::Value>) {
        match value {
            Some(v) => eprintln!("less_core: {name} = {v}"),
            None => eprintln!("less_core: {name} unresolved"),
        }
    }

    fn on_mixin_matched(&mut self, path: &[String], matched: usize, candidates: usize) {
        eprintln!("less_core: mixin {} matched {matched}/{candidates}", path.join("."));
    }

    fn on_import_resolved(&mut self, url: &str, resolved: Option<&std::path::Path>) {
        match resolved {
            Some(p) => eprintln!("less_core: @import {url} -> {}", p.display()),
            None => eprintln!("less_core: @import {url} unresolved"),
        }
    }

    fn on_dedup_collapsed(&mut self, line: &str, comments: usize) {
        eprintln!("less_core: dedup collapsed `{line}` ({comments} comments folded)");
    }
}

//! The single error kind raised anywhere in the evaluator.
//!
//! Mirrors the teacher's hand-rolled exception enum: a `strum`-derived
//! `Display` on a small discriminant, carried inside one struct that also
//! tracks where in the source the failure happened. There is no recovery —
//! every `EvalError` is fatal to the current `compile()` call.

use std::fmt;
use strum::{Display, EnumString};

/// Coarse classification of a failure, used by callers that want to match
/// on error shape (e.g. a test asserting "this is a guard mismatch") without
/// string-matching the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    UndefinedVariable,
    UndefinedMixin,
    VariableRecursion,
    DivideByZero,
    UnsupportedOperands,
    ColorCoercion,
    UnitConversion,
    ArgumentMismatch,
    UnknownNode,
    Import,
    Parse,
}

/// A location within a single source text, recorded at the offset a prop or
/// expression began at. `line` is derived lazily from `offset` against the
/// source text the caller still has on hand — the error itself only needs
/// to carry enough to let the caller reconstruct it.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub name: String,
    pub offset: usize,
    pub line: usize,
    pub culprit: String,
}

/// The one error type produced anywhere in this crate.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<SourceRef>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("variable {name} is undefined"))
    }

    pub fn undefined_mixin(path: &str) -> Self {
        Self::new(ErrorKind::UndefinedMixin, format!("{path} is undefined"))
    }

    pub fn recursion(name: &str) -> Self {
        Self::new(ErrorKind::VariableRecursion, format!("{name} is defined in terms of itself"))
    }

    pub fn divide_by_zero() -> Self {
        Self::new(ErrorKind::DivideByZero, "division by zero")
    }

    pub fn unit_conversion(from: &str, to: &str) -> Self {
        Self::new(ErrorKind::UnitConversion, format!("Cannot convert {from} to {to}"))
    }

    pub fn argument_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentMismatch, message)
    }

    pub fn unknown_node(what: &str) -> Self {
        Self::new(ErrorKind::UnknownNode, format!("unknown {what}"))
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(src) = &self.source {
            write!(f, " in {} on line {}:\n{}", src.name, src.line, src.culprit)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;

//! The tagged value tree the parser produces and the reducer normalises.
//!
//! Unlike the heap/refcount-backed `Value` this was grounded on, LESS values
//! have no cyclic mutable objects, so every variant here owns its payload
//! directly and derives `Clone` — there is no arena, no `HeapId`, no manual
//! `Drop`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Ge,
    Le,
    Eq,
    And,
}

impl Op {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Le => "=<",
            Op::Eq => "=",
            Op::And => "and",
        }
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Lt | Op::Gt | Op::Ge | Op::Le | Op::Eq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// One segment of a `string` value's part list: a literal fragment or a
/// nested value to interpolate (for `"@{foo}"`-style strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPart {
    Literal(String),
    Inner(Value),
}

/// The name half of a `variable` value: either a plain `@name`, or a nested
/// value whose reduced, stringified form supplies the name (`@{ident}`-style
/// dynamic variable lookup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableName {
    Named(String),
    Dynamic(Box<Value>),
}

/// The tagged value tree (spec'd value model). `Clone` is cheap: no variant
/// holds anything but owned, non-cyclic data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A number with an optional unit (`%`, a length, a time, an angle, or
    /// empty for a bare scalar).
    Number(f64, String),
    /// A resolved color: components in `[0, 255]`, alpha in `[0, 1]`.
    Color(f64, f64, f64, Option<f64>),
    /// A hex literal as written (`#abc` or `#aabbcc`), not yet coerced.
    RawColor(String),
    /// A bare identifier. CSS color names are coerced to `Color` on demand;
    /// booleans are encoded as `Keyword("true")` / `Keyword("false")`.
    Keyword(String),
    /// A quoted (or bare, delimiter `None`) string made of literal and
    /// interpolated parts.
    Str(Option<char>, Vec<StringPart>),
    /// An ordered sequence joined by `delimiter` (`,` or ` `) on emission.
    List(String, Vec<Value>),
    /// An unresolved (or re-tagged after a builtin returned nothing usable)
    /// function call: name plus its (usually list-valued) argument.
    Function(String, Box<Value>),
    /// A binary operator application as produced by the parser, not yet
    /// reduced. The whitespace flags matter only for the textual fallback
    /// rendering when no typed rule applies.
    Expression(Op, Box<Value>, Box<Value>, bool, bool),
    Variable(VariableName),
    /// `@{name}` used directly as a value (not as part of a larger string);
    /// `strip_quotes` unwraps the resolved value to a bare keyword.
    Interpolate(Box<Value>, bool),
    /// `~"literal"` / `~(expr)` — reduce inner, then unwrap its quoting.
    Escape(Box<Value>),
    Unary(UnaryOp, Box<Value>),
}

impl Value {
    #[must_use]
    pub fn keyword(s: impl Into<String>) -> Self {
        Value::Keyword(s.into())
    }

    #[must_use]
    pub fn number(n: f64, unit: impl Into<String>) -> Self {
        Value::Number(n, unit.into())
    }

    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Value::Keyword(if b { "true".to_string() } else { "false".to_string() })
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Keyword(k) if k == "true")
    }

    #[must_use]
    pub fn string(quote: Option<char>, text: impl Into<String>) -> Self {
        Value::Str(quote, vec![StringPart::Literal(text.into())])
    }

    #[must_use]
    pub fn color(r: f64, g: f64, b: f64, a: Option<f64>) -> Self {
        Value::Color(clamp_channel(r), clamp_channel(g), clamp_channel(b), a.map(clamp_alpha))
    }

    #[must_use]
    pub fn is_color_like(&self) -> bool {
        matches!(self, Value::Color(..) | Value::RawColor(_))
            || matches!(self, Value::Keyword(k) if crate::color::named_color(k).is_some())
    }

    /// Best-effort plain-text rendering used for string concatenation,
    /// interpolation targets, and textual fallback expressions. Assumes the
    /// value has already been reduced — it does not resolve variables.
    /// Equivalent to `stringify_styled(false)`.
    #[must_use]
    pub fn stringify(&self) -> String {
        self.stringify_styled(false)
    }

    /// Same contract as [`stringify`](Self::stringify), but colors render
    /// through `compress` (the formatter's `compress_colors` style knob,
    /// spec §6.3) instead of always the long hex form. Kept as a separate
    /// entry point rather than a parameter on every caller, since only the
    /// final declaration-line emission cares which style is active.
    #[must_use]
    pub fn stringify_styled(&self, compress: bool) -> String {
        match self {
            Value::Number(n, unit) => format!("{}{unit}", format_number(*n)),
            Value::Color(..) | Value::RawColor(_) => crate::color::stringify_color(self, compress),
            Value::Keyword(k) => k.clone(),
            Value::Str(_, parts) => parts
                .iter()
                .map(|p| match p {
                    StringPart::Literal(s) => s.clone(),
                    StringPart::Inner(v) => v.stringify_styled(compress),
                })
                .collect(),
            Value::List(delim, items) => {
                let sep = if delim == "," { ", " } else { " " };
                items.iter().map(|v| v.stringify_styled(compress)).collect::<Vec<_>>().join(sep)
            }
            Value::Function(name, arg) => format!("{name}({})", arg.stringify_styled(compress)),
            Value::Expression(op, l, r, wb, wa) => {
                let lb = if *wb { " " } else { "" };
                let ra = if *wa { " " } else { "" };
                format!("{}{lb}{}{ra}{}", l.stringify_styled(compress), op.as_str(), r.stringify_styled(compress))
            }
            Value::Variable(VariableName::Named(n)) => n.clone(),
            Value::Variable(VariableName::Dynamic(v)) => v.stringify_styled(compress),
            Value::Interpolate(v, _) => v.stringify_styled(compress),
            Value::Escape(v) => v.stringify_styled(compress),
            Value::Unary(op, v) => {
                let sign = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                };
                format!("{sign}{}", v.stringify_styled(compress))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify())
    }
}

#[must_use]
pub fn clamp_channel(v: f64) -> f64 {
    v.clamp(0.0, 255.0)
}

#[must_use]
pub fn clamp_alpha(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Number formatting: always `.` as decimal separator, trimmed of a
/// trailing `.0` for whole numbers, regardless of ambient locale.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{n:.8}");
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    }
}

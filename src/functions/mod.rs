//! Built-in function dispatch table plus the user-registered-function
//! registry (spec §6.1 `register_function`/`unregister_function`).
//!
//! Each category keeps the teacher's enum+`strum::Display` name-matching
//! idiom (`modules/math.rs`'s `MathFunctions`) in its own file; this module
//! just tries each category's `FromStr` in turn and falls through to the
//! caller-registered table. A name matching nothing in either returns
//! `Ok(None)` so the reducer can re-emit the call as a raw, unresolved
//! `Value::Function` (spec §4.2).

pub mod color_ops;
pub mod convert;
pub mod data_uri;
pub mod list;
pub mod math;
pub mod predicates;
pub mod string;

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// A user-registered function: takes the already-reduced argument list,
/// returns a single `Value`. Kept as an `Rc` rather than a bare `fn` pointer
/// so hosts can register closures that capture state (a counter, a config
/// struct, …).
pub type UserFn = Rc<dyn Fn(&[Value]) -> EvalResult<Value>>;

/// Holds caller-registered functions alongside the fixed built-in table.
/// One instance per [`crate::Compiler`] — registrations are per-compiler
/// state, not process-global (spec §6.1 design note).
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    user: HashMap<String, UserFn>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry").field("user", &self.user.keys().collect::<Vec<_>>()).finish()
    }
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: UserFn) {
        self.user.insert(name.into(), f);
    }

    pub fn unregister(&mut self, name: &str) {
        self.user.remove(name);
    }

    /// Arguments are flattened from the call's (usually list-valued)
    /// argument value by the caller before this is invoked. Returns
    /// `Ok(None)` if `name` matches nothing registered, built in or
    /// user-provided — the caller re-tags the call as an unresolved
    /// function value rather than erroring (spec §4.2).
    pub fn call(&self, name: &str, args: &[Value], import_dirs: &[PathBuf]) -> EvalResult<Option<Value>> {
        if let Some(f) = self.user.get(name) {
            return Ok(Some(f(args)?));
        }

        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "extract" => return Ok(Some(list::extract(args)?)),
            "e" => return Ok(Some(string::escape(args)?)),
            "%" | "_sprintf" => return Ok(Some(string::sprintf(args)?)),
            "data-uri" => return Ok(Some(data_uri::data_uri(args, import_dirs)?)),
            "convert" => return Ok(Some(call_convert(args)?)),
            _ => {}
        }
        if let Ok(f) = math::MathFn::from_str(&lower) {
            return Ok(Some(math::call(f, args)?));
        }
        if let Ok(f) = predicates::PredicateFn::from_str(&lower) {
            return Ok(Some(predicates::call(f, args)?));
        }
        if let Ok(f) = color_ops::ColorFn::from_str(&lower) {
            return Ok(Some(color_ops::call(f, args)?));
        }
        Ok(None)
    }
}

fn call_convert(args: &[Value]) -> EvalResult<Value> {
    let value = args.first().ok_or_else(|| EvalError::argument_mismatch("convert: missing value argument"))?;
    let to_unit = args.get(1).ok_or_else(|| EvalError::argument_mismatch("convert: missing unit argument"))?;
    let Value::Number(n, from) = value else {
        return Err(EvalError::argument_mismatch(format!("convert: {} is not a number", value.stringify())));
    };
    let to = match to_unit {
        Value::Keyword(k) => k.clone(),
        Value::Str(_, _) => to_unit.stringify(),
        Value::Number(_, u) => u.clone(),
        other => return Err(EvalError::argument_mismatch(format!("convert: {} is not a unit", other.stringify()))),
    };
    let converted = convert::convert(*n, from, &to)?;
    Ok(Value::number(converted, to))
}

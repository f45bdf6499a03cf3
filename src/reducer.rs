//! Value reduction (spec §4.2): normalises a tagged [`Value`] tree to a
//! canonical form, resolving variables and invoking functions along the way.
//!
//! `impl Evaluator` block living in its own file per the teacher's
//! one-concern-per-file split (`compiler.rs` owns the struct and the block
//! walk, `expr.rs` owns typed binary evaluation, this file owns everything
//! reachable from a bare value).

use crate::compiler::Evaluator;
use crate::error::{EvalError, EvalResult};
use crate::value::{StringPart, UnaryOp, Value, VariableName};

impl Evaluator<'_> {
    /// `reduce(value, for_expression)` — see spec §4.2 for the per-variant
    /// contract. Idempotent on already-reduced values that don't reference
    /// the environment.
    pub fn reduce(&mut self, value: &Value, for_expression: bool) -> EvalResult<Value> {
        match value {
            Value::Number(..) | Value::Color(..) => Ok(value.clone()),

            Value::RawColor(_) => {
                if for_expression {
                    Ok(crate::color::coerce_to_color(value).unwrap_or_else(|| value.clone()))
                } else {
                    Ok(value.clone())
                }
            }

            Value::Keyword(k) => {
                if for_expression {
                    if let Some(c) = crate::color::coerce_to_color(value) {
                        return Ok(c);
                    }
                }
                Ok(Value::Keyword(k.clone()))
            }

            Value::Str(quote, parts) => {
                let mut out = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        StringPart::Literal(s) => out.push(StringPart::Literal(s.clone())),
                        StringPart::Inner(inner) => {
                            // Any embedded value unwraps to its bare text
                            // (no surrounding quotes) once reduced.
                            let reduced = self.reduce(inner, false)?;
                            out.push(StringPart::Literal(reduced.stringify()));
                        }
                    }
                }
                Ok(Value::Str(*quote, out))
            }

            Value::List(delim, items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.reduce(item, for_expression)?);
                }
                Ok(Value::List(delim.clone(), out))
            }

            Value::Variable(name) => self.reduce_variable(name),

            Value::Interpolate(inner, strip_quotes) => {
                let reduced_inner = self.reduce(inner, false)?;
                let name = format!("@{}", reduced_inner.stringify());
                let resolved = self.env.get(&name).map_err(|e| self.err(e))?;
                let resolved = match resolved {
                    Value::RawColor(_) => crate::color::coerce_to_color(&resolved).unwrap_or(resolved),
                    other => other,
                };
                let reduced = self.reduce(&resolved, false)?;
                if *strip_quotes {
                    Ok(Value::Keyword(reduced.stringify()))
                } else {
                    Ok(reduced)
                }
            }

            Value::Escape(inner) => {
                let reduced = self.reduce(inner, false)?;
                Ok(Value::Keyword(reduced.stringify()))
            }

            Value::Unary(op, inner) => {
                let reduced = self.reduce(inner, for_expression)?;
                match reduced {
                    Value::Number(n, unit) => {
                        let signed = match op {
                            UnaryOp::Plus => n,
                            UnaryOp::Minus => -n,
                        };
                        Ok(Value::number(signed, unit))
                    }
                    other => Ok(Value::Unary(*op, Box::new(other))),
                }
            }

            Value::Expression(op, left, right, wb, wa) => {
                let l = self.reduce(left, true)?;
                let r = self.reduce(right, true)?;
                self.evaluate(*op, l, r, *wb, *wa)
            }

            Value::Function(name, arg) => self.reduce_function(name, arg),
        }
    }

    fn reduce_variable(&mut self, name: &VariableName) -> EvalResult<Value> {
        let resolved_name = match name {
            VariableName::Named(n) => n.clone(),
            VariableName::Dynamic(v) => {
                let reduced = self.reduce(v, false)?;
                format!("@{}", reduced.stringify())
            }
        };

        let frame = self.env.current();
        if !self.env.mark_seen(frame, &resolved_name) {
            return Err(self.err(EvalError::recursion(&resolved_name)));
        }

        let result = (|| -> EvalResult<Value> {
            if let Some(v) = self.registered_variables.get(&resolved_name) {
                return self.reduce(v, false);
            }
            let raw = self.env.get(&resolved_name).map_err(|e| self.err(e))?;
            self.reduce(&raw, false)
        })();

        self.env.clear_seen(frame, &resolved_name);
        self.tracer.on_variable_resolved(&resolved_name, result.as_ref().ok());
        result
    }

    /// Flattens a (possibly list-valued) function argument value into a
    /// plain `Vec<Value>`, reducing each item, matching how the parser
    /// packs comma-separated call arguments into a single `list` payload.
    fn flatten_call_args(&mut self, arg: &Value) -> EvalResult<Vec<Value>> {
        match arg {
            Value::List(_, items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.reduce(item, false)?);
                }
                Ok(out)
            }
            other => Ok(vec![self.reduce(other, false)?]),
        }
    }

    fn reduce_function(&mut self, name: &str, arg: &Value) -> EvalResult<Value> {
        let lower = name.to_ascii_lowercase();

        // rgb/rgba/hsl/hsla are coerced to a color directly rather than
        // dispatched through the function table (spec §4.2).
        if matches!(lower.as_str(), "rgb" | "rgba" | "hsl" | "hsla") {
            let args = self.flatten_call_args(arg)?;
            if let Some(color) = self.coerce_color_function(&lower, &args) {
                return Ok(color);
            }
        }

        let args = self.flatten_call_args(arg)?;
        match self.functions.call(&lower, &args, &self.import_dirs) {
            Ok(Some(Value::Number(n, unit))) => Ok(Value::Number(n, unit)),
            Ok(Some(Value::Str(q, parts))) => Ok(Value::Str(q, parts)),
            Ok(Some(v)) => Ok(v),
            Ok(None) => {
                // Not a known function: re-emit the call with reduced
                // arguments rather than erroring (spec §4.2).
                Ok(Value::Function(name.to_string(), Box::new(Value::List(",".to_string(), args))))
            }
            Err(e) => Err(self.err(e)),
        }
    }

    fn coerce_color_function(&self, name: &str, args: &[Value]) -> Option<Value> {
        let num = |v: &Value| -> Option<(f64, bool)> {
            match v {
                Value::Number(n, unit) => Some((*n, unit == "%")),
                _ => None,
            }
        };
        match name {
            "rgb" | "rgba" => {
                let (r, _) = num(args.first()?)?;
                let (g, _) = num(args.get(1)?)?;
                let (b, _) = num(args.get(2)?)?;
                let a = match args.get(3) {
                    Some(v) => {
                        let (n, is_pct) = num(v)?;
                        Some(if is_pct { n / 100.0 } else { n })
                    }
                    None => None,
                };
                Some(Value::color(r, g, b, a))
            }
            "hsl" | "hsla" => {
                let (h, _) = num(args.first()?)?;
                let (s, _) = num(args.get(1)?)?;
                let (l, _) = num(args.get(2)?)?;
                let a = match args.get(3) {
                    Some(v) => {
                        let (n, is_pct) = num(v)?;
                        Some(if is_pct { n / 100.0 } else { n })
                    }
                    None => None,
                };
                let (r, g, b) = crate::color::hsl_to_rgb(h, s / 100.0, l / 100.0);
                Some(Value::color(r, g, b, a))
            }
            _ => None,
        }
    }
}

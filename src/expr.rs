//! Typed binary expression evaluation across number, color, and string
//! operands (spec §4.3), plus the `and`/`=` operators shared by guards.

use crate::compiler::Evaluator;
use crate::error::{EvalError, EvalResult};
use crate::value::{Op, Value};

impl Evaluator<'_> {
    /// `evaluate(op, left, right, ws_before, ws_after)`. `left`/`right` are
    /// assumed already reduced with `for_expression = true` (raw colors and
    /// named-color keywords already coerced by the caller).
    pub fn evaluate(&mut self, op: Op, left: Value, right: Value, ws_before: bool, ws_after: bool) -> EvalResult<Value> {
        let left = coerce_operand(left);
        let right = coerce_operand(right);

        if op == Op::And {
            return Ok(Value::boolean(left.is_true() && right.is_true()));
        }
        if op == Op::Eq {
            return Ok(Value::boolean(structurally_equal(&left, &right)));
        }

        if op == Op::Add && (is_string_like(&left) || is_string_like(&right)) {
            return Ok(string_concat(left, right));
        }

        match (&left, &right) {
            (Value::Number(a, ua), Value::Number(b, ub)) => {
                let unit = if !ua.is_empty() { ua.clone() } else { ub.clone() };
                numeric_op(op, *a, *b, unit)
            }
            (Value::Color(r1, g1, b1, a1), Value::Color(r2, g2, b2, a2)) => {
                color_color_op(op, (*r1, *g1, *b1, *a1), (*r2, *g2, *b2, *a2))
            }
            (Value::Color(r, g, b, a), Value::Number(n, unit)) => {
                let n = if unit == "%" { n / 100.0 } else { *n };
                color_number_op(op, (*r, *g, *b, *a), n)
            }
            (Value::Number(n, unit), Value::Color(r, g, b, a)) => {
                // Only `+`/`*` commute (spec §4.3 table).
                if matches!(op, Op::Add | Op::Mul) {
                    let n = if unit == "%" { n / 100.0 } else { *n };
                    color_number_op(op, (*r, *g, *b, *a), n)
                } else {
                    Ok(textual_fallback(left, op, right, ws_before, ws_after))
                }
            }
            _ => Ok(textual_fallback(left, op, right, ws_before, ws_after)),
        }
    }
}

fn coerce_operand(v: Value) -> Value {
    match &v {
        Value::RawColor(_) => crate::color::coerce_to_color(&v).unwrap_or(v),
        Value::Keyword(k) if crate::color::named_color(k).is_some() || k == "transparent" => {
            crate::color::coerce_to_color(&v).unwrap_or(v)
        }
        _ => v,
    }
}

fn is_string_like(v: &Value) -> bool {
    matches!(v, Value::Str(..))
}

/// `+` with a string-coercible operand: the non-string side is appended as
/// a nested value part; if both sides are strings, the right string's
/// delimiter is dropped so its contents inline without re-quoting.
fn string_concat(left: Value, right: Value) -> Value {
    use crate::value::StringPart;
    match (left, right) {
        (Value::Str(q, mut parts), Value::Str(_, rparts)) => {
            parts.extend(rparts);
            Value::Str(q, parts)
        }
        (Value::Str(q, mut parts), other) => {
            parts.push(StringPart::Inner(other));
            Value::Str(q, parts)
        }
        (other, Value::Str(q, mut parts)) => {
            let mut out = vec![StringPart::Inner(other)];
            out.append(&mut parts);
            Value::Str(q, out)
        }
        (l, r) => Value::Str(None, vec![StringPart::Inner(l), StringPart::Inner(r)]),
    }
}

fn structurally_equal(a: &Value, b: &Value) -> bool {
    a.stringify() == b.stringify()
}

fn numeric_op(op: Op, a: f64, b: f64, unit: String) -> EvalResult<Value> {
    match op {
        Op::Add => Ok(Value::number(a + b, unit)),
        Op::Sub => Ok(Value::number(a - b, unit)),
        Op::Mul => Ok(Value::number(a * b, unit)),
        Op::Div => {
            if b == 0.0 {
                return Err(EvalError::divide_by_zero());
            }
            Ok(Value::number(a / b, unit))
        }
        Op::Mod => {
            if b == 0.0 {
                return Err(EvalError::divide_by_zero());
            }
            Ok(Value::number(a % b, unit))
        }
        Op::Lt => Ok(Value::boolean(a < b)),
        Op::Gt => Ok(Value::boolean(a > b)),
        Op::Ge => Ok(Value::boolean(a >= b)),
        Op::Le => Ok(Value::boolean(a <= b)),
        Op::Eq | Op::And => unreachable!("handled before dispatch"),
    }
}

fn color_component_op(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Mod => a % b,
        _ => a,
    }
}

fn color_color_op(op: Op, c1: (f64, f64, f64, Option<f64>), c2: (f64, f64, f64, Option<f64>)) -> EvalResult<Value> {
    if matches!(op, Op::Div | Op::Mod) && (c2.0 == 0.0 || c2.1 == 0.0 || c2.2 == 0.0) {
        return Err(EvalError::divide_by_zero());
    }
    let r = color_component_op(op, c1.0, c2.0);
    let g = color_component_op(op, c1.1, c2.1);
    let b = color_component_op(op, c1.2, c2.2);
    let alpha = match (c1.3, c2.3) {
        (Some(a1), Some(a2)) => Some(color_component_op(op, a1, a2)),
        (Some(a1), None) => Some(a1),
        (None, Some(a2)) => Some(a2),
        (None, None) => None,
    };
    Ok(Value::color(r, g, b, alpha))
}

fn color_number_op(op: Op, c: (f64, f64, f64, Option<f64>), n: f64) -> EvalResult<Value> {
    if matches!(op, Op::Div | Op::Mod) && n == 0.0 {
        return Err(EvalError::divide_by_zero());
    }
    let r = color_component_op(op, c.0, n);
    let g = color_component_op(op, c.1, n);
    let b = color_component_op(op, c.2, n);
    Ok(Value::color(r, g, b, c.3))
}

/// Fallback when no typed rule applies: a raw-string rendering of the
/// expression exactly as written, with its original whitespace flags
/// (spec §4.3, final clause).
fn textual_fallback(left: Value, op: Op, right: Value, ws_before: bool, ws_after: bool) -> Value {
    Value::Expression(op, Box::new(left), Box::new(right), ws_before, ws_after)
}

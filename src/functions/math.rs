//! Math built-ins: `pow`, `mod`, `abs`, `min`, `max`, trig, `sqrt`, `pi`,
//! rounding, `percentage`, `unit`.
//!
//! The name-to-implementation dispatch follows the teacher's
//! enum-plus-`strum::Display` pattern (`modules/math.rs`'s `MathFunctions`),
//! generalized here across several small categories instead of one flat
//! math module, since the function library groups by argument shape.

use strum::{Display, EnumString};

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MathFn {
    Pow,
    Mod,
    Abs,
    Min,
    Max,
    Tan,
    Sin,
    Cos,
    Atan,
    Asin,
    Acos,
    Sqrt,
    Pi,
    Floor,
    Ceil,
    Round,
    Percentage,
    Unit,
}

fn as_number(v: &Value) -> EvalResult<(f64, &str)> {
    match v {
        Value::Number(n, unit) => Ok((*n, unit.as_str())),
        _ => Err(EvalError::argument_mismatch(format!("expected a number, got {}", v.stringify()))),
    }
}

pub fn call(func: MathFn, args: &[Value]) -> EvalResult<Value> {
    match func {
        MathFn::Pi => Ok(Value::number(std::f64::consts::PI, "")),
        MathFn::Pow => {
            let (base, unit) = as_number(arg(args, 0)?)?;
            let (exp, _) = as_number(arg(args, 1)?)?;
            Ok(Value::number(base.powf(exp), unit))
        }
        MathFn::Mod => {
            let (a, unit) = as_number(arg(args, 0)?)?;
            let (b, _) = as_number(arg(args, 1)?)?;
            if b == 0.0 {
                return Err(EvalError::divide_by_zero());
            }
            Ok(Value::number(a % b, unit))
        }
        MathFn::Abs => {
            let (a, unit) = as_number(arg(args, 0)?)?;
            Ok(Value::number(a.abs(), unit))
        }
        MathFn::Min | MathFn::Max => {
            let mut best = as_number(arg(args, 0)?)?;
            for a in &args[1..] {
                let cand = as_number(a)?;
                // Compare in `best`'s unit: LESS normalises every later
                // operand's unit to the running winner's before comparing,
                // so e.g. `max(10px, 5%)` surfaces the same "Cannot convert"
                // error `convert()` raises rather than silently comparing
                // incompatible magnitudes.
                let cand_in_best_unit = if cand.1 == best.1 { cand.0 } else { crate::functions::convert::convert(cand.0, cand.1, best.1)? };
                let pick = match func {
                    MathFn::Min => cand_in_best_unit < best.0,
                    _ => cand_in_best_unit > best.0,
                };
                if pick {
                    best = (cand.0, cand.1);
                }
            }
            Ok(Value::number(best.0, best.1))
        }
        MathFn::Tan => Ok(Value::number(as_number(arg(args, 0)?)?.0.tan(), "")),
        MathFn::Sin => Ok(Value::number(as_number(arg(args, 0)?)?.0.sin(), "")),
        MathFn::Cos => Ok(Value::number(as_number(arg(args, 0)?)?.0.cos(), "")),
        MathFn::Atan => Ok(Value::number(as_number(arg(args, 0)?)?.0.atan(), "rad")),
        MathFn::Asin => Ok(Value::number(as_number(arg(args, 0)?)?.0.asin(), "rad")),
        MathFn::Acos => Ok(Value::number(as_number(arg(args, 0)?)?.0.acos(), "rad")),
        MathFn::Sqrt => {
            let (n, unit) = as_number(arg(args, 0)?)?;
            Ok(Value::number(n.sqrt(), unit))
        }
        MathFn::Floor => {
            let (n, unit) = as_number(arg(args, 0)?)?;
            Ok(Value::number(n.floor(), unit))
        }
        MathFn::Ceil => {
            let (n, unit) = as_number(arg(args, 0)?)?;
            Ok(Value::number(n.ceil(), unit))
        }
        MathFn::Round => {
            let (n, unit) = as_number(arg(args, 0)?)?;
            let precision = args.get(1).map(|v| as_number(v)).transpose()?.map_or(0, |(p, _)| p as i32);
            let factor = 10f64.powi(precision);
            Ok(Value::number((n * factor).round() / factor, unit))
        }
        MathFn::Percentage => {
            let (n, _) = as_number(arg(args, 0)?)?;
            Ok(Value::number(n * 100.0, "%"))
        }
        MathFn::Unit => {
            let (n, _) = as_number(arg(args, 0)?)?;
            let unit = match args.get(1) {
                Some(Value::Keyword(k)) => k.clone(),
                Some(Value::Str(_, _)) => args[1].stringify(),
                _ => String::new(),
            };
            Ok(Value::number(n, unit))
        }
    }
}

fn arg(args: &[Value], i: usize) -> EvalResult<&Value> {
    args.get(i).ok_or_else(|| EvalError::argument_mismatch(format!("missing argument {}", i + 1)))
}

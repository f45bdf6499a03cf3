//! `e(v)` (unwrap/escape — drop quotes) and `%`/`_sprintf`-style string
//! formatting with `%s`/`%d`/`%a` substitution.

use crate::error::EvalResult;
use crate::value::Value;

pub fn escape(args: &[Value]) -> EvalResult<Value> {
    let v = args.first().cloned().unwrap_or_else(|| Value::string(None, ""));
    Ok(Value::keyword(v.stringify()))
}

/// `_sprintf`-equivalent: walks `template` left to right, replacing each
/// `%s`/`%d`/`%a` token with the stringified next positional argument.
/// `%d` truncates toward zero if the value has a fractional part; `%a`
/// accepts any value as-is (kept distinct from `%s` only for source
/// fidelity — both stringify the same way here).
pub fn sprintf(args: &[Value]) -> EvalResult<Value> {
    let Some(template_val) = args.first() else {
        return Ok(Value::string(None, ""));
    };
    let template = template_val.stringify();
    let mut rest = args[1.min(args.len())..].iter();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('s') | Some('a') => {
                    chars.next();
                    if let Some(v) = rest.next() {
                        out.push_str(&v.stringify());
                    }
                    continue;
                }
                Some('d') => {
                    chars.next();
                    if let Some(v) = rest.next() {
                        if let Value::Number(n, _) = v {
                            out.push_str(&format!("{}", n.trunc() as i64));
                        } else {
                            out.push_str(&v.stringify());
                        }
                    }
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    let delim = match template_val {
        Value::Str(q, _) => *q,
        _ => None,
    };
    Ok(Value::string(delim, out))
}

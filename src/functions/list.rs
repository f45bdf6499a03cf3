//! `extract(list, n)` — 1-based list indexing.

use crate::error::EvalResult;
use crate::value::Value;

/// Out-of-range indices are not an error: per the preserved source quirk,
/// they fall back to stringifying the index argument itself (DESIGN.md
/// Open Question 4).
pub fn extract(args: &[Value]) -> EvalResult<Value> {
    let list = args.first().cloned().unwrap_or_else(|| Value::List(" ".to_string(), Vec::new()));
    let index_val = args.get(1).cloned().unwrap_or_else(|| Value::number(1.0, ""));
    let index = match &index_val {
        Value::Number(n, _) => *n as i64,
        _ => 0,
    };

    let items: Vec<Value> = match &list {
        Value::List(_, items) => items.clone(),
        other => vec![other.clone()],
    };

    if index >= 1 && (index as usize) <= items.len() {
        Ok(items[index as usize - 1].clone())
    } else {
        Ok(Value::keyword(index_val.stringify()))
    }
}

//! Type predicates: `isnumber`, `isstring`, `iscolor`, `iskeyword`,
//! `ispixel`, `ispercentage`, `isem`, `isrem`.

use strum::{Display, EnumString};

use crate::error::EvalResult;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PredicateFn {
    Isnumber,
    Isstring,
    Iscolor,
    Iskeyword,
    Ispixel,
    Ispercentage,
    Isem,
    Isrem,
}

pub fn call(func: PredicateFn, args: &[Value]) -> EvalResult<Value> {
    let Some(v) = args.first() else {
        return Ok(Value::boolean(false));
    };
    let result = match func {
        PredicateFn::Isnumber => matches!(v, Value::Number(..)),
        PredicateFn::Isstring => matches!(v, Value::Str(..)),
        PredicateFn::Iscolor => v.is_color_like(),
        PredicateFn::Iskeyword => matches!(v, Value::Keyword(_)),
        PredicateFn::Ispixel => matches!(v, Value::Number(_, u) if u == "px"),
        PredicateFn::Ispercentage => matches!(v, Value::Number(_, u) if u == "%"),
        PredicateFn::Isem => matches!(v, Value::Number(_, u) if u == "em"),
        PredicateFn::Isrem => matches!(v, Value::Number(_, u) if u == "rem"),
    };
    Ok(Value::boolean(result))
}

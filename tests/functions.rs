//! Built-in function calls (math/color) and the user-registered function
//! registry (spec §6.1 `register_function`/`unregister_function`).

use std::rc::Rc;

use less_core::Compiler;
use pretty_assertions::assert_eq;

#[test]
fn builtin_math_and_color_functions_resolve() {
    let mut c = Compiler::new();
    let css = c.compile(".a { w: percentage(0.5); d: darken(#800000, 10%); }", None).unwrap();
    assert!(css.contains("w: 50%;"));
    assert!(css.contains("d: #"));
}

#[test]
fn user_registered_function_overrides_nothing_builtin() {
    let mut c = Compiler::new();
    c.register_function("double", Rc::new(|args| {
        let less_core::value::Value::Number(n, unit) = &args[0] else {
            return Err(less_core::error::EvalError::argument_mismatch("double: expected a number"));
        };
        Ok(less_core::value::Value::number(n * 2.0, unit.clone()))
    }));
    let css = c.compile(".a { w: double(21px); }", None).unwrap();
    assert!(css.contains("w: 42px;"));
}

#[test]
fn unregistering_a_function_falls_back_to_unresolved_call() {
    let mut c = Compiler::new();
    c.register_function("triple", Rc::new(|args| {
        let less_core::value::Value::Number(n, unit) = &args[0] else {
            return Err(less_core::error::EvalError::argument_mismatch("triple: expected a number"));
        };
        Ok(less_core::value::Value::number(n * 3.0, unit.clone()))
    }));
    c.unregister_function("triple");
    let css = c.compile(".a { w: triple(2px); }", None).unwrap();
    // No builtin or user function named "triple" — the call round-trips
    // as an unresolved function value (spec §4.2).
    assert_eq!(css, ".a {\n  w: triple(2px);\n}\n");
}

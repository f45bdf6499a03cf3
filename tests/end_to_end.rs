//! End-to-end `Compiler::compile` scenarios mirroring the concrete
//! examples worked through while designing the evaluator: variables and
//! arithmetic, nested selectors with `&`, guard mismatches, and unit
//! conversion failures.

use std::collections::HashMap;

use less_core::value::Value;
use less_core::Compiler;
use pretty_assertions::assert_eq;

fn compiler_with(vars: &[(&str, Value)]) -> Compiler {
    let mut c = Compiler::new();
    let map: HashMap<String, Value> = vars.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect();
    c.set_variables(map);
    c
}

#[test]
fn variable_and_arithmetic() {
    let mut c = compiler_with(&[("@color", Value::keyword("red")), ("@base", Value::number(960.0, "px"))]);
    let css = c.compile(".magic { color: @color; width: @base - 200; }", None).unwrap();
    assert_eq!(css, ".magic {\n  color: red;\n  width: 760px;\n}\n");
}

#[test]
fn nested_selector_with_ampersand_flattens_to_sibling_rules() {
    let mut c = Compiler::new();
    let css = c.compile("div, pre { color: blue; span, .big { height: 20px; } }", None).unwrap();
    assert!(css.contains("div,\npre {\n  color: blue;\n}"));
    assert!(css.contains("div span"));
    assert!(css.contains("pre .big"));
}

#[test]
fn guard_mismatch_reports_undefined_mixin() {
    let mut c = Compiler::new();
    let err = c
        .compile(".flipped(@x) when (@x =< 10) { rule: value; } .selector { .flipped(12); }", None)
        .unwrap_err();
    assert_eq!(err.message, ".flipped is undefined");
}

#[test]
fn unit_conversion_across_families_errors() {
    let mut c = Compiler::new();
    let err = c.compile(".s { max: max(10px, 5%); }", None).unwrap_err();
    assert!(err.message.contains("Cannot convert"));
}

#[test]
fn compressed_formatter_drops_optional_whitespace() {
    let mut c = Compiler::new();
    c.set_formatter("compressed").unwrap();
    let css = c.compile(".a { color: blue; width: 10px; }", None).unwrap();
    assert_eq!(css, ".a{color:blue;width:10px}");
}

#[test]
fn unknown_formatter_name_is_rejected() {
    let mut c = Compiler::new();
    assert!(c.set_formatter("fancy").is_err());
}

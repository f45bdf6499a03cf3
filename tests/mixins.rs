//! Mixin resolution and expansion: argument binding, closest-scope-wins
//! lookup, and `!important` suffix propagation.

use less_core::Compiler;
use pretty_assertions::assert_eq;

#[test]
fn mixin_call_binds_ordered_args_and_defaults() {
    let mut c = Compiler::new();
    let css = c
        .compile(".box(@w, @h: @w) { width: @w; height: @h; } .a { .box(10px); } .b { .box(10px, 20px); }", None)
        .unwrap();
    assert!(css.contains(".a {\n  width: 10px;\n  height: 10px;\n}"));
    assert!(css.contains(".b {\n  width: 10px;\n  height: 20px;\n}"));
}

#[test]
fn nested_scope_wins_over_outer_scope() {
    let mut c = Compiler::new();
    let css = c
        .compile(
            ".greet() { text: outer; } \
             .wrap { .greet() { text: inner; } .a { .greet(); } }",
            None,
        )
        .unwrap();
    assert!(css.contains("text: inner;"));
    assert!(!css.contains("text: outer;"));
}

#[test]
fn important_suffix_propagates_to_every_declaration_in_mixin_body() {
    let mut c = Compiler::new();
    let css = c.compile(".m() { a: 1; b: 2; } .x { .m() !important; }", None).unwrap();
    assert!(css.contains("a: 1 !important;"));
    assert!(css.contains("b: 2 !important;"));
}

#[test]
fn uncalled_nested_mixin_definition_emits_nothing_of_its_own() {
    let mut c = Compiler::new();
    // `.loop()` here is a definition (guarded, never called), not a call —
    // it must not contribute any lines to `.a`'s own output.
    let css = c.compile(".a { .loop() when (false) { x: 1; } }", None).unwrap();
    assert_eq!(css, ".a {\n}\n");
}

//! Output-style coverage (spec §6.3): `lessjs` (default), `classic`,
//! `compressed`, and dedup/comment consolidation (spec §4.5.4/§8 invariant
//! 5).

use less_core::Compiler;
use pretty_assertions::assert_eq;

#[test]
fn default_formatter_is_lessjs() {
    let mut c = Compiler::new();
    let css = c.compile(".a { x: 1; }", None).unwrap();
    assert_eq!(css, ".a {\n  x: 1;\n}\n");
}

#[test]
fn classic_formatter_matches_lessjs_for_a_single_rule() {
    let mut c = Compiler::new();
    c.set_formatter("classic").unwrap();
    let css = c.compile(".a { x: 1; }", None).unwrap();
    assert_eq!(css, ".a {\n  x: 1;\n}\n");
}

#[test]
fn media_block_nests_its_rules_in_braces() {
    let mut c = Compiler::new();
    let css = c.compile("@media (min-width: 768px) { .a { x: 1; } }", None).unwrap();
    assert_eq!(css, "@media (min-width: 768px) {\n  .a {\n    x: 1;\n  }\n}\n");
}

#[test]
fn duplicate_declarations_collapse_to_first_occurrence() {
    let mut c = Compiler::new();
    let css = c.compile(".a { x: 1; y: 2; x: 1; }", None).unwrap();
    assert_eq!(css.matches("x: 1;").count(), 1);
    assert!(css.find("x: 1;").unwrap() < css.find("y: 2;").unwrap());
}

#[test]
fn comments_preceding_a_duplicate_are_spliced_before_the_kept_occurrence() {
    let mut c = Compiler::new();
    c.set_preserve_comments(true);
    let css = c.compile(".a { x: 1; /* keep me */ x: 1; }", None).unwrap();
    assert!(css.contains("/* keep me */\n  x: 1;"));
    assert_eq!(css.matches("x: 1;").count(), 1);
}

//! `checked_compile`/`cached_compile`/`checked_cached_compile` (spec §6.1).

use std::fs;
use std::thread::sleep;
use std::time::Duration;

use less_core::Compiler;

fn tempdir() -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("less_core_cache_test_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn checked_compile_only_recompiles_when_input_is_newer() {
    let dir = tempdir();
    let input = dir.join("a.less");
    let output = dir.join("a.css");
    fs::write(&input, ".a { x: 1; }").unwrap();

    let mut c = Compiler::new();
    assert!(c.checked_compile(&input, &output).unwrap());
    assert_eq!(fs::read_to_string(&output).unwrap(), ".a {\n  x: 1;\n}\n");

    // Unchanged input, existing (newer-or-equal) output: no recompile.
    assert!(!c.checked_compile(&input, &output).unwrap());

    sleep(Duration::from_millis(1100));
    fs::write(&input, ".a { x: 2; }").unwrap();
    assert!(c.checked_compile(&input, &output).unwrap());
    assert_eq!(fs::read_to_string(&output).unwrap(), ".a {\n  x: 2;\n}\n");
}

#[test]
fn cached_compile_reuses_record_until_a_tracked_file_changes() {
    let dir = tempdir();
    let input = dir.join("b.less");
    fs::write(&input, ".a { x: 1; }").unwrap();

    let mut c = Compiler::new();
    let first = c.cached_compile(&input, false).unwrap();
    assert!(first.updated);

    let second = c.cached_compile(&input, false).unwrap();
    assert!(!second.updated);
    assert_eq!(second.compiled.as_deref(), Some(".a {\n  x: 1;\n}\n"));

    let forced = c.cached_compile(&input, true).unwrap();
    assert!(forced.updated);
}

#[test]
fn checked_cached_compile_writes_css_and_meta_sidecar() {
    let dir = tempdir();
    let input = dir.join("c.less");
    let output = dir.join("c.css");
    fs::write(&input, ".a { x: 1; }").unwrap();

    let mut c = Compiler::new();
    let css = c.checked_cached_compile(&input, &output, false).unwrap();
    assert_eq!(css, ".a {\n  x: 1;\n}\n");
    assert_eq!(fs::read_to_string(&output).unwrap(), css);
    assert!(dir.join("c.css.meta").exists());
}

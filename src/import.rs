//! `@import` path resolution (spec §4.7): searches the configured import
//! directories in order, preferring a `.less`-suffixed match over a bare one.

use std::path::{Path, PathBuf};

/// Resolves `url` against `dirs`, returning the first existing file found.
/// `.css`-suffixed urls are the caller's responsibility to skip before
/// calling this (they're left for the browser to fetch, never parsed).
#[must_use]
pub fn find_import(url: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let as_written = Path::new(url);
    let with_suffix = if url.ends_with(".less") { None } else { Some(format!("{url}.less")) };

    for dir in dirs {
        if let Some(suffixed) = &with_suffix {
            let candidate = dir.join(suffixed);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let candidate = dir.join(as_written);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if as_written.is_file() {
        return Some(as_written.to_path_buf());
    }
    if let Some(suffixed) = &with_suffix {
        let candidate = Path::new(suffixed);
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn prefers_less_suffix_over_bare_match() {
        let dir = std::env::temp_dir().join("less_core_import_test_suffix");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("colors"), "bare").unwrap();
        fs::write(dir.join("colors.less"), "suffixed").unwrap();

        let found = find_import("colors", std::slice::from_ref(&dir)).unwrap();
        assert_eq!(fs::read_to_string(&found).unwrap(), "suffixed");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn searches_dirs_in_order() {
        let dir_a = std::env::temp_dir().join("less_core_import_test_a");
        let dir_b = std::env::temp_dir().join("less_core_import_test_b");
        fs::create_dir_all(&dir_a).unwrap();
        fs::create_dir_all(&dir_b).unwrap();
        fs::write(dir_b.join("shared.less"), "from b").unwrap();

        let found = find_import("shared.less", &[dir_a.clone(), dir_b.clone()]).unwrap();
        assert_eq!(fs::read_to_string(&found).unwrap(), "from b");

        fs::remove_dir_all(&dir_a).ok();
        fs::remove_dir_all(&dir_b).ok();
    }

    #[test]
    fn missing_file_resolves_to_none() {
        assert!(find_import("does-not-exist", &[]).is_none());
    }
}

//! Checked/cached compilation (spec §6.1): recompile-if-newer and a
//! dependency-aware compiled-output cache. The `.meta` sidecar is
//! `postcard`-encoded, grounded on the teacher's `deep_clone` postcard
//! round-trip (`_teacher_namespace.rs`) — the same crate, used here for a
//! snapshot record instead of a heap clone.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A file mtime reduced to whole seconds since the epoch — the smallest
/// representation that survives a postcard round-trip, since `SystemTime`
/// itself has no stable wire format.
pub type Mtime = u64;

#[must_use]
pub fn mtime_of(path: &Path) -> Mtime {
    system_time_to_mtime(fs::metadata(path).and_then(|m| m.modified()).unwrap_or(UNIX_EPOCH))
}

#[must_use]
pub fn system_time_to_mtime(t: SystemTime) -> Mtime {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// `cache_record` (spec §6.1): `{ root, files, compiled, updated }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub root: PathBuf,
    pub files: HashMap<PathBuf, Mtime>,
    /// The compiled CSS. Cleared before the record is written to the
    /// `<out>.meta` sidecar (spec §6.1) — present here only for the
    /// in-memory record a caller gets back from `cached_compile`.
    pub compiled: Option<String>,
    /// Whether this call actually recompiled (`true`) or reused a record
    /// that was still fresh (`false`).
    pub updated: bool,
}

impl CacheRecord {
    /// `true` if `self` should be rebuilt: `force`, no tracked files yet, or
    /// any tracked file now newer on disk than its recorded mtime (spec
    /// §6.1 `cached_compile`).
    #[must_use]
    pub fn is_stale(&self, force: bool) -> bool {
        force || self.files.is_empty() || self.files.iter().any(|(path, recorded)| mtime_of(path) > *recorded)
    }

    /// The sidecar form written to `<out>.meta`: same record, `compiled`
    /// cleared (spec §6.1).
    #[must_use]
    pub fn without_compiled(&self) -> Self {
        Self { compiled: None, ..self.clone() }
    }
}

/// Loads a previously written `.meta` sidecar, if any and if it still
/// decodes (a format change across versions just misses the cache, spec
/// §6.4 — no cross-implementation compatibility is promised).
#[must_use]
pub fn load_meta(meta_path: &Path) -> Option<CacheRecord> {
    let bytes = fs::read(meta_path).ok()?;
    postcard::from_bytes(&bytes).ok()
}

pub fn save_meta(meta_path: &Path, record: &CacheRecord) -> std::io::Result<()> {
    let bytes = postcard::to_allocvec(&record.without_compiled())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    fs::write(meta_path, bytes)
}

/// `<out>.meta` (spec §6.1/§6.4): the sidecar path for a given compiled
/// output path.
#[must_use]
pub fn meta_path_for(out_path: &Path) -> PathBuf {
    let mut name = out_path.as_os_str().to_os_string();
    name.push(".meta");
    PathBuf::from(name)
}

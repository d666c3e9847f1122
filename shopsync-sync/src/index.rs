//! Local file index with `.shopifyignore` support.
//!
//! Each scanned root may carry a `.shopifyignore` file: one glob per line,
//! blank lines and `#` comments skipped. Globs match the path relative to the
//! root, and `*` crosses directory separators. The compiled matcher is cached
//! per root for the lifetime of the index.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{io_err, SyncError};

pub const IGNORE_FILE: &str = ".shopifyignore";

#[derive(Debug, Default)]
pub struct LocalFileIndex {
    ignores: Mutex<HashMap<PathBuf, Arc<GlobSet>>>,
}

impl LocalFileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn ignores(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<GlobSet>>> {
        match self.ignores.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every file under `base/<sub>` for each of `sub_dirs`, as forward-slash
    /// paths relative to `base`, minus ignored ones. An empty `sub_dirs`
    /// entry scans `base` itself. Missing directories contribute nothing.
    pub fn list_files(&self, base: &Path, sub_dirs: &[&str]) -> Result<BTreeSet<String>, SyncError> {
        let ignore = self.ignore_set(base)?;
        let mut files = BTreeSet::new();
        for sub in sub_dirs {
            let dir = if sub.is_empty() { base.to_path_buf() } else { base.join(sub) };
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir).follow_links(true) {
                let entry = entry.map_err(|source| SyncError::Walk {
                    path: dir.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(rel) = relative_key(base, entry.path()) else {
                    continue;
                };
                if rel == IGNORE_FILE || rel.ends_with(".shopsync.tmp") {
                    continue;
                }
                if ignore.is_match(&rel) {
                    debug!(path = %rel, "ignored");
                    continue;
                }
                files.insert(rel);
            }
        }
        Ok(files)
    }

    /// Whether `rel` (relative to `base`) is excluded by `base/.shopifyignore`.
    pub fn is_ignored(&self, base: &Path, rel: &str) -> Result<bool, SyncError> {
        Ok(self.ignore_set(base)?.is_match(rel.trim_start_matches('/')))
    }

    fn ignore_set(&self, base: &Path) -> Result<Arc<GlobSet>, SyncError> {
        if let Some(set) = self.ignores().get(base) {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(compile_ignore(&base.join(IGNORE_FILE))?);
        self.ignores().insert(base.to_path_buf(), Arc::clone(&set));
        Ok(set)
    }
}

/// `path` relative to `base` with forward slashes, or `None` if outside `base`.
pub fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn compile_ignore(path: &Path) -> Result<GlobSet, SyncError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(io_err(path, err)),
    };
    let mut builder = GlobSetBuilder::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let glob = GlobBuilder::new(line.trim_start_matches('/'))
            .literal_separator(false)
            .build()
            .map_err(|source| SyncError::Ignore {
                path: path.to_path_buf(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| SyncError::Ignore {
        path: path.to_path_buf(),
        source,
    })
}

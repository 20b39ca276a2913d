use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::WatchError;
use crate::utils::path::{normalize_path, parent_dir};

/// The deck file and the directory holding it, both absolute, plus files
/// outside that directory watched on their own (a config found higher up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    file: PathBuf,
    dir: PathBuf,
    extra: Vec<PathBuf>,
}

impl WatchTarget {
    /// Resolve `file` once; the target never changes afterwards.
    pub fn new(file: &Path) -> Self {
        let file = normalize_path(file);
        let dir = parent_dir(&file);
        Self {
            file,
            dir,
            extra: Vec::new(),
        }
    }

    /// Also watch `path`. A file inside the deck directory is already covered.
    pub fn with_file(mut self, path: &Path) -> Self {
        let path = normalize_path(path);
        if parent_dir(&path) != self.dir && !self.extra.contains(&path) {
            self.extra.push(path);
        }
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files watched outside the deck directory.
    pub fn extra(&self) -> &[PathBuf] {
        &self.extra
    }

    fn files(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.file).chain(&self.extra)
    }

    /// Whether `path` is one of the individually watched files.
    pub(super) fn is_file(&self, path: &Path) -> bool {
        self.files().any(|file| file == path)
    }

    /// Watch the directory (required) and each file (if present).
    pub(super) fn attach(&self, watcher: &mut RecommendedWatcher) -> Result<(), WatchError> {
        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Attach {
                path: self.dir.clone(),
                source,
            })?;

        for file in self.files() {
            if let Err(e) = watcher.watch(file, RecursiveMode::NonRecursive) {
                crate::log!("watch"; "cannot watch {}: {}", file.display(), e);
            }
        }
        Ok(())
    }

    /// Re-add file watches after an atomic save replaced a file.
    ///
    /// Returns `false` if some file is not back yet.
    pub(super) fn rewatch(&self, watcher: &mut RecommendedWatcher) -> bool {
        let mut all_back = true;
        for file in self.files() {
            if !file.exists() {
                all_back = false;
                continue;
            }
            let _ = watcher.unwatch(file);
            if let Err(e) = watcher.watch(file, RecursiveMode::NonRecursive) {
                crate::log!("watch"; "re-watch failed for {}: {}", file.display(), e);
                all_back = false;
            }
        }
        all_back
    }
}

//! Candidate file discovery.
//!
//! Walks a root directory with the same ignore-aware walker the rest of the
//! toolchain uses and yields candidate source files in deterministic
//! (sorted) order. The runner takes the resulting list as-is; callers with
//! their own discovery can bypass this module entirely.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Ignore-aware recursive file finder.
#[derive(Debug, Clone)]
pub struct FileFinder {
    root: PathBuf,
    extensions: Vec<String>,
    follow_symlinks: bool,
}

impl FileFinder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            follow_symlinks: false,
        }
    }

    /// Restrict results to the given file extensions (without dots). An
    /// empty list accepts every file.
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Collect candidate files, sorted for deterministic iteration order.
    /// Unreadable directory entries are skipped.
    pub fn find(&self) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.root)
            .follow_links(self.follow_symlinks)
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| self.accepts(path))
            .collect();

        files.sort();
        files
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|accepted| accepted == e))
    }
}

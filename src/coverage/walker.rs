//! Directory walker
//!
//! Visits the project tree in pre-order, prunes ignored subtrees and yields
//! every directory that directly contains Go test files. Candidates are
//! produced lazily so a worker can start as soon as its directory is found.

use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::IgnoreSet;
use crate::error::OverallsError;
use crate::utils::paths::package_arg;

/// File names that mark a directory as a test package
pub const TEST_FILE_PATTERN: &str = "*_test.go";

/// A directory selected for a test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDirectory {
    /// Absolute path
    pub path: PathBuf,
    /// `/`-separated path relative to the project root; empty for the root itself
    pub rel_path: String,
}

impl CandidateDirectory {
    /// Package argument for `go test`, e.g. `./pkg/a`
    pub fn package(&self) -> String {
        package_arg(&self.rel_path)
    }
}

/// Project tree walker
pub struct Walker<'a> {
    root: &'a Path,
    ignores: &'a IgnoreSet,
    test_files: Pattern,
}

impl<'a> Walker<'a> {
    pub fn new(root: &'a Path, ignores: &'a IgnoreSet) -> Result<Self> {
        let test_files = Pattern::new(TEST_FILE_PATTERN).map_err(|e| {
            OverallsError::config_error(format!("invalid test file pattern: {}", e))
        })?;
        Ok(Self {
            root,
            ignores,
            test_files,
        })
    }

    /// Iterate candidate directories in pre-order
    ///
    /// Any traversal error is yielded as an `Err`; callers treat it as fatal
    /// since a partial view of the tree would silently drop coverage.
    pub fn candidates(&self) -> impl Iterator<Item = Result<CandidateDirectory>> + '_ {
        WalkDir::new(self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if !entry.file_type().is_dir() {
                    return false;
                }
                let rel = relative_path(self.root, entry.path());
                if self.ignores.contains(&rel) {
                    debug!("Ignoring DIR: {}", rel);
                    return false;
                }
                true
            })
            .map(move |entry| -> Result<Option<CandidateDirectory>> {
                let entry = entry
                    .map_err(|e| OverallsError::walk_error(self.root, e.to_string()))?;
                self.inspect(entry.path())
            })
            .filter_map(Result::transpose)
    }

    fn inspect(&self, dir: &Path) -> Result<Option<CandidateDirectory>> {
        let rel_path = relative_path(self.root, dir);

        if !self.has_test_files(dir)? {
            debug!("No Go test files in DIR: {:?}, skipping", rel_path);
            return Ok(None);
        }

        Ok(Some(CandidateDirectory {
            path: dir.to_path_buf(),
            rel_path,
        }))
    }

    fn has_test_files(&self, dir: &Path) -> Result<bool> {
        let read_err = |e: std::io::Error| {
            OverallsError::walk_error(
                self.root,
                format!("checking for test files in {}: {}", dir.display(), e),
            )
        };

        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let name = entry.file_name();
            if self.test_files.matches(&name.to_string_lossy()) && entry.path().is_file() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// `path` relative to `root`, joined with `/`
fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

//! Path utilities for overalls

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::OverallsError;

/// Resolve the `--project` argument to an existing directory
///
/// The path is tried as given first (absolute or relative to the current
/// directory). A relative path that does not exist is then looked up under
/// `$GOPATH/src`, which is where GOPATH-style projects live.
pub fn resolve_project_root(project: &Path, gopath: Option<&Path>) -> Result<PathBuf> {
    if project.as_os_str().is_empty() {
        return Err(OverallsError::project_error(project, "path is empty").into());
    }

    if project.is_dir() {
        return Ok(project.to_path_buf());
    }

    if project.is_relative() {
        if let Some(src) = gopath.and_then(gopath_src) {
            let candidate = src.join(project);
            if candidate.is_dir() {
                return Ok(candidate);
            }
        }
    }

    Err(OverallsError::project_error(project, "no such directory").into())
}

/// `$GOPATH/src`, or `None` when GOPATH is empty or `.`
fn gopath_src(gopath: &Path) -> Option<PathBuf> {
    let gopath = gopath.to_string_lossy();
    let gopath = gopath.trim();
    if gopath.is_empty() || gopath == "." {
        return None;
    }
    // Only the first entry of a list-valued GOPATH is used
    let first = std::env::split_paths(gopath).next()?;
    Some(first.join("src"))
}

/// Render a directory relative to the project root the way `go test` expects it
pub fn package_arg(rel_path: &str) -> String {
    if rel_path.is_empty() {
        ".".to_string()
    } else {
        format!("./{}", rel_path)
    }
}

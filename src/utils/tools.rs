//! Tool detection
//!
//! The test command is an external program; make sure it can be found before
//! the walk starts so the failure names the tool instead of a package.

use std::path::PathBuf;

use anyhow::Result;
use which::which;

use crate::error::{hints, OverallsError};

/// Locate `program` on PATH (or at the given path) or fail with an install hint
pub fn require_tool(program: &str, required_for: &str) -> Result<PathBuf> {
    which(program).map_err(|_| {
        OverallsError::missing_tool(program, required_for, hints::go()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_tool() {
        let err = require_tool("definitely-not-a-real-tool-xyz", "running tests").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OverallsError>(),
            Some(OverallsError::MissingTool { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_require_existing_tool() {
        assert!(require_tool("sh", "running tests").is_ok());
    }
}

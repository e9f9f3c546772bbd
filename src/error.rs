//! Error types and helpers for user-friendly error messages
//!
//! Every fatal condition of a run ends up as one of these variants. They are
//! returned up to `main`, which prints them with hints and exits non-zero.

use std::path::PathBuf;

use thiserror::Error;

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum OverallsError {
    /// Configuration file or flag errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        hint: Option<String>,
    },

    /// Tool/executable not found
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// Invalid project path
    #[error("Invalid project path '{path}': {message}")]
    ProjectStructure {
        path: PathBuf,
        message: String,
        hint: String,
    },

    /// The directory walk could not continue
    #[error("Could not walk project path '{root}': {message}")]
    Walk { root: PathBuf, message: String },

    /// A per-directory test run failed
    #[error("Testing '{package}' failed: {message}")]
    Dispatch { package: String, message: String },

    /// The merged report could not be written
    #[error("Could not write '{path}': {message}")]
    Report { path: PathBuf, message: String },
}

impl OverallsError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: None,
        }
    }

    /// Create a configuration error with source and hint
    pub fn config_error_with_hint(
        message: impl Into<String>,
        source: Option<anyhow::Error>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
            hint: Some(hint.into()),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a project path error
    pub fn project_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProjectStructure {
            path: path.into(),
            message: message.into(),
            hint: hints::project_path().to_string(),
        }
    }

    pub fn walk_error(root: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Walk {
            root: root.into(),
            message: message.into(),
        }
    }

    pub fn dispatch_error(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dispatch {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn report_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Report {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        match self {
            OverallsError::Config { hint, .. } => {
                if let Some(h) = hint {
                    eprintln!("\n{} {}", style("HINT:").yellow().bold(), h);
                }
            }
            OverallsError::MissingTool {
                hint, required_for, ..
            } => {
                eprintln!("  (required for {})", required_for);
                eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
            }
            OverallsError::ProjectStructure { hint, .. } => {
                eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
            }
            OverallsError::Walk { .. }
            | OverallsError::Dispatch { .. }
            | OverallsError::Report { .. } => {}
        }

        eprintln!();
    }
}

/// Print any error from a run, using the styled form when it is one of ours
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<OverallsError>() {
        Some(e) => e.display_with_hints(),
        None => {
            eprintln!("\n{} {:#}\n", console::style("ERROR:").red().bold(), err);
        }
    }
}

/// Common error hints
pub mod hints {
    /// Get hint for a missing Go toolchain
    pub fn go() -> &'static str {
        "Install Go from https://go.dev/dl/ or use your package manager:\n\
         • macOS: brew install go\n\
         • Ubuntu: sudo apt install golang-go\n\
         • Windows: winget install GoLang.Go\n\
         \n\
         Or point --go (OVERALLS_GO) at the go binary to use."
    }

    /// Get hint for an unusable project path
    pub fn project_path() -> &'static str {
        "Pass --project as an existing directory, either absolute, relative to the\n\
         current directory, or relative to $GOPATH/src:\n\
         • overalls --project=.\n\
         • overalls --project=github.com/you/yourproject"
    }

    /// Get hint for an invalid overalls.toml
    pub fn invalid_overalls_toml() -> &'static str {
        "overalls.toml is invalid. Common issues:\n\
         • Settings must live under an [overalls] table\n\
         • covermode must be one of set, count, atomic\n\
         • concurrency must be at least 1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_names_package() {
        let err = OverallsError::dispatch_error("./pkg/a", "exit status: 1");
        assert_eq!(err.to_string(), "Testing './pkg/a' failed: exit status: 1");
    }

    #[test]
    fn test_project_error_carries_hint() {
        let err = OverallsError::project_error("/nope", "does not exist");
        match err {
            OverallsError::ProjectStructure { hint, .. } => {
                assert!(hint.contains("--project"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = OverallsError::report_error("/x", "denied").into();
        assert!(err.downcast_ref::<OverallsError>().is_some());
    }
}

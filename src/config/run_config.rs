//! Immutable configuration for a single run

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;

use crate::error::OverallsError;

/// Directories skipped when no ignore list is given
pub const DEFAULT_IGNORES: &[&str] = &[".git", "vendor"];

/// Program used to run the tests when none is configured
pub const DEFAULT_GO_PROGRAM: &str = "go";

/// Coverage mode passed to `go test -covermode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CoverMode {
    /// Did each statement run?
    Set,
    /// How many times did each statement run?
    #[default]
    Count,
    /// Like count, but safe for parallel tests
    Atomic,
}

impl std::str::FromStr for CoverMode {
    type Err = OverallsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "set" => Ok(CoverMode::Set),
            "count" => Ok(CoverMode::Count),
            "atomic" => Ok(CoverMode::Atomic),
            _ => Err(OverallsError::config_error(format!(
                "invalid covermode '{}'. Valid modes: set, count, atomic",
                s
            ))),
        }
    }
}

impl std::fmt::Display for CoverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverMode::Set => write!(f, "set"),
            CoverMode::Count => write!(f, "count"),
            CoverMode::Atomic => write!(f, "atomic"),
        }
    }
}

/// Directory paths, relative to the project root, that are never descended into
///
/// Membership is an exact string match on the `/`-separated relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    entries: HashSet<String>,
}

impl IgnoreSet {
    /// Parse a comma separated list such as `.git,vendor`
    pub fn parse(list: &str) -> Self {
        Self::from_tokens(list.split(','))
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = tokens
            .into_iter()
            .filter_map(|t| normalize_token(t.as_ref()))
            .collect();
        Self { entries }
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.entries.contains(rel_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_token(token: &str) -> Option<String> {
    let token = token.trim().replace('\\', "/");
    let token = token.strip_prefix("./").unwrap_or(token.as_str());
    let token = token.trim_end_matches('/');
    if token.is_empty() || token == "." {
        None
    } else {
        Some(token.to_string())
    }
}

/// One layer of optional settings; command line and `overalls.toml` each produce one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub covermode: Option<CoverMode>,
    pub ignore: Option<IgnoreSet>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub go_args: Option<Vec<String>>,
}

impl Settings {
    /// Fill every unset field from `fallback`
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            covermode: self.covermode.or(fallback.covermode),
            ignore: self.ignore.or(fallback.ignore),
            concurrency: self.concurrency.or(fallback.concurrency),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
            go_args: self.go_args.or(fallback.go_args),
        }
    }
}

/// Everything the walker and the dispatcher need, fixed before the walk starts
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Canonical, existing project directory
    pub project_root: PathBuf,
    pub mode: CoverMode,
    pub ignores: IgnoreSet,
    /// Inserted verbatim after `go test`
    pub go_args: Vec<String>,
    /// Cap on simultaneously running test processes; `None` is unbounded
    pub concurrency: Option<usize>,
    /// Deadline for each test process
    pub timeout: Option<Duration>,
    pub go_program: String,
}

impl RunConfig {
    /// Build the final configuration, applying defaults to anything still unset
    pub fn from_settings(
        project_root: &Path,
        settings: Settings,
        go_program: Option<String>,
    ) -> Result<Self> {
        if !project_root.is_dir() {
            return Err(
                OverallsError::project_error(project_root, "not an existing directory").into(),
            );
        }
        let project_root = project_root.canonicalize().map_err(|e| {
            OverallsError::project_error(project_root, format!("cannot resolve: {}", e))
        })?;

        if settings.concurrency == Some(0) {
            return Err(OverallsError::config_error_with_hint(
                "concurrency must be at least 1",
                None,
                "Omit --concurrency to run every package at once",
            )
            .into());
        }
        if settings.timeout_secs == Some(0) {
            return Err(OverallsError::config_error("timeout must be at least 1 second").into());
        }

        let ignores = settings
            .ignore
            .unwrap_or_else(|| IgnoreSet::from_tokens(DEFAULT_IGNORES));

        Ok(Self {
            project_root,
            mode: settings.covermode.unwrap_or_default(),
            ignores,
            go_args: settings.go_args.unwrap_or_default(),
            concurrency: settings.concurrency,
            timeout: settings.timeout_secs.map(Duration::from_secs),
            go_program: go_program.unwrap_or_else(|| DEFAULT_GO_PROGRAM.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cover_mode_parse() {
        assert_eq!("set".parse::<CoverMode>().unwrap(), CoverMode::Set);
        assert_eq!("COUNT".parse::<CoverMode>().unwrap(), CoverMode::Count);
        assert_eq!(" atomic ".parse::<CoverMode>().unwrap(), CoverMode::Atomic);
        assert!("branch".parse::<CoverMode>().is_err());
    }

    #[test]
    fn test_cover_mode_display() {
        assert_eq!(CoverMode::Set.to_string(), "set");
        assert_eq!(CoverMode::Count.to_string(), "count");
        assert_eq!(CoverMode::Atomic.to_string(), "atomic");
        assert_eq!(CoverMode::default(), CoverMode::Count);
    }

    #[test]
    fn test_ignore_set_parse() {
        let set = IgnoreSet::parse(".git, vendor,,./third_party/,a\\b");
        assert_eq!(set.len(), 4);
        assert!(set.contains(".git"));
        assert!(set.contains("vendor"));
        assert!(set.contains("third_party"));
        assert!(set.contains("a/b"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_ignore_set_is_exact_match() {
        let set = IgnoreSet::parse("vendor");
        assert!(set.contains("vendor"));
        assert!(!set.contains("pkg/vendor"));
        assert!(!set.contains("vendo"));
        assert!(!set.contains("vendor*"));
    }

    #[test]
    fn test_settings_precedence() {
        let cli = Settings {
            covermode: Some(CoverMode::Atomic),
            ..Default::default()
        };
        let file = Settings {
            covermode: Some(CoverMode::Set),
            concurrency: Some(2),
            ..Default::default()
        };
        let merged = cli.or(file);
        assert_eq!(merged.covermode, Some(CoverMode::Atomic));
        assert_eq!(merged.concurrency, Some(2));
        assert_eq!(merged.ignore, None);
    }

    #[test]
    fn test_from_settings_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            RunConfig::from_settings(temp_dir.path(), Settings::default(), None).unwrap();

        assert_eq!(config.mode, CoverMode::Count);
        assert!(config.ignores.contains(".git"));
        assert!(config.ignores.contains("vendor"));
        assert_eq!(config.go_program, "go");
        assert!(config.go_args.is_empty());
        assert_eq!(config.concurrency, None);
        assert_eq!(config.timeout, None);
        assert!(config.project_root.is_absolute());
    }

    #[test]
    fn test_from_settings_rejects_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = RunConfig::from_settings(&missing, Settings::default(), None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OverallsError>(),
            Some(OverallsError::ProjectStructure { .. })
        ));
    }

    #[test]
    fn test_from_settings_rejects_zero_concurrency() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(RunConfig::from_settings(temp_dir.path(), settings, None).is_err());
    }

    #[test]
    fn test_from_settings_explicit_empty_ignore() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            ignore: Some(IgnoreSet::default()),
            timeout_secs: Some(30),
            ..Default::default()
        };
        let config = RunConfig::from_settings(temp_dir.path(), settings, None).unwrap();
        assert!(config.ignores.is_empty());
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}

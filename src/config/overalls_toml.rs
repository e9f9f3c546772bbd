//! overalls.toml parsing
//!
//! An optional file at the project root that supplies defaults for the
//! command line flags:
//!
//! ```toml
//! [overalls]
//! covermode = "atomic"
//! ignore = [".git", "vendor", "testdata"]
//! concurrency = 4
//! timeout_secs = 600
//! go_args = ["-race"]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::run_config::{CoverMode, IgnoreSet, Settings};
use crate::error::{hints, OverallsError};

/// Name of the configuration file looked up in the project root
pub const CONFIG_FILENAME: &str = "overalls.toml";

/// Root of overalls.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverallsToml {
    #[serde(default)]
    pub overalls: OverallsSection,
}

/// The `[overalls]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverallsSection {
    pub covermode: Option<String>,
    pub ignore: Option<Vec<String>>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub go_args: Option<Vec<String>>,
}

impl OverallsToml {
    /// Load `overalls.toml` from the project root, if there is one
    pub fn load_optional(project_root: &Path) -> Result<Option<Self>> {
        let path = project_root.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        Self::parse(&content).map(Some)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            OverallsError::config_error_with_hint(
                format!("Failed to parse {}: {}", CONFIG_FILENAME, e.message()),
                Some(e.into()),
                hints::invalid_overalls_toml(),
            )
            .into()
        })
    }

    /// Convert to a settings layer, validating the covermode
    pub fn into_settings(self) -> Result<Settings> {
        let section = self.overalls;
        let covermode = section
            .covermode
            .as_deref()
            .map(str::parse::<CoverMode>)
            .transpose()?;

        Ok(Settings {
            covermode,
            ignore: section.ignore.map(IgnoreSet::from_tokens),
            concurrency: section.concurrency,
            timeout_secs: section.timeout_secs,
            go_args: section.go_args,
        })
    }
}

//! CLI argument parsing using clap derive macros

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{CoverMode, IgnoreSet, OverallsToml, RunConfig, Settings};
use crate::coverage;
use crate::utils::paths::resolve_project_root;
use crate::utils::terminal;
use crate::utils::tools::require_tool;

const LONG_ABOUT: &str = "\
overalls recursively traverses your project's directory structure running
'go test -covermode=<mode> -coverprofile=profile.coverprofile' in each
directory with Go test files, and concatenates the results into one profile
in your project root named 'overalls.coverprofile'.

Defaults for every option can also be set in an optional overalls.toml at
the project root; command line flags take precedence.";

/// overalls - multi-package Go coverage
///
/// Runs go test with coverage in every package of a project and merges the profiles.
#[derive(Parser, Debug)]
#[command(name = "overalls")]
#[command(author, version, about, long_about = LONG_ABOUT)]
pub struct Cli {
    /// Project path: absolute, relative to the current directory, or relative to $GOPATH/src
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// GOPATH used to resolve --project when it is not found as given
    #[arg(long, env = "GOPATH", hide_env_values = true)]
    pub gopath: Option<PathBuf>,

    /// Mode to run when testing files [default: count]
    #[arg(long, value_enum)]
    pub covermode: Option<CoverMode>,

    /// Comma separated list of directories to ignore, relative to the project path [default: .git,vendor]
    #[arg(long, value_name = "DIRS")]
    pub ignore: Option<String>,

    /// Maximum number of go test processes running at once [default: unbounded]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Kill any go test process running longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Program used to run the tests
    #[arg(long = "go", env = "OVERALLS_GO", value_name = "PROGRAM")]
    pub go_program: Option<String>,

    /// Print debug messages
    #[arg(short, long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Extra arguments passed to go test (after `--`)
    #[arg(last = true, value_name = "GO_TEST_ARGS")]
    pub go_args: Vec<String>,
}

impl Cli {
    /// Execute a full coverage run
    pub async fn execute(self) -> Result<()> {
        if self.no_color {
            terminal::disable_colors();
        }
        init_logging(self.debug, !self.no_color);

        if let Some(gopath) = &self.gopath {
            debug!("GOPATH: {}", gopath.display());
        }
        let project = resolve_project_root(&self.project, self.gopath.as_deref())?;
        debug!("Project Path: {}", project.display());

        let file_settings = match OverallsToml::load_optional(&project)? {
            Some(file) => file.into_settings()?,
            None => Settings::default(),
        };
        let settings = self.settings().or(file_settings);
        let config = RunConfig::from_settings(&project, settings, self.go_program.clone())?;

        if config.ignores.is_empty() {
            debug!("No ignored directories");
        } else {
            debug!("Ignoring {} director(ies)", config.ignores.len());
        }
        require_tool(&config.go_program, "running go test")?;

        let summary = coverage::run(Arc::new(config)).await?;
        terminal::print_success(&format!(
            "merged {} package profile(s) into {}",
            summary.packages,
            summary.output.display()
        ));
        Ok(())
    }

    /// The command line layer of settings
    fn settings(&self) -> Settings {
        Settings {
            covermode: self.covermode,
            ignore: self.ignore.as_deref().map(IgnoreSet::parse),
            concurrency: self.concurrency,
            timeout_secs: self.timeout,
            go_args: if self.go_args.is_empty() {
                None
            } else {
                Some(self.go_args.clone())
            },
        }
    }
}

/// Install the global log subscriber; `RUST_LOG` overrides the level
fn init_logging(debug: bool, ansi: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,overalls={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stdout)
        .init();
}

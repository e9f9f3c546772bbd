//! overalls - multi-package Go coverage
//!
//! Walks a Go project, runs `go test -coverprofile` in every directory that
//! holds test files (all packages at once), and merges the per-package
//! profiles into a single `overalls.coverprofile` at the project root.
//!
//! ## Architecture
//!
//! ```text
//! cli → config → coverage::walker → coverage::dispatch → coverage::merge
//!                                        ↓
//!                                  exec (go test)
//! ```

mod cli;
mod config;
mod coverage;
mod error;
mod exec;
mod utils;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error::report(&e);
            ExitCode::FAILURE
        }
    }
}

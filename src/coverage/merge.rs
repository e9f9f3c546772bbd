//! Coverage profile merging
//!
//! Profiles are treated as opaque line-oriented text. The only line that is
//! understood is the `mode: <mode>` header, which is stripped from every
//! input and written once at the top of the merged output.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;
use regex::bytes::Regex;

use crate::config::CoverMode;
use crate::error::OverallsError;

/// Merged profile written at the project root
pub const OUT_FILENAME: &str = "overalls.coverprofile";

/// Per-package profile written by `go test` into each tested directory
pub const PKG_FILENAME: &str = "profile.coverprofile";

fn mode_line() -> &'static Regex {
    static MODE_LINE: OnceLock<Regex> = OnceLock::new();
    MODE_LINE.get_or_init(|| {
        Regex::new(r"(?m)^mode: [a-z]+\r?\n").expect("mode line pattern is valid")
    })
}

/// The header line for `mode`
pub fn mode_header(mode: CoverMode) -> String {
    format!("mode: {}\n", mode)
}

/// Merge per-package profiles, in the given order, into one profile
///
/// Every `mode:` line is removed regardless of the mode it names, and a
/// single header for `mode` is prepended. Inputs missing a final newline are
/// terminated so their last line cannot run into the next profile.
pub fn merge_profiles<I, B>(mode: CoverMode, profiles: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut body = Vec::new();
    for profile in profiles {
        let profile = profile.as_ref();
        if profile.is_empty() {
            continue;
        }
        body.extend_from_slice(profile);
        if !profile.ends_with(b"\n") {
            body.push(b'\n');
        }
    }

    let body = mode_line().replace_all(&body, &b""[..]);

    let mut merged = mode_header(mode).into_bytes();
    merged.extend_from_slice(&body);
    merged
}

/// Write the merged profile to `overalls.coverprofile` under `root`
pub fn write_report(root: &Path, merged: &[u8]) -> Result<PathBuf> {
    let path = root.join(OUT_FILENAME);
    std::fs::write(&path, merged)
        .map_err(|e| OverallsError::report_error(&path, e.to_string()))?;
    Ok(path)
}

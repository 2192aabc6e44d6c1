// src/snapshot.rs
//
// Snapshot identifiers encoded in OOMMF output file names.
//
// OOMMF names magnetisation snapshots like
//   <basename>-<driver>-<output>-<stage>-<iteration>.omf
// e.g. `skyrmion-Oxs_MinDriver-Magnetization-02-0000005.omf`.
//
// Two conventions are read from the file *name* (directories are ignored):
// - file index: the 4th '-'-delimited token, as an integer.
// - snapshot key: the last two word tokens before the extension, as
//   (stage, iteration). Word tokens are runs of [A-Za-z0-9_'].

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Result, ViewError};

/// (stage, iteration) pair used to join a snapshot to its ODT row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SnapshotKey {
    pub stage: u64,
    pub iteration: u64,
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} iteration {}", self.stage, self.iteration)
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:^|[^\w'])(?P<stage>\d+)[^\w']+(?P<iteration>\d+)[^\w']+(?P<ext>[\w']+)[^\w']*$",
        )
        .expect("snapshot key pattern is valid")
    })
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ViewError::cross_reference(path.display().to_string(), "no usable file name"))
}

impl SnapshotKey {
    /// Parse `(stage, iteration)` from a snapshot file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = file_name(path)?;
        let caps = key_pattern().captures(name).ok_or_else(|| {
            ViewError::cross_reference(
                path.display().to_string(),
                "file name does not end in '<stage>-<iteration>.<ext>'",
            )
        })?;

        let parse = |group: &str| -> Result<u64> {
            caps[group].parse::<u64>().map_err(|_| {
                ViewError::cross_reference(
                    path.display().to_string(),
                    format!("{} token '{}' is not an integer", group, &caps[group]),
                )
            })
        };
        Ok(Self {
            stage: parse("stage")?,
            iteration: parse("iteration")?,
        })
    }
}

/// Integer held in the 4th '-'-delimited token of the file name.
pub fn file_index(path: &Path) -> Result<i64> {
    let name = file_name(path)?;
    let token = name.split('-').nth(3).ok_or_else(|| {
        ViewError::cross_reference(
            path.display().to_string(),
            "file name has fewer than four '-'-delimited tokens",
        )
    })?;
    // the token may carry the extension when it is the last one
    let token = token.split('.').next().unwrap_or(token);
    token.parse::<i64>().map_err(|_| {
        ViewError::cross_reference(
            path.display().to_string(),
            format!("file index token '{}' is not an integer", token),
        )
    })
}

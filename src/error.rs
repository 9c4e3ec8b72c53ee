//! Error types for the scanner.
//!
//! Classification outcomes ("no remote", "not pushed", ...) are values of
//! [`crate::NotBackedUpReason`]. Everything here is a real fault.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The git executable could not be run at all.
    #[error("could not run `{binary}`, is git installed?")]
    GitNotInstalled { binary: String },

    /// git ran but exited with a failure we don't know how to interpret.
    #[error("`git {args}` failed in {} ({status}): {stderr}", .path.display())]
    GitCommand {
        path: PathBuf,
        args: String,
        status: String,
        stderr: String,
    },

    #[error("`git {args}` in {} did not finish within {timeout:?}", .path.display())]
    GitTimeout {
        path: PathBuf,
        args: String,
        timeout: Duration,
    },

    #[error("failed to run git in {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("libgit2 failed in {}: {source}", .path.display())]
    Git2 {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to expand glob pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("failed to load config from {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn git2(path: &Path, source: git2::Error) -> Self {
        Error::Git2 {
            path: path.to_path_buf(),
            source,
        }
    }
}

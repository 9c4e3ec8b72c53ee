//! Find project folders that aren't backed up to a git remote.
//!
//! A directory is backed up when it is a git repository with a remote, has
//! nothing uncommitted, and every local branch has been pushed. Everything
//! else is reported with the first reason it fails.

use std::path::Path;

pub mod candidates;
pub mod config;
pub mod error;
pub mod logger;
pub mod probe;
pub mod scanner;
pub mod verdict;

pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use probe::{CommandProbe, Git2Probe, GitProbe};
pub use scanner::{classify, Scanner, Verdicts};
pub use verdict::{NotBackedUpReason, Verdict};

/// Scan `cwd` with default settings, using the git executable.
///
/// With `pattern`, every directory it matches (relative to `cwd`) is checked.
/// Without one, every git repository below `cwd` is checked.
///
/// # Errors
///
/// [`Error::GitNotInstalled`] if git can't be run, before anything is scanned.
pub fn scan(pattern: Option<&str>, cwd: impl AsRef<Path>) -> Result<Verdicts> {
    Scanner::default().pattern(pattern).cwd(cwd).scan()
}

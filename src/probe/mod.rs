//! Questions asked of a candidate directory.
//!
//! A "not a git repository" answer is `Ok(false)`. Only faults that stop us
//! from answering at all come back as `Err`, so a broken repository is never
//! mistaken for a backed up one.

use std::path::Path;
use std::rc::Rc;

use crate::config::{Backend, Config};
use crate::error::Result;

mod command;
mod libgit2;

pub use command::CommandProbe;
pub use libgit2::Git2Probe;

pub trait GitProbe {
    /// Checks once, before any scanning, that git can be used at all.
    fn ensure_available(&self) -> Result<()>;

    /// `path` or one of its ancestors holds a repository.
    fn has_repository(&self, path: &Path) -> Result<bool>;

    /// The repository has at least one configured remote.
    fn has_remote(&self, path: &Path) -> Result<bool>;

    /// No staged, unstaged or untracked (non-ignored) changes.
    fn is_fully_committed(&self, path: &Path) -> Result<bool>;

    /// Every local branch tip is reachable from a remote-tracking ref.
    fn is_fully_pushed(&self, path: &Path) -> Result<bool>;
}

/// Build the probe selected by `config`.
pub fn from_config(config: &Config) -> Rc<dyn GitProbe> {
    match config.backend {
        Backend::Command => Rc::new(
            CommandProbe::new()
                .with_binary(&config.git_binary)
                .with_timeout(config.git_timeout()),
        ),
        Backend::Libgit2 => Rc::new(Git2Probe),
    }
}

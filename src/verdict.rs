use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Why a directory is not backed up. Checks run in declaration order and the
/// first one that fails decides the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotBackedUpReason {
    NoRepo,
    NoRemote,
    NotCommitted,
    NotPushed,
}

impl NotBackedUpReason {
    pub fn message(self) -> &'static str {
        match self {
            NotBackedUpReason::NoRepo => "No git repository",
            NotBackedUpReason::NoRemote => "No remotes in git repository",
            NotBackedUpReason::NotCommitted => "Some code is not yet committed",
            NotBackedUpReason::NotPushed => "Some code is not pushed to a remote",
        }
    }
}

/// A directory that is not backed up, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub path: PathBuf,
    pub reason: NotBackedUpReason,
}

impl Verdict {
    pub fn new(path: impl Into<PathBuf>, reason: NotBackedUpReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}.", self.path.display(), self.reason.message())
    }
}

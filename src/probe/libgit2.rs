use std::path::Path;

use git2::{ErrorCode, Repository, StatusOptions};
use tracing::debug;

use super::GitProbe;
use crate::error::{Error, Result};

/// Answers through libgit2. Needs no git executable on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Probe;

impl Git2Probe {
    fn open(path: &Path) -> Result<Repository> {
        Repository::discover(path).map_err(|e| Error::git2(path, e))
    }
}

impl GitProbe for Git2Probe {
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    fn has_repository(&self, path: &Path) -> Result<bool> {
        match Repository::discover(path) {
            Ok(repo) => {
                debug!(path = %path.display(), git_dir = %repo.path().display(), "found repository");
                Ok(true)
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(Error::git2(path, e)),
        }
    }

    fn has_remote(&self, path: &Path) -> Result<bool> {
        let repo = Self::open(path)?;
        let remotes = repo.remotes().map_err(|e| Error::git2(path, e))?;
        Ok(!remotes.is_empty())
    }

    fn is_fully_committed(&self, path: &Path) -> Result<bool> {
        let repo = Self::open(path)?;
        if repo.is_bare() {
            return Ok(true);
        }

        let statuses = repo
            .statuses(Some(
                StatusOptions::new()
                    .include_untracked(true)
                    .include_ignored(false)
                    .include_unmodified(false),
            ))
            .map_err(|e| Error::git2(path, e))?;
        Ok(statuses.is_empty())
    }

    fn is_fully_pushed(&self, path: &Path) -> Result<bool> {
        let repo = Self::open(path)?;
        let mut walk = repo.revwalk().map_err(|e| Error::git2(path, e))?;
        walk.push_glob("heads").map_err(|e| Error::git2(path, e))?;
        // HEAD covers commits made while detached
        match repo.head() {
            Ok(_) => walk.push_head().map_err(|e| Error::git2(path, e))?,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {}
            Err(e) => return Err(Error::git2(path, e)),
        }
        walk.hide_glob("remotes").map_err(|e| Error::git2(path, e))?;

        match walk.next() {
            None => Ok(true),
            Some(Ok(oid)) => {
                debug!(path = %path.display(), %oid, "commit not on any remote");
                Ok(false)
            }
            Some(Err(e)) => Err(Error::git2(path, e)),
        }
    }
}

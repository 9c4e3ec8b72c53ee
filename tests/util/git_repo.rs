use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// A scratch tree of project folders in every state the scanner tells apart.
/// Bare remotes live in a separate directory so they never show up as
/// candidates.
pub struct Projects {
    pub root: TempDir,
    remotes: TempDir,
}

impl Projects {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            remotes: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// A folder with no repository.
    pub fn plain(&self, name: &str) -> PathBuf {
        let dir = self.path(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README.md"), "# not versioned\n").unwrap();
        dir
    }

    /// A repository with one commit and no remote.
    pub fn local(&self, name: &str) -> PathBuf {
        let dir = self.path(name);
        fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "--quiet", "--initial-branch=main"]);
        commit(&dir, "README.md", "# hello\n");
        dir
    }

    /// A repository with a remote that has everything pushed.
    pub fn pushed(&self, name: &str) -> PathBuf {
        let dir = self.with_remote(name);
        git(&dir, &["push", "--quiet", "origin", "main"]);
        dir
    }

    /// A bare repository, itself pointing at a remote.
    pub fn bare(&self, name: &str) -> PathBuf {
        let dir = self.path(name);
        git(
            self.root.path(),
            &["init", "--quiet", "--bare", "--initial-branch=main", name],
        );
        let upstream = self.remotes.path().join(format!("{name}-upstream.git"));
        git(&dir, &["remote", "add", "origin", upstream.to_str().unwrap()]);
        dir
    }

    /// A repository with a remote configured but nothing pushed to it.
    pub fn with_remote(&self, name: &str) -> PathBuf {
        let dir = self.local(name);
        let remote = self.remotes.path().join(format!("{name}.git"));
        git(
            self.remotes.path(),
            &[
                "init",
                "--quiet",
                "--bare",
                "--initial-branch=main",
                remote.to_str().unwrap(),
            ],
        );
        git(&dir, &["remote", "add", "origin", remote.to_str().unwrap()]);
        dir
    }
}

pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_NAME", "Author Name")
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_COMMITTER_NAME", "Committer Name")
        .env("GIT_COMMITTER_EMAIL", "committer@example.com")
        .output()
        .unwrap_or_else(|_| panic!("failed to execute git {args:?}"));

    assert!(
        output.status.success(),
        "git {args:?} failed in {}: {}",
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn commit(dir: &Path, file_name: &str, contents: &str) {
    fs::write(dir.join(file_name), contents).unwrap();
    git(dir, &["add", file_name]);
    git(dir, &["commit", "--quiet", "-m", &format!("update {file_name}")]);
}

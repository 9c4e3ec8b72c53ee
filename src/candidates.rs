//! Enumerate the directories a scan looks at.
//!
//! With a glob pattern, every directory it matches under the base directory is
//! a candidate. Without one, the base directory is walked and every directory
//! holding a `.git` entry is a candidate. Both orders are deterministic for a
//! fixed filesystem: `glob` and the walk both go alphabetically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, Paths};
use tracing::{trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CandidateOptions {
    pub exclude: Vec<String>,
    pub include_hidden: bool,
    pub max_depth: usize,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CandidateOptions {
    fn from(config: &Config) -> Self {
        Self {
            exclude: config.exclude.clone(),
            include_hidden: config.include_hidden,
            max_depth: config.max_depth,
        }
    }
}

/// Decides which directories are skipped.
#[derive(Debug, Clone)]
struct Filter {
    root: PathBuf,
    exclude: Vec<Pattern>,
    include_hidden: bool,
}

impl Filter {
    fn new(root: &Path, options: &CandidateOptions) -> Result<Self> {
        let exclude = options
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| Error::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: root.to_path_buf(),
            exclude,
            include_hidden: options.include_hidden,
        })
    }

    fn is_hidden(&self, path: &Path) -> bool {
        if self.include_hidden || path == self.root {
            return false;
        }
        path.file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    }

    /// Exclude patterns match either the path relative to the root, or the
    /// full path.
    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.exclude
            .iter()
            .any(|pattern| pattern.matches_path(relative) || pattern.matches_path(path))
    }

    fn skips(&self, path: &Path) -> bool {
        self.is_hidden(path) || self.is_excluded(path)
    }
}

type WalkIter = walkdir::FilterEntry<walkdir::IntoIter, Box<dyn FnMut(&DirEntry) -> bool>>;

enum Source {
    Pattern(Paths),
    Walk(WalkIter),
}

/// Lazily produced candidate directories.
pub struct Candidates {
    source: Source,
    filter: Filter,
}

impl Candidates {
    pub fn new(pattern: Option<&str>, root: &Path, options: &CandidateOptions) -> Result<Self> {
        let filter = Filter::new(root, options)?;
        let source = match pattern {
            Some(pattern) => Self::matching(pattern, root, filter.include_hidden)?,
            None => Self::repositories(root, options.max_depth, filter.clone()),
        };
        Ok(Self { source, filter })
    }

    fn matching(pattern: &str, root: &Path, include_hidden: bool) -> Result<Source> {
        // Only directories are candidates and that is checked per match, so a
        // trailing separator adds nothing.
        let pattern = pattern.trim_end_matches('/');
        let full = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let root = Pattern::escape(&root.to_string_lossy());
            Path::new(&root).join(pattern).to_string_lossy().into_owned()
        };

        let options = MatchOptions {
            require_literal_leading_dot: !include_hidden,
            ..MatchOptions::new()
        };
        let paths = glob::glob_with(&full, options).map_err(|source| Error::Pattern {
            pattern: full.clone(),
            source,
        })?;

        Ok(Source::Pattern(paths))
    }

    fn repositories(root: &Path, max_depth: usize, filter: Filter) -> Source {
        let predicate: Box<dyn FnMut(&DirEntry) -> bool> = Box::new(move |entry| {
            entry.file_type().is_dir() && entry.file_name() != ".git" && !filter.skips(entry.path())
        });

        let walk = WalkDir::new(root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(predicate);

        Source::Walk(walk)
    }
}

impl Iterator for Candidates {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Pattern(paths) => loop {
                let path = match paths.next()? {
                    Ok(path) => path,
                    Err(e) if e.error().kind() == ErrorKind::NotFound => {
                        warn!(path = %e.path().display(), "skipping vanished path");
                        continue;
                    }
                    Err(e) => return Some(Err(e.into())),
                };

                if !path.is_dir() || self.filter.skips(&path) {
                    trace!(path = %path.display(), "not a candidate");
                    continue;
                }
                return Some(Ok(path));
            },
            // hidden and excluded directories never get past filter_entry
            Source::Walk(walk) => loop {
                let entry = match walk.next()? {
                    Ok(entry) => entry,
                    Err(e) if e.depth() > 0 && is_not_found(&e) => {
                        warn!(path = ?e.path(), "skipping vanished directory");
                        continue;
                    }
                    Err(e) => return Some(Err(e.into())),
                };

                if entry.path().join(".git").exists() {
                    return Some(Ok(entry.into_path()));
                }
            },
        }
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == ErrorKind::NotFound)
        .unwrap_or(false)
}

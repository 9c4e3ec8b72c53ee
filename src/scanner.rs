use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::candidates::{CandidateOptions, Candidates};
use crate::config::Config;
use crate::error::Result;
use crate::probe::{self, CommandProbe, GitProbe};
use crate::verdict::{NotBackedUpReason, Verdict};

/// Finds directories that are not backed up to a git remote.
#[derive(Clone)]
pub struct Scanner {
    probe: Rc<dyn GitProbe>,
    pattern: Option<String>,
    cwd: PathBuf,
    options: CandidateOptions,
}

impl Scanner {
    pub fn new(probe: Rc<dyn GitProbe>) -> Self {
        Self {
            probe,
            pattern: None,
            cwd: PathBuf::from("."),
            options: CandidateOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(probe::from_config(config)).options(CandidateOptions::from(config))
    }

    /// Glob pattern of directories to check, relative to [`Scanner::cwd`].
    /// Without one, every git repository below `cwd` is checked.
    pub fn pattern(mut self, pattern: Option<impl Into<String>>) -> Self {
        self.pattern = pattern.map(Into::into);
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = expand_home(cwd.as_ref());
        self
    }

    pub fn options(mut self, options: CandidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Start a scan. Fails before touching the filesystem if git can't be
    /// used, and before probing any path if a pattern is invalid.
    ///
    /// Each call walks the filesystem again.
    pub fn scan(&self) -> Result<Verdicts> {
        self.probe.ensure_available()?;
        let candidates = Candidates::new(self.pattern.as_deref(), &self.cwd, &self.options)?;
        debug!(cwd = %self.cwd.display(), pattern = ?self.pattern, "scanning");

        Ok(Verdicts {
            probe: Rc::clone(&self.probe),
            candidates,
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(Rc::new(CommandProbe::new()))
    }
}

/// Decide why `path` is not backed up, or `None` if it is.
///
/// Checks run in a fixed order and stop at the first one that fails.
pub fn classify(probe: &dyn GitProbe, path: &Path) -> Result<Option<NotBackedUpReason>> {
    if !probe.has_repository(path)? {
        return Ok(Some(NotBackedUpReason::NoRepo));
    }
    if !probe.has_remote(path)? {
        return Ok(Some(NotBackedUpReason::NoRemote));
    }
    if !probe.is_fully_committed(path)? {
        return Ok(Some(NotBackedUpReason::NotCommitted));
    }
    if !probe.is_fully_pushed(path)? {
        return Ok(Some(NotBackedUpReason::NotPushed));
    }
    Ok(None)
}

/// Lazy sequence of verdicts in discovery order. Paths that are backed up
/// produce nothing. A path that could not be classified produces an `Err`
/// and the scan moves on to the next one.
pub struct Verdicts {
    probe: Rc<dyn GitProbe>,
    candidates: Candidates,
}

impl Iterator for Verdicts {
    type Item = Result<Verdict>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = match self.candidates.next()? {
                Ok(path) => path,
                Err(e) => return Some(Err(e)),
            };

            match classify(self.probe.as_ref(), &path) {
                Ok(Some(reason)) => {
                    info!(path = %path.display(), ?reason, "not backed up");
                    return Some(Ok(Verdict::new(path, reason)));
                }
                Ok(None) => debug!(path = %path.display(), "backed up"),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;

    /// Answers from a table keyed by directory name and records every
    /// question asked.
    #[derive(Default)]
    struct FakeProbe {
        missing_git: bool,
        answers: HashMap<String, [bool; 4]>,
        asked: RefCell<Vec<(String, &'static str)>>,
    }

    impl FakeProbe {
        fn answer(&self, path: &Path, question: &'static str, index: usize) -> Result<bool> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.asked.borrow_mut().push((name.clone(), question));
            match self.answers.get(&name) {
                Some(answers) => Ok(answers[index]),
                None => Err(Error::GitCommand {
                    path: path.to_path_buf(),
                    args: question.to_string(),
                    status: "exit status: 128".to_string(),
                    stderr: "fatal: corrupt".to_string(),
                }),
            }
        }
    }

    impl GitProbe for FakeProbe {
        fn ensure_available(&self) -> Result<()> {
            if self.missing_git {
                return Err(Error::GitNotInstalled {
                    binary: "git".to_string(),
                });
            }
            Ok(())
        }

        fn has_repository(&self, path: &Path) -> Result<bool> {
            self.answer(path, "repository", 0)
        }

        fn has_remote(&self, path: &Path) -> Result<bool> {
            self.answer(path, "remote", 1)
        }

        fn is_fully_committed(&self, path: &Path) -> Result<bool> {
            self.answer(path, "committed", 2)
        }

        fn is_fully_pushed(&self, path: &Path) -> Result<bool> {
            self.answer(path, "pushed", 3)
        }
    }

    fn fake(answers: &[(&str, [bool; 4])]) -> Rc<FakeProbe> {
        Rc::new(FakeProbe {
            answers: answers
                .iter()
                .map(|(name, answers)| (name.to_string(), *answers))
                .collect(),
            ..FakeProbe::default()
        })
    }

    fn tree(dirs: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        root
    }

    #[test]
    fn first_failing_check_decides_the_reason() {
        let probe = fake(&[
            ("none", [false, false, false, false]),
            ("local", [true, false, false, false]),
            ("dirty", [true, true, false, false]),
            ("ahead", [true, true, true, false]),
            ("safe", [true, true, true, true]),
        ]);
        for (name, expected) in [
            ("none", Some(NotBackedUpReason::NoRepo)),
            ("local", Some(NotBackedUpReason::NoRemote)),
            ("dirty", Some(NotBackedUpReason::NotCommitted)),
            ("ahead", Some(NotBackedUpReason::NotPushed)),
            ("safe", None),
        ] {
            let path = Path::new("/somewhere").join(name);
            assert_eq!(classify(probe.as_ref(), &path).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn checks_stop_at_first_failure() {
        let probe = fake(&[("local", [true, false, false, false])]);
        classify(probe.as_ref(), Path::new("/x/local")).unwrap();

        let asked: Vec<_> = probe.asked.borrow().iter().map(|(_, q)| *q).collect();
        assert_eq!(asked, ["repository", "remote"]);
    }

    #[test]
    fn scan_reports_only_problems_in_discovery_order() {
        let root = tree(&["c_safe", "b_dirty", "a_none"]);
        let probe = fake(&[
            ("a_none", [false, false, false, false]),
            ("b_dirty", [true, true, false, true]),
            ("c_safe", [true, true, true, true]),
        ]);

        let scanner = Scanner::new(probe).pattern(Some("*")).cwd(root.path());
        let verdicts: Vec<_> = scanner.scan().unwrap().map(Result::unwrap).collect();

        assert_eq!(
            verdicts,
            [
                Verdict::new(root.path().join("a_none"), NotBackedUpReason::NoRepo),
                Verdict::new(root.path().join("b_dirty"), NotBackedUpReason::NotCommitted),
            ]
        );
    }

    #[test]
    fn missing_git_fails_before_any_path_is_probed() {
        let root = tree(&["a"]);
        let probe = Rc::new(FakeProbe {
            missing_git: true,
            ..FakeProbe::default()
        });

        let scanner = Scanner::new(probe.clone()).pattern(Some("*")).cwd(root.path());
        let err = scanner.scan().err().unwrap();

        assert!(matches!(err, Error::GitNotInstalled { .. }));
        assert!(probe.asked.borrow().is_empty());
    }

    #[test]
    fn probe_failure_is_reported_and_scan_continues() {
        let root = tree(&["a_broken", "b_local"]);
        let probe = fake(&[("b_local", [true, false, true, true])]);

        let scanner = Scanner::new(probe).pattern(Some("*")).cwd(root.path());
        let results: Vec<_> = scanner.scan().unwrap().collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], Err(Error::GitCommand { .. })));
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Verdict::new(root.path().join("b_local"), NotBackedUpReason::NoRemote)
        );
    }

    #[test]
    fn stopping_early_probes_nothing_further() {
        let root = tree(&["a", "b", "c"]);
        let probe = fake(&[
            ("a", [false, false, false, false]),
            ("b", [false, false, false, false]),
            ("c", [false, false, false, false]),
        ]);

        let scanner = Scanner::new(probe.clone()).pattern(Some("*")).cwd(root.path());
        let first = scanner.scan().unwrap().next().unwrap().unwrap();

        assert_eq!(first.path, root.path().join("a"));
        assert_eq!(probe.asked.borrow().len(), 1);
    }

    #[test]
    fn home_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/code")), home.join("code"));
        }
        assert_eq!(expand_home(Path::new("/tmp/code")), PathBuf::from("/tmp/code"));
    }
}

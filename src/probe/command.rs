use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::GitProbe;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Answers by spawning the git executable with the candidate as its working
/// directory.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    binary: OsString,
    timeout: Option<Duration>,
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandProbe {
    pub fn new() -> Self {
        Self {
            binary: OsString::from("git"),
            timeout: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<OsString>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Kill any single git invocation that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, path: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(path)
            .stdin(Stdio::null())
            // stderr is matched against English messages
            .env("LC_ALL", "C")
            // keep `git status` from refreshing the index
            .env("GIT_OPTIONAL_LOCKS", "0");
        cmd
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<Output> {
        debug!(path = %path.display(), ?args, "running git");
        let spawn_error = |source| Error::Spawn {
            path: path.to_path_buf(),
            source,
        };

        let mut cmd = self.command(path, args);
        let Some(timeout) = self.timeout else {
            return cmd.output().map_err(spawn_error);
        };

        let child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        wait_with_timeout(child, timeout)
            .map_err(spawn_error)?
            .ok_or_else(|| Error::GitTimeout {
                path: path.to_path_buf(),
                args: args.join(" "),
                timeout,
            })
    }

    /// Run git and return its stdout, treating any non-zero exit as a fault.
    fn stdout(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.run(path, args)?;
        if !output.status.success() {
            return Err(failure(path, args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitProbe for CommandProbe {
    fn ensure_available(&self) -> Result<()> {
        let not_installed = || Error::GitNotInstalled {
            binary: self.binary.to_string_lossy().into_owned(),
        };

        match Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                debug!(
                    version = %String::from_utf8_lossy(&output.stdout).trim(),
                    "found git"
                );
                Ok(())
            }
            Ok(output) => {
                debug!(status = %output.status, "git --version failed");
                Err(not_installed())
            }
            Err(e) => {
                debug!(error = %e, "could not spawn git");
                Err(not_installed())
            }
        }
    }

    fn has_repository(&self, path: &Path) -> Result<bool> {
        let args = ["rev-parse", "--git-dir"];
        let output = self.run(path, &args)?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not a git repository") {
            return Ok(false);
        }
        Err(failure(path, &args, &output))
    }

    fn has_remote(&self, path: &Path) -> Result<bool> {
        let remotes = self.stdout(path, &["remote"])?;
        Ok(remotes.lines().any(|line| !line.trim().is_empty()))
    }

    fn is_fully_committed(&self, path: &Path) -> Result<bool> {
        // a bare repository has no working tree to leave changes in
        if self.is_bare(path)? {
            return Ok(true);
        }
        let status = self.stdout(path, &["status", "--porcelain", "--untracked-files=normal"])?;
        Ok(status.trim().is_empty())
    }

    fn is_fully_pushed(&self, path: &Path) -> Result<bool> {
        // HEAD covers commits made while detached
        let mut args = vec!["rev-list"];
        if self.has_head(path)? {
            args.push("HEAD");
        }
        args.extend(["--branches", "--not", "--remotes"]);

        let unpushed = self.stdout(path, &args)?;
        Ok(unpushed.trim().is_empty())
    }
}

impl CommandProbe {
    fn is_bare(&self, path: &Path) -> Result<bool> {
        let bare = self.stdout(path, &["rev-parse", "--is-bare-repository"])?;
        Ok(bare.trim() == "true")
    }

    /// `false` while HEAD is unborn (no commit yet).
    fn has_head(&self, path: &Path) -> Result<bool> {
        let args = ["rev-parse", "--verify", "--quiet", "HEAD"];
        let output = self.run(path, &args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(failure(path, &args, &output)),
        }
    }
}

fn failure(path: &Path, args: &[&str], output: &Output) -> Error {
    Error::GitCommand {
        path: path.to_path_buf(),
        args: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Wait for `child`, killing it once `timeout` has passed. Returns `None` on
/// timeout.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<Option<Output>> {
    // Pipes are drained while waiting so a chatty git can't block on a full
    // pipe buffer.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            // it may have exited since try_wait
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Some(Output {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    }))
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "git output reader panicked"))?,
        None => Ok(Vec::new()),
    }
}

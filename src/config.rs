use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the probe talks to git.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Spawn the git executable for every question.
    #[default]
    Command,
    /// Answer through libgit2, in process.
    Libgit2,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Config {
    /// Glob patterns of directories to leave out of the scan.
    pub exclude: Vec<String>,
    // Dot-directories are skipped unless this is set, both as candidates and
    // while walking for repositories.
    pub include_hidden: bool,
    pub max_depth: usize,
    pub backend: Backend,
    pub git_binary: String,
    pub git_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: vec![],
            include_hidden: false,
            max_depth: 255,
            backend: Backend::Command,
            git_binary: "git".to_string(),
            git_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        Self::config_home().map(|home| home.join("config.toml"))
    }

    /// Location of all config. By default
    ///
    /// Linux   :   $XDG_CONFIG_HOME/backup-your-code or $HOME/.config/backup-your-code
    /// macOS   :   $HOME/Library/Application Support/backup-your-code
    /// Windows :   %AppData%\Roaming\backup-your-code
    ///
    /// This can be overridden by setting BACKUP_YOUR_CODE_CONFIG_HOME.
    fn config_home() -> Option<PathBuf> {
        if let Ok(env_var) = env::var("BACKUP_YOUR_CODE_CONFIG_HOME") {
            if !env_var.is_empty() {
                return Some(env_var.into());
            }
        }

        dirs::config_dir().map(|dir| dir.join("backup-your-code"))
    }

    /// Load Config from the default path. A missing file means defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let config_error = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => config_error("file does not exist".to_string()),
            _ => config_error(e.to_string()),
        })?;

        let mut buffer = String::new();
        BufReader::new(file)
            .read_to_string(&mut buffer)
            .map_err(|e| config_error(e.to_string()))?;

        toml::from_str(&buffer).map_err(|e| config_error(e.to_string()))
    }

    pub fn git_timeout(&self) -> Option<Duration> {
        self.git_timeout_secs.map(Duration::from_secs)
    }
}

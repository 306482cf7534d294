//! Client configuration: API location, credentials and tuning knobs.
//!
//! Stored as YAML in `~/.snykctl.yaml` unless a path is given explicitly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_URL: &str = "https://snyk.io/api/v1";
pub const DEFAULT_TIMEOUT: u64 = 10;
pub const DEFAULT_WORKER_SIZE: usize = 10;
pub const CONFIG_FILE_NAME: &str = ".snykctl.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot locate the home directory")]
    NoHome,
    #[error("invalid {field}: {value} is not a number")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub token: String,
    /// Group id; group-scoped endpoints (membership, org creation) need it.
    #[serde(default)]
    pub id: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_worker_size")]
    pub worker_size: usize,
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_worker_size() -> usize {
    DEFAULT_WORKER_SIZE
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            id: String::new(),
            timeout: DEFAULT_TIMEOUT,
            worker_size: DEFAULT_WORKER_SIZE,
            url: default_url(),
        }
    }
}

/// `~/.snykctl.yaml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::BaseDirs::new().ok_or(ConfigError::NoHome)?;
    Ok(dirs.home_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Read the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Config = serde_yaml::from_str(&content)?;
        if config.url.trim().is_empty() {
            config.url = default_url();
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Last six characters of the token, for display in prompts.
    pub fn obfuscated_token(&self) -> &str {
        tail(&self.token)
    }

    pub fn obfuscated_id(&self) -> &str {
        tail(&self.id)
    }

    /// Interactively update token, group id, timeout and worker size.
    ///
    /// Each prompt shows the current value; an empty answer keeps it.
    pub fn prompt_update<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), ConfigError> {
        let token = ask(
            input,
            output,
            &format!("token [.... {}]: ", self.obfuscated_token()),
        )?;
        if let Some(token) = token {
            self.token = token;
        }

        let id = ask(
            input,
            output,
            &format!("group_id [.... {}]: ", self.obfuscated_id()),
        )?;
        if let Some(id) = id {
            self.id = id;
        }

        if let Some(timeout) = ask(input, output, &format!("timeout [{}]: ", self.timeout))? {
            self.timeout = parse_number("timeout", &timeout)?;
        }

        if let Some(workers) = ask(
            input,
            output,
            &format!("worker size [{}]: ", self.worker_size),
        )? {
            self.worker_size = parse_number("worker size", &workers)?;
        }

        Ok(())
    }
}

fn tail(s: &str) -> &str {
    if s.len() > 6 {
        s.get(s.len() - 6..).unwrap_or("")
    } else {
        ""
    }
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<Option<String>, ConfigError> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(None)
    } else {
        Ok(Some(answer.to_string()))
    }
}

fn parse_number<N: std::str::FromStr>(field: &'static str, value: &str) -> Result<N, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

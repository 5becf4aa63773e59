//! Runtime configuration, read from the environment (and `.env` if present).

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://dummyjson.com";
pub const DEFAULT_TOKEN_TTL_MINS: u32 = 60;

pub const ENV_API_URL: &str = "TASKLIST_API_URL";
pub const ENV_TOKEN_TTL_MINS: &str = "TASKLIST_TOKEN_TTL_MINS";
pub const ENV_STATE_FILE: &str = "TASKLIST_STATE_FILE";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TASKLIST_TOKEN_TTL_MINS must be a positive integer, got {0:?}")]
    InvalidTokenTtl(String),

    #[error("TASKLIST_API_URL must not be empty")]
    EmptyApiUrl,

    #[error("failed to load {path}: {message}")]
    EnvFile { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the remote API, without trailing slash requirements.
    pub api_url: String,
    /// Sent as `expiresInMins` on login.
    pub token_ttl_mins: u32,
    /// Where the session is persisted. `None` keeps it in memory only.
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_ttl_mins: DEFAULT_TOKEN_TTL_MINS,
            state_file: None,
        }
    }
}

impl Config {
    /// Read the process environment, after loading `.env` from the current
    /// directory or its parents when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, but the env file must exist at `path`. Variables
    /// already set in the process take precedence over the file.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        dotenv::from_path(path).map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if api_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }

        let token_ttl_mins = match lookup(ENV_TOKEN_TTL_MINS) {
            None => DEFAULT_TOKEN_TTL_MINS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidTokenTtl(raw)),
            },
        };

        let state_file = lookup(ENV_STATE_FILE)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_url,
            token_ttl_mins,
            state_file,
        })
    }
}

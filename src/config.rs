// Persisted client settings: which server to talk to and the bearer token
// from the last login. Stored as a small JSON document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER: &str = "https://cloud-dev.funix.io";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "FUNIX_CLOUD_CONFIG";

/// Environment variable overriding the server for one run.
pub const SERVER_ENV: &str = "FUNIX_CLOUD_SERVER";

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredConfig")]
pub struct Config {
    pub server: String,

    pub token: Option<String>,

    #[serde(skip)]
    path: PathBuf,
}

/// On-disk shape. Older files name the server `api_server`; `server` wins
/// when both are present.
#[derive(Deserialize)]
struct StoredConfig {
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    api_server: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl From<StoredConfig> for Config {
    fn from(stored: StoredConfig) -> Self {
        Config {
            server: stored
                .server
                .or(stored.api_server)
                .unwrap_or_else(default_server),
            token: stored.token,
            path: PathBuf::new(),
        }
    }
}

impl Config {
    /// `~/.config/funix-cloud/config.json`, or `./.funix-cloud.json` when no
    /// home directory is known.
    pub fn default_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(".config").join("funix-cloud").join("config.json"),
            None => PathBuf::from(".funix-cloud.json"),
        }
    }

    /// Picks the flag, then the environment, then the default location.
    pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(Self::default_path)
    }

    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config {
                server: default_server(),
                token: None,
                path,
            });
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Config {} is not valid JSON", path.display()))?;
        config.path = path;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to encode config")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config {}", self.path.display()))?;
        log::debug!("saved config to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores (or clears) the token and writes the file.
    pub fn set_token(&mut self, token: Option<String>) -> Result<()> {
        self.token = token;
        self.save()
    }

    pub fn set_server(&mut self, server: &str) -> Result<()> {
        self.server = normalize_server(server);
        self.save()
    }

    /// Server for this run: explicit override, then environment, then file.
    pub fn server_url(&self, flag: Option<&str>) -> String {
        let chosen = flag
            .map(str::to_string)
            .or_else(|| std::env::var(SERVER_ENV).ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| self.server.clone());
        normalize_server(&chosen)
    }
}

fn normalize_server(server: &str) -> String {
    server.trim().trim_end_matches('/').to_string()
}

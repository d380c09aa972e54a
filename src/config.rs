//! Layered configuration for the checker builder.
//!
//! Settings are read from `.checker/checker.toml`, then overridden by
//! environment variables, then by command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 4100
//! db_path = ".checker/checkers.db"
//! dev = false
//!
//! [client]
//! base_url = "http://127.0.0.1:4100"
//! timeout_secs = 10
//! retries = 1
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! | Variable               | Overrides               |
//! |------------------------|-------------------------|
//! | `CHECKER_PORT`         | `server.port`           |
//! | `CHECKER_DB_PATH`      | `server.db_path`        |
//! | `CHECKER_BASE_URL`     | `client.base_url`       |
//! | `CHECKER_TIMEOUT_SECS` | `client.timeout_secs`   |
//! | `CHECKER_LOG`          | `logging.level`         |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::builder::server::{DEFAULT_DB_PATH, DEFAULT_PORT, ServerConfig};

pub const CONFIG_DIR: &str = ".checker";
pub const CONFIG_FILE: &str = "checker.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub dev: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Contents of `checker.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckerToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl CheckerToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse checker.toml")
    }

    /// Load `checker.toml` from `config_dir`, or defaults when it is absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize checker.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("CHECKER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("CHECKER_PORT is not a valid port: {}", port))?;
        }
        if let Some(path) = lookup("CHECKER_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("CHECKER_BASE_URL") {
            self.client.base_url = url;
        }
        if let Some(secs) = lookup("CHECKER_TIMEOUT_SECS") {
            self.client.timeout_secs = secs
                .parse()
                .with_context(|| format!("CHECKER_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(level) = lookup("CHECKER_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration and return human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if !(self.client.base_url.starts_with("http://")
            || self.client.base_url.starts_with("https://"))
        {
            warnings.push(format!(
                "client.base_url '{}' should start with http:// or https://",
                self.client.base_url
            ));
        }
        if self.client.timeout_secs == 0 {
            warnings.push("client.timeout_secs is 0; every request will time out".to_string());
        }
        if self.client.retries > 3 {
            warnings.push(format!(
                "client.retries is {}; more than a few retries hides outages",
                self.client.retries
            ));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "logging.level '{}' is not a valid filter",
                self.logging.level
            ));
        }
        warnings
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.server.port,
            db_path: self.server.db_path.clone(),
            dev_mode: self.server.dev,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.client.base_url.clone(),
            timeout: Duration::from_secs(self.client.timeout_secs),
            retries: self.client.retries,
        }
    }
}

/// Resolve the effective configuration for a project directory: file, then
/// process environment.
pub fn resolve(project_dir: &Path) -> Result<CheckerToml> {
    let mut config = CheckerToml::load_or_default(&project_dir.join(CONFIG_DIR))?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

//! CLI configuration

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment overrides, e.g. `DASHBOARD_API__BASE_URL`
pub const ENV_PREFIX: &str = "DASHBOARD";

/// File looked up in the data directory when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Dashboard CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Remote admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/admin-api".to_string(),
            timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local session storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file; defaults to `session.json` in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level used when neither `--log-level` nor `RUST_LOG` is set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// environment, later sources winning.
    ///
    /// With no explicit `path`, `config.toml` in `data_dir` is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any source fails to
    /// parse
    pub fn load(path: Option<&Path>, data_dir: &Path) -> Result<Self> {
        Self::load_with(path, data_dir, environment())
    }

    fn load_with(
        path: Option<&Path>,
        data_dir: &Path,
        env: config::Environment,
    ) -> Result<Self> {
        let defaults = Self::default();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(data_dir.join(CONFIG_FILE_NAME)).required(false),
        };

        let settings = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("log.level", defaults.log.level)?
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to load configuration")?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Session file location
    pub fn session_path(&self, data_dir: &Path) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(dashboard_core::session::SESSION_FILE_NAME))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn environment() -> config::Environment {
    // Single `_` after the prefix, `__` between nested keys
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Write the default configuration to `path`
pub fn generate_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DashboardConfig::default().to_toml()?)?;
    Ok(())
}

//! Configuration file management for famaplan.
//!
//! Provides a TOML-based config file at `~/.config/famaplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use famaplan_core::generator::GeminiConfig;
use famaplan_db::config::DbConfig;

/// Environment variables read during resolution.
pub const ENV_API_KEY: &str = "FAMAPLAN_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "FAMAPLAN_MODEL";
pub const ENV_API_BASE_URL: &str = "FAMAPLAN_API_BASE_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model for structured generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Model for short rewrites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the famaplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/famaplan` or
/// `~/.config/famaplan`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("famaplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("famaplan")
}

/// Return the path to the famaplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct FamaplanConfig {
    pub db_config: DbConfig,
    /// `None` when no API key is configured anywhere; only the AI commands
    /// need one.
    pub gemini: Option<GeminiConfig>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl FamaplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `FAMAPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - API key: `FAMAPLAN_API_KEY` > `GEMINI_API_KEY` > `generator.api_key`
    /// - Model: `FAMAPLAN_MODEL` > `generator.model` > built-in default
    /// - Base URL: `FAMAPLAN_API_BASE_URL` > `generator.base_url` > built-in default
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let section = file_config.map(|c| c.generator).unwrap_or_default();
        let api_key = env_nonempty(ENV_API_KEY)
            .or_else(|| env_nonempty(ENV_API_KEY_FALLBACK))
            .or(section.api_key)
            .filter(|k| !k.trim().is_empty());

        let gemini = api_key.map(|key| {
            let mut gemini = GeminiConfig::new(key);
            if let Some(model) = env_nonempty(ENV_MODEL).or(section.model) {
                gemini.model = model;
            }
            if let Some(fast_model) = section.fast_model {
                gemini.fast_model = fast_model;
            }
            if let Some(base_url) = env_nonempty(ENV_API_BASE_URL).or(section.base_url) {
                gemini.base_url = base_url;
            }
            if let Some(secs) = section.timeout_secs {
                gemini.timeout = Duration::from_secs(secs);
            }
            gemini
        });

        Ok(Self { db_config, gemini })
    }

    /// The generator settings, or an error explaining how to provide a key.
    pub fn require_gemini(&self) -> Result<&GeminiConfig> {
        match &self.gemini {
            Some(cfg) => Ok(cfg),
            None => bail!(
                "no generator API key found; set {ENV_API_KEY} or run `famaplan init --api-key <KEY>`"
            ),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

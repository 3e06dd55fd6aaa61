/// Configuration module for lexnote.
///
/// Handles loading, validating, and providing default configuration values.
/// The core library never reads the file itself; callers resolve a
/// [`Config`] once and hand the relevant sections down.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dict::Endpoint;
use crate::notebook::{self, Ranking};

const APP_DIR: &str = "lexnote";
const CONFIG_FILENAME: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_endpoint() -> String {
    Endpoint::Youdao.as_str().to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ecdict_path() -> String {
    app_dir().join("stardict.db").to_string_lossy().to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_notebook_dir() -> String {
    app_dir().join("notebook").to_string_lossy().to_string()
}

fn default_db_path() -> String {
    app_dir().join("notebook.db").to_string_lossy().to_string()
}

fn default_chapter() -> String {
    notebook::DEFAULT_CHAPTER.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_root() -> String {
    "dict".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dict: DictConfig,

    #[serde(default)]
    pub notebook: NotebookConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DictConfig {
    /// Active provider identifier (`youdao`, `etymonline`, `ecdict`, `chatgpt`, `mwebster`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP timeout for web providers.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Path of the ECDICT `stardict` SQLite file.
    #[serde(default = "default_ecdict_path")]
    pub ecdict_path: String,

    #[serde(default)]
    pub chatgpt: ChatGptConfig,

    #[serde(default)]
    pub mwebster: MWebsterConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatGptConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct MWebsterConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Which notebook backend is active for a run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotebookBackend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotebookConfig {
    #[serde(default)]
    pub backend: NotebookBackend,

    /// Directory holding one file per chapter (file backend).
    #[serde(default = "default_notebook_dir")]
    pub dir: String,

    /// SQLite database path (sqlite backend).
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_chapter")]
    pub chapter: String,

    #[serde(default)]
    pub ranking: Ranking,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_root")]
    pub root: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            ecdict_path: default_ecdict_path(),
            chatgpt: ChatGptConfig::default(),
            mwebster: MWebsterConfig::default(),
        }
    }
}

impl Default for ChatGptConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            backend: NotebookBackend::default(),
            dir: default_notebook_dir(),
            db_path: default_db_path(),
            chapter: default_chapter(),
            ranking: Ranking::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root: default_root(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Default config file location: `<config dir>/lexnote/config.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        app_dir().join(CONFIG_FILENAME)
    }

    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is `None`, uses [`Config::default_path`].
    /// If the file does not exist, returns a default config and, for the
    /// default location only, writes a template file.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let default_path = Self::default_path();
        let path = config_path.unwrap_or(&default_path);

        if !path.exists() {
            info!("{} not found, using defaults", path.display());
            let cfg = Self::default();

            if config_path.is_none() {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {}", path.display()),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", path.display());
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Save configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        anyhow::ensure!(self.dict.timeout_secs > 0, "dict.timeout_secs must be positive");
        notebook::validate_chapter(&self.notebook.chapter)?;
        anyhow::ensure!(self.server.port > 0, "server.port must be positive");
        anyhow::ensure!(
            !self.server.root.trim_matches('/').is_empty(),
            "server.root must not be empty"
        );
        Ok(())
    }

    /// The configured provider endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        self.dict
            .endpoint
            .parse::<Endpoint>()
            .with_context(|| "dict.endpoint is not a known provider")
    }
}

// ── Tests ────────────────────────────────────────────────────────────

//! Service configuration
//!
//! Loaded once at startup from a TOML file, with environment overrides for
//! deployment secrets, then injected into components as plain structs. The
//! core pipeline never reads the environment itself.
//!
//! ## Loading Order
//!
//! 1. Explicit `--config` path from the CLI
//! 2. `CROPSENSE_CONFIG` environment variable (path to TOML file)
//! 3. `cropsense.toml` in the current working directory
//! 4. Built-in defaults (simulation-only mode)
//!
//! After file loading, `DEEPSEEK_API_KEY` and `CROPSENSE_ADDR` from the
//! environment override the corresponding fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Placeholder value some .env templates ship with; treated as unset.
const PLACEHOLDER_API_KEY: &str = "your_deepseek_api_key_here";

/// Default config file name searched in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cropsense.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub knowledge: KnowledgeConfig,
    pub model: ModelConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Chat-completion provider settings, consumed by the LLM gateway.
///
/// An empty `api_key` signals simulation-only mode: the gateway never
/// attempts a network round trip and answers from canned templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Timeout for full generation calls (seconds).
    pub chat_timeout_secs: u64,
    /// Timeout for the health-check completion call (seconds).
    pub health_timeout_secs: u64,
    /// Timeout for the TCP reachability probe (seconds).
    pub probe_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            chat_timeout_secs: 30,
            health_timeout_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

impl ProviderConfig {
    /// Whether a real credential is present (placeholder counts as absent).
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }
}

/// Knowledge base settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Path to a JSON knowledge base file. When absent or unreadable the
    /// compiled-in citrus entries are served instead.
    pub path: Option<PathBuf>,
}

/// Classifier model settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Optional path to a threshold snapshot (versioned JSON). Absence is
    /// not an error; defaults install on train.
    pub snapshot_path: Option<PathBuf>,
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Load configuration following the documented order, then apply
    /// environment overrides. Never fails: a malformed file logs a warning
    /// and falls back to defaults so the service always comes up.
    pub fn load(cli_path: Option<&Path>) -> Self {
        let mut config = Self::load_file(cli_path);
        config.apply_env_overrides();
        config
    }

    fn load_file(cli_path: Option<&Path>) -> Self {
        let candidate: Option<PathBuf> = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CROPSENSE_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let Some(path) = candidate else {
            info!("No config file found, using built-in defaults (simulation mode)");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<Self>(&raw) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config file is malformed, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config file, using defaults");
                Self::default()
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = key;
            }
        }
        if let Ok(addr) = std::env::var("CROPSENSE_ADDR") {
            if !addr.is_empty() {
                self.server.addr = addr;
            }
        }

        if self.provider.is_configured() {
            info!(model = %self.provider.model, "Provider credential configured, AI mode enabled");
        } else {
            warn!("No provider credential, running in simulation mode");
        }
    }
}

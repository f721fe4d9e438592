//! # Pillgraph Config
//!
//! Configuration system for the Pillgraph medication scanner backend.
//!
//! Provides TOML-based configuration parsing and validation for the HTTP
//! server, snapshot storage, the vision provider, and fuzzy search tuning.
//!
//! # Configuration Schema
//!
//! The configuration file (`pillgraph.toml`) supports the following sections:
//! - `[server]` — HTTP server settings (host, port, log_level, log_format, CORS)
//! - `[storage]` — Graph snapshot location
//! - `[vision]` — Vision-language provider for label analysis
//! - `[search]` — Fuzzy effect search tuning
//!
//! # Environment Variable Overrides
//!
//! Every config field can be overridden via environment variables using the
//! `PILLGRAPH_` prefix and `_` as section separator:
//! - `PILLGRAPH_SERVER_HOST` → `server.host`
//! - `PILLGRAPH_SERVER_PORT` → `server.port`
//! - `PILLGRAPH_STORAGE_SNAPSHOT_PATH` → `storage.snapshot_path`
//! - `PILLGRAPH_VISION_PROVIDER` → `vision.provider`
//! - etc.

use serde::{Deserialize, Serialize};

/// Top-level Pillgraph configuration.
///
/// Parsed from `pillgraph.toml` or constructed programmatically.
/// Environment variables with the `PILLGRAPH_` prefix override TOML values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PillgraphConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Snapshot storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Vision provider settings.
    #[serde(default)]
    pub vision: VisionConfig,
    /// Fuzzy search settings.
    #[serde(default)]
    pub search: SearchTuningConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP port (default: 5050).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level (default: "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format: "text" (default) or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Allowed CORS origin for the browser frontend; "*" allows any.
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            cors_allow_origin: default_cors_allow_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5050
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_cors_allow_origin() -> String {
    "*".to_string()
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON graph snapshot (default: "data/graph.json").
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> String {
    "data/graph.json".to_string()
}

/// Vision-language provider configuration for label analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Provider: "gemini" (default) or "openrouter".
    #[serde(default = "default_vision_provider")]
    pub provider: String,
    /// Model identifier sent to the provider.
    #[serde(default = "default_vision_model")]
    pub model: String,
    /// Name of the environment variable holding the provider API key.
    /// The key itself never lives in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL override for OpenAI-compatible providers.
    /// Empty selects the provider's default endpoint.
    #[serde(default)]
    pub api_base_url: String,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_vision_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: default_vision_provider(),
            model: default_vision_model(),
            api_key_env: default_api_key_env(),
            api_base_url: String::new(),
            timeout_secs: default_vision_timeout_secs(),
        }
    }
}

fn default_vision_provider() -> String {
    "gemini".to_string()
}
fn default_vision_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_vision_timeout_secs() -> u64 {
    60
}

/// Fuzzy effect search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTuningConfig {
    /// Minimum similarity score for a match (0.0 permissive, 1.0 exact).
    #[serde(default = "default_search_threshold")]
    pub threshold: f32,
}

impl Default for SearchTuningConfig {
    fn default() -> Self {
        Self {
            threshold: default_search_threshold(),
        }
    }
}

fn default_search_threshold() -> f32 {
    0.72
}

impl PillgraphConfig {
    /// Load configuration from a TOML file, then apply environment variable overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse_toml(&contents)
    }

    /// Parse configuration from a TOML string, apply env overrides, then validate.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let mut config: PillgraphConfig = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Variables use the `PILLGRAPH_` prefix with `_` as section separator:
    /// - `PILLGRAPH_SERVER_HOST` → `server.host`
    /// - `PILLGRAPH_SERVER_PORT` → `server.port`
    /// - `PILLGRAPH_SERVER_LOG_LEVEL` → `server.log_level`
    /// - `PILLGRAPH_SERVER_LOG_FORMAT` → `server.log_format`
    /// - `PILLGRAPH_SERVER_CORS_ALLOW_ORIGIN` → `server.cors_allow_origin`
    /// - `PILLGRAPH_STORAGE_SNAPSHOT_PATH` → `storage.snapshot_path`
    /// - `PILLGRAPH_VISION_PROVIDER` → `vision.provider`
    /// - `PILLGRAPH_VISION_MODEL` → `vision.model`
    /// - `PILLGRAPH_VISION_API_KEY_ENV` → `vision.api_key_env`
    /// - `PILLGRAPH_VISION_API_BASE_URL` → `vision.api_base_url`
    /// - `PILLGRAPH_VISION_TIMEOUT_SECS` → `vision.timeout_secs`
    /// - `PILLGRAPH_SEARCH_THRESHOLD` → `search.threshold`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PILLGRAPH_SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_SERVER_PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("PILLGRAPH_SERVER_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_SERVER_LOG_FORMAT") {
            self.server.log_format = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_SERVER_CORS_ALLOW_ORIGIN") {
            self.server.cors_allow_origin = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_STORAGE_SNAPSHOT_PATH") {
            self.storage.snapshot_path = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_VISION_PROVIDER") {
            self.vision.provider = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_VISION_MODEL") {
            self.vision.model = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_VISION_API_KEY_ENV") {
            self.vision.api_key_env = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_VISION_API_BASE_URL") {
            self.vision.api_base_url = v;
        }
        if let Ok(v) = std::env::var("PILLGRAPH_VISION_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.vision.timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("PILLGRAPH_SEARCH_THRESHOLD") {
            if let Ok(threshold) = v.parse() {
                self.search.threshold = threshold;
            }
        }
    }

    /// Validate the configuration, returning a descriptive error on the first problem.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!(
                "server.port must be > 0 (got 0). Set a valid port in pillgraph.toml or via PILLGRAPH_SERVER_PORT env var."
            );
        }
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.server.log_level.as_str()) {
            anyhow::bail!(
                "server.log_level must be one of: {} (got '{}').",
                valid_log_levels.join(", "),
                self.server.log_level
            );
        }
        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&self.server.log_format.as_str()) {
            anyhow::bail!(
                "server.log_format must be one of: {} (got '{}').",
                valid_log_formats.join(", "),
                self.server.log_format
            );
        }

        if self.storage.snapshot_path.trim().is_empty() {
            anyhow::bail!(
                "storage.snapshot_path must not be empty. Set it in pillgraph.toml or via PILLGRAPH_STORAGE_SNAPSHOT_PATH env var."
            );
        }

        let valid_providers = ["gemini", "openrouter"];
        if !valid_providers.contains(&self.vision.provider.as_str()) {
            anyhow::bail!(
                "vision.provider must be one of: {} (got '{}').",
                valid_providers.join(", "),
                self.vision.provider
            );
        }
        if self.vision.model.trim().is_empty() {
            anyhow::bail!("vision.model must not be empty.");
        }
        if self.vision.timeout_secs == 0 {
            anyhow::bail!("vision.timeout_secs must be > 0 (got 0).");
        }

        if !(0.0..=1.0).contains(&self.search.threshold) {
            anyhow::bail!(
                "search.threshold must be between 0.0 and 1.0 (got {}).",
                self.search.threshold
            );
        }

        Ok(())
    }

    /// Generate a fully commented example configuration file.
    ///
    /// This is suitable for `pillgraph_server --init-config` output.
    pub fn example_toml_commented() -> String {
        r#"# =============================================================================
# Pillgraph Configuration File
# =============================================================================
# This file configures the Pillgraph medication scanner backend.
# All values shown below are defaults — uncomment and modify as needed.
#
# Environment variables override TOML values. Use the PILLGRAPH_ prefix:
#   PILLGRAPH_SERVER_PORT=9000 pillgraph_server

# -----------------------------------------------------------------------------
# [server] — HTTP server settings
# -----------------------------------------------------------------------------
[server]
# Bind address for the REST API.
host = "0.0.0.0"
# HTTP port for the REST API.
port = 5050
# Log level: trace, debug, info, warn, error
log_level = "info"
# Log format: "text" (human-readable) or "json" (structured)
log_format = "text"
# Allowed CORS origin for the browser frontend. "*" allows any origin.
cors_allow_origin = "*"

# -----------------------------------------------------------------------------
# [storage] — Graph snapshot location
# -----------------------------------------------------------------------------
[storage]
# Path of the JSON graph snapshot. The parent directory is created on first save.
snapshot_path = "data/graph.json"

# -----------------------------------------------------------------------------
# [vision] — Vision-language provider for label analysis
# -----------------------------------------------------------------------------
[vision]
# Provider: "gemini" (Google Generative Language API) or "openrouter"
# (any OpenAI-compatible chat completions endpoint).
provider = "gemini"
# Model identifier sent to the provider.
model = "gemini-2.0-flash"
# Environment variable holding the provider API key.
# The key itself never lives in this file.
api_key_env = "GEMINI_API_KEY"
# Base URL override for OpenAI-compatible providers.
# api_base_url = "https://openrouter.ai/api/v1"
# Request timeout in seconds.
timeout_secs = 60

# -----------------------------------------------------------------------------
# [search] — Fuzzy effect search tuning
# -----------------------------------------------------------------------------
[search]
# Minimum similarity score for a search match (0.0 permissive, 1.0 exact).
threshold = 0.72
"#
        .to_string()
    }
}

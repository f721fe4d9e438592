//! Vision-language boundary for medication label analysis.
//!
//! Provides a unified [`VisionClient`] interface over the supported
//! providers (Gemini, OpenRouter-compatible) plus the extraction prompt and
//! the parsing of the model's raw text into a [`GraphFragment`].
//!
//! The core merge engine never sees free-form model output — everything here
//! runs before `merge` is called.

mod client;
mod extract;

pub use client::{GeminiClient, OpenRouterClient, VisionClient};
pub use extract::{parse_data_url, parse_scan_output, ScanAnalysis, LABEL_PROMPT};

use std::sync::Arc;

use pillgraph_config::VisionConfig;
use tracing::{info, warn};

/// Build the configured vision client, if its API key is available.
///
/// Returns `None` (with a warning) when the key environment variable named by
/// `vision.api_key_env` is unset — the server still runs, with scanning
/// reported as unavailable.
pub fn build_client(config: &VisionConfig) -> Option<Arc<dyn VisionClient>> {
    let api_key = match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            warn!(
                "Vision provider '{}' disabled: {} is not set",
                config.provider, config.api_key_env
            );
            return None;
        }
    };

    let client: Arc<dyn VisionClient> = match config.provider.as_str() {
        "openrouter" => Arc::new(OpenRouterClient::new(
            api_key,
            config.api_base_url.clone(),
            config.model.clone(),
            config.timeout_secs,
        )),
        // Config validation restricts the provider set; default to Gemini.
        _ => Arc::new(GeminiClient::new(
            api_key,
            config.model.clone(),
            config.timeout_secs,
        )),
    };

    info!(
        "Vision provider '{}' ready (model: {})",
        config.provider, config.model
    );
    Some(client)
}

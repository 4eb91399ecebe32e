/// `load_config` module: loads the static YAML config of the host driver and injects
/// the bearer secrets from the environment.
///
/// This is the only place where untrusted YAML is parsed and mapped onto the core's
/// strongly-typed config structs.
///
/// # Responsibilities
/// - Parse the `api`, `store` and `capture` sections into [`ApiConfig`], [`StoreConfig`]
///   and [`PipelineConfig`]
/// - Inject `PUNCH_API_TOKEN` (and optionally `PUNCH_STORE_TOKEN`) from the environment
/// - Reject a capture quality outside (0, 1]
///
/// # Errors
/// All errors use `anyhow::Error` and name the file or the offending key.
use anyhow::{bail, Result};
use punch_capture::config::{ApiConfig, PipelineConfig, StoreConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const API_TOKEN_ENV: &str = "PUNCH_API_TOKEN";
pub const STORE_TOKEN_ENV: &str = "PUNCH_STORE_TOKEN";

pub struct CliConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub capture: PipelineConfig,
    pub api_token: Option<String>,
    pub store_token: Option<String>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("api", &self.api)
            .field("store", &self.store)
            .field("capture", &self.capture)
            .field("api_token_set", &self.api_token.is_some())
            .field("store_token_set", &self.store_token.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    api: ApiConfig,
    store: StoreConfig,
    #[serde(default)]
    capture: PipelineConfig,
}

/// Loads a static YAML config file (no secrets) and injects the tokens from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let quality = raw.capture.capture_quality;
    if !(quality > 0.0 && quality <= 1.0) {
        error!(quality, "Capture quality out of range");
        bail!("capture.capture_quality must be within (0, 1], got {quality}");
    }

    let api_token = secret(API_TOKEN_ENV);
    let store_token = secret(STORE_TOKEN_ENV);
    if api_token.is_none() {
        warn!(var = API_TOKEN_ENV, "No API token in environment; submissions will fail");
    }
    if raw.store.require_token && store_token.is_none() {
        warn!(var = STORE_TOKEN_ENV, "Store requires a token but none is set");
    }

    raw.api.trace_loaded();
    raw.store.trace_loaded();
    raw.capture.trace_loaded();

    Ok(CliConfig {
        api: raw.api,
        store: raw.store,
        capture: raw.capture,
        api_token,
        store_token,
    })
}

fn secret(var: &str) -> Option<String> {
    let value = env::var(var).ok().filter(|v| !v.trim().is_empty());
    info!(var, present = value.is_some(), "Secret lookup");
    value
}

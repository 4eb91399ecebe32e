use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_CAPTURE_QUALITY: f32 = 0.7;

fn default_capture_quality() -> f32 {
    DEFAULT_CAPTURE_QUALITY
}

fn default_object_prefix() -> String {
    "punch".to_string()
}

fn default_extension() -> String {
    "jpg".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Fixed pipeline constants. Not user-exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_capture_quality")]
    pub capture_quality: f32,
    #[serde(default = "default_object_prefix")]
    pub object_prefix: String,
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_quality: DEFAULT_CAPTURE_QUALITY,
            object_prefix: default_object_prefix(),
            default_extension: default_extension(),
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            capture_quality = self.capture_quality,
            object_prefix = %self.object_prefix,
            default_extension = %self.default_extension,
            "Loaded PipelineConfig"
        );
    }
}

/// Bucket REST endpoint and the public URL pattern for its objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base of the storage API, e.g. `https://store/storage/v1`.
    pub endpoint: String,
    /// Base of public object URLs, e.g. `https://store`.
    pub public_base: String,
    pub bucket: String,
    #[serde(default)]
    pub require_token: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn trace_loaded(&self) {
        info!(
            endpoint = %self.endpoint,
            public_base = %self.public_base,
            bucket = %self.bucket,
            require_token = self.require_token,
            timeout_secs = self.timeout_secs,
            "Loaded StoreConfig"
        );
        debug!(?self, "StoreConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            timeout_secs = self.timeout_secs,
            "Loaded ApiConfig"
        );
    }
}

//! Router and classifier configuration
//!
//! Defaults mirror the on-disk layout operators already use. Values can be
//! overridden from the environment (after loading `.env`), and the CLI layers
//! its own flags on top.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Classifications below this confidence go to manual review
pub const CONFIDENCE_THRESHOLD: f64 = 0.80;

/// Maximum lines per index segment
pub const MAX_INDEX_ENTRIES: usize = 10;

/// Default budget for one classifier call
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Folder layout and routing policy for one pipeline instance.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Files awaiting processing (flat)
    pub input_dir: PathBuf,

    /// Quarantine for documents needing manual review (flat)
    pub exception_dir: PathBuf,

    /// Parent of the per-category output folders
    pub output_root: PathBuf,

    /// Daily audit log location
    pub log_dir: PathBuf,

    pub confidence_threshold: f64,

    pub max_index_entries: usize,

    pub classifier_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./temp_dir"),
            exception_dir: PathBuf::from("./exceptions"),
            output_root: PathBuf::from("./classified_output"),
            log_dir: PathBuf::from("./logs"),
            confidence_threshold: CONFIDENCE_THRESHOLD,
            max_index_entries: MAX_INDEX_ENTRIES,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }
}

impl RouterConfig {
    /// Config rooted at `base` (used by tests and sandboxed runs)
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            input_dir: base.join("temp_dir"),
            exception_dir: base.join("exceptions"),
            output_root: base.join("classified_output"),
            log_dir: base.join("logs"),
            ..Self::default()
        }
    }

    /// Defaults overridden by `DOCROUTER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = env_path("DOCROUTER_INPUT_DIR") {
            config.input_dir = dir;
        }
        if let Some(dir) = env_path("DOCROUTER_EXCEPTION_DIR") {
            config.exception_dir = dir;
        }
        if let Some(dir) = env_path("DOCROUTER_OUTPUT_DIR") {
            config.output_root = dir;
        }
        if let Some(dir) = env_path("DOCROUTER_LOG_DIR") {
            config.log_dir = dir;
        }
        if let Some(timeout) = env_secs("DOCROUTER_CLASSIFIER_TIMEOUT_SECS")? {
            config.classifier_timeout = timeout;
        }

        Ok(config)
    }

    /// Output folder for one category
    pub fn category_dir(&self, category: crate::models::Category) -> PathBuf {
        self.output_root.join(category.as_str())
    }

    /// Create the input, exception and output folders if missing
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.input_dir, &self.exception_dir, &self.output_root] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Settings for the OpenAI-compatible classification endpoint.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// HTTP-level timeout; the router applies its own budget on top
    pub request_timeout: Duration,
}

impl ClassifierConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        Ok(config)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_secs(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

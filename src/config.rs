//! Generator configuration, resolved from the process environment.
//!
//! Credentials are only ever read from the environment.

use std::time::Duration;

use crate::gateway::huggingface::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::gateway::GatewayConfig;
use crate::mission::DeliveryMode;

pub const API_KEY_VAR: &str = "HF_API_KEY";
/// Accepted when `HF_API_KEY` is unset.
pub const FALLBACK_API_KEY_VAR: &str = "API_KEY";

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.2-3B-Instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
/// High on purpose: consecutive missions should differ.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HF_API_KEY (or API_KEY) is not set or empty")]
    MissingApiKey,
}

/// Everything one mission request needs besides the player context.
#[derive(Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub delivery_mode: DeliveryMode,
    pub retry: GatewayConfig,
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("delivery_mode", &self.delivery_mode)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GeneratorConfig {
    /// Defaults for everything but the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            delivery_mode: DeliveryMode::Direct,
            retry: GatewayConfig::default(),
        }
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = [API_KEY_VAR, FALLBACK_API_KEY_VAR]
            .into_iter()
            .filter_map(|var| lookup(var))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup("HF_BASE_URL").filter(|s| !s.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(model) = lookup("MISSION_MODEL").filter(|s| !s.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, "HF_TIMEOUT_SECONDS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parsed::<u32, _>(&lookup, "MISSION_MAX_TOKENS") {
            config.max_tokens = max;
        }
        if let Some(t) = parsed::<f32, _>(&lookup, "MISSION_TEMPERATURE") {
            config.temperature = t;
        }
        if let Some(n) = parsed::<u32, _>(&lookup, "MISSION_MAX_RETRIES") {
            config.retry.max_retries = n;
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "MISSION_RETRY_BASE_MS") {
            config.retry.retry_base_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: GatewayConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Unparseable values fall back to the default with a warning.
fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

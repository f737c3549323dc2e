//! # Scaling Configuration Module
//!
//! This module defines configuration structures for the AI scaling tier:
//! provider selection, per-provider credentials, rate limiting, retry and
//! circuit breaker settings. Values are read from the environment (a `.env`
//! file is honored by the binary through `dotenv`).

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::scaling_errors::ConfigError;

// Constants for AI scaling configuration
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_HUGGINGFACE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const HUGGINGFACE_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

/// Which generative text service performs AI scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    HuggingFace,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "huggingface" | "hf" => Ok(ProviderKind::HuggingFace),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "OpenAI"),
            ProviderKind::HuggingFace => write!(f, "HuggingFace"),
        }
    }
}

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Whether the provider may be called at all
    pub enabled: bool,
    /// Bearer token, `None` when not configured
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Full URL of the chat/completion endpoint
    pub endpoint: String,
}

impl ProviderSettings {
    /// Default OpenAI settings (disabled, no key)
    pub fn openai() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
        }
    }

    /// Default HuggingFace settings (disabled, no key)
    pub fn huggingface() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: DEFAULT_HUGGINGFACE_MODEL.to_string(),
            endpoint: huggingface_endpoint(DEFAULT_HUGGINGFACE_MODEL),
        }
    }

    /// Check that a non-blank API key is present
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

/// Retry and recovery configuration for AI calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts per AI call
    pub max_retries: u32,
    /// Wait applied on HTTP 429 when no Retry-After header is sent
    pub default_retry_after_secs: u64,
    /// Longest `Retry-After` the client will wait for; longer requests give up
    pub max_retry_after_secs: u64,
    /// Unit of the exponential backoff; the wait before retry `n` is `base × 2^n`
    pub backoff_base_ms: u64,
    /// Upper bound of the random jitter added to backoff waits
    pub backoff_jitter_ms: u64,
    /// Timeout for a single HTTP attempt
    pub request_timeout_secs: u64,
    /// Consecutive failures before the circuit breaker opens
    pub circuit_breaker_threshold: u32,
    /// Time before an open circuit lets calls through again
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_retry_after_secs: 5,
            max_retry_after_secs: 60,
            backoff_base_ms: 1000,
            backoff_jitter_ms: 250,
            request_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_secs)
    }
}

/// Top-level configuration for the AI scaling tier
#[derive(Debug, Clone, PartialEq)]
pub struct AiScalingConfig {
    /// Provider used for AI scaling
    pub provider: ProviderKind,
    pub openai: ProviderSettings,
    pub huggingface: ProviderSettings,
    /// Minimum time between two outbound AI calls from this process
    pub min_request_interval_secs: u64,
    pub retry: RetryConfig,
}

impl Default for AiScalingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            openai: ProviderSettings::openai(),
            huggingface: ProviderSettings::huggingface(),
            min_request_interval_secs: 2,
            retry: RetryConfig::default(),
        }
    }
}

impl AiScalingConfig {
    /// Build the configuration from environment variables
    ///
    /// Unset variables keep their defaults; malformed values are reported.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let retry_defaults = RetryConfig::default();

        let provider = match lookup("AI_SCALING_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.provider,
        };

        let openai = ProviderSettings {
            enabled: parse_or(&lookup, "OPENAI_ENABLED", defaults.openai.enabled)?,
            api_key: lookup("OPENAI_API_KEY"),
            model: lookup("OPENAI_MODEL").unwrap_or(defaults.openai.model),
            endpoint: lookup("OPENAI_ENDPOINT").unwrap_or(defaults.openai.endpoint),
        };

        let huggingface_model =
            lookup("HUGGINGFACE_MODEL").unwrap_or(defaults.huggingface.model);
        let huggingface = ProviderSettings {
            enabled: parse_or(&lookup, "HUGGINGFACE_ENABLED", defaults.huggingface.enabled)?,
            api_key: lookup("HUGGINGFACE_API_KEY"),
            endpoint: lookup("HUGGINGFACE_ENDPOINT")
                .unwrap_or_else(|| huggingface_endpoint(&huggingface_model)),
            model: huggingface_model,
        };

        let retry = RetryConfig {
            max_retries: parse_or(&lookup, "AI_MAX_RETRIES", retry_defaults.max_retries)?,
            default_retry_after_secs: parse_or(
                &lookup,
                "AI_DEFAULT_RETRY_AFTER_SECS",
                retry_defaults.default_retry_after_secs,
            )?,
            max_retry_after_secs: parse_or(
                &lookup,
                "AI_MAX_RETRY_AFTER_SECS",
                retry_defaults.max_retry_after_secs,
            )?,
            backoff_base_ms: parse_or(&lookup, "AI_BACKOFF_BASE_MS", retry_defaults.backoff_base_ms)?,
            backoff_jitter_ms: parse_or(
                &lookup,
                "AI_BACKOFF_JITTER_MS",
                retry_defaults.backoff_jitter_ms,
            )?,
            request_timeout_secs: parse_or(
                &lookup,
                "AI_REQUEST_TIMEOUT_SECS",
                retry_defaults.request_timeout_secs,
            )?,
            circuit_breaker_threshold: parse_or(
                &lookup,
                "AI_CIRCUIT_BREAKER_THRESHOLD",
                retry_defaults.circuit_breaker_threshold,
            )?,
            circuit_breaker_reset_secs: parse_or(
                &lookup,
                "AI_CIRCUIT_BREAKER_RESET_SECS",
                retry_defaults.circuit_breaker_reset_secs,
            )?,
        };

        Ok(Self {
            provider,
            openai,
            huggingface,
            min_request_interval_secs: parse_or(
                &lookup,
                "AI_MIN_REQUEST_INTERVAL_SECS",
                defaults.min_request_interval_secs,
            )?,
            retry,
        })
    }

    /// Settings of the selected provider
    pub fn selected_settings(&self) -> &ProviderSettings {
        match self.provider {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::HuggingFace => &self.huggingface,
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(self.min_request_interval_secs)
    }
}

/// Inference endpoint for a HuggingFace model id
pub fn huggingface_endpoint(model: &str) -> String {
    format!("{HUGGINGFACE_INFERENCE_BASE}/{model}")
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

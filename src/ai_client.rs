//! # AI Scaling Client Module
//!
//! This module sends ingredient lines to a generative text provider and asks
//! it to rescale them for a new serving count. It provides:
//!
//! - Provider-specific request/response shapes ([`AiProvider`])
//! - Process-local rate limiting through an injected [`RateLimiter`]
//! - Retry with `Retry-After` handling on HTTP 429 and exponential backoff on
//!   transport errors
//! - Circuit breaker protection
//! - Validation that the provider returned exactly one line per input line
//!
//! Lines travel in both directions joined by [`RESPONSE_DELIMITER`]; the prompt
//! names the delimiter explicitly.

use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::rate_limiter::{IntervalRateLimiter, RateLimiter};
use crate::scaling_config::{AiScalingConfig, ProviderKind, ProviderSettings, RetryConfig};
use crate::scaling_errors::AiScalingError;

/// Separator between ingredient lines in prompts and provider replies
pub const RESPONSE_DELIMITER: &str = "|";

const OPENAI_TEMPERATURE: f32 = 0.2;
const HUGGINGFACE_MAX_NEW_TOKENS: u32 = 512;

/// Chat-completion request body (OpenAI-compatible)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Text-generation request body (HuggingFace inference API)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextGenerationRequest {
    pub model: String,
    pub inputs: String,
    pub parameters: TextGenerationParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextGenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextGenerationResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

/// Wire-level request for either provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderRequest {
    Chat(ChatRequest),
    TextGeneration(TextGenerationRequest),
}

/// Supported providers, each knowing its own request and response shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    HuggingFace,
}

impl From<ProviderKind> for AiProvider {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAi => AiProvider::OpenAi,
            ProviderKind::HuggingFace => AiProvider::HuggingFace,
        }
    }
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OpenAI",
            AiProvider::HuggingFace => "HuggingFace",
        }
    }

    /// Build the request body for `prompt`
    pub fn build_request(&self, model: &str, prompt: &str) -> ProviderRequest {
        match self {
            AiProvider::OpenAi => ProviderRequest::Chat(ChatRequest {
                model: model.to_string(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: "You rescale recipe ingredient quantities. Reply with the \
                                  ingredient lines only."
                            .to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    },
                ],
                temperature: OPENAI_TEMPERATURE,
            }),
            AiProvider::HuggingFace => ProviderRequest::TextGeneration(TextGenerationRequest {
                model: model.to_string(),
                inputs: prompt.to_string(),
                parameters: TextGenerationParameters {
                    max_new_tokens: HUGGINGFACE_MAX_NEW_TOKENS,
                    temperature: OPENAI_TEMPERATURE,
                    return_full_text: false,
                },
            }),
        }
    }

    /// Extract the generated text from a response body
    pub fn parse_response(&self, body: &str) -> Result<String, AiScalingError> {
        let invalid = |e: serde_json::Error| AiScalingError::InvalidResponse(e.to_string());
        match self {
            AiProvider::OpenAi => {
                let response: ChatResponse = serde_json::from_str(body).map_err(invalid)?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| AiScalingError::InvalidResponse("no choices".to_string()))
            }
            AiProvider::HuggingFace => {
                let response: TextGenerationResponse =
                    serde_json::from_str(body).map_err(invalid)?;
                match response {
                    TextGenerationResponse::Single(generated) => Ok(generated.generated_text),
                    TextGenerationResponse::Batch(batch) => batch
                        .into_iter()
                        .next()
                        .map(|generated| generated.generated_text)
                        .ok_or_else(|| {
                            AiScalingError::InvalidResponse("empty generation batch".to_string())
                        }),
                }
            }
        }
    }
}

/// Build the rescaling prompt for a set of ingredient lines
pub fn build_prompt(ingredients: &[String], original_servings: i32, new_servings: i32) -> String {
    let joined = ingredients.join(&format!(" {RESPONSE_DELIMITER} "));
    format!(
        "The following {count} recipe ingredient lines are written for {original_servings} \
         servings. Rescale every quantity for {new_servings} servings. Keep the language, \
         units, wording and order of each line exactly as given and change only the amounts. \
         Lines without an amount stay unchanged. Return exactly {count} lines separated by \
         the delimiter \"{RESPONSE_DELIMITER}\" and nothing else.\n\n{joined}",
        count = ingredients.len(),
    )
}

/// Split generated text into ingredient lines on [`RESPONSE_DELIMITER`]
pub fn split_response_lines(content: &str) -> Vec<String> {
    content
        .split(RESPONSE_DELIMITER)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Client for AI-assisted ingredient rescaling
#[derive(Debug)]
pub struct AiScalingClient {
    http: reqwest::Client,
    provider: AiProvider,
    settings: ProviderSettings,
    retry: RetryConfig,
    rate_limiter: Arc<dyn RateLimiter>,
    circuit_breaker: CircuitBreaker,
}

impl AiScalingClient {
    /// Create a client with its own interval rate limiter
    pub fn new(config: &AiScalingConfig) -> Result<Self, AiScalingError> {
        let limiter = Arc::new(IntervalRateLimiter::new(config.min_request_interval()));
        Self::with_rate_limiter(config, limiter)
    }

    /// Create a client that shares `rate_limiter` with other callers
    pub fn with_rate_limiter(
        config: &AiScalingConfig,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, AiScalingError> {
        let provider = AiProvider::from(config.provider);
        let http = reqwest::Client::builder()
            .timeout(config.retry.request_timeout())
            .build()
            .map_err(|e| AiScalingError::Misconfigured {
                provider: provider.name().to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            provider,
            settings: config.selected_settings().clone(),
            retry: config.retry.clone(),
            rate_limiter,
            circuit_breaker: CircuitBreaker::new(&config.retry),
        })
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    /// Whether the selected provider is enabled and has credentials
    pub fn is_available(&self) -> bool {
        self.settings.enabled && self.settings.has_credentials()
    }

    /// Ask the provider to rescale `ingredients`
    ///
    /// Returns exactly one line per input line, or the reason the AI tier
    /// could not be used. Cancelling `cancel` aborts rate-limit waits, backoff
    /// waits and in-flight requests.
    pub async fn request(
        &self,
        ingredients: &[String],
        original_servings: i32,
        new_servings: i32,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, AiScalingError> {
        self.ensure_configured()?;

        if self.circuit_breaker.is_open() {
            return Err(AiScalingError::CircuitOpen);
        }

        let prompt = build_prompt(ingredients, original_servings, new_servings);
        let body = self.provider.build_request(&self.settings.model, &prompt);

        let result = self
            .send_with_retry(&body, cancel)
            .await
            .and_then(|content| validate_lines(&content, ingredients.len()));

        match &result {
            Ok(lines) => {
                self.circuit_breaker.record_success();
                info!(
                    provider = self.provider.name(),
                    lines = lines.len(),
                    "AI scaling succeeded"
                );
            }
            Err(e) if e.is_provider_failure() => self.circuit_breaker.record_failure(),
            Err(_) => {}
        }

        result
    }

    fn ensure_configured(&self) -> Result<(), AiScalingError> {
        let reason = if !self.settings.enabled {
            "provider disabled"
        } else if !self.settings.has_credentials() {
            "missing API key"
        } else {
            return Ok(());
        };

        Err(AiScalingError::Misconfigured {
            provider: self.provider.name().to_string(),
            reason: reason.to_string(),
        })
    }

    async fn send_with_retry(
        &self,
        body: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AiScalingError> {
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AiScalingError::Cancelled),
                _ = self.rate_limiter.acquire() => {}
            }

            debug!(
                provider = self.provider.name(),
                attempt,
                max_attempts,
                "Sending AI scaling request"
            );

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AiScalingError::Cancelled),
                sent = self.send_once(body) => sent,
            };

            let wait = match sent {
                Ok(response) if response.status().is_success() => {
                    let text = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(AiScalingError::Cancelled),
                        text = response.text() => text,
                    };
                    match text {
                        Ok(text) => return self.provider.parse_response(&text),
                        Err(e) => self.transport_wait(attempt, max_attempts, &e)?,
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    match status {
                        StatusCode::TOO_MANY_REQUESTS => {
                            let wait = retry_after(&response)
                                .unwrap_or_else(|| self.retry.default_retry_after());
                            warn!(
                                provider = self.provider.name(),
                                attempt,
                                retry_after_secs = wait.as_secs(),
                                "AI provider rate limited the request"
                            );
                            if wait > self.retry.max_retry_after() {
                                warn!(
                                    provider = self.provider.name(),
                                    retry_after_secs = wait.as_secs(),
                                    max_retry_after_secs = self.retry.max_retry_after_secs,
                                    "Retry-After exceeds the allowed wait, giving up"
                                );
                                return Err(AiScalingError::RateLimited { attempts: attempt });
                            }
                            if attempt >= max_attempts {
                                return Err(AiScalingError::RateLimited { attempts: attempt });
                            }
                            wait
                        }
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::GONE => {
                            error!(
                                provider = self.provider.name(),
                                status = status.as_u16(),
                                "AI provider rejected credentials or license"
                            );
                            return Err(AiScalingError::Unauthorized {
                                status: status.as_u16(),
                            });
                        }
                        _ => {
                            warn!(
                                provider = self.provider.name(),
                                status = status.as_u16(),
                                "AI provider returned an unexpected status"
                            );
                            return Err(AiScalingError::UnexpectedStatus {
                                status: status.as_u16(),
                            });
                        }
                    }
                }
                Err(e) => self.transport_wait(attempt, max_attempts, &e)?,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AiScalingError::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }

    async fn send_once(&self, body: &ProviderRequest) -> reqwest::Result<Response> {
        let mut request = self.http.post(&self.settings.endpoint).json(body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await
    }

    /// Backoff before the next attempt after a transport failure, or the final
    /// error once every attempt is used
    fn transport_wait(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn fmt::Display,
    ) -> Result<Duration, AiScalingError> {
        warn!(
            provider = self.provider.name(),
            attempt,
            error = %error,
            "AI request failed"
        );
        if attempt >= max_attempts {
            return Err(AiScalingError::Transport {
                attempts: attempt,
                message: error.to_string(),
            });
        }
        Ok(self.backoff_delay(attempt))
    }

    /// `base × 2^attempt` plus random jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .retry
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let jitter = if self.retry.backoff_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.retry.backoff_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

/// Parse a `Retry-After` header given in seconds
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn validate_lines(content: &str, expected: usize) -> Result<Vec<String>, AiScalingError> {
    let lines = split_response_lines(content);
    if lines.len() != expected {
        warn!(
            expected,
            actual = lines.len(),
            "AI response line count does not match request"
        );
        return Err(AiScalingError::ShapeMismatch {
            expected,
            actual: lines.len(),
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prompt_names_delimiter_and_servings() {
        let prompt = build_prompt(&lines(&["2 su bardağı un", "tuz"]), 4, 8);
        assert!(prompt.contains("for 4"));
        assert!(prompt.contains("for 8 servings"));
        assert!(prompt.contains("\"|\""));
        assert!(prompt.ends_with("2 su bardağı un | tuz"));
    }

    #[test]
    fn test_split_response_lines() {
        assert_eq!(
            split_response_lines(" 4 su bardağı un | bir çay bardağı şeker |tuz\n"),
            lines(&["4 su bardağı un", "bir çay bardağı şeker", "tuz"])
        );
        assert!(split_response_lines("  ").is_empty());
    }

    #[test]
    fn test_validate_lines_shape() {
        assert!(validate_lines("a | b", 2).is_ok());
        assert_eq!(
            validate_lines("a | b | c", 2),
            Err(AiScalingError::ShapeMismatch { expected: 2, actual: 3 })
        );
    }

    #[test]
    fn test_openai_request_shape() {
        let request = AiProvider::OpenAi.build_request("gpt-test", "prompt text");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "prompt text");
    }

    #[test]
    fn test_huggingface_request_shape() {
        let request = AiProvider::HuggingFace.build_request("my-model", "prompt text");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "my-model");
        assert_eq!(json["inputs"], "prompt text");
        assert_eq!(json["parameters"]["return_full_text"], false);
    }

    #[test]
    fn test_parse_openai_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"4 su bardağı un | tuz"}}]}"#;
        assert_eq!(
            AiProvider::OpenAi.parse_response(body).unwrap(),
            "4 su bardağı un | tuz"
        );
        assert!(matches!(
            AiProvider::OpenAi.parse_response(r#"{"choices":[]}"#),
            Err(AiScalingError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_huggingface_response() {
        let batch = r#"[{"generated_text":"4 su bardağı un | tuz"}]"#;
        assert_eq!(
            AiProvider::HuggingFace.parse_response(batch).unwrap(),
            "4 su bardağı un | tuz"
        );
        let single = r#"{"generated_text":"tuz"}"#;
        assert_eq!(AiProvider::HuggingFace.parse_response(single).unwrap(), "tuz");
        assert!(AiProvider::HuggingFace.parse_response("not json").is_err());
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = AiScalingConfig {
            retry: RetryConfig {
                backoff_base_ms: 1000,
                backoff_jitter_ms: 0,
                ..RetryConfig::default()
            },
            ..AiScalingConfig::default()
        };
        let client = AiScalingClient::new(&config).unwrap();
        assert_eq!(client.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(client.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(client.backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_transport_wait_backs_off_until_last_attempt() {
        let config = AiScalingConfig {
            retry: RetryConfig {
                backoff_base_ms: 10,
                backoff_jitter_ms: 0,
                ..RetryConfig::default()
            },
            ..AiScalingConfig::default()
        };
        let client = AiScalingClient::new(&config).unwrap();
        assert_eq!(
            client.transport_wait(1, 3, &"body truncated"),
            Ok(Duration::from_millis(20))
        );
        assert_eq!(
            client.transport_wait(3, 3, &"body truncated"),
            Err(AiScalingError::Transport {
                attempts: 3,
                message: "body truncated".to_string()
            })
        );
    }

    #[test]
    fn test_backoff_jitter_is_bounded() {
        let config = AiScalingConfig {
            retry: RetryConfig {
                backoff_base_ms: 100,
                backoff_jitter_ms: 50,
                ..RetryConfig::default()
            },
            ..AiScalingConfig::default()
        };
        let client = AiScalingClient::new(&config).unwrap();
        for _ in 0..20 {
            let delay = client.backoff_delay(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_disabled_provider_fails_fast() {
        let client = AiScalingClient::new(&AiScalingConfig::default()).unwrap();
        assert!(!client.is_available());

        let result = client
            .request(&lines(&["2 su bardağı un"]), 4, 8, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AiScalingError::Misconfigured { .. })));
    }

    #[tokio::test]
    async fn test_enabled_provider_without_key_fails_fast() {
        let mut config = AiScalingConfig::default();
        config.openai.enabled = true;
        let client = AiScalingClient::new(&config).unwrap();

        let result = client
            .request(&lines(&["tuz"]), 2, 4, &CancellationToken::new())
            .await;
        assert_eq!(
            result,
            Err(AiScalingError::Misconfigured {
                provider: "OpenAI".to_string(),
                reason: "missing API key".to_string()
            })
        );
    }
}

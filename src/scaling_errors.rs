//! # Scaling Error Types Module
//!
//! This module defines the error types of the AI scaling tier and of
//! configuration loading. None of them ever reaches the caller of the
//! orchestrator: every AI failure degrades to the deterministic scaler.

use thiserror::Error;

/// Reasons the AI scaling tier did not produce a usable result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiScalingError {
    /// Provider disabled or missing credentials
    #[error("provider {provider} is not usable: {reason}")]
    Misconfigured { provider: String, reason: String },

    /// Too many recent failures, calls are short-circuited
    #[error("circuit breaker is open, AI call skipped")]
    CircuitOpen,

    /// Connection, timeout or body read failure after all retries
    #[error("transport failure after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    /// HTTP 429 on every attempt
    #[error("rate limited by provider after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    /// HTTP 401/403/410
    #[error("authentication or license failure (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success status
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    /// Body could not be decoded into ingredient lines
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Line count differs from the request
    #[error("provider returned {actual} line(s), expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The caller abandoned the operation
    #[error("AI scaling cancelled")]
    Cancelled,
}

impl AiScalingError {
    /// Whether this failure should count towards opening the circuit breaker
    pub fn is_provider_failure(&self) -> bool {
        !matches!(
            self,
            AiScalingError::Misconfigured { .. }
                | AiScalingError::CircuitOpen
                | AiScalingError::Cancelled
        )
    }
}

/// Errors raised while reading configuration from the environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown AI provider '{0}', expected 'openai' or 'huggingface'")]
    UnknownProvider(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

//! # Ingredient Scaler
//!
//! Rescales recipe ingredient lines to a new serving count and builds
//! shopping lists from meal plans. Scaling tries a generative AI provider
//! first and falls back to a deterministic scaler that understands numeric
//! quantities and Turkish fraction phrases ("yarım", "bir buçuk").

pub mod aggregator;
pub mod ai_client;
pub mod circuit_breaker;
pub mod fraction_vocabulary;
pub mod ingredient_model;
pub mod ingredient_parser;
pub mod logging;
pub mod number_formatter;
pub mod orchestrator;
pub mod rate_limiter;
pub mod scaler;
pub mod scaling_config;
pub mod scaling_errors;

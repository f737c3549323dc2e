//! # Scaling Orchestrator Module
//!
//! Entry point of the quantity engine. A scaling request first goes to the AI
//! scaling client when one is configured; any failure there degrades to the
//! deterministic scaler. The orchestrator never fails and always returns one
//! line per input line.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ai_client::AiScalingClient;
use crate::ingredient_model::{ScalingRequest, ScalingResponse};
use crate::scaler::DeterministicScaler;
use crate::scaling_config::AiScalingConfig;
use crate::scaling_errors::AiScalingError;

/// Which tier produced a scaling result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalingPath {
    /// The AI provider returned a well-formed answer
    Ai,
    /// The deterministic scaler ran; `reason` is the AI failure, if AI was tried
    Deterministic { reason: Option<AiScalingError> },
    /// The input was returned unchanged (empty list or invalid servings)
    Passthrough,
}

/// Scaled lines together with the tier that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingOutcome {
    pub ingredients: Vec<String>,
    pub path: ScalingPath,
}

impl ScalingOutcome {
    fn passthrough(request: &ScalingRequest) -> Self {
        Self {
            ingredients: request.ingredients.clone(),
            path: ScalingPath::Passthrough,
        }
    }
}

impl From<ScalingOutcome> for ScalingResponse {
    fn from(outcome: ScalingOutcome) -> Self {
        ScalingResponse {
            ingredients: outcome.ingredients,
        }
    }
}

/// Coordinates the AI and deterministic scaling tiers
#[derive(Debug)]
pub struct ScalingOrchestrator {
    ai_client: Option<AiScalingClient>,
    scaler: DeterministicScaler,
}

impl ScalingOrchestrator {
    pub fn new(ai_client: Option<AiScalingClient>) -> Self {
        Self {
            ai_client,
            scaler: DeterministicScaler::new(),
        }
    }

    /// Orchestrator that never calls out to a provider
    pub fn deterministic_only() -> Self {
        Self::new(None)
    }

    /// Build the orchestrator and its AI client from configuration
    ///
    /// A client that cannot be constructed is logged and left out.
    pub fn from_config(config: &AiScalingConfig) -> Self {
        match AiScalingClient::new(config) {
            Ok(client) => {
                info!(
                    provider = client.provider().name(),
                    available = client.is_available(),
                    "AI scaling client initialized"
                );
                Self::new(Some(client))
            }
            Err(e) => {
                warn!(error = %e, "AI scaling client unavailable, using deterministic scaling only");
                Self::deterministic_only()
            }
        }
    }

    /// Rescale the request's lines for its new serving count
    pub async fn adjust_ingredients(&self, request: &ScalingRequest) -> ScalingResponse {
        self.adjust_ingredients_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`adjust_ingredients`](Self::adjust_ingredients), abandoning the
    /// AI call when `cancel` fires
    pub async fn adjust_ingredients_with_cancel(
        &self,
        request: &ScalingRequest,
        cancel: &CancellationToken,
    ) -> ScalingResponse {
        self.adjust_ingredients_detailed(request, cancel)
            .await
            .into()
    }

    /// Rescale and report which tier produced the result
    pub async fn adjust_ingredients_detailed(
        &self,
        request: &ScalingRequest,
        cancel: &CancellationToken,
    ) -> ScalingOutcome {
        if request.ingredients.is_empty() {
            return ScalingOutcome::passthrough(request);
        }

        let Some(multiplier) = request.multiplier() else {
            debug!(
                original_servings = request.original_servings,
                new_servings = request.new_servings,
                "Invalid serving counts, returning ingredients unchanged"
            );
            return ScalingOutcome::passthrough(request);
        };

        let reason = match &self.ai_client {
            Some(client) => match self.try_ai(client, request, cancel).await {
                Ok(ingredients) => {
                    return ScalingOutcome {
                        ingredients,
                        path: ScalingPath::Ai,
                    }
                }
                Err(e) => Some(e),
            },
            None => None,
        };

        ScalingOutcome {
            ingredients: self.scaler.scale_all(&request.ingredients, multiplier),
            path: ScalingPath::Deterministic { reason },
        }
    }

    async fn try_ai(
        &self,
        client: &AiScalingClient,
        request: &ScalingRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, AiScalingError> {
        let result = client
            .request(
                &request.ingredients,
                request.original_servings,
                request.new_servings,
                cancel,
            )
            .await
            .and_then(|lines| {
                if lines.len() == request.ingredients.len() {
                    Ok(lines)
                } else {
                    Err(AiScalingError::ShapeMismatch {
                        expected: request.ingredients.len(),
                        actual: lines.len(),
                    })
                }
            });

        match &result {
            Err(AiScalingError::Cancelled) => {
                info!("AI scaling cancelled, falling back to deterministic scaling");
            }
            Err(e) => {
                warn!(error = %e, "AI scaling failed, falling back to deterministic scaling");
            }
            Ok(_) => {}
        }

        result
    }
}

impl Default for ScalingOrchestrator {
    fn default() -> Self {
        Self::deterministic_only()
    }
}

use anyhow::{bail, Context, Result};
use std::env;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ingredient_scaler::ingredient_model::ScalingRequest;
use ingredient_scaler::logging::init_logging;
use ingredient_scaler::orchestrator::{ScalingOrchestrator, ScalingPath};
use ingredient_scaler::scaling_config::AiScalingConfig;

const USAGE: &str = "usage: ingredient-scaler <original-servings> <new-servings> < ingredients.txt";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_logging();

    let (original_servings, new_servings) = parse_servings(env::args().skip(1))?;

    let config = AiScalingConfig::from_env().context("Invalid AI scaling configuration")?;
    let orchestrator = ScalingOrchestrator::from_config(&config);

    let ingredients = read_lines().await.context("Failed to read ingredients from stdin")?;
    info!(
        lines = ingredients.len(),
        original_servings, new_servings, "Scaling ingredients"
    );

    // Ctrl-C abandons the AI call; the deterministic result is still printed
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling AI scaling");
            ctrl_c_token.cancel();
        }
    });

    let request = ScalingRequest::new(ingredients, original_servings, new_servings);
    let outcome = orchestrator
        .adjust_ingredients_detailed(&request, &cancel)
        .await;

    match &outcome.path {
        ScalingPath::Ai => info!("Scaled with AI provider"),
        ScalingPath::Deterministic { reason } => {
            info!(ai_error = ?reason, "Scaled deterministically")
        }
        ScalingPath::Passthrough => info!("Ingredients returned unchanged"),
    }

    for line in &outcome.ingredients {
        println!("{}", line);
    }

    Ok(())
}

fn parse_servings(mut args: impl Iterator<Item = String>) -> Result<(i32, i32)> {
    let (Some(original), Some(new)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let original = original
        .trim()
        .parse()
        .with_context(|| format!("Invalid original servings '{}'", original))?;
    let new = new
        .trim()
        .parse()
        .with_context(|| format!("Invalid new servings '{}'", new))?;

    Ok((original, new))
}

async fn read_lines() -> Result<Vec<String>> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut ingredients = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            ingredients.push(line.to_string());
        }
    }

    Ok(ingredients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_servings() {
        assert_eq!(parse_servings(args(&["4", "8"])).unwrap(), (4, 8));
        assert!(parse_servings(args(&["4"])).is_err());
        assert!(parse_servings(args(&["four", "8"])).is_err());
    }
}

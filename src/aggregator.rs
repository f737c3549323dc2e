//! # Ingredient Aggregator Module
//!
//! Builds a shopping list from a meal plan. Every planned meal contributes its
//! recipe's ingredients scaled by `planned servings / recipe servings`;
//! ingredients with the same name are merged into one entry.
//!
//! ## Usage
//!
//! ```rust
//! use ingredient_scaler::aggregator::IngredientAggregator;
//! use ingredient_scaler::ingredient_model::{MealPlanItem, RecipeSnapshot};
//!
//! let item = MealPlanItem {
//!     servings: 8,
//!     recipe: RecipeSnapshot {
//!         servings: 4,
//!         ingredients_text: "200 g un".to_string(),
//!     },
//! };
//!
//! let aggregator = IngredientAggregator::new();
//! let list = aggregator.to_shopping_list(&aggregator.aggregate(&[item]));
//! assert_eq!(list[0].to_string(), "400 g un");
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::ingredient_model::{
    AggregatedIngredient, MealPlanItem, PlannedMeal, RecipeSnapshot, ShoppingListItem,
};
use crate::ingredient_parser::{normalize_name, parse_ingredient_text};

/// Read access to recipes and meal plans owned by the persistence layer
#[async_trait]
pub trait MealPlanSource: Send + Sync {
    /// Fetch a recipe, `None` if it no longer exists
    async fn get_recipe(&self, recipe_id: i64) -> Result<Option<RecipeSnapshot>>;

    /// Fetch the meals planned under `plan_id`
    async fn get_meal_plan_items(&self, plan_id: i64) -> Result<Vec<PlannedMeal>>;
}

/// Stateless merger of scaled recipe ingredients
#[derive(Debug, Clone, Copy, Default)]
pub struct IngredientAggregator;

impl IngredientAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Scale every item's ingredients and merge them by name
    ///
    /// Items without positive planned and recipe servings are skipped. The
    /// result is sorted by display name, case-insensitively.
    pub fn aggregate(&self, items: &[MealPlanItem]) -> Vec<AggregatedIngredient> {
        let mut totals: HashMap<String, AggregatedIngredient> = HashMap::new();

        for item in items {
            let Some(ratio) = item.serving_ratio() else {
                warn!(
                    servings = item.servings,
                    recipe_servings = item.recipe.servings,
                    "Skipping meal plan item with invalid servings"
                );
                continue;
            };

            for parsed in parse_ingredient_text(&item.recipe.ingredients_text) {
                let canonical_name = normalize_name(&parsed.name);
                let scaled = parsed.quantity * ratio;

                match totals.get_mut(&canonical_name) {
                    Some(existing) => {
                        if existing.unit != parsed.unit {
                            debug!(
                                name = %canonical_name,
                                kept = ?existing.unit,
                                ignored = ?parsed.unit,
                                "Merging ingredient with a different unit"
                            );
                        }
                        existing.total_quantity += scaled;
                    }
                    None => {
                        totals.insert(
                            canonical_name.clone(),
                            AggregatedIngredient {
                                canonical_name,
                                display_name: parsed.name,
                                total_quantity: scaled,
                                unit: parsed.unit,
                            },
                        );
                    }
                }
            }
        }

        let mut aggregated: Vec<AggregatedIngredient> = totals.into_values().collect();
        aggregated.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });
        aggregated
    }

    /// Render aggregates as shopping-list lines
    pub fn to_shopping_list(&self, aggregates: &[AggregatedIngredient]) -> Vec<ShoppingListItem> {
        aggregates
            .iter()
            .map(AggregatedIngredient::to_shopping_list_item)
            .collect()
    }
}

/// Resolve a meal plan through `source` and build its shopping list
///
/// Planned meals whose recipe is missing are skipped with a warning.
pub async fn build_shopping_list(
    source: &dyn MealPlanSource,
    plan_id: i64,
) -> Result<Vec<ShoppingListItem>> {
    let planned = source
        .get_meal_plan_items(plan_id)
        .await
        .with_context(|| format!("Failed to load meal plan {}", plan_id))?;

    let mut items = Vec::with_capacity(planned.len());
    for meal in planned {
        let recipe = source
            .get_recipe(meal.recipe_id)
            .await
            .with_context(|| format!("Failed to load recipe {}", meal.recipe_id))?;

        match recipe {
            Some(recipe) => items.push(MealPlanItem {
                servings: meal.servings,
                recipe,
            }),
            None => warn!(
                plan_id,
                recipe_id = meal.recipe_id,
                date = %meal.date,
                "Planned recipe not found, skipping"
            ),
        }
    }

    let aggregator = IngredientAggregator::new();
    let list = aggregator.to_shopping_list(&aggregator.aggregate(&items));
    info!(plan_id, meals = items.len(), entries = list.len(), "Built shopping list");
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(servings: i32, recipe_servings: i32, text: &str) -> MealPlanItem {
        MealPlanItem {
            servings,
            recipe: RecipeSnapshot {
                servings: recipe_servings,
                ingredients_text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_same_ingredient_is_merged() {
        let items = vec![item(4, 4, "2 su bardağı un"), item(4, 4, "2 su bardağı un")];
        let aggregated = IngredientAggregator::new().aggregate(&items);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].canonical_name, "un");
        assert_eq!(aggregated[0].total_quantity, 4.0);
        assert_eq!(aggregated[0].unit.as_deref(), Some("su bardağı"));
    }

    #[test]
    fn test_serving_ratio_is_applied() {
        let aggregated = IngredientAggregator::new().aggregate(&[item(8, 4, "200 g un")]);
        assert_eq!(aggregated[0].total_quantity, 400.0);
    }

    #[test]
    fn test_merge_ignores_case_and_keeps_first_display_name() {
        let items = vec![item(2, 2, "1 adet Soğan"), item(4, 2, "soğan")];
        let aggregated = IngredientAggregator::new().aggregate(&items);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].display_name, "Soğan");
        // 1 × 1 + 1 (implicit) × 2
        assert_eq!(aggregated[0].total_quantity, 3.0);
    }

    #[test]
    fn test_invalid_recipe_servings_are_skipped() {
        let items = vec![item(4, 0, "2 su bardağı un"), item(2, 2, "tuz")];
        let aggregated = IngredientAggregator::new().aggregate(&items);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].display_name, "tuz");
    }

    #[test]
    fn test_non_positive_planned_servings_are_skipped() {
        let items = vec![
            item(-4, 4, "2 su bardağı un"),
            item(0, 4, "1 su bardağı süt"),
            item(2, 2, "tuz"),
        ];
        let aggregated = IngredientAggregator::new().aggregate(&items);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].display_name, "tuz");
        assert!(aggregated.iter().all(|a| a.total_quantity > 0.0));
    }

    #[test]
    fn test_sorted_by_display_name() {
        let items = vec![item(1, 1, "şeker\nYumurta\nun\nBal")];
        let names: Vec<String> = IngredientAggregator::new()
            .aggregate(&items)
            .into_iter()
            .map(|a| a.display_name)
            .collect();
        assert_eq!(names, vec!["Bal", "un", "Yumurta", "şeker"]);
    }

    #[test]
    fn test_shopping_list_rounds_quantities() {
        let aggregated = IngredientAggregator::new().aggregate(&[item(1, 3, "1 su bardağı süt")]);
        let list = IngredientAggregator::new().to_shopping_list(&aggregated);
        assert_eq!(list[0].quantity, "0.33");
        assert_eq!(list[0].to_string(), "0.33 su bardağı süt");
    }
}

//! # Ingredient and Quantity Data Model
//!
//! This module defines the data structures that flow through the quantity
//! engine: scaling requests and responses, parsed ingredient lines, located
//! quantity tokens, aggregated shopping-list entries and the meal-plan shapes
//! consumed from the persistence layer.
//!
//! Everything here is created per call and discarded once the response is built.
//!
//! ## Usage
//!
//! ```rust
//! use ingredient_scaler::ingredient_model::{ParsedIngredient, ScalingRequest};
//!
//! let request = ScalingRequest::new(vec!["2 su bardağı un".to_string()], 4, 8);
//! assert_eq!(request.multiplier(), Some(2.0));
//!
//! let flour = ParsedIngredient::new("un").with_quantity(2.0).with_unit("su bardağı");
//! assert_eq!(flour.to_string(), "2 su bardağı un");
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::number_formatter::format_plain;

/// Request to rescale one recipe's ingredient lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingRequest {
    /// Ingredient lines in display order
    pub ingredients: Vec<String>,
    /// Serving count the lines were written for
    pub original_servings: i32,
    /// Serving count to rescale to
    pub new_servings: i32,
}

/// Rescaled ingredient lines, one per request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingResponse {
    pub ingredients: Vec<String>,
}

/// Where a parsed quantity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantitySource {
    /// A numeric token ("2", "1.5", "1,5", "1/2")
    Number,
    /// A fraction phrase ("yarım", "bir buçuk")
    Phrase,
    /// No token found; the item counts as one
    Implicit,
}

/// Structured form of one ingredient line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    /// Ingredient name, never empty
    pub name: String,
    /// Parsed amount, 1 when the line carries no quantity
    pub quantity: f64,
    /// Unit phrase ("su bardağı", "g"), if one was recognized
    pub unit: Option<String>,
    /// How the quantity was obtained
    pub source: QuantitySource,
}

/// Kind of token located by the quantity grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    Number,
    Phrase,
}

/// A quantity token located inside a line
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityToken {
    /// Byte offset of the token start
    pub start: usize,
    /// Byte offset of the token end
    pub end: usize,
    /// Decimal value of the token
    pub value: f64,
    pub kind: QuantityKind,
}

/// One merged shopping-list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedIngredient {
    /// Lower-cased name used as the merge key
    pub canonical_name: String,
    /// Name as first seen
    pub display_name: String,
    /// Sum of the scaled quantities of every contributing line
    pub total_quantity: f64,
    /// Unit of the first contributing line
    pub unit: Option<String>,
}

/// A rendered shopping-list line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub name: String,
    /// Quantity rounded to two decimals, trailing zeros trimmed
    pub quantity: String,
    pub unit: Option<String>,
}

/// The parts of a recipe the aggregator needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSnapshot {
    pub servings: i32,
    pub ingredients_text: String,
}

/// A meal-plan entry joined with its recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanItem {
    /// Servings planned for this meal
    pub servings: i32,
    pub recipe: RecipeSnapshot,
}

/// A meal-plan entry as stored by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub recipe_id: i64,
    pub servings: i32,
    pub date: NaiveDate,
}

impl ScalingRequest {
    pub fn new(ingredients: Vec<String>, original_servings: i32, new_servings: i32) -> Self {
        Self {
            ingredients,
            original_servings,
            new_servings,
        }
    }

    /// Check that both serving counts are positive
    pub fn has_valid_servings(&self) -> bool {
        self.original_servings > 0 && self.new_servings > 0
    }

    /// `new_servings / original_servings`, or `None` when the servings are invalid
    pub fn multiplier(&self) -> Option<f64> {
        self.has_valid_servings()
            .then(|| f64::from(self.new_servings) / f64::from(self.original_servings))
    }
}

impl ParsedIngredient {
    /// Create an ingredient that counts as a single item
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            quantity: 1.0,
            unit: None,
            source: QuantitySource::Implicit,
        }
    }

    /// Set an explicit numeric quantity
    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self.source = QuantitySource::Number;
        self
    }

    /// Set the quantity together with its source
    pub fn with_quantity_from(mut self, quantity: f64, source: QuantitySource) -> Self {
        self.quantity = quantity;
        self.source = source;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Whether the line carried its own quantity token
    pub fn has_explicit_quantity(&self) -> bool {
        self.source != QuantitySource::Implicit
    }
}

impl QuantityToken {
    /// The token text inside the line it was located in
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

impl AggregatedIngredient {
    /// Render as a shopping-list line
    pub fn to_shopping_list_item(&self) -> ShoppingListItem {
        ShoppingListItem {
            name: self.display_name.clone(),
            quantity: format_plain(self.total_quantity),
            unit: self.unit.clone(),
        }
    }
}

impl MealPlanItem {
    /// `servings / recipe.servings`, or `None` unless both counts are positive
    pub fn serving_ratio(&self) -> Option<f64> {
        (self.servings > 0 && self.recipe.servings > 0)
            .then(|| f64::from(self.servings) / f64::from(self.recipe.servings))
    }
}

impl fmt::Display for ParsedIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_explicit_quantity() {
            write!(f, "{} ", format_plain(self.quantity))?;
        }
        if let Some(unit) = &self.unit {
            write!(f, "{} ", unit)?;
        }
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for ShoppingListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {} {}", self.quantity, unit, self.name),
            None => write!(f, "{} {}", self.quantity, self.name),
        }
    }
}

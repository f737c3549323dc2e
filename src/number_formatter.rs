//! # Number Formatter Module
//!
//! Turns scaled quantities back into display strings. Values that land on a
//! known fraction phrase are written as the phrase ("yarım", "bir buçuk");
//! anything else becomes a trimmed decimal ("4", "1.5", "0.33").

use crate::fraction_vocabulary::vocabulary;

/// Format a quantity the way a recipe author would write it
///
/// # Examples
///
/// ```rust
/// use ingredient_scaler::number_formatter::format_natural;
///
/// assert_eq!(format_natural(0.5), "yarım");
/// assert_eq!(format_natural(1.5), "bir buçuk");
/// assert_eq!(format_natural(4.0), "4");
/// assert_eq!(format_natural(1.2), "1.2");
/// ```
pub fn format_natural(value: f64) -> String {
    match vocabulary().phrase_for(value) {
        Some(phrase) => phrase.to_string(),
        None => format_plain(value),
    }
}

/// Format a quantity as a number rounded to two decimals with trailing zeros
/// removed (`400`, `10.5`, `0.33`)
pub fn format_plain(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }

    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

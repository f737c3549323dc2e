//! # Deterministic Scaler Module
//!
//! Rescales ingredient lines without any external service. For each line the
//! quantity token is located with the shared ingredient grammar, multiplied,
//! re-formatted through the natural number formatter and written back in
//! place. Everything around the token is left untouched.
//!
//! ## Features
//!
//! - Fraction phrases are rescaled first ("yarım" × 2 → "bir")
//! - "bir" is a quantity only when it opens the line before a unit
//! - Numeric quantities followed by a unit or name are rescaled otherwise
//! - Decimal commas in the source line are preserved in the output
//! - Lines with nothing to scale ("tuz", "bir miktar tuz") pass through unchanged

use tracing::{debug, trace};

use crate::ingredient_model::QuantityKind;
use crate::ingredient_parser::locate_quantity;
use crate::number_formatter::format_natural;

/// Stateless line scaler used whenever the AI path is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicScaler;

impl DeterministicScaler {
    pub fn new() -> Self {
        Self
    }

    /// Rescale a single ingredient line by `multiplier`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingredient_scaler::scaler::DeterministicScaler;
    ///
    /// let scaler = DeterministicScaler::new();
    /// assert_eq!(scaler.scale("2 su bardağı un", 2.0), "4 su bardağı un");
    /// assert_eq!(scaler.scale("yarım çay bardağı şeker", 2.0), "bir çay bardağı şeker");
    /// assert_eq!(scaler.scale("tuz", 2.0), "tuz");
    /// ```
    pub fn scale(&self, line: &str, multiplier: f64) -> String {
        if (multiplier - 1.0).abs() < f64::EPSILON || !multiplier.is_finite() {
            return line.to_string();
        }

        let Some(token) = locate_quantity(line) else {
            trace!(line, "Nothing to scale, passing line through");
            return line.to_string();
        };

        let original = token.text(line);
        let scaled_value = token.value * multiplier;
        let mut replacement = format_natural(scaled_value);

        match token.kind {
            QuantityKind::Number if original.contains(',') => {
                replacement = replacement.replace('.', ",");
            }
            QuantityKind::Phrase if starts_uppercase(original) => {
                replacement = capitalize(&replacement);
            }
            _ => {}
        }

        debug!(
            line,
            original,
            replacement = %replacement,
            multiplier,
            "Scaled ingredient quantity"
        );

        let mut scaled = String::with_capacity(line.len() + replacement.len());
        scaled.push_str(&line[..token.start]);
        scaled.push_str(&replacement);
        scaled.push_str(&line[token.end..]);
        scaled
    }

    /// Rescale every line, preserving order and count
    pub fn scale_all(&self, lines: &[String], multiplier: f64) -> Vec<String> {
        lines
            .iter()
            .map(|line| self.scale(line, multiplier))
            .collect()
    }
}

fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some('i') => format!("İ{}", chars.as_str()),
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> DeterministicScaler {
        DeterministicScaler::new()
    }

    #[test]
    fn test_scale_number_with_unit() {
        assert_eq!(scaler().scale("2 su bardağı un", 2.0), "4 su bardağı un");
        assert_eq!(scaler().scale("200 g un", 2.0), "400 g un");
        assert_eq!(scaler().scale("500g kıyma", 0.5), "250g kıyma");
    }

    #[test]
    fn test_scale_fraction_phrase() {
        assert_eq!(
            scaler().scale("yarım çay bardağı şeker", 2.0),
            "bir çay bardağı şeker"
        );
        assert_eq!(
            scaler().scale("yarım çay bardağı şeker", 3.0),
            "bir buçuk çay bardağı şeker"
        );
        assert_eq!(scaler().scale("çeyrek demet dereotu", 4.0), "bir demet dereotu");
    }

    #[test]
    fn test_phrase_to_plain_number() {
        assert_eq!(scaler().scale("yarım su bardağı süt", 4.0), "2 su bardağı süt");
    }

    #[test]
    fn test_number_to_phrase() {
        assert_eq!(scaler().scale("1 su bardağı süt", 0.5), "yarım su bardağı süt");
    }

    #[test]
    fn test_only_first_phrase_is_substituted() {
        assert_eq!(
            scaler().scale("yarım limon, yarım portakal", 2.0),
            "bir limon, yarım portakal"
        );
    }

    #[test]
    fn test_surrounding_text_untouched() {
        assert_eq!(
            scaler().scale("Üzeri için 3 yemek kaşığı yoğurt (süzme)", 2.0),
            "Üzeri için 6 yemek kaşığı yoğurt (süzme)"
        );
    }

    #[test]
    fn test_decimal_comma_is_preserved() {
        assert_eq!(scaler().scale("1,5 su bardağı süt", 3.0), "4,5 su bardağı süt");
    }

    #[test]
    fn test_capitalized_phrase_stays_capitalized() {
        assert_eq!(scaler().scale("Yarım limon", 2.0), "Bir limon");
        assert_eq!(scaler().scale("Bir tutam tuz", 2.0), "2 tutam tuz");
    }

    #[test]
    fn test_article_bir_is_not_scaled() {
        assert_eq!(
            scaler().scale("2 su bardağı un (bir kısmı serpmek için)", 2.0),
            "4 su bardağı un (bir kısmı serpmek için)"
        );
        assert_eq!(scaler().scale("bir miktar tuz", 2.0), "bir miktar tuz");
        assert_eq!(
            scaler().scale("Bir kaç dal maydanoz", 2.0),
            "Bir kaç dal maydanoz"
        );
    }

    #[test]
    fn test_leading_bir_before_unit_is_scaled() {
        assert_eq!(
            scaler().scale("bir çay bardağı şeker", 2.0),
            "2 çay bardağı şeker"
        );
        assert_eq!(scaler().scale("bir su bardağı su", 0.5), "yarım su bardağı su");
    }

    #[test]
    fn test_unscalable_lines_pass_through() {
        assert_eq!(scaler().scale("tuz", 3.0), "tuz");
        assert_eq!(scaler().scale("karabiber", 0.5), "karabiber");
        assert_eq!(scaler().scale("", 2.0), "");
    }

    #[test]
    fn test_multiplier_one_is_identity() {
        assert_eq!(scaler().scale("1 su bardağı süt", 1.0), "1 su bardağı süt");
        assert_eq!(scaler().scale("yarım limon", 1.0), "yarım limon");
    }

    #[test]
    fn test_scale_all_preserves_count() {
        let lines = vec![
            "2 su bardağı un".to_string(),
            "tuz".to_string(),
            "yarım çay bardağı şeker".to_string(),
        ];
        let scaled = scaler().scale_all(&lines, 2.0);
        assert_eq!(scaled.len(), lines.len());
        assert_eq!(scaled[1], "tuz");
    }
}

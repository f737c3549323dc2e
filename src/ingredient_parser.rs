//! # Ingredient Parser
//!
//! This module turns free-text ingredient lines into structured
//! [`ParsedIngredient`] values. Both the single-recipe scaling path and the
//! shopping-list path use the same grammar:
//!
//! ```text
//! line     := [quantity] [unit] name
//! quantity := number | fraction-phrase
//! number   := "2" | "1.5" | "1,5" | "1/2" | "1 1/2"
//! unit     := known unit phrase, longest first ("su bardağı", "çay kaşığı", "g", ...)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ingredient_scaler::ingredient_parser::parse_ingredient_text;
//!
//! let parsed = parse_ingredient_text("2 su bardağı un\nyarım çay bardağı şeker, tuz");
//!
//! assert_eq!(parsed.len(), 3);
//! assert_eq!(parsed[0].name, "un");
//! assert_eq!(parsed[1].quantity, 0.5);
//! assert_eq!(parsed[2].name, "tuz");
//! ```

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::fraction_vocabulary::{phrase_pattern, vocabulary, FractionMatch, PhraseKind};
use crate::ingredient_model::{ParsedIngredient, QuantityKind, QuantitySource, QuantityToken};

/// Unit phrases recognized after a quantity
const UNIT_PHRASES: &[&str] = &[
    // Kitchen measures
    "su bardağı",
    "çay bardağı",
    "kahve fincanı",
    "yemek kaşığı",
    "tatlı kaşığı",
    "çay kaşığı",
    "kahve kaşığı",
    "bardak",
    "fincan",
    "kaşık",
    "kase",
    "avuç",
    "tutam",
    // Metric
    "kilogram",
    "gram",
    "kg",
    "gr",
    "g",
    "mililitre",
    "litre",
    "ml",
    "lt",
    "l",
    // Count and packaging
    "adet",
    "tane",
    "dilim",
    "diş",
    "demet",
    "dal",
    "yaprak",
    "baş",
    "parça",
    "paket",
    "kutu",
    "kavanoz",
    "şişe",
];

lazy_static! {
    /// Numeric quantity followed by optional whitespace and a word (unit or name)
    static ref NUMBER_REGEX: Regex = Regex::new(
        r"(?P<number>(?:(?P<whole>\d+)\s+)?(?P<numerator>\d+)\s*/\s*(?P<denominator>\d+)|(?P<decimal>\d+(?:[.,]\d+)?))\s*\p{L}"
    )
    .expect("Number pattern should be valid");

    /// Unit phrase anchored at the start of the text that follows a quantity
    static ref UNIT_REGEX: Regex = {
        let mut units: Vec<&str> = UNIT_PHRASES.to_vec();
        units.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        let alternation = units
            .iter()
            .map(|unit| phrase_pattern(unit))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)^(?:{alternation})\b")).expect("Unit pattern should be valid")
    };
}

/// Locate the quantity token the scaler should rewrite
///
/// A fraction phrase anywhere in the line takes priority (longest phrase
/// first); then a counting word opening the line in front of a unit
/// ("bir çay bardağı"); otherwise the first number followed by a word.
/// Returns `None` for lines with nothing to scale ("tuz", "bir miktar tuz").
pub fn locate_quantity(line: &str) -> Option<QuantityToken> {
    if let Some(found) = vocabulary().find_first_match(line) {
        return Some(phrase_token(found));
    }
    if let Some(token) = leading_phrase(line) {
        return Some(token);
    }
    number_tokens(line).next()
}

/// Locate a quantity token only if it opens the line
pub fn leading_quantity(line: &str) -> Option<QuantityToken> {
    if let Some(token) = leading_phrase(line) {
        return Some(token);
    }
    let offset = line.len() - line.trim_start().len();
    number_tokens(line)
        .next()
        .filter(|token| token.start == offset)
}

/// Parse one ingredient line
///
/// Blank lines yield `None`. Lines without a leading quantity become a single
/// countable item named after the whole line.
///
/// # Examples
///
/// ```rust
/// use ingredient_scaler::ingredient_parser::parse_ingredient_line;
///
/// let flour = parse_ingredient_line("200 g un").unwrap();
/// assert_eq!(flour.name, "un");
/// assert_eq!(flour.quantity, 200.0);
/// assert_eq!(flour.unit.as_deref(), Some("g"));
///
/// let salt = parse_ingredient_line("tuz").unwrap();
/// assert_eq!(salt.quantity, 1.0);
/// assert_eq!(salt.unit, None);
/// ```
pub fn parse_ingredient_line(line: &str) -> Option<ParsedIngredient> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(token) = leading_quantity(line) else {
        trace!(line, "No leading quantity, counting line as one item");
        return Some(ParsedIngredient::new(&clean_name(line)));
    };

    let rest = line[token.end..].trim_start();
    let (unit, name) = split_unit(rest);
    let source = match token.kind {
        QuantityKind::Number => QuantitySource::Number,
        QuantityKind::Phrase => QuantitySource::Phrase,
    };

    let parsed = match (unit, name.is_empty()) {
        // Quantity without anything after it ("yarım"): keep the line as the name
        (None, true) => ParsedIngredient::new(&clean_name(line)),
        // "2 su bardağı" with no name: the unit is the best name available
        (Some(unit), true) => {
            ParsedIngredient::new(&clean_name(&unit)).with_quantity_from(token.value, source)
        }
        (Some(unit), false) => ParsedIngredient::new(&name)
            .with_quantity_from(token.value, source)
            .with_unit(&unit),
        (None, false) => ParsedIngredient::new(&name).with_quantity_from(token.value, source),
    };

    debug!(
        line,
        name = %parsed.name,
        quantity = parsed.quantity,
        unit = ?parsed.unit,
        "Parsed ingredient line"
    );
    Some(parsed)
}

/// Split a raw ingredient blob on newlines and commas, then parse every entry
pub fn parse_ingredient_text(text: &str) -> Vec<ParsedIngredient> {
    split_ingredient_text(text)
        .iter()
        .filter_map(|line| parse_ingredient_line(line))
        .collect()
}

/// Split a raw ingredient blob into trimmed, non-empty entries
///
/// Newlines and commas separate entries, except a comma sitting between two
/// digits, which is a decimal separator ("1,5 su bardağı süt").
pub fn split_ingredient_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut entries = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let is_separator = match c {
            '\n' | '\r' => true,
            ',' => {
                let digit_before = i > 0 && chars[i - 1].is_ascii_digit();
                let digit_after = chars.get(i + 1).is_some_and(|next| next.is_ascii_digit());
                !(digit_before && digit_after)
            }
            _ => false,
        };

        if is_separator {
            push_entry(&mut entries, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_entry(&mut entries, &current);

    entries
}

/// Lower-case a name for use as a merge key
///
/// Turkish `I`/`İ` are mapped to `ı`/`i` before lower-casing so "IRMIK" and
/// "ırmık" share a key.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .chars()
        .flat_map(|c| match c {
            'I' => vec!['ı'],
            'İ' => vec!['i'],
            other => other.to_lowercase().collect(),
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_entry(entries: &mut Vec<String>, raw: &str) {
    let entry = raw.trim();
    if !entry.is_empty() {
        entries.push(entry.to_string());
    }
}

/// Phrase opening the line; a counting word only counts when a unit follows it
fn leading_phrase(line: &str) -> Option<QuantityToken> {
    let found = vocabulary().match_at_start(line)?;
    if found.kind == PhraseKind::Count && !UNIT_REGEX.is_match(line[found.end..].trim_start()) {
        trace!(line, phrase = found.phrase, "Counting word without a unit, not a quantity");
        return None;
    }
    Some(phrase_token(found))
}

fn phrase_token(found: FractionMatch) -> QuantityToken {
    QuantityToken {
        start: found.start,
        end: found.end,
        value: found.value,
        kind: QuantityKind::Phrase,
    }
}

/// Numeric tokens in `line`, skipping digits glued to a preceding word ("B12")
fn number_tokens(line: &str) -> impl Iterator<Item = QuantityToken> + '_ {
    NUMBER_REGEX.captures_iter(line).filter_map(move |caps| {
        let number = caps.name("number")?;
        let glued = line[..number.start()]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        if glued {
            return None;
        }
        let value = number_value(&caps)?;
        Some(QuantityToken {
            start: number.start(),
            end: number.end(),
            value,
            kind: QuantityKind::Number,
        })
    })
}

fn number_value(caps: &Captures<'_>) -> Option<f64> {
    if let Some(decimal) = caps.name("decimal") {
        return decimal.as_str().replace(',', ".").parse().ok();
    }

    let numerator: f64 = caps.name("numerator")?.as_str().parse().ok()?;
    let denominator: f64 = caps.name("denominator")?.as_str().parse().ok()?;
    if denominator == 0.0 {
        return None;
    }
    let whole: f64 = match caps.name("whole") {
        Some(whole) => whole.as_str().parse().ok()?,
        None => 0.0,
    };
    Some(whole + numerator / denominator)
}

/// Split "su bardağı un" into (Some("su bardağı"), "un")
fn split_unit(rest: &str) -> (Option<String>, String) {
    match UNIT_REGEX.find(rest) {
        Some(unit) => (
            Some(normalize_name(unit.as_str())),
            clean_name(&rest[unit.end()..]),
        ),
        None => (None, clean_name(rest)),
    }
}

fn clean_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ';', ':'])
        .trim()
        .to_string()
}

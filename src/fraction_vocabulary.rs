//! # Fraction Vocabulary Module
//!
//! This module contains the table of Turkish fraction phrases ("yarım", "çeyrek",
//! "bir buçuk", ...) and the compiled regex patterns used to find them in
//! ingredient lines.
//!
//! Lookup scans phrases longest-first, so "üç çeyrek" wins over "çeyrek" and
//! "bir buçuk" wins over "bir". Matching is case-insensitive and respects word
//! boundaries ("bir" never matches inside "birkaç").
//!
//! "bir" is also the ordinary word for "a/one" ("bir miktar", "bir kısmı"), so
//! it is a [`PhraseKind::Count`] entry: it is never found mid-line and only
//! [`FractionVocabulary::match_at_start`] reports it.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

/// How a vocabulary phrase may be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseKind {
    /// A fraction idiom, matched anywhere in a line
    Fraction,
    /// A counting word that doubles as an article, matched only at line start
    Count,
}

/// Vocabulary phrases in declaration order.
///
/// When several phrases share a value, the first declared one is the canonical
/// phrase emitted by the number formatter (e.g. "çeyrek" rather than "dörtte bir").
const FRACTION_PHRASES: &[(&str, f64, PhraseKind)] = &[
    ("yarım", 0.5, PhraseKind::Fraction),
    ("çeyrek", 0.25, PhraseKind::Fraction),
    ("üç çeyrek", 0.75, PhraseKind::Fraction),
    ("dörtte üç", 0.75, PhraseKind::Fraction),
    ("dörtte bir", 0.25, PhraseKind::Fraction),
    ("üçte bir", 1.0 / 3.0, PhraseKind::Fraction),
    ("üçte iki", 2.0 / 3.0, PhraseKind::Fraction),
    ("bir", 1.0, PhraseKind::Count),
    ("bir buçuk", 1.5, PhraseKind::Fraction),
    ("iki buçuk", 2.5, PhraseKind::Fraction),
    ("üç buçuk", 3.5, PhraseKind::Fraction),
];

/// Tolerance used when comparing a computed value against a phrase value
pub const PHRASE_TOLERANCE: f64 = 1e-3;

lazy_static! {
    static ref VOCABULARY: FractionVocabulary = FractionVocabulary::build();
}

/// A single entry of the vocabulary with its compiled matcher
#[derive(Debug)]
struct FractionEntry {
    phrase: &'static str,
    value: f64,
    kind: PhraseKind,
    pattern: Regex,
}

/// A fraction phrase found in a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct FractionMatch {
    /// The vocabulary phrase that matched (lower-case form)
    pub phrase: &'static str,
    /// Decimal value of the phrase
    pub value: f64,
    /// Byte offset of the match start in the searched text
    pub start: usize,
    /// Byte offset of the match end in the searched text
    pub end: usize,
    pub kind: PhraseKind,
}

/// Ordered fraction phrase table
#[derive(Debug)]
pub struct FractionVocabulary {
    /// Entries sorted longest phrase first
    by_length: Vec<FractionEntry>,
}

/// Shared vocabulary instance, compiled once per process
pub fn vocabulary() -> &'static FractionVocabulary {
    &VOCABULARY
}

impl FractionVocabulary {
    fn build() -> Self {
        let mut by_length: Vec<FractionEntry> = FRACTION_PHRASES
            .iter()
            .map(|&(phrase, value, kind)| FractionEntry {
                phrase,
                value,
                kind,
                pattern: Regex::new(&format!(r"(?i)\b{}\b", phrase_pattern(phrase)))
                    .expect("Fraction phrase pattern should be valid"),
            })
            .collect();

        // Stable sort keeps declaration order among phrases of equal length
        by_length.sort_by(|a, b| b.phrase.chars().count().cmp(&a.phrase.chars().count()));

        Self { by_length }
    }

    /// Find the longest fraction phrase present in `text`
    ///
    /// Phrases are tried from longest to shortest; the first phrase found
    /// anywhere in the text wins. Counting words are skipped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingredient_scaler::fraction_vocabulary::vocabulary;
    ///
    /// let found = vocabulary().find_first_match("üç çeyrek su bardağı süt").unwrap();
    /// assert_eq!(found.phrase, "üç çeyrek");
    /// assert_eq!(found.value, 0.75);
    /// ```
    pub fn find_first_match(&self, text: &str) -> Option<FractionMatch> {
        let fractions = self
            .by_length
            .iter()
            .filter(|entry| entry.kind == PhraseKind::Fraction);
        for entry in fractions {
            if let Some(found) = entry.pattern.find(text) {
                trace!(phrase = entry.phrase, text, "Fraction phrase matched");
                return Some(FractionMatch {
                    phrase: entry.phrase,
                    value: entry.value,
                    start: found.start(),
                    end: found.end(),
                    kind: entry.kind,
                });
            }
        }
        None
    }

    /// Match a phrase, counting words included, only when it starts at the
    /// beginning of `text` (leading whitespace allowed)
    pub fn match_at_start(&self, text: &str) -> Option<FractionMatch> {
        let offset = text.len() - text.trim_start().len();
        self.by_length.iter().find_map(|entry| {
            entry
                .pattern
                .find(&text[offset..])
                .filter(|found| found.start() == 0)
                .map(|found| FractionMatch {
                    phrase: entry.phrase,
                    value: entry.value,
                    start: offset,
                    end: offset + found.end(),
                    kind: entry.kind,
                })
        })
    }

    /// Canonical phrase for `value`, if one is within [`PHRASE_TOLERANCE`]
    pub fn phrase_for(&self, value: f64) -> Option<&'static str> {
        FRACTION_PHRASES
            .iter()
            .find(|(_, phrase_value, _)| (phrase_value - value).abs() < PHRASE_TOLERANCE)
            .map(|(phrase, _, _)| *phrase)
    }

    /// All phrases with their values, longest first
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.by_length.iter().map(|entry| (entry.phrase, entry.value))
    }
}

/// Build a regex fragment for a Turkish phrase.
///
/// Dotted and dotless i are not case-folded pairs in Unicode, so each is given
/// an explicit class with its Turkish upper-case form. Spaces match any run of
/// whitespace.
pub(crate) fn phrase_pattern(phrase: &str) -> String {
    let mut pattern = String::with_capacity(phrase.len() * 2);
    for c in phrase.chars() {
        match c {
            'i' => pattern.push_str("[iİ]"),
            'ı' => pattern.push_str("[ıI]"),
            ' ' => pattern.push_str(r"\s+"),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_phrase_wins() {
        let found = vocabulary().find_first_match("üç çeyrek su bardağı süt").unwrap();
        assert_eq!(found.phrase, "üç çeyrek");
        assert_eq!(found.start, 0);

        let found = vocabulary().find_first_match("bir buçuk yemek kaşığı yağ").unwrap();
        assert_eq!(found.phrase, "bir buçuk");
        assert_eq!(found.value, 1.5);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let found = vocabulary().find_first_match("YARIM çay bardağı şeker").unwrap();
        assert_eq!(found.phrase, "yarım");
        assert_eq!(&"YARIM çay bardağı şeker"[found.start..found.end], "YARIM");

        let found = vocabulary().match_at_start("Bİr tutam tuz").unwrap();
        assert_eq!(found.phrase, "bir");
        assert_eq!(found.kind, PhraseKind::Count);
    }

    #[test]
    fn test_counting_word_is_not_found_mid_line() {
        assert!(vocabulary()
            .find_first_match("2 su bardağı un (bir kısmı serpmek için)")
            .is_none());
        assert!(vocabulary().find_first_match("bir miktar tuz").is_none());

        let found = vocabulary().find_first_match("Bir buçuk su bardağı su").unwrap();
        assert_eq!(found.phrase, "bir buçuk");
        assert_eq!(found.kind, PhraseKind::Fraction);
    }

    #[test]
    fn test_word_boundaries() {
        assert!(vocabulary().find_first_match("birkaç dal maydanoz").is_none());
        assert!(vocabulary().find_first_match("tuz").is_none());
    }

    #[test]
    fn test_match_at_start() {
        assert!(vocabulary().match_at_start("  yarım limon").is_some());
        assert!(vocabulary().match_at_start("limon yarım").is_none());
    }

    #[test]
    fn test_phrase_for_prefers_declared_order() {
        assert_eq!(vocabulary().phrase_for(0.25), Some("çeyrek"));
        assert_eq!(vocabulary().phrase_for(0.75), Some("üç çeyrek"));
        assert_eq!(vocabulary().phrase_for(1.0), Some("bir"));
        assert_eq!(vocabulary().phrase_for(0.333), Some("üçte bir"));
        assert_eq!(vocabulary().phrase_for(4.0), None);
    }

    #[test]
    fn test_entries_are_sorted_longest_first() {
        let lengths: Vec<usize> = vocabulary()
            .entries()
            .map(|(phrase, _)| phrase.chars().count())
            .collect();
        assert!(lengths.windows(2).all(|pair| pair[0] >= pair[1]));
    }
}

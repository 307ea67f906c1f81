//! Category classification.
//!
//! A structured category supplied by the source wins when it names a
//! category of the classifier's domain. Otherwise the free text is
//! case-folded and scanned against an ordered keyword rule list; the first
//! rule with a keyword starting some word of the text wins, so `sel` matches
//! `selde` but not `kişisel`. Events matching nothing get the domain's
//! default category.

use event_map_event_models::{Category, Domain};
use event_map_source_models::{CategorySource, RawEvent};

/// Lowercases text for keyword matching, folding the Turkish dotted and
/// dotless I (`İ`, `I`, `ı`) to `i` and dropping the combining dot above.
#[must_use]
pub fn fold_case(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' | 'I' | 'ı' => folded.push('i'),
            '\u{0307}' => {}
            c => folded.extend(c.to_lowercase()),
        }
    }
    folded
}

/// A category and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    category: Category,
    keywords: Vec<String>,
}

impl KeywordRule {
    /// Creates a rule. Keywords are case-folded the same way as event
    /// text; blank keywords are dropped.
    #[must_use]
    pub fn new<S: AsRef<str>>(category: Category, keywords: &[S]) -> Self {
        Self {
            category,
            keywords: keywords
                .iter()
                .map(|k| fold_case(k.as_ref().trim()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// The category this rule assigns.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// The folded keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns `true` if any keyword occurs at the start of a word of
    /// already-folded text. Suffixes are allowed (`deprem` matches
    /// `depremde`); a keyword inside a longer word is not a match.
    #[must_use]
    pub fn matches(&self, folded: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| starts_word(folded, keyword))
    }
}

fn starts_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(at, _)| {
        haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Assigns categories for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    domain: Domain,
    rules: Vec<KeywordRule>,
}

impl Classifier {
    /// Creates a classifier with rules in priority order.
    #[must_use]
    pub const fn new(domain: Domain, rules: Vec<KeywordRule>) -> Self {
        Self { domain, rules }
    }

    /// The domain this classifier serves.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// Rules in priority order.
    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Classifies an event. Total: always returns a category of this
    /// classifier's domain.
    #[must_use]
    pub fn classify(&self, event: &RawEvent) -> Category {
        for source in event.category_sources() {
            match source {
                CategorySource::Structured(label) => {
                    if let Some(category) = Category::parse_for_domain(label, self.domain) {
                        return category;
                    }
                }
                CategorySource::FreeText(text) => {
                    if let Some(category) = self.match_text(text) {
                        return category;
                    }
                }
            }
        }
        self.domain.default_category()
    }

    /// Runs only the keyword rules over `text`.
    #[must_use]
    pub fn match_text(&self, text: &str) -> Option<Category> {
        let folded = fold_case(text);
        self.rules
            .iter()
            .find(|rule| rule.matches(&folded))
            .map(KeywordRule::category)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn hazard() -> Classifier {
        Classifier::new(
            Domain::Hazard,
            vec![
                KeywordRule::new(Category::Earthquake, &["deprem", "earthquake"]),
                KeywordRule::new(Category::Flood, &["sel", "flood"]),
                KeywordRule::new(Category::Fire, &["yangın", "fire"]),
                KeywordRule::new(Category::Storm, &["fırtına", "storm"]),
            ],
        )
    }

    fn event(structured: Option<&str>, text: Option<&str>) -> RawEvent {
        RawEvent {
            id: "e".to_string(),
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            geo: None,
            free_text: text.map(String::from),
            structured_category: structured.map(String::from),
            sentiment: None,
            intensity: None,
        }
    }

    #[test]
    fn earlier_rule_wins_when_both_match() {
        assert_eq!(
            hazard().classify(&event(None, Some("İstanbul'da hem sel hem deprem oldu"))),
            Category::Earthquake
        );
    }

    #[test]
    fn structured_category_takes_precedence() {
        assert_eq!(
            hazard().classify(&event(Some("Flood"), Some("deprem"))),
            Category::Flood
        );
    }

    #[test]
    fn foreign_structured_category_falls_through() {
        assert_eq!(
            hazard().classify(&event(Some("renewable"), Some("orman yangını"))),
            Category::Fire
        );
        assert_eq!(
            hazard().classify(&event(Some("nonsense"), None)),
            Category::GeneralHazard
        );
    }

    #[test]
    fn no_inputs_yield_default() {
        assert_eq!(hazard().classify(&event(None, None)), Category::GeneralHazard);
        assert_eq!(
            hazard().classify(&event(None, Some("güzel bir gün"))),
            Category::GeneralHazard
        );
    }

    #[test]
    fn matching_is_case_insensitive_with_turkish_i() {
        assert_eq!(
            hazard().classify(&event(None, Some("ORMAN YANGINI"))),
            Category::Fire
        );
        assert_eq!(
            hazard().classify(&event(None, Some("FIRTINA UYARISI"))),
            Category::Storm
        );
        assert_eq!(
            hazard().classify(&event(None, Some("Major EARTHQUAKE reported"))),
            Category::Earthquake
        );
    }

    #[test]
    fn folds_turkish_capitals() {
        assert_eq!(fold_case("İSTANBUL"), "istanbul");
        assert_eq!(fold_case("Işık"), "işik");
        assert_eq!(fold_case("i\u{0307}"), "i");
    }

    #[test]
    fn keywords_are_folded_on_construction() {
        let rule = KeywordRule::new(Category::Fire, &["YANGIN", "  "]);
        assert_eq!(rule.keywords(), ["yangin".to_string()]);
        assert!(rule.matches(&fold_case("Yangın")));
    }

    #[test]
    fn keywords_only_match_at_word_starts() {
        let classifier = hazard();
        for text in ["kişisel verilerin korunması", "Maxsel Holding", "campfire"] {
            assert_eq!(classifier.match_text(text), None, "{text}");
        }
        assert_eq!(classifier.match_text("Selde iki ev yıkıldı"), Some(Category::Flood));
        assert_eq!(classifier.match_text("(deprem) 4.1"), Some(Category::Earthquake));
        assert_eq!(classifier.match_text("Ege'de fırtınalar"), Some(Category::Storm));
    }

    #[test]
    fn keyword_phrases_span_words() {
        let rule = KeywordRule::new(Category::Waste, &["geri dönüşüm"]);
        assert!(rule.matches(&fold_case("Yeni GERİ DÖNÜŞÜM tesisi")));
        assert!(!rule.matches(&fold_case("geri dönüldü")));
    }

    #[test]
    fn classification_is_total_for_every_domain() {
        for domain in Domain::all() {
            let classifier = Classifier::new(*domain, vec![]);
            for text in [None, Some(""), Some("deprem"), Some("anything")] {
                let category = classifier.classify(&event(None, text));
                assert_eq!(category.domain(), *domain);
            }
        }
    }
}

//! Keyword extraction shared by classification and predicate matching.

use std::collections::BTreeSet;

/// Tokens shorter than this are dropped
pub const MIN_KEYWORD_LEN: usize = 3;

/// English filler plus domain-generic words that say nothing about a device
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "been", "being",
    "has", "have", "had", "into", "onto", "its", "their", "which", "when", "where", "who",
    "whom", "will", "can", "may", "might", "shall", "should", "would", "could", "not", "but",
    "nor", "via", "per", "all", "any", "other", "such", "than", "then", "also", "each", "both",
    "between", "during", "under", "over", "within", "without", "these", "those", "our", "your",
    "they", "them", "there", "here", "upon", "about", "after", "before", "more", "most", "less",
    "only", "very", "same", "some", "use", "used", "uses", "using", "intended", "indicated",
    "indication", "indications", "device", "devices", "medical", "system", "systems",
    "patient", "patients", "product", "products", "apparatus", "equipment", "including",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lowercased word tokens (runs of alphanumerics or `_`), in order
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Normalized keyword set of a free-text description
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN && !is_stop_word(token))
        .collect()
}

/// Keywords in first-appearance order, most specific (longest) first
pub fn ranked_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut ordered: Vec<String> = tokenize(text)
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN && !is_stop_word(token))
        .filter(|token| seen.insert(token.clone()))
        .collect();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    ordered.truncate(limit);
    ordered
}

/// |a ∩ b| / |a ∪ b|, 0 when both are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// |a ∩ b| / |a|, 0 when `a` is empty
pub fn coverage(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.intersection(b).count() as f64 / a.len() as f64
}

/// Text reduced to single-space separated lowercase tokens, padded with
/// spaces so whole words and multi-word phrases can be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let joined = tokenize(text).collect::<Vec<_>>().join(" ");
        Self(format!(" {} ", joined))
    }

    /// Join several fragments into one searchable text
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let joined = parts.into_iter().collect::<Vec<_>>().join(" ");
        Self::new(&joined)
    }

    /// Whole-word / whole-phrase match; `phrase` must be lowercase tokens
    pub fn contains(&self, phrase: &str) -> bool {
        let phrase = phrase.trim();
        !phrase.is_empty() && self.0.contains(&format!(" {} ", phrase))
    }

    /// Every phrase from `phrases` present in the text, in table order
    pub fn matches<'p>(&self, phrases: &[&'p str]) -> Vec<&'p str> {
        phrases.iter().copied().filter(|p| self.contains(p)).collect()
    }

    pub fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_extract_keywords_drops_noise() {
        let keywords = extract_keywords("Implantable cardiac pacemaker with wireless telemetry");
        assert_eq!(
            keywords,
            set(&["cardiac", "implantable", "pacemaker", "telemetry", "wireless"])
        );

        let keywords = extract_keywords("Cardiac Rhythm Pacemaker System, a medical device");
        assert_eq!(keywords, set(&["cardiac", "pacemaker", "rhythm"]));
    }

    #[test]
    fn test_extract_keywords_short_tokens_and_punctuation() {
        let keywords = extract_keywords("An IV set; for use in ICU/ER (single-use)");
        assert_eq!(keywords, set(&["icu", "set", "single"]));
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_ranked_keywords_prefers_longer_terms() {
        let ranked = ranked_keywords("glucose sensor with bluetooth glucose transmitter", 3);
        assert_eq!(ranked, vec!["transmitter", "bluetooth", "glucose"]);
    }

    #[test]
    fn test_jaccard_and_coverage() {
        let a = set(&["cardiac", "pacemaker", "wireless"]);
        let b = set(&["cardiac", "pacemaker", "rhythm", "lead"]);
        assert!((jaccard(&a, &b) - 0.4).abs() < 1e-9);
        assert!((coverage(&a, &b) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 0.0);
        assert_eq!(coverage(&BTreeSet::new(), &b), 0.0);
    }

    #[test]
    fn test_normalized_text_whole_word_matching() {
        let text = NormalizedText::new("Uses Wi-Fi and stainless-steel; performs surface scans");
        assert!(text.contains("wi fi"));
        assert!(text.contains("stainless steel"));
        assert!(!text.contains("rf"));
        assert!(!text.contains("steel;"));
        assert_eq!(text.matches(&["steel", "titanium", "wi fi"]), vec!["steel", "wi fi"]);
    }

    proptest! {
        #[test]
        fn prop_extract_keywords_is_pure(text in "[a-zA-Z ,.;-]{0,80}") {
            let first = extract_keywords(&text);
            let second = extract_keywords(&text);
            prop_assert_eq!(&first, &second);
        }

        #[test]
        fn prop_keywords_are_normalized(text in "[a-zA-Z0-9 ,.;-]{0,80}") {
            for keyword in extract_keywords(&text) {
                prop_assert!(keyword.chars().count() >= MIN_KEYWORD_LEN);
                prop_assert_eq!(keyword.to_lowercase(), keyword.clone());
                prop_assert!(!STOP_WORDS.contains(&keyword.as_str()));
            }
        }

        #[test]
        fn prop_re_extracting_joined_keywords_is_stable(text in "[a-zA-Z ]{0,80}") {
            let first = extract_keywords(&text);
            let joined = first.iter().cloned().collect::<Vec<_>>().join(" ");
            prop_assert_eq!(extract_keywords(&joined), first);
        }
    }
}

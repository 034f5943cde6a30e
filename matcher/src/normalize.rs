use crate::config::MatcherConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

static DEFAULT_NORMALIZER: Lazy<Normalizer> =
    Lazy::new(|| Normalizer::new(&MatcherConfig::default()));

/// Turns raw labels into their comparable form and extracts keywords.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stop_words: HashSet<String>,
    min_keyword_chars: usize,
    fold_accents: bool,
}

impl Normalizer {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            stop_words: config
                .stop_words
                .iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
            min_keyword_chars: config.min_keyword_chars,
            fold_accents: config.fold_accents,
        }
    }

    pub fn normalize(&self, label: &str) -> String {
        let lowered = if self.fold_accents {
            strip_accents(label).to_lowercase()
        } else {
            label.to_lowercase()
        };
        let spaced = NON_WORD_RE.replace_all(&lowered, " ");
        spaced
            .split_whitespace()
            .filter(|token| !self.stop_words.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Keywords of an already normalized label.
    pub fn keywords_of(&self, normalized: &str) -> Vec<String> {
        normalized
            .split(' ')
            .filter(|token| token.chars().count() >= self.min_keyword_chars)
            .map(str::to_string)
            .collect()
    }

    pub fn keywords(&self, label: &str) -> Vec<String> {
        self.keywords_of(&self.normalize(label))
    }
}

/// Normalizes with the default stop-word set.
pub fn normalize(label: &str) -> String {
    DEFAULT_NORMALIZER.normalize(label)
}

/// Keywords (more than two characters) of `label` under the default config.
pub fn extract_keywords(label: &str) -> Vec<String> {
    DEFAULT_NORMALIZER.keywords(label)
}

fn strip_accents(value: &str) -> String {
    value
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_becomes_space() {
        assert_eq!(normalize("Paw-Patrol: Mighty_Pups!"), "paw patrol mighty_pups");
        assert_eq!(normalize("bluey-episode-1"), "bluey episode 1");
    }

    #[test]
    fn stop_words_are_removed_as_whole_tokens() {
        assert_eq!(normalize("The Magic School Bus"), "magic school bus");
        assert_eq!(normalize("The Magic School Bus"), normalize("Magic School Bus"));
        assert_eq!(normalize("Theodore and the Andes"), "theodore andes");
        assert_eq!(normalize("Tom & Jerry"), "tom jerry");
    }

    #[test]
    fn degenerate_inputs_normalize_to_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("?!..."), "");
        assert_eq!(normalize("The And Of A"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for label in [
            "The Magic School Bus Rides Again",
            "  Sesame   Street!! ",
            "Pokémon: Journeys",
            "Daniel Tiger's Neighborhood",
            "",
        ] {
            let once = normalize(label);
            assert_eq!(normalize(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn unicode_letters_are_word_characters() {
        assert_eq!(normalize("Pokémon"), "pokémon");
    }

    #[test]
    fn accent_folding_is_opt_in() {
        let config = MatcherConfig {
            fold_accents: true,
            ..Default::default()
        };
        let normalizer = Normalizer::new(&config);
        assert_eq!(normalizer.normalize("Pokémon Élite"), "pokemon elite");
    }

    #[test]
    fn keywords_skip_short_tokens() {
        assert_eq!(
            extract_keywords("Go, Diego, Go!"),
            vec!["diego".to_string()]
        );
        assert_eq!(
            extract_keywords("The Magic School Bus Rides Again"),
            vec!["magic", "school", "bus", "rides", "again"]
        );
        assert!(extract_keywords("Oh No").is_empty());
    }

    #[test]
    fn custom_stop_words_replace_defaults() {
        let config = MatcherConfig {
            stop_words: vec!["Show".into()],
            ..Default::default()
        };
        let normalizer = Normalizer::new(&config);
        assert_eq!(normalizer.normalize("The Show"), "the");
    }
}

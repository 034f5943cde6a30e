use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "&", "of", "in", "on", "at", "to", "for", "with", "a", "an",
];

/// Relative weight of each signal in the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub direct: f64,
    pub keyword: f64,
    pub exact_word: f64,
    pub partial: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            direct: 0.4,
            keyword: 0.4,
            exact_word: 0.1,
            partial: 0.1,
        }
    }
}

/// Tunables of the scorer. `Default` reproduces the catalog scripts' historical
/// constants; a JSON file may override any subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Tokens dropped during normalization (whole-token, case-insensitive).
    pub stop_words: Vec<String>,
    /// Keywords shorter than this many characters are discarded.
    pub min_keyword_chars: usize,
    /// Per-keyword similarity (percent) that must be strictly exceeded.
    pub keyword_cutoff: f64,
    /// Points per target keyword found verbatim in the candidate.
    pub exact_word_bonus: f64,
    /// Points, once, when one normalized label contains the other.
    pub partial_bonus: f64,
    pub weights: ScoreWeights,
    /// Composite score a candidate must strictly exceed to be returned.
    pub acceptance_floor: f64,
    /// Strip diacritics before comparing ("Pokémon" == "Pokemon").
    pub fold_accents: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            min_keyword_chars: 3,
            keyword_cutoff: 80.0,
            exact_word_bonus: 20.0,
            partial_bonus: 30.0,
            weights: ScoreWeights::default(),
            acceptance_floor: 40.0,
            fold_accents: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("weight `{name}` must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("keyword_cutoff must be within 0..=100 (got {0})")]
    KeywordCutoffOutOfRange(f64),
    #[error("`{name}` must be finite and non-negative (got {value})")]
    InvalidPoints { name: &'static str, value: f64 },
    #[error("min_keyword_chars must be at least 1")]
    ZeroKeywordLength,
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("direct", self.weights.direct),
            ("keyword", self.weights.keyword),
            ("exact_word", self.weights.exact_word),
            ("partial", self.weights.partial),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if !(0.0..=100.0).contains(&self.keyword_cutoff) {
            return Err(ConfigError::KeywordCutoffOutOfRange(self.keyword_cutoff));
        }
        let points = [
            ("exact_word_bonus", self.exact_word_bonus),
            ("partial_bonus", self.partial_bonus),
            ("acceptance_floor", self.acceptance_floor),
        ];
        for (name, value) in points {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPoints { name, value });
            }
        }
        if self.min_keyword_chars == 0 {
            return Err(ConfigError::ZeroKeywordLength);
        }
        Ok(())
    }
}

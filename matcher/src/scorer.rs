use crate::config::{ConfigError, MatcherConfig};
use crate::keywords::{exact_word_hits, keyword_match_score};
use crate::normalize::Normalizer;
use crate::pool::{CandidatePool, PreparedLabel};
use crate::similarity::similarity;
use serde::Serialize;

/// The four signals blended into the composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub direct_similarity: f64,
    pub keyword_score: f64,
    pub exact_word_bonus: f64,
    pub partial_bonus: f64,
}

impl Breakdown {
    pub fn rounded(&self) -> Self {
        Self {
            direct_similarity: round1(self.direct_similarity),
            keyword_score: round1(self.keyword_score),
            exact_word_bonus: round1(self.exact_word_bonus),
            partial_bonus: round1(self.partial_bonus),
        }
    }
}

/// One candidate with its unrounded composite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub index: usize,
    pub label: String,
    pub score: f64,
    pub breakdown: Breakdown,
}

/// Outcome of a best-match search. Numbers are rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched_label: Option<String>,
    /// Position of the matched label in the candidate list.
    pub matched_index: Option<usize>,
    pub score: f64,
    pub breakdown: Breakdown,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched_label: None,
            matched_index: None,
            score: 0.0,
            breakdown: Breakdown::default(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_label.is_some()
    }
}

impl From<ScoredCandidate> for MatchResult {
    fn from(scored: ScoredCandidate) -> Self {
        Self {
            matched_label: Some(scored.label),
            matched_index: Some(scored.index),
            score: round1(scored.score),
            breakdown: scored.breakdown.rounded(),
        }
    }
}

/// Composite fuzzy scorer. Immutable once built, shareable across threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatcherConfig,
    normalizer: Normalizer,
}

impl Default for Matcher {
    fn default() -> Self {
        let config = MatcherConfig::default();
        Self {
            normalizer: Normalizer::new(&config),
            config,
        }
    }
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Normalizes and tokenizes `candidates` once so they can be matched
    /// against many targets.
    pub fn pool<I, S>(&self, candidates: I) -> CandidatePool<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CandidatePool::new(self, candidates)
    }

    /// Best candidate for `target`, or no match when nothing scores above the
    /// acceptance floor. Ties keep the earliest candidate.
    pub fn find_best_match<S: AsRef<str>>(&self, target: &str, candidates: &[S]) -> MatchResult {
        if target.trim().is_empty() || candidates.is_empty() {
            return MatchResult::no_match();
        }
        self.pool(candidates.iter().map(|c| c.as_ref().to_string()))
            .best_match(target)
    }

    /// Every candidate scored against `target`, best first.
    pub fn rank<S: AsRef<str>>(&self, target: &str, candidates: &[S]) -> Vec<ScoredCandidate> {
        self.pool(candidates.iter().map(|c| c.as_ref().to_string()))
            .rank(target)
    }

    /// Composite score and signals for a single pair, unrounded.
    pub fn score_candidate(&self, target: &str, candidate: &str) -> (f64, Breakdown) {
        let target = self.prepare(target);
        let candidate = self.prepare(candidate);
        self.score_prepared(&target, &candidate)
    }

    pub(crate) fn prepare(&self, label: impl Into<String>) -> PreparedLabel {
        let raw = label.into();
        let normalized = self.normalizer.normalize(&raw);
        let keywords = self.normalizer.keywords_of(&normalized);
        PreparedLabel {
            raw,
            normalized,
            keywords,
        }
    }

    pub(crate) fn score_prepared(
        &self,
        target: &PreparedLabel,
        candidate: &PreparedLabel,
    ) -> (f64, Breakdown) {
        let config = &self.config;
        let direct_similarity = similarity(&target.normalized, &candidate.normalized);
        let keyword_score =
            keyword_match_score(&target.keywords, &candidate.keywords, config.keyword_cutoff);
        let exact_word_bonus =
            exact_word_hits(&target.keywords, &candidate.keywords) as f64 * config.exact_word_bonus;
        let partial_bonus = if contains_either(&target.normalized, &candidate.normalized) {
            config.partial_bonus
        } else {
            0.0
        };
        let breakdown = Breakdown {
            direct_similarity,
            keyword_score,
            exact_word_bonus,
            partial_bonus,
        };
        (self.composite(&breakdown), breakdown)
    }

    pub fn composite(&self, breakdown: &Breakdown) -> f64 {
        let weights = &self.config.weights;
        weights.direct * breakdown.direct_similarity
            + weights.keyword * breakdown.keyword_score
            + weights.exact_word * breakdown.exact_word_bonus
            + weights.partial * breakdown.partial_bonus
    }
}

// The empty string is contained in every label.
fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

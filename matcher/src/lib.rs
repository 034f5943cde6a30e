//! Fuzzy name matching for the show catalog.
//!
//! Pairs a show name with the closest label among candidates (image file
//! stems, alternate titles, import rows) by blending four signals:
//! whole-label edit similarity, keyword overlap, verbatim keyword hits and
//! substring containment. Everything here is pure: no I/O, no logging.
//!
//! ```
//! use show_matcher::find_best_match;
//!
//! let result = find_best_match("Peppa Pig", &["bluey", "peppa-pig", "paw-patrol"]);
//! assert_eq!(result.matched_label.as_deref(), Some("peppa-pig"));
//! ```

pub mod config;
pub mod keywords;
pub mod normalize;
pub mod policy;
pub mod pool;
pub mod scorer;
pub mod similarity;

use once_cell::sync::Lazy;

pub use config::{ConfigError, MatcherConfig, ScoreWeights};
pub use keywords::keyword_match_score;
pub use normalize::{extract_keywords, normalize, Normalizer};
pub use policy::{AcceptancePolicy, Verdict};
pub use pool::CandidatePool;
pub use scorer::{Breakdown, MatchResult, Matcher, ScoredCandidate};
pub use similarity::{levenshtein, similarity};

static DEFAULT_MATCHER: Lazy<Matcher> = Lazy::new(Matcher::default);

/// [`Matcher::find_best_match`] with the default configuration.
pub fn find_best_match<S: AsRef<str>>(target: &str, candidates: &[S]) -> MatchResult {
    DEFAULT_MATCHER.find_best_match(target, candidates)
}

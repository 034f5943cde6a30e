use crate::scorer::MatchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MIN_SCORE: f64 = 40.0;
pub const DEFAULT_HIGH_CONFIDENCE: f64 = 60.0;

/// Caller-side decision on a [`MatchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Safe to write without a human look.
    Accepted,
    /// Matched, but below the high-confidence bar.
    Review,
    None,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::Review => "review",
            Verdict::None => "none",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub min_score: f64,
    pub high_confidence: f64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            high_confidence: DEFAULT_HIGH_CONFIDENCE,
        }
    }
}

impl AcceptancePolicy {
    pub fn classify(&self, result: &MatchResult) -> Verdict {
        if !result.is_match() || result.score <= self.min_score {
            Verdict::None
        } else if result.score >= self.high_confidence {
            Verdict::Accepted
        } else {
            Verdict::Review
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Breakdown;

    fn matched(score: f64) -> MatchResult {
        MatchResult {
            matched_label: Some("bluey".into()),
            matched_index: Some(0),
            score,
            breakdown: Breakdown::default(),
        }
    }

    #[test]
    fn classify_bands() {
        let policy = AcceptancePolicy::default();
        assert_eq!(policy.classify(&MatchResult::no_match()), Verdict::None);
        assert_eq!(policy.classify(&matched(40.0)), Verdict::None);
        assert_eq!(policy.classify(&matched(55.9)), Verdict::Review);
        assert_eq!(policy.classify(&matched(60.0)), Verdict::Accepted);
        assert_eq!(policy.classify(&matched(103.0)), Verdict::Accepted);
    }

    #[test]
    fn stricter_floor_than_matcher() {
        let policy = AcceptancePolicy {
            min_score: 50.0,
            high_confidence: 80.0,
        };
        assert_eq!(policy.classify(&matched(45.0)), Verdict::None);
        assert_eq!(Verdict::Review.to_string(), "review");
    }
}

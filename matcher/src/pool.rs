use crate::scorer::{MatchResult, Matcher, ScoredCandidate};
use rayon::prelude::*;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub(crate) struct PreparedLabel {
    pub(crate) raw: String,
    pub(crate) normalized: String,
    pub(crate) keywords: Vec<String>,
}

/// Candidate labels normalized once and bound to the matcher that
/// prepared them.
#[derive(Debug, Clone)]
pub struct CandidatePool<'m> {
    matcher: &'m Matcher,
    entries: Vec<PreparedLabel>,
}

impl<'m> CandidatePool<'m> {
    pub(crate) fn new<I, S>(matcher: &'m Matcher, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = candidates
            .into_iter()
            .map(|label| matcher.prepare(label))
            .collect();
        Self { matcher, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.raw.as_str())
    }

    pub fn best_match(&self, target: &str) -> MatchResult {
        if target.trim().is_empty() || self.entries.is_empty() {
            return MatchResult::no_match();
        }
        let target = self.matcher.prepare(target);
        let mut best_score = self.matcher.config().acceptance_floor;
        let mut best = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let (score, breakdown) = self.matcher.score_prepared(&target, entry);
            if score > best_score {
                best_score = score;
                best = Some((index, breakdown));
            }
        }
        match best {
            Some((index, breakdown)) => ScoredCandidate {
                index,
                label: self.entries[index].raw.clone(),
                score: best_score,
                breakdown,
            }
            .into(),
            None => MatchResult::no_match(),
        }
    }

    /// All candidates scored against `target`, highest first; equal scores
    /// keep pool order. The acceptance floor is not applied.
    pub fn rank(&self, target: &str) -> Vec<ScoredCandidate> {
        let target = self.matcher.prepare(target);
        let mut scored: Vec<ScoredCandidate> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let (score, breakdown) = self.matcher.score_prepared(&target, entry);
                ScoredCandidate {
                    index,
                    label: entry.raw.clone(),
                    score,
                    breakdown,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored
    }

    /// Best match for every target, computed in parallel. Results follow
    /// the order of `targets`.
    pub fn match_all<S>(&self, targets: &[S]) -> Vec<MatchResult>
    where
        S: AsRef<str> + Sync,
    {
        targets
            .par_iter()
            .map(|target| self.best_match(target.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_keeps_raw_labels() {
        let matcher = Matcher::default();
        let pool = matcher.pool(["Bluey", "Peppa Pig"]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.label(1), Some("Peppa Pig"));
        assert_eq!(pool.label(2), None);
    }

    #[test]
    fn empty_pool_never_matches() {
        let matcher = Matcher::default();
        let pool = matcher.pool(Vec::<String>::new());
        assert!(pool.is_empty());
        assert_eq!(pool.best_match("Bluey"), MatchResult::no_match());
    }

    #[test]
    fn stop_word_only_target_is_still_scored() {
        let matcher = Matcher::default();
        let pool = matcher.pool(["bluey", "the"]);
        assert_eq!(pool.best_match("   "), MatchResult::no_match());

        let result = pool.best_match("The!");
        assert_eq!(result.matched_label.as_deref(), Some("the"));
        assert_eq!(result.matched_index, Some(1));
        assert_eq!(result.score, 43.0);
    }

    #[test]
    fn rank_orders_by_score_then_position() {
        let matcher = Matcher::default();
        let pool = matcher.pool(["peppa pig", "bluey", "peppa pig"]);
        let ranked = pool.rank("Peppa Pig");
        let order: Vec<usize> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 2, 1]);
        assert!(ranked[0].score > ranked[2].score);
    }

    #[test]
    fn match_all_preserves_target_order() {
        let matcher = Matcher::default();
        let pool = matcher.pool(["peppa-pig", "bluey", "paw-patrol"]);
        let targets = ["Paw Patrol", "Nothing Alike Here", "Peppa Pig", "Bluey"];
        let results = pool.match_all(&targets);
        let indices: Vec<Option<usize>> = results.iter().map(|r| r.matched_index).collect();
        assert_eq!(indices, vec![Some(2), None, Some(0), Some(1)]);
    }
}

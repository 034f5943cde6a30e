use crate::similarity::exceeds;

/// Score when neither side has a keyword: no evidence, no reward.
pub const EMPTY_KEYWORDS_SCORE: f64 = 0.0;

/// Share (percent) of target keywords that have a near-identical keyword in
/// the candidate, relative to the larger of the two sets.
///
/// A target keyword counts once the first candidate keyword whose similarity
/// is strictly above `cutoff` is found.
pub fn keyword_match_score<T, C>(target: &[T], candidate: &[C], cutoff: f64) -> f64
where
    T: AsRef<str>,
    C: AsRef<str>,
{
    let denominator = target.len().max(candidate.len());
    if denominator == 0 {
        return EMPTY_KEYWORDS_SCORE;
    }
    let matched = target
        .iter()
        .filter(|word| {
            let word: &str = word.as_ref();
            candidate.iter().any(|other| exceeds(word, other.as_ref(), cutoff))
        })
        .count();
    matched as f64 / denominator as f64 * 100.0
}

/// Number of target keywords present verbatim in the candidate set.
pub(crate) fn exact_word_hits<T, C>(target: &[T], candidate: &[C]) -> usize
where
    T: AsRef<str>,
    C: AsRef<str>,
{
    target
        .iter()
        .filter(|word| {
            let word: &str = word.as_ref();
            candidate.iter().any(|other| AsRef::<str>::as_ref(other) == word)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_overlap() {
        let words = ["magic", "school", "bus"];
        assert_eq!(keyword_match_score(&words, &words, 80.0), 100.0);
    }

    #[test]
    fn divides_by_larger_set() {
        let target = ["magic", "school", "bus", "rides", "again"];
        let candidate = ["magic", "school", "bus"];
        assert_eq!(keyword_match_score(&target, &candidate, 80.0), 60.0);
        assert_eq!(keyword_match_score(&candidate, &target, 80.0), 60.0);
    }

    #[test]
    fn tolerates_small_misspellings() {
        // "schools" is 85.7% similar to "school"; "skool" is not.
        assert_eq!(keyword_match_score(&["school"], &["schools"], 80.0), 100.0);
        assert_eq!(keyword_match_score(&["school"], &["skool"], 80.0), 0.0);
    }

    #[test]
    fn cutoff_is_strict() {
        // 4 of 5 characters survive: exactly 80%.
        assert_eq!(keyword_match_score(&["bluey"], &["bluex"], 80.0), 0.0);
        assert_eq!(keyword_match_score(&["bluey"], &["bluex"], 79.9), 100.0);
    }

    #[test]
    fn empty_sets() {
        let none: [&str; 0] = [];
        assert_eq!(keyword_match_score(&none, &none, 80.0), EMPTY_KEYWORDS_SCORE);
        assert_eq!(keyword_match_score(&none, &["bluey"], 80.0), 0.0);
        assert_eq!(keyword_match_score(&["bluey"], &none, 80.0), 0.0);
    }

    #[test]
    fn repeated_target_keywords_each_count() {
        assert_eq!(exact_word_hits(&["bus", "bus"], &["bus"]), 2);
        assert_eq!(exact_word_hits(&["bus"], &["buses"]), 0);
    }
}

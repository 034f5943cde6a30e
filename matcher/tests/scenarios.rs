//! Catalog-shaped matching scenarios against the public API.

use show_matcher::{
    find_best_match, normalize, AcceptancePolicy, MatchResult, Matcher,
    MatcherConfig, Verdict,
};
use std::path::Path;

/// Image listings arrive as file names; the matcher sees stems.
fn stems(files: &[&str]) -> Vec<String> {
    files
        .iter()
        .map(|name| {
            Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn test_bluey_ranks_episode_image_first() {
    let candidates = stems(&["bluey-episode-1.jpg", "blue-clues.jpg", "peppa-pig.jpg"]);
    let matcher = Matcher::default();

    let ranked = matcher.rank("Bluey", &candidates);
    assert_eq!(ranked[0].label, "bluey-episode-1");
    assert_eq!(ranked[0].breakdown.partial_bonus, 30.0);
    assert_eq!(ranked[0].breakdown.exact_word_bonus, 20.0);
    assert!((ranked[0].score - 38.333_333).abs() < 1e-3);

    // 38.3 sits under the default floor of 40.
    assert!(!matcher.find_best_match("Bluey", &candidates).is_match());

    let lenient = Matcher::new(MatcherConfig {
        acceptance_floor: 35.0,
        ..Default::default()
    })
    .unwrap();
    let result = lenient.find_best_match("Bluey", &candidates);
    assert_eq!(result.matched_label.as_deref(), Some("bluey-episode-1"));
    assert_eq!(result.matched_index, Some(0));
    assert_eq!(result.score, 38.3);
}

#[test]
fn test_magic_school_bus_clears_floor_through_bonuses() {
    let candidates = stems(&["magic-school-bus.jpg"]);
    let result = find_best_match("The Magic School Bus Rides Again", &candidates);

    assert_eq!(result.matched_label.as_deref(), Some("magic-school-bus"));
    assert_eq!(result.breakdown.direct_similarity, 57.1);
    assert_eq!(result.breakdown.keyword_score, 60.0);
    assert_eq!(result.breakdown.exact_word_bonus, 60.0);
    assert_eq!(result.breakdown.partial_bonus, 30.0);
    assert_eq!(result.score, 55.9);
    assert_eq!(
        AcceptancePolicy::default().classify(&result),
        Verdict::Review
    );
}

#[test]
fn test_unrelated_show_is_no_match() {
    let candidates = stems(&["totally-unrelated-show.jpg"]);
    let result = find_best_match("Paw Patrol", &candidates);
    assert_eq!(result, MatchResult::no_match());

    let ranked = Matcher::default().rank("Paw Patrol", &candidates);
    assert!(ranked[0].score <= 40.0);
}

#[test]
fn test_exact_duplicate_wins() {
    let result = find_best_match("Bluey", &["peppa-pig", "Bluey", "bluey-2"]);
    assert_eq!(result.matched_label.as_deref(), Some("Bluey"));
    assert_eq!(result.matched_index, Some(1));
    // 40 + 40 + 2 (one exact keyword) + 3 (containment)
    assert_eq!(result.score, 85.0);
}

#[test]
fn test_ties_keep_first_candidate() {
    let matcher = Matcher::default();
    let (a, _) = matcher.score_candidate("Peppa Pig", "peppa pit");
    let (b, _) = matcher.score_candidate("Peppa Pig", "peppa pix");
    assert_eq!(a, b);

    let result = matcher.find_best_match("Peppa Pig", &["peppa pit", "peppa pix"]);
    assert_eq!(result.matched_label.as_deref(), Some("peppa pit"));
    let result = matcher.find_best_match("Peppa Pig", &["peppa pix", "peppa pit"]);
    assert_eq!(result.matched_label.as_deref(), Some("peppa pix"));
}

#[test]
fn test_threshold_enforced_for_weak_lists() {
    let candidates = ["sesame street", "arthur", "wild kratts"];
    let matcher = Matcher::default();
    for scored in matcher.rank("Paw Patrol", &candidates) {
        assert!(scored.score <= 40.0, "{} scored {}", scored.label, scored.score);
    }
    assert_eq!(matcher.find_best_match("Paw Patrol", &candidates).matched_label, None);
}

#[test]
fn test_degenerate_inputs_are_no_match() {
    let none: [&str; 0] = [];
    assert_eq!(find_best_match("Bluey", &none), MatchResult::no_match());
    assert_eq!(find_best_match("", &["bluey"]), MatchResult::no_match());
    assert_eq!(find_best_match("   ", &["bluey"]), MatchResult::no_match());
    // Only containment (3 points) survives against a real label.
    assert_eq!(find_best_match("The!", &["bluey"]), MatchResult::no_match());
}

#[test]
fn test_stop_word_only_names_match_each_other() {
    let result = find_best_match("The!", &["bluey", "the"]);
    assert_eq!(result.matched_label.as_deref(), Some("the"));
    assert_eq!(result.matched_index, Some(1));
    assert_eq!(result.breakdown.direct_similarity, 100.0);
    assert_eq!(result.breakdown.partial_bonus, 30.0);
    assert_eq!(result.score, 43.0);
}

#[test]
fn test_leading_article_is_ignored() {
    assert_eq!(normalize("The Magic School Bus"), normalize("Magic School Bus"));
    let result = find_best_match("The Magic School Bus", &["magic-school-bus"]);
    assert_eq!(result.breakdown.direct_similarity, 100.0);
    // 40 + 40 + 6 (three exact keywords) + 3 (containment)
    assert_eq!(result.score, 89.0);
}

#[test]
fn test_batch_over_catalog() {
    let images = stems(&[
        "bluey.webp",
        "daniel-tigers-neighborhood.jpg",
        "paw-patrol.png",
        "sesame-street.jpg",
    ]);
    let shows = [
        "Sesame Street",
        "Daniel Tiger's Neighborhood",
        "Bluey",
        "Cocomelon",
        "PAW Patrol",
    ];
    let matcher = Matcher::default();
    let pool = matcher.pool(images.clone());
    let results = pool.match_all(&shows);

    let matched: Vec<Option<&str>> = results
        .iter()
        .map(|r| r.matched_label.as_deref())
        .collect();
    assert_eq!(
        matched,
        vec![
            Some("sesame-street"),
            Some("daniel-tigers-neighborhood"),
            Some("bluey"),
            None,
            Some("paw-patrol"),
        ]
    );
    for (show, result) in shows.iter().zip(&results) {
        assert_eq!(result, &matcher.find_best_match(show, &images));
    }
}

/// Classic Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];
    for (i, &ch_b) in b.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &ch_a) in a.iter().enumerate() {
            let cost = if ch_a == ch_b { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(curr[j] + 1).min(prev[j + 1] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[a.len()]
}

/// Edit-distance similarity as a percentage; two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64 * 100.0
}

/// Upper bound of [`similarity`] from lengths alone: the distance is at
/// least the length difference.
pub(crate) fn similarity_upper_bound(len_a: usize, len_b: usize) -> f64 {
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 100.0;
    }
    len_a.min(len_b) as f64 / max_len as f64 * 100.0
}

/// Whether `similarity(a, b) > cutoff`, skipping the DP when the length
/// bound already rules it out.
pub(crate) fn exceeds(a: &str, b: &str, cutoff: f64) -> bool {
    if similarity_upper_bound(a.chars().count(), b.chars().count()) <= cutoff {
        return false;
    }
    similarity(a, b) > cutoff
}

//! Fuzzy string similarity measures, all returning values in `[0, 1]`.
//!
//! Built on `strsim`'s normalized Levenshtein distance; the token-set
//! measure mirrors the classic order-insensitive token overlap ratio used
//! for person-name deduplication.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Case-insensitive character-level similarity.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    normalized_levenshtein(&a, &b)
}

/// Best similarity of the shorter string against any same-length window of
/// the longer one. Containment short-circuits to 1.0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if shorter.is_empty() {
        return if longer.is_empty() { 1.0 } else { 0.0 };
    }
    if longer.contains(&shorter) {
        return 1.0;
    }

    let long_chars: Vec<char> = longer.chars().collect();
    let window = shorter.chars().count();
    let mut best: f64 = 0.0;
    for start in 0..=long_chars.len().saturating_sub(window) {
        let slice: String = long_chars[start..start + window].iter().collect();
        best = best.max(normalized_levenshtein(&shorter, &slice));
    }
    best
}

/// Order-insensitive token overlap: compares the sorted token intersection
/// against each side's sorted intersection-plus-remainder and keeps the best
/// pairwise ratio. Identical token sets score 1.0 regardless of order or
/// repetition.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let base = common.join(" ");
    let with_a = join_parts(&base, &only_a);
    let with_b = join_parts(&base, &only_b);

    let r1 = normalized_levenshtein(&base, &with_a);
    let r2 = normalized_levenshtein(&base, &with_b);
    let r3 = normalized_levenshtein(&with_a, &with_b);
    r1.max(r2).max(r3)
}

fn join_parts(base: &str, rest: &[&str]) -> String {
    let rest = rest.join(" ");
    if base.is_empty() {
        rest
    } else if rest.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, rest)
    }
}

//! String similarity for entity labels.
//!
//! The base metric is the Sørensen-Dice coefficient over character bigrams
//! of whitespace-free, lowercased labels. Short single-token labels are
//! also compared against the initialism of the other label, so that
//! abbreviations such as "USA" can meet their long form.

use std::collections::HashMap;

/// Connective words skipped when building an initialism.
const CONNECTIVES: &[&str] = &[
    "of", "the", "and", "de", "da", "du", "del", "la", "le", "et", "y",
];

/// Shortest and longest token treated as a possible abbreviation.
const ACRONYM_MIN: usize = 2;
const ACRONYM_MAX: usize = 6;

/// Normalize a label for comparison.
///
/// Lowercases, spells out `&`, turns punctuation into spaces and collapses
/// runs of whitespace.
pub fn normalize_label(label: &str) -> String {
    let replaced = label.to_lowercase().replace('&', " and ");
    let cleaned: String = replaced
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sørensen-Dice coefficient over character bigrams.
///
/// Whitespace is ignored. Identical strings score 1; strings shorter than
/// two characters score 0 unless identical.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = counts.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    2.0 * intersection as f64 / (a.len() + b.len() - 2) as f64
}

/// First letters of the non-connective words of a normalized label.
pub fn initialism(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .filter(|w| !CONNECTIVES.contains(w))
        .filter_map(|w| w.chars().next())
        .collect()
}

/// A single short token, or a run of single letters such as "u s a".
fn is_acronym_candidate(normalized: &str) -> bool {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let len: usize = tokens.iter().map(|t| t.chars().count()).sum();
    let shaped = tokens.len() == 1 || tokens.iter().all(|t| t.chars().count() == 1);
    shaped && (ACRONYM_MIN..=ACRONYM_MAX).contains(&len)
}

/// Similarity in `[0, 1]` between two raw labels.
///
/// # Example
/// ```
/// use aquacast::resolve::label_similarity;
///
/// assert_eq!(label_similarity("Bosnia & Herzegovina", "bosnia and herzegovina"), 1.0);
/// assert_eq!(label_similarity("USA", "United States of America"), 1.0);
/// assert!(label_similarity("Zzzz", "Canada") < 0.1);
/// ```
pub fn label_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_label(a);
    let nb = normalize_label(b);

    let mut score = dice_coefficient(&na, &nb);
    if score >= 1.0 {
        return score;
    }

    if is_acronym_candidate(&na) {
        score = score.max(dice_coefficient(&na, &initialism(&nb)));
    }
    if is_acronym_candidate(&nb) {
        score = score.max(dice_coefficient(&initialism(&na), &nb));
    }
    score
}

//! Mapping of raw entity labels onto canonical labels.

use crate::error::{ForecastError, Result};
use crate::resolve::similarity::label_similarity;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default acceptance threshold for a label match.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Outcome of resolving one raw label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// The label was matched to a canonical label above the threshold.
    Resolved { canonical_id: String, score: f64 },
    /// No canonical label scored above the threshold.
    Unresolved {
        best_candidate: Option<String>,
        best_score: f64,
    },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }

    /// Score of the best candidate, resolved or not.
    pub fn score(&self) -> f64 {
        match self {
            Resolution::Resolved { score, .. } => *score,
            Resolution::Unresolved { best_score, .. } => *best_score,
        }
    }
}

/// Raw label to [`Resolution`] mapping produced by [`NameResolver`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameMapping {
    entries: HashMap<String, Resolution>,
}

impl NameMapping {
    /// Look up the resolution of a raw label.
    pub fn get(&self, label: &str) -> Option<&Resolution> {
        self.entries.get(label)
    }

    /// Canonical identifier for a raw label.
    ///
    /// Unresolved and unknown labels fall back to themselves.
    pub fn canonical_for<'a>(&'a self, label: &'a str) -> &'a str {
        match self.entries.get(label) {
            Some(Resolution::Resolved { canonical_id, .. }) => canonical_id,
            _ => label,
        }
    }

    /// Number of labels in the mapping.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|r| r.is_resolved()).count()
    }

    /// Unresolved labels, sorted by label.
    pub fn unresolved(&self) -> Vec<(&str, &Resolution)> {
        let mut out: Vec<(&str, &Resolution)> = self
            .entries
            .iter()
            .filter(|(_, r)| !r.is_resolved())
            .map(|(label, r)| (label.as_str(), r))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Strict mode: fail on the first unresolved label (in sorted order).
    pub fn require_all(&self) -> Result<()> {
        match self.unresolved().first() {
            Some((label, resolution)) => Err(ForecastError::UnresolvedEntity {
                label: label.to_string(),
                best_score: resolution.score(),
            }),
            None => Ok(()),
        }
    }

    fn insert(&mut self, label: String, resolution: Resolution) {
        self.entries.insert(label, resolution);
    }
}

/// Fuzzy matcher of raw labels against a canonical label list.
///
/// # Example
/// ```
/// use aquacast::resolve::NameResolver;
///
/// let resolver = NameResolver::default();
/// let canonical = ["United States of America", "Canada"];
/// let mapping = resolver.resolve(&["USA", "Zzzz"], &canonical);
///
/// assert_eq!(mapping.canonical_for("USA"), "United States of America");
/// assert_eq!(mapping.canonical_for("Zzzz"), "Zzzz");
/// ```
#[derive(Debug, Clone)]
pub struct NameResolver {
    threshold: f64,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl NameResolver {
    /// Create a resolver accepting matches scoring strictly above `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best canonical candidate for `label` as `(index, score)`.
    ///
    /// Ties keep the earliest candidate. Returns `None` for an empty list.
    pub fn best_match<S: AsRef<str>>(&self, label: &str, canonical: &[S]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in canonical.iter().enumerate() {
            let score = label_similarity(label, candidate.as_ref());
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((i, score)),
            }
        }
        best
    }

    /// Resolve every distinct raw label against the canonical list.
    pub fn resolve<R, C>(&self, raw_labels: &[R], canonical_labels: &[C]) -> NameMapping
    where
        R: AsRef<str>,
        C: AsRef<str>,
    {
        let exact: HashSet<&str> = canonical_labels.iter().map(|c| c.as_ref()).collect();
        let mut mapping = NameMapping::default();

        for raw in raw_labels {
            let label = raw.as_ref();
            if mapping.get(label).is_some() {
                continue;
            }

            let resolution = if exact.contains(label) {
                Resolution::Resolved {
                    canonical_id: label.to_string(),
                    score: 1.0,
                }
            } else {
                self.score_label(label, canonical_labels)
            };

            if let Resolution::Unresolved { best_score, .. } = &resolution {
                debug!(label, best_score, "entity label left unresolved");
            }
            mapping.insert(label.to_string(), resolution);
        }

        let unresolved = mapping.len() - mapping.resolved_count();
        if unresolved > 0 {
            warn!(
                unresolved,
                total = mapping.len(),
                threshold = self.threshold,
                "some entity labels could not be resolved"
            );
        }
        mapping
    }

    fn score_label<C: AsRef<str>>(&self, label: &str, canonical: &[C]) -> Resolution {
        match self.best_match(label, canonical) {
            Some((idx, score)) if score > self.threshold => Resolution::Resolved {
                canonical_id: canonical[idx].as_ref().to_string(),
                score,
            },
            Some((idx, score)) => Resolution::Unresolved {
                best_candidate: Some(canonical[idx].as_ref().to_string()),
                best_score: score,
            },
            None => Resolution::Unresolved {
                best_candidate: None,
                best_score: 0.0,
            },
        }
    }
}

/// Resolve `raw_labels` against `canonical_labels` with the given threshold.
pub fn resolve<R, C>(raw_labels: &[R], canonical_labels: &[C], threshold: f64) -> NameMapping
where
    R: AsRef<str>,
    C: AsRef<str>,
{
    NameResolver::new(threshold).resolve(raw_labels, canonical_labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: [&str; 2] = ["United States of America", "Canada"];

    #[test]
    fn resolves_abbreviation_to_long_form() {
        let mapping = resolve(&["USA"], &CANONICAL, 0.6);
        match mapping.get("USA").unwrap() {
            Resolution::Resolved {
                canonical_id,
                score,
            } => {
                assert_eq!(canonical_id, "United States of America");
                assert!(*score > 0.6);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn unknown_label_falls_back_to_itself() {
        let mapping = resolve(&["Zzzz"], &CANONICAL, 0.6);
        assert!(!mapping.get("Zzzz").unwrap().is_resolved());
        assert_eq!(mapping.canonical_for("Zzzz"), "Zzzz");
        assert_eq!(mapping.canonical_for("never seen"), "never seen");
    }

    #[test]
    fn exact_labels_resolve_with_full_score() {
        let mapping = resolve(&["Canada"], &CANONICAL, 0.6);
        assert_eq!(
            mapping.get("Canada"),
            Some(&Resolution::Resolved {
                canonical_id: "Canada".to_string(),
                score: 1.0
            })
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        // "night" vs "nacht" scores exactly 0.25
        let mapping = resolve(&["night"], &["nacht"], 0.25);
        assert!(!mapping.get("night").unwrap().is_resolved());

        let mapping = resolve(&["night"], &["nacht"], 0.2);
        assert!(mapping.get("night").unwrap().is_resolved());
    }

    #[test]
    fn ties_keep_first_candidate() {
        let resolver = NameResolver::default();
        let best = resolver.best_match("Niger", &["Niger", "Niger"]).unwrap();
        assert_eq!(best.0, 0);

        let mapping = resolve(&["Congo"], &["Congo Rep", "Congo Rep"], 0.5);
        assert_eq!(mapping.canonical_for("Congo"), "Congo Rep");
    }

    #[test]
    fn duplicate_raw_labels_are_scored_once() {
        let mapping = resolve(&["Canada", "Canada", "USA"], &CANONICAL, 0.6);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.resolved_count(), 2);
    }

    #[test]
    fn empty_canonical_list_leaves_everything_unresolved() {
        let empty: [&str; 0] = [];
        let mapping = resolve(&["France"], &empty, 0.6);
        assert_eq!(
            mapping.get("France"),
            Some(&Resolution::Unresolved {
                best_candidate: None,
                best_score: 0.0
            })
        );
    }

    #[test]
    fn strict_mode_reports_first_unresolved_label() {
        let mapping = resolve(&["Zzzz", "Aaaa", "USA"], &CANONICAL, 0.6);
        let err = mapping.require_all().unwrap_err();
        match err {
            ForecastError::UnresolvedEntity { label, .. } => assert_eq!(label, "Aaaa"),
            other => panic!("unexpected error {other:?}"),
        }

        let mapping = resolve(&["USA"], &CANONICAL, 0.6);
        assert!(mapping.require_all().is_ok());
    }
}

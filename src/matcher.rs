//! Matching of incoming person names against the golden reference.
//!
//! Lookup order per record: exact raw `BI Name`, then exact normalized
//! alias, then (when fuzzy matching is enabled) a full scan scoring each
//! golden row by the better of its raw name and its normalized alias.

use tracing::debug;

use crate::config::GOLDEN_MATCH_THRESHOLD;
use crate::golden::GoldenTable;
use crate::normalize::Normalizer;
use crate::similarity;
use crate::TARGET_MATCH;

/// Outcome of a golden lookup. `bi_name` is the matching reference row's
/// raw name; `score` is 1.0 for exact hits.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenMatch {
    pub bi_name: String,
    pub standard_name: String,
    pub score: f64,
}

pub struct Matcher<'a> {
    normalizer: &'a Normalizer,
    threshold: f64,
    use_fuzzy: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Matcher {
            normalizer,
            threshold: GOLDEN_MATCH_THRESHOLD,
            use_fuzzy: true,
        }
    }

    pub fn with_fuzzy_matching(mut self, use_fuzzy: bool) -> Self {
        self.use_fuzzy = use_fuzzy;
        self
    }

    #[cfg(test)]
    fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Best golden entry for a raw name, or None when nothing clears the
    /// threshold. The fuzzy stage keeps the strictly-best score, so the
    /// first golden row reaching the maximum wins ties.
    pub fn find_best_match(&self, raw_name: &str, golden: &GoldenTable) -> Option<GoldenMatch> {
        if golden.is_empty() {
            return None;
        }

        if let Some(entry) = golden.get_by_bi_name(raw_name) {
            return Some(GoldenMatch {
                bi_name: entry.bi_name.clone(),
                standard_name: entry.standard_name.clone(),
                score: 1.0,
            });
        }

        let clean = self.normalizer.clean_name(raw_name, true);
        if let Some(entry) = golden.get_by_alias(&clean) {
            return Some(GoldenMatch {
                bi_name: entry.bi_name.clone(),
                standard_name: entry.standard_name.clone(),
                score: 1.0,
            });
        }

        if !self.use_fuzzy {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in golden.entries().iter().enumerate() {
            let score = similarity::ratio(raw_name, &entry.bi_name)
                .max(similarity::ratio(raw_name, &entry.alias_clean));
            if score >= self.threshold && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((idx, score));
            }
        }

        best.map(|(idx, score)| {
            let entry = &golden.entries()[idx];
            debug!(
                target: TARGET_MATCH,
                "fuzzy golden match '{}' -> '{}' ({:.3})", raw_name, entry.standard_name, score
            );
            GoldenMatch {
                bi_name: entry.bi_name.clone(),
                standard_name: entry.standard_name.clone(),
                score,
            }
        })
    }
}

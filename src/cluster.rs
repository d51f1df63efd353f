//! Blocked pairwise dedup over persons the golden reference did not cover.
//!
//! Candidate pairs come from a cheap blocking key (first token, last token,
//! length bucket); within a block, rows with the same lowercased family
//! token score via token-set similarity. High-confidence pairs collapse to
//! one spelling, mid-range pairs are flagged for manual review.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::config::{AUTO_MERGE_THRESHOLD, UNSURE_THRESHOLD_DEFAULT};
use crate::normalize::Normalizer;
use crate::similarity;
use crate::types::PersonRecord;
use crate::TARGET_CLUSTER;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Rows whose standard name was replaced by a cluster representative.
    pub merged: usize,
    /// Rows flagged "Not Sure".
    pub unsure: usize,
}

pub struct ClusterEngine<'a> {
    normalizer: &'a Normalizer,
    unsure_threshold: f64,
    use_fuzzy: bool,
}

type BlockKey = (String, String, u8);

fn block_key(tokens: &[String]) -> BlockKey {
    let Some(first) = tokens.first() else {
        return (String::new(), String::new(), 0);
    };
    let last = tokens.last().cloned().unwrap_or_default();
    let bucket = match tokens.len() {
        0..=2 => 0,
        3..=4 => 1,
        _ => 2,
    };
    (first.clone(), last, bucket)
}

impl<'a> ClusterEngine<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        ClusterEngine {
            normalizer,
            unsure_threshold: UNSURE_THRESHOLD_DEFAULT,
            use_fuzzy: true,
        }
    }

    pub fn with_unsure_threshold(mut self, threshold: f64) -> Self {
        self.unsure_threshold = threshold;
        self
    }

    pub fn with_fuzzy_matching(mut self, use_fuzzy: bool) -> Self {
        self.use_fuzzy = use_fuzzy;
        self
    }

    /// Collapse near-duplicate standard names among unmatched persons.
    /// Rows with a golden hit are left untouched. The merge mapping is
    /// built in one pass and applied once, so chains do not cascade.
    pub fn merge(&self, persons: &mut [PersonRecord]) -> MergeStats {
        if !self.use_fuzzy {
            warn!(target: TARGET_CLUSTER, "fuzzy matching disabled, skipping smart merge");
            return MergeStats::default();
        }

        let candidates: Vec<usize> = persons
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_unmatched() && !p.standard_name.is_empty())
            .map(|(i, _)| i)
            .collect();
        if candidates.len() < 2 {
            return MergeStats::default();
        }

        let tokens: HashMap<usize, Vec<String>> = candidates
            .iter()
            .map(|&i| (i, self.normalizer.tokens(&persons[i].standard_name, true)))
            .collect();
        let family = |i: usize| -> String {
            persons[i]
                .standard_name
                .split_whitespace()
                .last()
                .unwrap_or_default()
                .to_lowercase()
        };

        let mut blocks: BTreeMap<BlockKey, Vec<usize>> = BTreeMap::new();
        for &i in &candidates {
            blocks.entry(block_key(&tokens[&i])).or_default().push(i);
        }

        let mut mapping: HashMap<String, String> = HashMap::new();
        let mut unsure_pairs: BTreeSet<(String, String)> = BTreeSet::new();

        for group in blocks.values() {
            for (pos, &i) in group.iter().enumerate() {
                for &j in &group[pos + 1..] {
                    if family(i) != family(j) || tokens[&i].is_empty() || tokens[&j].is_empty() {
                        continue;
                    }
                    let sim = similarity::token_set_ratio(
                        &tokens[&i].join(" "),
                        &tokens[&j].join(" "),
                    );
                    if sim >= AUTO_MERGE_THRESHOLD {
                        let (name_i, name_j) =
                            (&persons[i].standard_name, &persons[j].standard_name);
                        let (len_i, len_j) = (tokens[&i].len(), tokens[&j].len());
                        let (choose, other) = if len_i > len_j {
                            (name_i, name_j)
                        } else if len_j > len_i {
                            (name_j, name_i)
                        } else {
                            let uniq_i = tokens[&i].iter().collect::<BTreeSet<_>>().len();
                            let uniq_j = tokens[&j].iter().collect::<BTreeSet<_>>().len();
                            if uniq_i >= uniq_j {
                                (name_i, name_j)
                            } else {
                                (name_j, name_i)
                            }
                        };
                        if choose != other {
                            debug!(
                                target: TARGET_CLUSTER,
                                "merge '{}' -> '{}' ({:.3})", other, choose, sim
                            );
                            mapping.insert(other.clone(), choose.clone());
                        }
                    } else if sim >= self.unsure_threshold {
                        let mut pair =
                            (persons[i].standard_name.clone(), persons[j].standard_name.clone());
                        if pair.0 > pair.1 {
                            std::mem::swap(&mut pair.0, &mut pair.1);
                        }
                        unsure_pairs.insert(pair);
                    }
                }
            }
        }

        let unsure_names: BTreeSet<&String> =
            unsure_pairs.iter().flat_map(|(a, b)| [a, b]).collect();

        let mut stats = MergeStats::default();
        for &i in &candidates {
            if let Some(target) = mapping.get(&persons[i].standard_name) {
                persons[i].standard_name = target.clone();
                stats.merged += 1;
            }
            if unsure_names.contains(&persons[i].standard_name) {
                persons[i].not_sure = "Not Sure".to_string();
                stats.unsure += 1;
            } else {
                persons[i].not_sure.clear();
            }
        }

        if stats.merged > 0 || stats.unsure > 0 {
            info!(
                target: TARGET_CLUSTER,
                "smart merge: {} rows merged, {} flagged unsure", stats.merged, stats.unsure
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(standard_name: &str) -> PersonRecord {
        PersonRecord {
            bi_name: standard_name.to_string(),
            extracted_name: standard_name.to_string(),
            standard_name: standard_name.to_string(),
            ..PersonRecord::default()
        }
    }

    #[test]
    fn near_identical_names_auto_merge_to_longer() {
        let normalizer = Normalizer::new();
        let engine = ClusterEngine::new(&normalizer);
        let mut persons = vec![
            person("Ahmed Mohamed Ali"),
            person("Ahmed Mohamed Mohamed Ali"),
        ];
        let stats = engine.merge(&mut persons);
        assert_eq!(stats.merged, 1);
        assert_eq!(persons[0].standard_name, "Ahmed Mohamed Mohamed Ali");
        assert_eq!(persons[1].standard_name, "Ahmed Mohamed Mohamed Ali");
    }

    #[test]
    fn mid_range_similarity_flags_both_not_sure() {
        let normalizer = Normalizer::new();
        let engine = ClusterEngine::new(&normalizer);
        let mut persons = vec![
            person("Ahmed Samir Tarek"),
            person("Ahmed Hamdy Tarek"),
        ];
        let stats = engine.merge(&mut persons);
        assert_eq!(stats.merged, 0);
        assert_eq!(stats.unsure, 2);
        assert_eq!(persons[0].standard_name, "Ahmed Samir Tarek");
        assert_eq!(persons[0].not_sure, "Not Sure");
        assert_eq!(persons[1].not_sure, "Not Sure");
    }

    #[test]
    fn different_families_never_pair() {
        let normalizer = Normalizer::new();
        let engine = ClusterEngine::new(&normalizer);
        let mut persons = vec![person("Ahmed Mohamed Ali"), person("Ahmed Mohamed Omar")];
        let stats = engine.merge(&mut persons);
        assert_eq!(stats, MergeStats::default());
        assert_eq!(persons[1].standard_name, "Ahmed Mohamed Omar");
    }

    #[test]
    fn matched_rows_are_left_alone() {
        let normalizer = Normalizer::new();
        let engine = ClusterEngine::new(&normalizer);
        let mut matched = person("Ahmed Mohamed Ali");
        matched.golden_match = "Dr Ahmed Mohamed Ali".to_string();
        let mut persons = vec![matched, person("Ahmed Mohamed Mohamed Ali")];
        let stats = engine.merge(&mut persons);
        assert_eq!(stats, MergeStats::default());
        assert_eq!(persons[0].standard_name, "Ahmed Mohamed Ali");
    }

    #[test]
    fn disabled_fuzzy_is_a_no_op() {
        let normalizer = Normalizer::new();
        let engine = ClusterEngine::new(&normalizer).with_fuzzy_matching(false);
        let mut persons = vec![
            person("Ahmed Mohamed Ali"),
            person("Ahmed Mohamed Mohamed Ali"),
        ];
        let stats = engine.merge(&mut persons);
        assert_eq!(stats, MergeStats::default());
        assert_eq!(persons[0].standard_name, "Ahmed Mohamed Ali");
    }
}

//! Medical specialty canonicalization.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::config::SPECIALTY_FUZZY_FLOOR;
use crate::similarity::partial_ratio;
use crate::TARGET_NORMALIZE;

use super::tokens::title_case;
use super::vocab::{
    NON_WORD, SPECIALTY_CANONICAL, SPECIALTY_STOP_SET, SPECIALTY_TOKEN_ALIASES,
};

lazy_static! {
    static ref SPEC_SPLIT: Regex = Regex::new(r"[\s/,\-_]+").unwrap();
}

fn clean_specialty_text(raw: &str) -> String {
    let txt = raw.to_lowercase();
    let txt = txt.trim();
    if txt.is_empty() {
        return String::new();
    }
    let txt = NON_WORD.replace_all(txt, " ");
    SPEC_SPLIT
        .split(&txt)
        .filter(|t| !t.is_empty() && !SPECIALTY_STOP_SET.contains(t))
        .map(|t| *SPECIALTY_TOKEN_ALIASES.get(t).unwrap_or(&t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a free-text specialty onto the canonical specialty table.
///
/// Attempts, in order: exact canonical/synonym equality, whole-word synonym
/// containment, then (fuzzy mode only) best partial-ratio match with an 0.88
/// acceptance floor. Unmatched input comes back title-cased verbatim;
/// "Unknown" only ever means the input was empty.
pub fn normalize_specialty(raw: &str, use_fuzzy: bool) -> String {
    let base = clean_specialty_text(raw);
    if base.is_empty() {
        return "Unknown".to_string();
    }

    for (canon, syns) in SPECIALTY_CANONICAL {
        if base == *canon || syns.contains(&base.as_str()) {
            return title_case(canon);
        }
    }

    for (canon, syns) in SPECIALTY_CANONICAL {
        for key in std::iter::once(canon).chain(syns.iter()) {
            let pat = format!(r"\b{}\b", regex::escape(key));
            if Regex::new(&pat).map(|re| re.is_match(&base)).unwrap_or(false) {
                return title_case(canon);
            }
        }
    }

    if use_fuzzy {
        let mut best: Option<&str> = None;
        let mut best_score = 0.0_f64;
        for (canon, syns) in SPECIALTY_CANONICAL {
            for key in std::iter::once(canon).chain(syns.iter()) {
                let score = partial_ratio(&base, key);
                if score > best_score {
                    best_score = score;
                    best = Some(canon);
                }
            }
        }
        if best_score >= SPECIALTY_FUZZY_FLOOR {
            if let Some(canon) = best {
                debug!(
                    target: TARGET_NORMALIZE,
                    "fuzzy specialty match '{}' -> '{}' ({:.2})", raw, canon, best_score
                );
                return title_case(canon);
            }
        }
    }

    title_case(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_synonym_matches() {
        assert_eq!(normalize_specialty("Dental", true), "Dental");
        assert_eq!(normalize_specialty("Dentistry", true), "Dental");
        assert_eq!(normalize_specialty("paediatrics", true), "Pediatrics");
    }

    #[test]
    fn stopwords_and_abbreviations_collapse() {
        assert_eq!(normalize_specialty("Dermatology Dept", true), "Dermatology");
        assert_eq!(normalize_specialty("GI", true), "Gastroenterology");
        assert_eq!(normalize_specialty("ED", true), "Er");
    }

    #[test]
    fn word_boundary_containment() {
        assert_eq!(normalize_specialty("Adult Cardiology Follow-up", true), "Cardiology");
    }

    #[test]
    fn unmatched_returns_title_cased_verbatim() {
        assert_eq!(normalize_specialty("Sleep Medicine", false), "Sleep Medicine");
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(normalize_specialty("", true), "Unknown");
        assert_eq!(normalize_specialty("  -  ", true), "Unknown");
    }
}

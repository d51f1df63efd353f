//! Thresholds and well-known file locations.

use std::path::{Path, PathBuf};

/// Similarity at or above which two person records merge without review.
pub const AUTO_MERGE_THRESHOLD: f64 = 0.90;

/// Default similarity floor for flagging borderline pairs as "Not Sure".
pub const UNSURE_THRESHOLD_DEFAULT: f64 = 0.70;

/// Similarity floor for accepting a fuzzy golden-reference match.
pub const GOLDEN_MATCH_THRESHOLD: f64 = 0.80;

/// Acceptance floor for fuzzy specialty canonicalization.
pub const SPECIALTY_FUZZY_FLOOR: f64 = 0.88;

/// Capacity of the tokenizer memo cache. The same raw strings recur across
/// millions of comparisons in large batches.
pub const TOKEN_CACHE_CAPACITY: usize = 200_000;

/// Default review workbook for new/unmapped aliases, relative to the
/// working directory.
pub const DEFAULT_NEW_ALIASES: &str = "Doctor_List_Final_Names.xlsx";

/// Candidate golden-reference locations under `base`, in priority order.
pub fn golden_candidates(base: &Path) -> [PathBuf; 4] {
    [
        base.join("reference").join("golden_doctors.xlsx"),
        base.join("reference").join("golden_reference.xlsx"),
        base.join("golden_reference.xlsx"),
        base.join("doctor_cleaner").join("golden_reference.xlsx"),
    ]
}

/// First existing candidate under `base`, if any.
pub fn discover_golden(base: &Path) -> Option<PathBuf> {
    golden_candidates(base).into_iter().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_prefers_reference_golden_doctors() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        std::fs::create_dir_all(base.join("reference")).unwrap();
        std::fs::write(base.join("golden_reference.xlsx"), b"x").unwrap();
        std::fs::write(base.join("reference").join("golden_doctors.xlsx"), b"x").unwrap();

        let found = discover_golden(base).unwrap();
        assert_eq!(found, base.join("reference").join("golden_doctors.xlsx"));
    }

    #[test]
    fn discovery_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_golden(dir.path()).is_none());
    }
}

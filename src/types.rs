//! Record types flowing through one batch run.
//!
//! Optional fields are defined-empty rather than conditionally absent: a
//! person record always carries the full output schema, with empty strings
//! where nothing applies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::UNSURE_THRESHOLD_DEFAULT;

/// One row of batch input; never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub bi_name: String,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Facility,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => write!(f, "person"),
            EntityKind::Facility => write!(f, "facility"),
        }
    }
}

impl From<&str> for EntityKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "facility" => EntityKind::Facility,
            _ => EntityKind::Person,
        }
    }
}

/// A person row after extraction, matching and clustering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonRecord {
    pub bi_name: String,
    pub extracted_name: String,
    pub original_specialty: String,
    pub specialty_std: String,
    /// Canonical name after matching/clustering; always populated.
    pub standard_name: String,
    /// Golden `BI Name` that matched, or empty for no reference hit.
    pub golden_match: String,
    pub match_score: f64,
    pub name_changed: bool,
    /// "Not Sure" when flagged for manual disambiguation, else empty.
    pub not_sure: String,
}

impl PersonRecord {
    pub fn is_unmatched(&self) -> bool {
        self.golden_match.is_empty()
    }
}

/// A facility row: raw vs standardized name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub bi_name: String,
    pub standard_name: String,
    pub name_changed: bool,
}

/// One batch job, constructed by the caller and consumed once.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub golden_path: Option<PathBuf>,
    pub new_aliases_out: Option<PathBuf>,
    pub threshold: f64,
}

impl ProcessRequest {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        ProcessRequest {
            input_path: input_path.into(),
            output_path: output_path.into(),
            golden_path: None,
            new_aliases_out: None,
            threshold: UNSURE_THRESHOLD_DEFAULT,
        }
    }

    pub fn with_golden(mut self, path: impl Into<PathBuf>) -> Self {
        self.golden_path = Some(path.into());
        self
    }

    pub fn with_new_aliases_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.new_aliases_out = Some(path.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// End-of-run counters, logged line-oriented and as one JSON line so an
/// out-of-process caller can scrape them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub total_rows: usize,
    pub persons: usize,
    pub facilities: usize,
    pub golden_rows: usize,
    pub golden_matches: usize,
    pub new_aliases: usize,
    pub merged: usize,
    pub unsure: usize,
    pub changed: usize,
    pub unique_before: usize,
    pub unique_after: usize,
    pub elapsed_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_round_trip() {
        assert_eq!(EntityKind::from("facility"), EntityKind::Facility);
        assert_eq!(EntityKind::from("PERSON"), EntityKind::Person);
        assert_eq!(EntityKind::from("other"), EntityKind::Person);
        assert_eq!(EntityKind::Facility.to_string(), "facility");
    }

    #[test]
    fn request_builder_defaults() {
        let req = ProcessRequest::new("in.xlsx", "out.xlsx");
        assert!(req.golden_path.is_none());
        assert!((req.threshold - UNSURE_THRESHOLD_DEFAULT).abs() < f64::EPSILON);
    }
}

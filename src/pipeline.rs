//! End-to-end batch runs: load input, load golden reference, standardize
//! specialties, split persons from facilities, extract and match names,
//! collapse leftover duplicates, and write the review workbook.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::classify::is_facility;
use crate::cluster::ClusterEngine;
use crate::config::DEFAULT_NEW_ALIASES;
use crate::error::PipelineError;
use crate::golden::{GoldenRepository, GoldenTable};
use crate::matcher::Matcher;
use crate::normalize::specialty::normalize_specialty;
use crate::normalize::{extract_person_name_smart, Normalizer};
use crate::tabular::{self, Cell, OutSheet};
use crate::types::{
    EntityKind, FacilityRecord, PersonRecord, ProcessRequest, RawRecord, RunStats,
};
use crate::TARGET_PIPELINE;

pub const DOCTOR_COLUMNS: [&str; 9] = [
    "BI Name",
    "Extracted_Name",
    "Original_Specialty",
    "Specialty_Std",
    "Standard_Name",
    "Golden_Match",
    "Match_Score",
    "Name_Changed",
    "Not_Sure",
];

pub const FACILITY_COLUMNS: [&str; 3] = ["BI Name", "Standard_Name", "Name_Changed"];

pub struct Pipeline {
    normalizer: Normalizer,
    base_dir: PathBuf,
    use_fuzzy: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            normalizer: Normalizer::new(),
            base_dir: PathBuf::from("."),
            use_fuzzy: true,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_fuzzy_matching(mut self, use_fuzzy: bool) -> Self {
        self.use_fuzzy = use_fuzzy;
        self
    }

    /// Run one batch. Fatal only on unreadable input, a missing `BI Name`
    /// column, an unreadable explicitly-given golden path, or a failed
    /// output write; everything else degrades with a warning.
    pub fn process(&self, request: &ProcessRequest) -> Result<RunStats> {
        let started = Instant::now();
        info!(target: TARGET_PIPELINE, "starting processing run");
        info!(target: TARGET_PIPELINE, "input: {}", request.input_path.display());
        info!(target: TARGET_PIPELINE, "output: {}", request.output_path.display());
        info!(
            target: TARGET_PIPELINE,
            "golden: {}",
            request
                .golden_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".to_string())
        );
        info!(target: TARGET_PIPELINE, "unsure threshold: {}", request.threshold);
        if self.use_fuzzy {
            info!(target: TARGET_PIPELINE, "fuzzy matching: enabled");
        } else {
            warn!(
                target: TARGET_PIPELINE,
                "fuzzy matching unavailable, exact lookups only for this run"
            );
        }

        let records = self.load_input(&request.input_path)?;
        info!(target: TARGET_PIPELINE, "loaded {} records", records.len());

        let repo = GoldenRepository::new(&self.normalizer, &self.base_dir);
        let golden = repo.load(request.golden_path.as_deref())?;

        let (mut persons, facilities) = self.split_and_standardize(&records);
        info!(
            target: TARGET_PIPELINE,
            "found {} persons, {} facilities", persons.len(), facilities.len()
        );

        self.log_extraction_examples(&persons);

        let golden_matches = self.match_persons(&mut persons, &golden);

        let merge_stats = if self.use_fuzzy {
            let unmatched = persons.iter().filter(|p| p.is_unmatched()).count();
            if unmatched > 0 {
                info!(
                    target: TARGET_PIPELINE,
                    "smart clustering over {} unmatched names", unmatched
                );
            }
            ClusterEngine::new(&self.normalizer)
                .with_unsure_threshold(request.threshold)
                .merge(&mut persons)
        } else {
            Default::default()
        };

        for p in &mut persons {
            p.name_changed = p.bi_name != p.standard_name;
        }

        let new_aliases = self.export_new_aliases(
            &persons,
            &golden,
            request.new_aliases_out.as_deref(),
        );

        self.write_output(&request.output_path, &persons, &facilities)?;

        let unique_before: HashSet<&str> = persons.iter().map(|p| p.bi_name.as_str()).collect();
        let unique_after: HashSet<&str> =
            persons.iter().map(|p| p.standard_name.as_str()).collect();
        let stats = RunStats {
            total_rows: records.len(),
            persons: persons.len(),
            facilities: facilities.len(),
            golden_rows: golden.len(),
            golden_matches,
            new_aliases,
            merged: merge_stats.merged,
            unsure: merge_stats.unsure,
            changed: persons.iter().filter(|p| p.name_changed).count(),
            unique_before: unique_before.len(),
            unique_after: unique_after.len(),
            elapsed_ms: started.elapsed().as_millis(),
        };
        self.log_stats(&stats);
        Ok(stats)
    }

    /// Merge a reviewed workbook back into the golden reference.
    pub fn learn(
        &self,
        golden_path: &Path,
        reviewed_path: &Path,
        out_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let repo = GoldenRepository::new(&self.normalizer, &self.base_dir);
        repo.update_from_review(golden_path, reviewed_path, out_path)
    }

    fn load_input(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let sheet = tabular::read_sheet(path, None)
            .with_context(|| format!("failed to read input {}", path.display()))?;
        let Some(bi_idx) = sheet.column_index("BI Name") else {
            return Err(PipelineError::InputSchema("BI Name".to_string()).into());
        };
        let spec_idx = sheet.column_index("Specialty");
        let records = sheet
            .rows
            .iter()
            .map(|row| RawRecord {
                bi_name: sheet.cell(row, bi_idx).to_string(),
                specialty: spec_idx.map(|i| sheet.cell(row, i).to_string()),
            })
            .filter(|r| !r.bi_name.is_empty())
            .collect();
        Ok(records)
    }

    fn split_and_standardize(
        &self,
        records: &[RawRecord],
    ) -> (Vec<PersonRecord>, Vec<FacilityRecord>) {
        let mut persons = Vec::new();
        let mut facilities = Vec::new();
        for record in records {
            let (original_specialty, specialty_std) = match &record.specialty {
                Some(raw) => (
                    raw.clone(),
                    normalize_specialty(raw, self.use_fuzzy),
                ),
                None => (String::new(), "Unknown".to_string()),
            };

            let kind = if is_facility(&record.bi_name) {
                EntityKind::Facility
            } else {
                EntityKind::Person
            };
            match kind {
                EntityKind::Facility => {
                    let standard_name = self.normalizer.clean_name(&record.bi_name, false);
                    facilities.push(FacilityRecord {
                        name_changed: record.bi_name != standard_name,
                        bi_name: record.bi_name.clone(),
                        standard_name,
                    });
                }
                EntityKind::Person => {
                    persons.push(PersonRecord {
                        bi_name: record.bi_name.clone(),
                        extracted_name: extract_person_name_smart(&record.bi_name),
                        original_specialty,
                        specialty_std,
                        ..PersonRecord::default()
                    });
                }
            }
        }
        (persons, facilities)
    }

    fn log_extraction_examples(&self, persons: &[PersonRecord]) {
        let examples: Vec<&PersonRecord> = persons
            .iter()
            .filter(|p| p.bi_name != p.extracted_name)
            .take(5)
            .collect();
        if !examples.is_empty() {
            info!(target: TARGET_PIPELINE, "smart extraction examples:");
            for p in examples {
                info!(target: TARGET_PIPELINE, "  '{}' -> '{}'", p.bi_name, p.extracted_name);
            }
        }
    }

    /// Fill `standard_name`/`golden_match`/`match_score` for every person.
    /// Returns the number of golden hits.
    fn match_persons(&self, persons: &mut [PersonRecord], golden: &GoldenTable) -> usize {
        if golden.is_empty() {
            for p in persons.iter_mut() {
                p.standard_name = self.normalizer.clean_name(&p.extracted_name, true);
                if p.standard_name.is_empty() {
                    p.standard_name = p.bi_name.clone();
                }
            }
            return 0;
        }

        info!(target: TARGET_PIPELINE, "matching against golden reference");
        let matcher = Matcher::new(&self.normalizer).with_fuzzy_matching(self.use_fuzzy);
        let mut matched = 0usize;
        for p in persons.iter_mut() {
            let hit = if golden.contains_bi_name(&p.bi_name) {
                matcher.find_best_match(&p.bi_name, golden)
            } else if !p.extracted_name.is_empty() {
                matcher.find_best_match(&p.extracted_name, golden)
            } else {
                None
            };
            match hit {
                Some(m) => {
                    p.standard_name = m.standard_name;
                    p.golden_match = m.bi_name;
                    p.match_score = m.score;
                    matched += 1;
                }
                None => {
                    p.standard_name = if p.extracted_name.is_empty() {
                        p.bi_name.clone()
                    } else {
                        p.extracted_name.clone()
                    };
                }
            }
        }
        let pct = if persons.is_empty() {
            0.0
        } else {
            matched as f64 / persons.len() as f64 * 100.0
        };
        info!(
            target: TARGET_PIPELINE,
            "golden matches: {}/{} ({:.1}%)", matched, persons.len(), pct
        );
        matched
    }

    /// Best-effort export of person rows the golden reference has never
    /// seen, for manual review. Never fails the run.
    fn export_new_aliases(
        &self,
        persons: &[PersonRecord],
        golden: &GoldenTable,
        out_path: Option<&Path>,
    ) -> usize {
        let mut seen: HashSet<(&str, &str, &str, &str)> = HashSet::new();
        let rows: Vec<Vec<Cell>> = persons
            .iter()
            .filter(|p| !golden.contains_bi_name(&p.bi_name))
            .filter(|p| {
                seen.insert((
                    p.bi_name.as_str(),
                    p.extracted_name.as_str(),
                    p.original_specialty.as_str(),
                    p.standard_name.as_str(),
                ))
            })
            .map(|p| {
                vec![
                    Cell::from(p.bi_name.as_str()),
                    Cell::from(p.extracted_name.as_str()),
                    Cell::from(p.original_specialty.as_str()),
                    Cell::from(p.standard_name.as_str()),
                    Cell::from("Not Sure"),
                ]
            })
            .collect();
        if rows.is_empty() {
            return 0;
        }

        let count = rows.len();
        let path = out_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_NEW_ALIASES));
        let sheet = OutSheet {
            name: "New_Aliases".to_string(),
            headers: [
                "BI Name",
                "Extracted_Name",
                "Original_Specialty",
                "Standard_Name",
                "Unsure",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows,
        };
        match tabular::write_workbook(&path, &[sheet]) {
            Ok(()) => {
                info!(
                    target: TARGET_PIPELINE,
                    "new aliases for review: {} -> {}", count, path.display()
                );
                count
            }
            Err(e) => {
                warn!(target: TARGET_PIPELINE, "could not write new aliases file: {e:#}");
                0
            }
        }
    }

    fn write_output(
        &self,
        path: &Path,
        persons: &[PersonRecord],
        facilities: &[FacilityRecord],
    ) -> Result<()> {
        info!(target: TARGET_PIPELINE, "saving results");
        let doctor_rows: Vec<Vec<Cell>> = persons
            .iter()
            .map(|p| {
                vec![
                    Cell::from(p.bi_name.as_str()),
                    Cell::from(p.extracted_name.as_str()),
                    Cell::from(p.original_specialty.as_str()),
                    Cell::from(p.specialty_std.as_str()),
                    Cell::from(p.standard_name.as_str()),
                    Cell::from(p.golden_match.as_str()),
                    Cell::Number(p.match_score),
                    Cell::Bool(p.name_changed),
                    Cell::from(p.not_sure.as_str()),
                ]
            })
            .collect();
        let facility_rows: Vec<Vec<Cell>> = facilities
            .iter()
            .map(|f| {
                vec![
                    Cell::from(f.bi_name.as_str()),
                    Cell::from(f.standard_name.as_str()),
                    Cell::Bool(f.name_changed),
                ]
            })
            .collect();

        let sheets = [
            OutSheet {
                name: "Doctors".to_string(),
                headers: DOCTOR_COLUMNS.iter().map(|h| h.to_string()).collect(),
                rows: doctor_rows,
            },
            OutSheet {
                name: "Facilities".to_string(),
                headers: FACILITY_COLUMNS.iter().map(|h| h.to_string()).collect(),
                rows: facility_rows,
            },
        ];
        tabular::write_workbook(path, &sheets)
            .with_context(|| format!("failed to write output {}", path.display()))
    }

    fn log_stats(&self, stats: &RunStats) {
        info!(target: TARGET_PIPELINE, "processing complete");
        info!(target: TARGET_PIPELINE, "persons: {}", stats.persons);
        info!(target: TARGET_PIPELINE, "facilities: {}", stats.facilities);
        info!(target: TARGET_PIPELINE, "unique names before: {}", stats.unique_before);
        info!(target: TARGET_PIPELINE, "unique names after: {}", stats.unique_after);
        let reduction = if stats.unique_before > 0 {
            (stats.unique_before - stats.unique_after) as f64 / stats.unique_before as f64 * 100.0
        } else {
            0.0
        };
        let changed_pct = if stats.persons > 0 {
            stats.changed as f64 / stats.persons as f64 * 100.0
        } else {
            0.0
        };
        info!(target: TARGET_PIPELINE, "reduction: {:.1}%", reduction);
        info!(target: TARGET_PIPELINE, "names changed: {:.1}%", changed_pct);
        info!(target: TARGET_PIPELINE, "processing time: {} ms", stats.elapsed_ms);
        match serde_json::to_string(stats) {
            Ok(json) => info!(target: TARGET_PIPELINE, "stats: {json}"),
            Err(e) => warn!(target: TARGET_PIPELINE, "could not serialize stats: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_routes_service_names_to_facilities() {
        let pipeline = Pipeline::new();
        let records = vec![
            RawRecord {
                bi_name: "Dr Ahmed Mohamed".to_string(),
                specialty: Some("cardio".to_string()),
            },
            RawRecord {
                bi_name: "ENT Clinic Downtown".to_string(),
                specialty: None,
            },
        ];
        let (persons, facilities) = pipeline.split_and_standardize(&records);
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].extracted_name, "Ahmed Mohamed");
        assert_eq!(persons[0].specialty_std, "Cardiology");
        assert_eq!(facilities.len(), 1);
        assert_eq!(facilities[0].standard_name, "Ent Clinic Downtown");
        assert!(facilities[0].name_changed);
    }

    #[test]
    fn empty_golden_standardizes_from_extracted_name() {
        let pipeline = Pipeline::new();
        let mut persons = vec![PersonRecord {
            bi_name: "Dr. Mohamed Aly".to_string(),
            extracted_name: "Mohamed Aly".to_string(),
            ..PersonRecord::default()
        }];
        let matched = pipeline.match_persons(&mut persons, &GoldenTable::default());
        assert_eq!(matched, 0);
        assert_eq!(persons[0].standard_name, "Mohamed Ali");
        assert!(persons[0].is_unmatched());
    }
}

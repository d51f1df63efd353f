//! Golden reference repository: the curated table of known raw alias ->
//! standard name/specialty mappings.
//!
//! The repository exclusively owns the table's on-disk representation. A
//! loaded table is an immutable snapshot for the duration of one run; the
//! only writer is the learn-from-review merge. There is no file locking, so
//! do not run a learn merge and a processing run against the same reference
//! path at the same time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::discover_golden;
use crate::error::PipelineError;
use crate::normalize::Normalizer;
use crate::tabular::{self, Cell, OutSheet, Sheet};
use crate::TARGET_GOLDEN;

pub const GOLDEN_HEADERS: [&str; 4] =
    ["BI Name", "Standard_Name", "Original_Specialty", "Alias_Clean"];

/// One row of the golden reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenEntry {
    pub bi_name: String,
    pub standard_name: String,
    pub specialty: String,
    /// Normalized-token join of `bi_name`; the unique dedup/lookup key.
    pub alias_clean: String,
}

/// The loaded reference with exact-lookup indexes. `alias_clean` is unique;
/// on conflict the last row in file order wins.
#[derive(Debug, Default)]
pub struct GoldenTable {
    entries: Vec<GoldenEntry>,
    by_bi_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl GoldenTable {
    pub fn from_entries(raw: Vec<GoldenEntry>) -> Self {
        // Last occurrence per alias_clean wins.
        let mut keep_for_alias: HashMap<&str, usize> = HashMap::new();
        for (idx, e) in raw.iter().enumerate() {
            keep_for_alias.insert(e.alias_clean.as_str(), idx);
        }
        let entries: Vec<GoldenEntry> = raw
            .iter()
            .enumerate()
            .filter(|(idx, e)| keep_for_alias.get(e.alias_clean.as_str()) == Some(idx))
            .map(|(_, e)| e.clone())
            .collect();

        let mut by_bi_name = HashMap::new();
        let mut by_alias = HashMap::new();
        for (idx, e) in entries.iter().enumerate() {
            by_bi_name.insert(e.bi_name.clone(), idx);
            by_alias.insert(e.alias_clean.clone(), idx);
        }
        GoldenTable {
            entries,
            by_bi_name,
            by_alias,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[GoldenEntry] {
        &self.entries
    }

    /// Exact lookup by raw `BI Name`.
    pub fn get_by_bi_name(&self, bi_name: &str) -> Option<&GoldenEntry> {
        self.by_bi_name.get(bi_name).map(|&i| &self.entries[i])
    }

    /// Exact lookup by normalized alias key.
    pub fn get_by_alias(&self, alias_clean: &str) -> Option<&GoldenEntry> {
        self.by_alias.get(alias_clean).map(|&i| &self.entries[i])
    }

    pub fn contains_bi_name(&self, bi_name: &str) -> bool {
        self.by_bi_name.contains_key(bi_name)
    }
}

/// Loads, merges and persists the golden reference.
pub struct GoldenRepository<'a> {
    normalizer: &'a Normalizer,
    base_dir: PathBuf,
}

/// Header text folded for synonym resolution: collapsed whitespace,
/// trimmed, lowercased, underscores as spaces.
fn fold_header(h: &str) -> String {
    h.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_lowercase()
        .replace('_', " ")
}

impl<'a> GoldenRepository<'a> {
    pub fn new(normalizer: &'a Normalizer, base_dir: impl Into<PathBuf>) -> Self {
        GoldenRepository {
            normalizer,
            base_dir: base_dir.into(),
        }
    }

    /// First existing candidate location under the base directory.
    pub fn discover(&self) -> Option<PathBuf> {
        discover_golden(&self.base_dir)
    }

    /// Load the golden table. With no path, auto-discovery runs; with an
    /// explicit path that does not exist, auto-discovery is tried before
    /// giving up. An explicitly-given file that cannot be parsed is an
    /// error; an absent or malformed auto-discovered reference degrades to
    /// an empty table with a warning.
    pub fn load(&self, path: Option<&Path>) -> Result<GoldenTable> {
        match path {
            Some(p) if p.exists() => self.read_table(p),
            Some(p) => {
                warn!(
                    target: TARGET_GOLDEN,
                    "golden reference not found at {}, trying auto-discovery", p.display()
                );
                self.load_discovered()
            }
            None => self.load_discovered(),
        }
    }

    fn load_discovered(&self) -> Result<GoldenTable> {
        let Some(found) = self.discover() else {
            warn!(target: TARGET_GOLDEN, "no golden reference found in any known location");
            return Ok(GoldenTable::default());
        };
        info!(target: TARGET_GOLDEN, "auto-detected golden reference: {}", found.display());
        match self.read_table(&found) {
            Ok(table) => Ok(table),
            Err(e) => {
                warn!(
                    target: TARGET_GOLDEN,
                    "unusable golden reference {}: {e:#}; continuing without one", found.display()
                );
                Ok(GoldenTable::default())
            }
        }
    }

    fn read_table(&self, path: &Path) -> Result<GoldenTable> {
        let sheet = tabular::read_sheet(path, None)
            .with_context(|| format!("failed to read golden reference {}", path.display()))?;
        let table = self.table_from_sheet(&sheet)?;
        info!(
            target: TARGET_GOLDEN,
            "loaded {} golden records from {}", table.len(), path.display()
        );
        Ok(table)
    }

    fn table_from_sheet(&self, sheet: &Sheet) -> Result<GoldenTable> {
        let mut bi_idx = None;
        let mut std_idx = None;
        let mut spec_idx = None;
        for (idx, header) in sheet.headers.iter().enumerate() {
            match fold_header(header).as_str() {
                "bi name" | "bi names" => bi_idx = Some(idx),
                "standard name" | "standard names" => std_idx = Some(idx),
                "original specialty" | "specialty" | "speciality" => spec_idx = Some(idx),
                _ => {}
            }
        }
        let (bi_idx, std_idx) = match (bi_idx, std_idx) {
            (Some(b), Some(s)) => (b, s),
            _ => {
                return Err(PipelineError::ReferenceSchema(
                    "'BI Name' and 'Standard_Name'".to_string(),
                )
                .into())
            }
        };

        let mut entries = Vec::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let bi_name = sheet.cell(row, bi_idx).to_string();
            let standard_name = sheet.cell(row, std_idx).to_string();
            if bi_name.is_empty() || standard_name.is_empty() {
                continue;
            }
            let specialty = spec_idx
                .map(|i| sheet.cell(row, i).to_string())
                .unwrap_or_default();
            let alias_clean = self.normalizer.clean_name(&bi_name, true);
            entries.push(GoldenEntry {
                bi_name,
                standard_name,
                specialty,
                alias_clean,
            });
        }
        Ok(GoldenTable::from_entries(entries))
    }

    /// Parse a reviewed file: csv, or the "Doctors" sheet of a workbook
    /// (falling back to the first sheet). Requires case-insensitive
    /// `BI Name` and `Standard_Name` headers; a specialty-like column is
    /// picked up by substring match on the header name.
    fn reviewed_entries(&self, path: &Path) -> Result<Vec<GoldenEntry>> {
        let sheet = tabular::read_sheet_or_first(path, "Doctors")
            .with_context(|| format!("failed to read reviewed file {}", path.display()))?;

        let lowered: Vec<String> = sheet
            .headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let bi_idx = lowered.iter().position(|h| h == "bi name");
        let std_idx = lowered.iter().position(|h| h == "standard_name");
        let (bi_idx, std_idx) = match (bi_idx, std_idx) {
            (Some(b), Some(s)) => (b, s),
            _ => {
                return Err(PipelineError::ReferenceSchema(
                    "'BI Name' and 'Standard_Name'".to_string(),
                )
                .into())
            }
        };
        let spec_idx = lowered.iter().position(|h| {
            h.contains("specialty") || h.contains("speciality") || h.contains("department")
        });

        let mut entries = Vec::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let bi_name = sheet.cell(row, bi_idx).to_string();
            let standard_name = sheet.cell(row, std_idx).to_string();
            if bi_name.is_empty() || standard_name.is_empty() {
                continue;
            }
            let specialty = spec_idx
                .map(|i| sheet.cell(row, i).to_string())
                .unwrap_or_default();
            let alias_clean = self.normalizer.clean_name(&bi_name, true);
            entries.push(GoldenEntry {
                bi_name,
                standard_name,
                specialty,
                alias_clean,
            });
        }
        Ok(entries)
    }

    /// Merge a reviewed file into the base golden table and persist the
    /// result. Reviewed rows are appended after base rows, so on an
    /// `Alias_Clean` conflict the reviewed data wins. Returns the path the
    /// merged table was written to (`out_path`, or `base_path`).
    pub fn update_from_review(
        &self,
        base_path: &Path,
        reviewed_path: &Path,
        out_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let base = self.load(Some(base_path))?;
        let reviewed = self.reviewed_entries(reviewed_path)?;
        info!(
            target: TARGET_GOLDEN,
            "merging {} reviewed rows into {} base rows", reviewed.len(), base.len()
        );

        let mut merged: Vec<GoldenEntry> = base.entries().to_vec();
        merged.extend(reviewed);
        merged.sort_by(|a, b| a.alias_clean.cmp(&b.alias_clean));
        // Sorted + stable: duplicates are adjacent and base precedes
        // reviewed within a key, so keeping the last of each run keeps the
        // reviewed row.
        let mut deduped: Vec<GoldenEntry> = Vec::with_capacity(merged.len());
        for entry in merged {
            if deduped
                .last()
                .map(|p| p.alias_clean == entry.alias_clean)
                .unwrap_or(false)
            {
                *deduped.last_mut().expect("non-empty") = entry;
            } else {
                deduped.push(entry);
            }
        }

        let target = out_path.unwrap_or(base_path).to_path_buf();
        self.save(&deduped, &target)?;
        info!(
            target: TARGET_GOLDEN,
            "golden reference updated: {} ({} records)", target.display(), deduped.len()
        );
        Ok(target)
    }

    /// Persist entries in the canonical four-column layout.
    pub fn save(&self, entries: &[GoldenEntry], path: &Path) -> Result<()> {
        let rows: Vec<Vec<Cell>> = entries
            .iter()
            .map(|e| {
                vec![
                    Cell::from(e.bi_name.as_str()),
                    Cell::from(e.standard_name.as_str()),
                    Cell::from(e.specialty.as_str()),
                    Cell::from(e.alias_clean.as_str()),
                ]
            })
            .collect();
        let sheet = OutSheet {
            name: "Golden".to_string(),
            headers: GOLDEN_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        };
        tabular::write_workbook(path, &[sheet])
    }
}

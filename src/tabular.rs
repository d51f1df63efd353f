//! Flat-file tabular I/O: xlsx and csv sheets in, workbooks out.
//!
//! Writers publish atomically: content goes to a sibling temp file which is
//! renamed over the target, so a failed run never leaves a half-written
//! output observable as success.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::error::PipelineError;
use crate::TARGET_IO;

/// An in-memory sheet: header row plus string rows, padded to header width.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Index of the first header equal to `name` after trimming.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Value at `idx` in `row`, empty for out-of-range. The returned slice
    /// borrows from `row`, not from the sheet.
    pub fn cell<'a>(&self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// A single typed cell for workbook output.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// One sheet of workbook output.
#[derive(Debug, Clone)]
pub struct OutSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn read_csv_sheet(path: &Path) -> Result<Sheet> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open csv file: {}", path.display()))?;
    let headers = reader
        .headers()
        .context("failed to read csv headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read csv row {}", idx + 1))?;
        rows.push(record.iter().map(|v| v.trim().to_string()).collect());
    }
    Ok(Sheet { headers, rows })
}

fn read_xlsx_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;
    let name = match sheet_name {
        Some(n) => n.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("workbook has no sheets: {}", path.display()))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("failed to read sheet '{}' of {}", name, path.display()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => Vec::new(),
    };
    let rows: Vec<Vec<String>> = rows_iter
        .map(|row| {
            let mut r: Vec<String> = row.iter().map(cell_to_string).collect();
            r.resize(headers.len().max(r.len()), String::new());
            r
        })
        .collect();
    Ok(Sheet { headers, rows })
}

/// Unreadable paths surface as [`PipelineError::Io`] so callers can tell
/// a missing/inaccessible file apart from a malformed one.
fn check_readable(path: &Path) -> Result<()> {
    fs::metadata(path)
        .map_err(PipelineError::Io)
        .with_context(|| format!("cannot access {}", path.display()))?;
    Ok(())
}

/// Read a tabular file; `.csv` goes through the csv reader, everything else
/// through calamine. `sheet_name = None` means the first sheet.
pub fn read_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    check_readable(path)?;
    let sheet = if is_csv(path) {
        read_csv_sheet(path)?
    } else {
        read_xlsx_sheet(path, sheet_name)?
    };
    debug!(
        target: TARGET_IO,
        "read {} rows x {} cols from {}",
        sheet.rows.len(),
        sheet.headers.len(),
        path.display()
    );
    Ok(sheet)
}

/// Read the named sheet, falling back to the first sheet when absent.
/// CSV files have a single implicit sheet.
pub fn read_sheet_or_first(path: &Path, preferred: &str) -> Result<Sheet> {
    check_readable(path)?;
    if is_csv(path) {
        return read_csv_sheet(path);
    }
    match read_xlsx_sheet(path, Some(preferred)) {
        Ok(sheet) => Ok(sheet),
        Err(_) => read_xlsx_sheet(path, None),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Write a multi-sheet workbook atomically. A `.csv` target takes the first
/// sheet only, as plain csv.
pub fn write_workbook(path: &Path, sheets: &[OutSheet]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_sibling(path);

    if is_csv(path) {
        let sheet = sheets
            .first()
            .ok_or_else(|| anyhow!("no sheets to write to {}", path.display()))?;
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        writer.write_record(&sheet.headers)?;
        for row in &sheet.rows {
            let record: Vec<String> = row
                .iter()
                .map(|c| match c {
                    Cell::Text(s) => s.clone(),
                    Cell::Number(n) => n.to_string(),
                    Cell::Bool(b) => b.to_string(),
                })
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
    } else {
        let mut workbook = Workbook::new();
        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|e| anyhow!("invalid sheet name '{}': {e}", sheet.name))?;
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string(0, col as u16, header)?;
            }
            for (row_idx, row) in sheet.rows.iter().enumerate() {
                for (col, cell) in row.iter().enumerate() {
                    let (r, c) = (row_idx as u32 + 1, col as u16);
                    match cell {
                        Cell::Text(s) => worksheet.write_string(r, c, s)?,
                        Cell::Number(n) => worksheet.write_number(r, c, *n)?,
                        Cell::Bool(b) => worksheet.write_boolean(r, c, *b)?,
                    };
                }
            }
        }
        workbook
            .save(&tmp)
            .with_context(|| format!("failed to write workbook {}", tmp.display()))?;
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("failed to publish {}", path.display()))?;
    debug!(target: TARGET_IO, "wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> OutSheet {
        OutSheet {
            name: "Doctors".to_string(),
            headers: vec!["BI Name".to_string(), "Score".to_string()],
            rows: vec![
                vec![Cell::from("Dr Ahmed"), Cell::Number(0.5)],
                vec![Cell::from("Dr Hassan"), Cell::Number(1.0)],
            ],
        }
    }

    #[test]
    fn xlsx_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_workbook(&path, &[sample_sheet()]).unwrap();

        let sheet = read_sheet(&path, None).unwrap();
        assert_eq!(sheet.headers, vec!["BI Name", "Score"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], "Dr Ahmed");
        // Integral floats read back without a trailing ".0".
        assert_eq!(sheet.rows[1][1], "1");
    }

    #[test]
    fn csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_workbook(&path, &[sample_sheet()]).unwrap();

        let sheet = read_sheet(&path, None).unwrap();
        assert_eq!(sheet.headers, vec!["BI Name", "Score"]);
        assert_eq!(sheet.rows[0][1], "0.5");
    }

    #[test]
    fn named_sheet_with_first_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_workbook(&path, &[sample_sheet()]).unwrap();

        let by_name = read_sheet_or_first(&path, "Doctors").unwrap();
        let fallback = read_sheet_or_first(&path, "NoSuchSheet").unwrap();
        assert_eq!(by_name.rows.len(), fallback.rows.len());
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_sheet(&dir.path().join("nope.xlsx"), None).unwrap_err();
        assert!(err
            .downcast_ref::<PipelineError>()
            .map(|e| matches!(e, PipelineError::Io(_)))
            .unwrap_or(false));

        let err = read_sheet_or_first(&dir.path().join("nope.csv"), "Doctors").unwrap_err();
        assert!(err
            .downcast_ref::<PipelineError>()
            .map(|e| matches!(e, PipelineError::Io(_)))
            .unwrap_or(false));
    }

    #[test]
    fn cell_lookup_borrows_from_the_row() {
        let sheet = Sheet {
            headers: vec!["BI Name".to_string()],
            rows: Vec::new(),
        };
        let row = vec!["Dr Ahmed".to_string()];
        let value = sheet.cell(&row, 0);
        assert_eq!(value, "Dr Ahmed");
        assert_eq!(sheet.cell(&row, 5), "");
        // The returned slice stays valid alongside later sheet borrows.
        assert!(sheet.column_index("BI Name").is_some());
        assert_eq!(value, "Dr Ahmed");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_workbook(&path, &[sample_sheet()]).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

use std::path::Path;

use medmatch::error::PipelineError;
use medmatch::pipeline::Pipeline;
use medmatch::tabular::{self, Cell, OutSheet};
use medmatch::types::ProcessRequest;

fn write_sheet(path: &Path, name: &str, headers: &[&str], rows: &[&[&str]]) {
    let sheet = OutSheet {
        name: name.to_string(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|v| Cell::from(*v)).collect())
            .collect(),
    };
    tabular::write_workbook(path, &[sheet]).unwrap();
}

fn doctors_column<'a>(
    sheet: &'a tabular::Sheet,
    name: &str,
) -> impl Iterator<Item = &'a str> + 'a {
    let idx = sheet.column_index(name).unwrap();
    sheet.rows.iter().map(move |row| sheet.cell(row, idx))
}

#[test]
fn process_without_reference_unifies_spelling_variants() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    write_sheet(
        &input,
        "Sheet1",
        &["BI Name", "Specialty"],
        &[
            &["Dr. Mohamed Aly", "cardio"],
            &["Mohamed Ali", "cardiology"],
            &["ENT Clinic Downtown", ""],
        ],
    );

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new().with_base_dir(dir.path());
    let stats = pipeline
        .process(&ProcessRequest::new(&input, &output))
        .unwrap();

    assert_eq!(stats.total_rows, 3);
    assert_eq!(stats.persons, 2);
    assert_eq!(stats.facilities, 1);
    assert_eq!(stats.golden_rows, 0);
    assert_eq!(stats.unique_before, 2);
    assert_eq!(stats.unique_after, 1);

    let doctors = tabular::read_sheet(&output, Some("Doctors")).unwrap();
    assert_eq!(doctors.rows.len(), 2);
    let standard: Vec<&str> = doctors_column(&doctors, "Standard_Name").collect();
    assert_eq!(standard, vec!["Mohamed Ali", "Mohamed Ali"]);
    let specialty: Vec<&str> = doctors_column(&doctors, "Specialty_Std").collect();
    assert_eq!(specialty, vec!["Cardiology", "Cardiology"]);
    let changed: Vec<&str> = doctors_column(&doctors, "Name_Changed").collect();
    assert_eq!(changed, vec!["true", "false"]);

    let facilities = tabular::read_sheet(&output, Some("Facilities")).unwrap();
    assert_eq!(facilities.rows.len(), 1);
    let idx = facilities.column_index("Standard_Name").unwrap();
    assert_eq!(facilities.cell(&facilities.rows[0], idx), "Ent Clinic Downtown");

    // Every person is unseen, so both land in the review export.
    let aliases_path = dir.path().join("Doctor_List_Final_Names.xlsx");
    let aliases = tabular::read_sheet(&aliases_path, None).unwrap();
    assert_eq!(aliases.rows.len(), 2);
    assert_eq!(stats.new_aliases, 2);
}

#[test]
fn process_matches_against_golden_reference() {
    let dir = tempfile::tempdir().unwrap();
    let golden = dir.path().join("golden.xlsx");
    write_sheet(
        &golden,
        "Golden",
        &["BI Name", "Standard_Name", "Original_Specialty"],
        &[&["Dr Ahmed Mohamed", "Ahmed Mohamed", "Cardiology"]],
    );

    let input = dir.path().join("input.xlsx");
    write_sheet(
        &input,
        "Sheet1",
        &["BI Name"],
        &[&["Dr Ahmed Mohamed"], &["Dr Hassan Ali"]],
    );

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new().with_base_dir(dir.path());
    let stats = pipeline
        .process(&ProcessRequest::new(&input, &output).with_golden(&golden))
        .unwrap();

    assert_eq!(stats.golden_rows, 1);
    assert_eq!(stats.golden_matches, 1);
    // Only the unseen name goes out for review.
    assert_eq!(stats.new_aliases, 1);

    let doctors = tabular::read_sheet(&output, Some("Doctors")).unwrap();
    let matched: Vec<&str> = doctors_column(&doctors, "Golden_Match").collect();
    assert_eq!(matched, vec!["Dr Ahmed Mohamed", ""]);
    let scores: Vec<&str> = doctors_column(&doctors, "Match_Score").collect();
    assert_eq!(scores, vec!["1", "0"]);
    let standard: Vec<&str> = doctors_column(&doctors, "Standard_Name").collect();
    assert_eq!(standard, vec!["Ahmed Mohamed", "Hassan Ali"]);
}

#[test]
fn mid_similarity_names_are_flagged_for_review() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    write_sheet(
        &input,
        "Sheet1",
        &["BI Name"],
        &[&["Ahmed Samir Tarek"], &["Ahmed Hamdy Tarek"]],
    );

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new().with_base_dir(dir.path());
    let stats = pipeline
        .process(&ProcessRequest::new(&input, &output))
        .unwrap();
    assert_eq!(stats.unsure, 2);
    assert_eq!(stats.merged, 0);

    let doctors = tabular::read_sheet(&output, Some("Doctors")).unwrap();
    let flags: Vec<&str> = doctors_column(&doctors, "Not_Sure").collect();
    assert_eq!(flags, vec!["Not Sure", "Not Sure"]);
}

#[test]
fn exact_only_mode_skips_clustering() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    write_sheet(
        &input,
        "Sheet1",
        &["BI Name"],
        &[&["Ahmed Mohamed Ali"], &["Ahmed Mohamed Mohamed Ali"]],
    );

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new()
        .with_base_dir(dir.path())
        .with_fuzzy_matching(false);
    let stats = pipeline
        .process(&ProcessRequest::new(&input, &output))
        .unwrap();
    assert_eq!(stats.merged, 0);
    assert_eq!(stats.unique_after, 2);
}

#[derive(Clone, Default)]
struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn exact_only_mode_warns_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    write_sheet(&input, "Sheet1", &["BI Name"], &[&["Dr Ahmed Mohamed"]]);

    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new()
        .with_base_dir(dir.path())
        .with_fuzzy_matching(false);
    tracing::subscriber::with_default(subscriber, || {
        pipeline
            .process(&ProcessRequest::new(&input, &output))
            .unwrap();
    });

    let log = buffer.contents();
    let warnings: Vec<&str> = log
        .lines()
        .filter(|l| l.contains("WARN") && l.contains("fuzzy matching unavailable"))
        .collect();
    assert_eq!(warnings.len(), 1, "log was:\n{log}");
}

#[test]
fn missing_bi_name_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    write_sheet(&input, "Sheet1", &["Name"], &[&["Dr Ahmed"]]);

    let output = dir.path().join("output.xlsx");
    let pipeline = Pipeline::new().with_base_dir(dir.path());
    let err = pipeline
        .process(&ProcessRequest::new(&input, &output))
        .unwrap_err();
    assert!(err
        .downcast_ref::<PipelineError>()
        .map(|e| matches!(e, PipelineError::InputSchema(_)))
        .unwrap_or(false));
}

#[test]
fn learn_then_process_resolves_the_reviewed_alias() {
    let dir = tempfile::tempdir().unwrap();
    let golden = dir.path().join("golden.xlsx");
    write_sheet(
        &golden,
        "Golden",
        &["BI Name", "Standard_Name"],
        &[&["Dr Ahmed Mohamed", "Ahmed Mohamed"]],
    );

    let reviewed = dir.path().join("reviewed.csv");
    std::fs::write(
        &reviewed,
        "BI Name,Standard_Name\nDr Hassan Aly,Hassan Ali\n",
    )
    .unwrap();

    let pipeline = Pipeline::new().with_base_dir(dir.path());
    pipeline.learn(&golden, &reviewed, None).unwrap();

    let input = dir.path().join("input.xlsx");
    write_sheet(&input, "Sheet1", &["BI Name"], &[&["Dr Hassan Aly"]]);
    let output = dir.path().join("output.xlsx");
    let stats = pipeline
        .process(&ProcessRequest::new(&input, &output).with_golden(&golden))
        .unwrap();
    assert_eq!(stats.golden_rows, 2);
    assert_eq!(stats.golden_matches, 1);

    let doctors = tabular::read_sheet(&output, Some("Doctors")).unwrap();
    let standard: Vec<&str> = doctors_column(&doctors, "Standard_Name").collect();
    assert_eq!(standard, vec!["Hassan Ali"]);
}

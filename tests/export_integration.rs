//! Template Export Integration Tests
//!
//! Drives the exporter and the full CSV → classify → group → export path
//! against small xlsx packages built on the fly.

mod common;

use common::{number, read_cells, sheet_names, sheet_xml, ss_co_rules, write_template};
use earthworm::dataset::{read_csv, LoadOptions};
use earthworm::{
    export_units, DisplayAttributes, DisplayTable, GroupingSettings, LithologyError,
    LithologyPipeline, LithologyUnit, Progress, TemplateExporter,
};
use std::fs;

fn units() -> Vec<LithologyUnit> {
    vec![
        LithologyUnit::new(0.0, 10.0, "SS", DisplayAttributes::default()).expect("unit"),
        LithologyUnit::new(10.0, 25.0, "CO", DisplayAttributes::default()).expect("unit"),
    ]
}

#[test]
fn template_is_left_unchanged_when_output_differs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);
    let before = fs::read(&template).expect("read template");

    export_units(&units(), &template, &output).expect("export");

    assert_eq!(fs::read(&template).expect("read template"), before);
    assert!(output.is_file());
    assert!(!dir.path().join(".out.xlsx.earthworm-tmp").exists());
}

#[test]
fn missing_lithology_sheet_is_created() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("Summary", sheet_xml("Well summary", &[]))]);

    let summary = export_units(&units(), &template, &output).expect("export");
    assert!(summary.sheet_created);
    assert_eq!(sheet_names(&output), vec!["Summary", "Lithology"]);

    let cells = read_cells(&output, "Lithology");
    assert_eq!(cells["L5"], "SS");
    assert_eq!(cells["L6"], "CO");
    assert_eq!(number(&cells, "D6"), 15.0);

    // The other sheet is carried over untouched.
    assert_eq!(read_cells(&output, "Summary")["A1"], "Well summary");
}

#[test]
fn merged_cells_are_skipped_and_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &["L6:M6"]))]);

    let summary = export_units(&units(), &template, &output).expect("export");
    assert_eq!(summary.merged_cells_skipped, 1);
    assert_eq!(summary.rows_written, 2);

    let cells = read_cells(&output, "Lithology");
    assert_eq!(cells["L5"], "SS");
    assert!(!cells.contains_key("L6"));
    assert_eq!(number(&cells, "B6"), 25.0);
}

#[test]
fn writing_onto_the_template_edits_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);

    let summary = export_units(&units(), &template, &template).expect("export");
    assert_eq!(summary.output_path, template);
    assert_eq!(read_cells(&template, "Lithology")["L5"], "SS");
}

#[test]
fn missing_template_is_reported_with_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("absent.xlsx");
    let output = dir.path().join("out.xlsx");

    let err = export_units(&units(), &template, &output).unwrap_err();
    assert!(matches!(err, LithologyError::MissingFile { .. }));
    assert!(err.to_string().contains("absent.xlsx"));
    assert!(!output.exists());
}

#[test]
fn missing_output_directory_is_created() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out").join("report.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);

    let summary = export_units(&units(), &template, &output).expect("export");
    assert_eq!(summary.rows_written, 2);
    assert_eq!(read_cells(&output, "Lithology")["L6"], "CO");
}

#[test]
fn sheet_name_match_ignores_case() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("lithology", sheet_xml("Header", &[]))]);

    let summary = export_units(&units(), &template, &output).expect("export");
    assert!(!summary.sheet_created);
    assert_eq!(sheet_names(&output), vec!["lithology"]);
    assert_eq!(read_cells(&output, "lithology")["L5"], "SS");
}

#[test]
fn failed_save_removes_the_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);
    let before = fs::read(&template).expect("read template");

    // A directory where the save writes its temporary file.
    fs::create_dir(dir.path().join(".out.xlsx.earthworm-tmp")).expect("block temp path");

    let err = export_units(&units(), &template, &output).unwrap_err();
    assert!(matches!(err, LithologyError::Write { ref path, .. } if *path == output), "{err}");
    assert!(!output.exists(), "partial output left behind");
    assert_eq!(fs::read(&template).expect("read template"), before);
}

#[test]
fn progress_reports_each_unit_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);

    let mut messages = Vec::new();
    let mut cb = |m: &str| messages.push(m.to_string());
    TemplateExporter::default()
        .export(&units(), &template, &output, &mut Progress::new(&mut cb))
        .expect("export");

    let unit_lines: Vec<&String> = messages.iter().filter(|m| m.starts_with("Unit ")).collect();
    assert_eq!(unit_lines.len(), 2);
    assert!(unit_lines[0].starts_with("Unit 1/2: SS"));
    assert!(unit_lines[1].starts_with("Unit 2/2: CO"));
}

#[test]
fn rows_past_the_written_units_are_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("out.xlsx");
    let xml = sheet_xml("Header", &[]).replace(
        "</sheetData>",
        r#"<row r="9"><c r="A9"><v>777</v></c><c r="L9" t="inlineStr"><is><t>old</t></is></c></row></sheetData>"#,
    );
    write_template(&template, &[("Lithology", xml)]);

    let summary = export_units(&units(), &template, &output).expect("export");
    assert_eq!(summary.rows_written, 2);

    let cells = read_cells(&output, "Lithology");
    assert_eq!(cells["L6"], "CO");
    assert!(!cells.keys().any(|k| k.ends_with('7') || k.ends_with('8')));
    assert_eq!(number(&cells, "A9"), 777.0);
    assert_eq!(cells["L9"], "old");
    assert_eq!(number(&cells, "A3"), 42.0);
}

#[test]
fn csv_through_pipeline_to_workbook() {
    let csv = "\
DEPT,GR,RHOB,LITH
99.5,20,2.4,SS
100.0,15,2.45,SS
100.5,90,1.5,CO
101.0,95,-999.25,CO
101.5,30,2.5,SS
";
    let options = LoadOptions {
        reference_column: Some("LITH".into()),
        dataset: earthworm::DatasetOptions {
            casing_depth: Some(99.5),
            ..Default::default()
        },
        ..Default::default()
    };
    let dataset = read_csv(csv.as_bytes(), &options).expect("load");
    assert_eq!(dataset.len(), 4, "casing-depth sample dropped");

    let display = DisplayTable::new().with(
        "CO",
        DisplayAttributes {
            colour: Some("black".into()),
            ..Default::default()
        },
    );
    let pipeline = LithologyPipeline::new(
        ss_co_rules(),
        display,
        GroupingSettings {
            sample_spacing: Some(0.5),
            merge_threshold: None,
        },
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("well.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Header", &[]))]);

    let mut messages = Vec::new();
    let mut cb = |m: &str| messages.push(m.to_string());
    let (result, summary) = pipeline
        .run_and_export(&dataset, &template, &output, &mut Progress::new(&mut cb))
        .expect("pipeline");

    assert_eq!(result.classified.labels(), ["SS", "CO", "CO", "SS"]);
    assert_eq!(result.units.len(), 3);
    assert_eq!(summary.rows_written, 3);
    assert!(messages.iter().any(|m| m.starts_with("Classifying rule 1/2")));

    let cells = read_cells(&output, "Lithology");
    assert_eq!(number(&cells, "A5"), 100.0);
    assert_eq!(number(&cells, "B5"), 100.5);
    assert_eq!(cells["L6"], "CO");
    assert_eq!(cells["P6"], "black");
    assert_eq!(number(&cells, "B7"), 102.0);
}

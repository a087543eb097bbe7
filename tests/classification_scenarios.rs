//! Classification Scenario Tests
//!
//! End-to-end checks of the engine's headline behaviours: first-match
//! labelling, gap analysis over an observed range, fixed-column export into
//! a template, and fail-fast configuration errors.

mod common;

use common::{gr_dataset, number, read_cells, sheet_xml, ss_co_rules, write_template};
use earthworm::types::ObservedRange;
use earthworm::{
    classify, export_units, Classifier, DisplayAttributes, LithologyError, LithologyRule,
    LithologyUnit, Progress, RangeBound, RangeGapAnalyzer, RangeRuleSet,
};
use std::collections::HashMap;

// ============================================================================
// Classification
// ============================================================================

#[test]
fn gr_rules_label_sandstone_coal_sandstone() {
    let dataset = gr_dataset(100.0, 0.5, &[10.0, 85.0, 40.0]);
    let labels = classify(&dataset, &ss_co_rules()).expect("classify");
    assert_eq!(labels, vec!["SS", "CO", "SS"]);
}

#[test]
fn boundary_value_goes_to_first_matching_rule() {
    // GR = 80 satisfies both closed ranges; SS is listed first.
    let dataset = gr_dataset(0.0, 1.0, &[80.0]);
    let labels = classify(&dataset, &ss_co_rules()).expect("classify");
    assert_eq!(labels, vec!["SS"]);
}

#[test]
fn unmatched_and_missing_values_are_unknown() {
    let schema = earthworm::Schema::new(["GR"]).expect("schema");
    let samples = vec![
        earthworm::Sample::new(1.0, vec![Some(-5.0)]),
        earthworm::Sample::new(2.0, vec![None]),
        earthworm::Sample::new(3.0, vec![Some(f64::NAN)]),
    ];
    let dataset =
        earthworm::Dataset::new(schema, samples, earthworm::DatasetOptions::default()).expect("dataset");
    let labels = classify(&dataset, &ss_co_rules()).expect("classify");
    assert_eq!(labels, vec!["Unknown", "Unknown", "Unknown"]);
}

#[test]
fn unknown_parameter_fails_before_any_row_is_scanned() {
    let rules = RangeRuleSet::new(vec![
        LithologyRule::new("SS").with_bound("GR", RangeBound::finite(0.0, 80.0).expect("bound")),
        LithologyRule::new("ZZ").with_bound("XYZ", RangeBound::at_most(1.0).expect("bound")),
    ])
    .expect("rules");
    let dataset = gr_dataset(0.0, 1.0, &[10.0, 20.0]);

    let mut seen = Vec::new();
    let mut cb = |m: &str| seen.push(m.to_string());
    let err = Classifier::classify(&dataset, &rules, &mut Progress::new(&mut cb)).unwrap_err();

    assert!(err.is_configuration(), "{err}");
    let msg = err.to_string();
    assert!(msg.contains("XYZ"), "error should name the parameter: {msg}");
    assert!(msg.contains("ZZ"), "error should name the rule: {msg}");
    assert!(seen.is_empty(), "no rule should have started: {seen:?}");
}

#[test]
fn empty_rule_set_is_a_configuration_error() {
    let rules = RangeRuleSet::new(Vec::new()).expect("empty set constructs");
    let err = classify(&gr_dataset(0.0, 1.0, &[1.0]), &rules).unwrap_err();
    assert!(matches!(err, LithologyError::Configuration(_)));
}

// ============================================================================
// Gap analysis
// ============================================================================

#[test]
fn gr_rules_cover_observed_range_without_gaps() {
    let observed = HashMap::from([("GR".to_string(), ObservedRange::new(0.0, 100.0))]);
    let report = RangeGapAnalyzer::analyze(&ss_co_rules(), &["GR"], &observed).expect("analyze");

    let gr = report.get("GR").expect("GR coverage");
    assert!(gr.gaps.is_empty(), "unexpected gaps: {:?}", gr.gaps);
    assert_eq!(gr.covered, vec![(0.0, 100.0)]);
    assert_eq!(report.total_gaps(), 0);
}

#[test]
fn gap_between_rules_is_reported() {
    let rules = RangeRuleSet::new(vec![
        LithologyRule::new("SS").with_bound("GR", RangeBound::finite(0.0, 60.0).expect("bound")),
        LithologyRule::new("CO").with_bound("GR", RangeBound::at_least(80.0).expect("bound")),
    ])
    .expect("rules");
    let observed = HashMap::from([("GR".to_string(), ObservedRange::new(0.0, 100.0))]);
    let report = RangeGapAnalyzer::analyze(&rules, &["GR"], &observed).expect("analyze");
    assert_eq!(report.get("GR").expect("GR").gaps, vec![(60.0, 80.0)]);
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn two_units_land_in_rows_five_and_six() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("well.xlsx");
    write_template(&template, &[("Lithology", sheet_xml("Lithology log", &[]))]);

    let coal = DisplayAttributes {
        shade: Some("dark".into()),
        hue: Some("grey".into()),
        colour: Some("black".into()),
        ..Default::default()
    };
    let units = vec![
        LithologyUnit::new(0.0, 10.0, "SS", DisplayAttributes::default()).expect("unit"),
        LithologyUnit::new(10.0, 25.0, "CO", coal).expect("unit"),
    ];

    let summary = export_units(&units, &template, &output).expect("export");
    assert_eq!(summary.rows_written, 2);
    assert!(!summary.sheet_created);

    let cells = read_cells(&output, "Lithology");
    assert_eq!(number(&cells, "A5"), 0.0);
    assert_eq!(number(&cells, "B5"), 10.0);
    assert_eq!(number(&cells, "D5"), 10.0);
    assert_eq!(cells["L5"], "SS");
    assert_eq!(number(&cells, "A6"), 10.0);
    assert_eq!(number(&cells, "B6"), 25.0);
    assert_eq!(number(&cells, "D6"), 15.0);
    assert_eq!(cells["L6"], "CO");
    assert_eq!(cells["N6"], "dark");
    assert_eq!(cells["O6"], "grey");
    assert_eq!(cells["P6"], "black");

    // Absent display attributes leave their columns empty.
    assert!(!cells.contains_key("N5"));
    // Pre-existing template content survives.
    assert_eq!(cells["A1"], "Lithology log");
    assert_eq!(number(&cells, "A3"), 42.0);
}

//! Engine Property Tests
//!
//! Invariants that must hold for any input: deterministic classification,
//! first-match ordering, gap/coverage reconstruction, unit tiling, and
//! contingency rows summing to one.

mod common;

use common::{gr_dataset, ss_co_rules};
use earthworm::types::ObservedRange;
use earthworm::{
    classify, coalesce_units, merge_thin_units, Classifier, ClassifiedDataset, Comparator, Dataset,
    DatasetOptions, DisplayTable, LithologyRule, Progress, RangeBound, RangeGapAnalyzer,
    RangeRuleSet, Sample, Schema, UnitGrouper,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn two_param_dataset(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = (0..n)
        .map(|i| {
            let gr = rng.gen_range(0.0..150.0);
            let rhob = rng.gen_range(1.2..2.9);
            Sample::new(500.0 + i as f64 * 0.1, vec![Some(gr), Some(rhob)])
        })
        .collect();
    Dataset::new(Schema::new(["GR", "RHOB"]).expect("schema"), samples, DatasetOptions::default())
        .expect("dataset")
}

fn rule(label: &str, bounds: &[(&str, RangeBound)]) -> LithologyRule {
    bounds
        .iter()
        .fold(LithologyRule::new(label), |r, (p, b)| r.with_bound(*p, *b))
}

fn bound(low: f64, high: f64) -> RangeBound {
    RangeBound::finite(low, high).expect("bound")
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn classification_is_deterministic() {
    let dataset = two_param_dataset(400, 7);
    let rules = RangeRuleSet::new(vec![
        rule("CO", &[("RHOB", RangeBound::at_most(1.8).expect("bound"))]),
        rule("SS", &[("GR", bound(0.0, 75.0))]),
        rule("MS", &[("GR", RangeBound::at_least(75.0).expect("bound"))]),
    ])
    .expect("rules");

    let first = classify(&dataset, &rules).expect("classify");
    for _ in 0..3 {
        assert_eq!(classify(&dataset, &rules).expect("classify"), first);
    }
}

#[test]
fn reordering_disjoint_rules_changes_nothing() {
    let dataset = two_param_dataset(300, 11);
    let a = rule("SS", &[("GR", bound(0.0, 50.0))]);
    let b = rule("MS", &[("GR", bound(60.0, 120.0))]);

    let forward = RangeRuleSet::new(vec![a.clone(), b.clone()]).expect("rules");
    let reversed = RangeRuleSet::new(vec![b, a]).expect("rules");
    assert_eq!(
        classify(&dataset, &forward).expect("classify"),
        classify(&dataset, &reversed).expect("classify")
    );
}

#[test]
fn overlap_goes_to_whichever_rule_is_listed_first() {
    let dataset = two_param_dataset(300, 13);
    let gr = earthworm::ParameterId(0);
    let a = rule("SS", &[("GR", bound(0.0, 80.0))]);
    let b = rule("SH", &[("GR", bound(60.0, 150.0))]);

    let ab = classify(&dataset, &RangeRuleSet::new(vec![a.clone(), b.clone()]).expect("rules"))
        .expect("classify");
    let ba = classify(&dataset, &RangeRuleSet::new(vec![b, a]).expect("rules")).expect("classify");

    for ((sample, x), y) in dataset.samples().iter().zip(&ab).zip(&ba) {
        let v = sample.value(gr).expect("GR present");
        if (60.0..=80.0).contains(&v) {
            assert_eq!(x, "SS", "GR={v}");
            assert_eq!(y, "SH", "GR={v}");
        } else {
            assert_eq!(x, y, "GR={v} is outside the overlap");
        }
    }
}

#[test]
fn rule_without_bounds_matches_nothing() {
    let dataset = gr_dataset(0.0, 1.0, &[1.0, 50.0, 99.0]);
    let rules = RangeRuleSet::new(vec![
        LithologyRule::new("ANY"),
        rule("SS", &[("GR", bound(0.0, 60.0))]),
    ])
    .expect("rules");
    assert_eq!(classify(&dataset, &rules).expect("classify"), vec!["SS", "SS", "Unknown"]);
}

// ============================================================================
// Gap analysis
// ============================================================================

#[test]
fn gaps_and_coverage_reconstruct_observed_range() {
    let rules = RangeRuleSet::new(vec![
        rule("A", &[("GR", bound(10.0, 30.0))]),
        rule("B", &[("GR", bound(25.0, 40.0))]),
        rule("C", &[("GR", bound(55.0, 70.0))]),
        rule("D", &[("GR", RangeBound::at_least(90.0).expect("bound"))]),
    ])
    .expect("rules");
    let observed = ObservedRange::new(0.0, 100.0);
    let coverage = RangeGapAnalyzer::analyze_parameter(&rules, "GR", observed);

    let mut pieces: Vec<(f64, f64)> = coverage.covered.iter().chain(&coverage.gaps).copied().collect();
    pieces.sort_by(|a, b| a.0.total_cmp(&b.0));

    assert_eq!(pieces.first().map(|p| p.0), Some(0.0));
    assert_eq!(pieces.last().map(|p| p.1), Some(100.0));
    for pair in pieces.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "pieces must abut: {pieces:?}");
    }
    assert_eq!(coverage.gaps, vec![(0.0, 10.0), (40.0, 55.0), (70.0, 90.0)]);
    assert_eq!(coverage.overlaps.len(), 1);
    assert_eq!(coverage.overlaps[0].labels, vec!["A", "B"]);
}

#[test]
fn merging_intervals_with_themselves_is_idempotent() {
    let mut intervals = vec![(0.0, 5.0), (3.0, 8.0), (12.0, 20.0), (20.0, 21.0)];
    let once = earthworm::gaps::merge_intervals(intervals.clone());
    intervals.extend(intervals.clone());
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    assert_eq!(earthworm::gaps::merge_intervals(intervals), once);
    assert_eq!(once, vec![(0.0, 8.0), (12.0, 21.0)]);
}

#[test]
fn missing_observed_range_is_a_configuration_error() {
    let err = RangeGapAnalyzer::analyze(&ss_co_rules(), &["GR"], &HashMap::new()).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("GR"));
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn units_tile_the_logged_interval() {
    let dataset = two_param_dataset(250, 21);
    let rules = RangeRuleSet::new(vec![
        rule("SS", &[("GR", bound(0.0, 60.0))]),
        rule("SH", &[("GR", bound(60.0, 150.0))]),
    ])
    .expect("rules");
    let classified =
        Classifier::classify_dataset(&dataset, &rules, &mut Progress::silent()).expect("classify");
    let units = UnitGrouper::group(&classified, &DisplayTable::new(), Some(0.1)).expect("group");

    let first = dataset.samples().first().expect("samples").depth;
    let last = dataset.samples().last().expect("samples").depth;
    assert_eq!(units.first().expect("units").from_depth(), first);
    assert!((units.last().expect("units").to_depth() - (last + 0.1)).abs() < 1e-9);
    for pair in units.windows(2) {
        assert_eq!(pair[0].to_depth(), pair[1].from_depth());
        assert_ne!(pair[0].lithology(), pair[1].lithology());
    }

    let total: f64 = units.iter().map(|u| u.thickness()).sum();
    assert!((total - (last + 0.1 - first)).abs() < 1e-6);
}

#[test]
fn regrouping_units_by_their_own_labels_is_idempotent() {
    let dataset = two_param_dataset(120, 5);
    let rules = RangeRuleSet::new(vec![
        rule("SS", &[("GR", bound(0.0, 70.0))]),
        rule("SH", &[("GR", bound(70.0, 150.0))]),
    ])
    .expect("rules");
    let classified =
        Classifier::classify_dataset(&dataset, &rules, &mut Progress::silent()).expect("classify");
    let units = UnitGrouper::group(&classified, &DisplayTable::new(), Some(0.1)).expect("group");

    let end = units.last().expect("units").to_depth();
    let regrouped = UnitGrouper::group_records(
        units.iter().map(|u| (u.from_depth(), u.lithology())),
        &DisplayTable::new(),
        Some(end - units.last().expect("units").from_depth()),
    )
    .expect("regroup");
    assert_eq!(regrouped.len(), units.len());
    for (a, b) in regrouped.iter().zip(&units) {
        assert_eq!(a.lithology(), b.lithology());
        assert_eq!(a.from_depth(), b.from_depth());
        assert!((a.to_depth() - b.to_depth()).abs() < 1e-9);
    }
    assert_eq!(coalesce_units(&units).expect("coalesce"), units);
}

#[test]
fn unsorted_depths_name_the_offending_row() {
    let records = [(10.0, "SS"), (10.5, "SS"), (10.2, "CO")];
    let err = UnitGrouper::group_records(records, &DisplayTable::new(), Some(0.5)).unwrap_err();
    match err {
        earthworm::LithologyError::DataOrdering { row, previous, depth } => {
            assert_eq!(row, 2);
            assert_eq!(previous, 10.5);
            assert_eq!(depth, 10.2);
        }
        other => panic!("expected DataOrdering, got {other}"),
    }
}

#[test]
fn thin_merge_never_rewrites_lithology() {
    // SS [0,1) CO [1,1.02) SS [1.02,3) SH [3,3.01) SS [3.01,4.01)
    let records = [
        (0.0, "SS"),
        (1.0, "CO"),
        (1.02, "SS"),
        (3.0, "SH"),
        (3.01, "SS"),
    ];
    let units = UnitGrouper::group_records(records, &DisplayTable::new(), Some(1.0)).expect("group");
    let merged = merge_thin_units(&units, 0.05).expect("merge");

    let labels: Vec<&str> = merged.iter().map(|u| u.lithology()).collect();
    assert_eq!(labels, vec!["SS", "CO", "SS", "SH", "SS"]);
    for pair in merged.windows(2) {
        assert_eq!(pair[0].to_depth(), pair[1].from_depth());
    }
    assert_eq!(merged.first().map(|u| u.from_depth()), Some(0.0));
    assert!((merged.last().expect("units").to_depth() - 4.01).abs() < 1e-9);
}

#[test]
fn thin_merge_keeps_every_sample_label() {
    let dataset = two_param_dataset(300, 31);
    let rules = RangeRuleSet::new(vec![
        rule("CO", &[("RHOB", RangeBound::at_most(1.6).expect("bound"))]),
        rule("SS", &[("GR", bound(0.0, 70.0))]),
        rule("SH", &[("GR", bound(70.0, 150.0))]),
    ])
    .expect("rules");
    let classified =
        Classifier::classify_dataset(&dataset, &rules, &mut Progress::silent()).expect("classify");
    let units = UnitGrouper::group(&classified, &DisplayTable::new(), Some(0.1)).expect("group");
    let merged = merge_thin_units(&units, 0.15).expect("merge");

    for (sample, label) in classified.iter() {
        let unit = merged
            .iter()
            .find(|u| u.from_depth() <= sample.depth && sample.depth < u.to_depth())
            .expect("every sample lies in a unit");
        assert_eq!(unit.lithology(), label, "depth {}", sample.depth);
    }
}

// ============================================================================
// Comparator
// ============================================================================

#[test]
fn contingency_rows_sum_to_one() {
    let mut rng = StdRng::seed_from_u64(99);
    let refs = ["SS", "SH", "CO"];
    let samples: Vec<Sample> = (0..200)
        .map(|i| {
            let gr = rng.gen_range(0.0..150.0);
            let reference = refs[rng.gen_range(0..refs.len())];
            let s = Sample::new(i as f64 * 0.1, vec![Some(gr)]);
            if i % 17 == 0 {
                s
            } else {
                s.with_reference(reference)
            }
        })
        .collect();
    let dataset =
        Dataset::new(Schema::new(["GR"]).expect("schema"), samples, DatasetOptions::default())
            .expect("dataset");
    let labels = classify(&dataset, &ss_co_rules()).expect("classify");
    let classified = ClassifiedDataset::new(&dataset, labels).expect("classified");

    let comparison = Comparator::compare(&classified);
    assert_eq!(comparison.excluded, 12);
    assert_eq!(comparison.compared, 188);
    for (r, row) in comparison.table.proportions.iter().enumerate() {
        if comparison.table.row_total(r) > 0 {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row {r} sums to {sum}");
        }
    }
    let chi = comparison.chi_square.expect("3xN table has a chi-square test");
    assert!((0.0..=1.0).contains(&chi.p_value));
}

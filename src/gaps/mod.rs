//! Range Gap Analysis
//!
//! For each requested parameter, collects the interval every rule claims
//! (open sides clipped to the observed extent), merges them, and reports the
//! uncovered remainder of the observed range. Sub-ranges claimed by more
//! than one rule are reported as overlaps, since those are where rule order
//! decides the label.
//!
//! Pure interval arithmetic: an interval ending exactly where the next one
//! starts is contiguous, so it leaves no gap.

use crate::error::{LithologyError, Result};
use crate::types::{
    Dataset, GapReport, ObservedRange, Overlap, ParameterCoverage, RangeRuleSet, RuleInterval,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Observed min/max per parameter. Parameters with no finite value are
/// absent from the map.
pub fn observed_ranges(dataset: &Dataset) -> HashMap<String, ObservedRange> {
    let schema = dataset.schema();
    let mut ranges = HashMap::with_capacity(schema.len());
    for (i, name) in schema.names().iter().enumerate() {
        let id = crate::types::ParameterId(i);
        let extent = dataset.column(id).flatten().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        });
        if let Some((min, max)) = extent {
            ranges.insert(name.clone(), ObservedRange::new(min, max));
        }
    }
    ranges
}

/// Gap and overlap analyzer
pub struct RangeGapAnalyzer;

impl RangeGapAnalyzer {
    /// Analyze coverage of `parameters` by `rules`.
    ///
    /// # Arguments
    /// * `rules` - Rule set; must not be empty
    /// * `parameters` - Parameters to report, in output order
    /// * `observed` - Observed extent per parameter
    ///
    /// Fails with a configuration error if the rule set is empty or a
    /// requested parameter has no observed range.
    pub fn analyze(
        rules: &RangeRuleSet,
        parameters: &[&str],
        observed: &HashMap<String, ObservedRange>,
    ) -> Result<GapReport> {
        rules.ensure_not_empty()?;
        let mut report = GapReport::default();
        for &parameter in parameters {
            let range = observed.get(parameter).ok_or_else(|| {
                LithologyError::Configuration(format!(
                    "no observed range for parameter '{parameter}'"
                ))
            })?;
            let coverage = Self::analyze_parameter(rules, parameter, *range);
            debug!(
                parameter,
                intervals = coverage.intervals.len(),
                gaps = coverage.gaps.len(),
                overlaps = coverage.overlaps.len(),
                "Parameter coverage"
            );
            report.parameters.push(coverage);
        }
        info!(
            parameters = report.parameters.len(),
            gaps = report.total_gaps(),
            "Gap analysis complete"
        );
        Ok(report)
    }

    /// Analyze every rule-referenced parameter the dataset has values for.
    pub fn analyze_dataset(rules: &RangeRuleSet, dataset: &Dataset) -> Result<GapReport> {
        let observed = observed_ranges(dataset);
        let parameters: Vec<&str> = rules
            .parameters()
            .into_iter()
            .filter(|p| observed.contains_key(*p))
            .collect();
        Self::analyze(rules, &parameters, &observed)
    }

    /// Coverage of one parameter.
    pub fn analyze_parameter(
        rules: &RangeRuleSet,
        parameter: &str,
        observed: ObservedRange,
    ) -> ParameterCoverage {
        let mut intervals: Vec<RuleInterval> = rules
            .rules()
            .iter()
            .filter_map(|rule| {
                let (start, end) = rule.bound(parameter)?.clip(observed.min, observed.max)?;
                Some(RuleInterval {
                    label: rule.label().to_string(),
                    start,
                    end,
                })
            })
            .collect();
        intervals.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let covered = merge_intervals(intervals.iter().map(|i| (i.start, i.end)));
        let gaps = if intervals.is_empty() {
            vec![(observed.min, observed.max)]
        } else {
            complement(&covered, observed.min, observed.max)
        };
        let overlaps = find_overlaps(&intervals);

        ParameterCoverage {
            parameter: parameter.to_string(),
            observed,
            intervals,
            covered,
            gaps,
            overlaps,
        }
    }
}

// ============================================================================
// Interval arithmetic
// ============================================================================

/// Merge intervals already sorted by (start, end). Touching intervals merge.
pub fn merge_intervals(sorted: impl IntoIterator<Item = (f64, f64)>) -> Vec<(f64, f64)> {
    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Uncovered sub-intervals of `[min, max]`, each of positive width.
pub fn complement(covered: &[(f64, f64)], min: f64, max: f64) -> Vec<(f64, f64)> {
    let mut gaps = Vec::new();
    let mut cursor = min;
    for &(start, end) in covered {
        if start > cursor {
            gaps.push((cursor, start.min(max)));
        }
        cursor = cursor.max(end);
    }
    if max > cursor {
        gaps.push((cursor, max));
    }
    gaps
}

/// Sub-ranges of positive width claimed by two or more intervals.
/// Adjacent pieces with the same claimants are joined.
fn find_overlaps(intervals: &[RuleInterval]) -> Vec<Overlap> {
    let mut points: Vec<f64> = intervals.iter().flat_map(|i| [i.start, i.end]).collect();
    points.sort_by(f64::total_cmp);
    points.dedup();

    let mut overlaps: Vec<Overlap> = Vec::new();
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let labels: Vec<String> = intervals
            .iter()
            .filter(|i| i.start <= a && i.end >= b)
            .map(|i| i.label.clone())
            .collect();
        if labels.len() < 2 {
            continue;
        }
        match overlaps.last_mut() {
            Some(last) if last.end == a && last.labels == labels => last.end = b,
            _ => overlaps.push(Overlap {
                start: a,
                end: b,
                labels,
            }),
        }
    }
    overlaps
}

//! Read-only analysis outputs: gap coverage and per-group statistics

use serde::Serialize;
use std::collections::BTreeMap;

/// Observed min/max of one parameter over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservedRange {
    pub min: f64,
    pub max: f64,
}

impl ObservedRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// A rule-derived interval, clipped to the observed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInterval {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

/// A sub-range claimed by more than one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub start: f64,
    pub end: f64,
    pub labels: Vec<String>,
}

/// Coverage of one parameter by the rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterCoverage {
    pub parameter: String,
    pub observed: ObservedRange,
    /// Contributing intervals, sorted by (start, end).
    pub intervals: Vec<RuleInterval>,
    /// Merged coverage within the observed range.
    pub covered: Vec<(f64, f64)>,
    /// Uncovered sub-intervals within the observed range.
    pub gaps: Vec<(f64, f64)>,
    pub overlaps: Vec<Overlap>,
}

impl ParameterCoverage {
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// One-line human-readable gap summary.
    pub fn gap_summary(&self) -> String {
        match self.gaps.as_slice() {
            [] => "No gaps found - full coverage".to_string(),
            [(a, b)] => format!("Gap: {a:.1} - {b:.1}"),
            gaps => {
                let parts: Vec<String> =
                    gaps.iter().map(|(a, b)| format!("{a:.1}-{b:.1}")).collect();
                format!("Gaps: {}", parts.join(", "))
            }
        }
    }

    /// One-line human-readable overlap summary.
    pub fn overlap_summary(&self) -> String {
        if self.overlaps.is_empty() {
            return "No overlapping ranges found".to_string();
        }
        let parts: Vec<String> = self
            .overlaps
            .iter()
            .map(|o| format!("{} ({:.1}-{:.1})", o.labels.join("/"), o.start, o.end))
            .collect();
        format!("Overlapping lithologies: {}", parts.join(", "))
    }
}

/// Gap analysis result, keyed by parameter in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapReport {
    pub parameters: Vec<ParameterCoverage>,
}

impl GapReport {
    pub fn get(&self, parameter: &str) -> Option<&ParameterCoverage> {
        self.parameters.iter().find(|p| p.parameter == parameter)
    }

    pub fn total_gaps(&self) -> usize {
        self.parameters.iter().map(|p| p.gaps.len()).sum()
    }
}

/// Descriptive statistics of one parameter within one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Statistics for one (reference label, qualifier) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub reference_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub sample_count: usize,
    /// Parameters with at least one finite value in the group.
    pub parameters: BTreeMap<String, ParameterStats>,
}

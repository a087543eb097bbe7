//! Density-then-gamma classification.
//!
//! A coarser alternative to first-match that looks at one curve at a time:
//!
//! ```text
//! PASS 1: density  rules in order, only unlabelled samples are claimed
//! PASS 2: gamma    rules in order, every matching sample is relabelled
//! ```
//!
//! Gamma therefore has the final say wherever any gamma bound matches, and
//! among gamma bounds the last matching rule wins. Other parameters in the
//! rules are ignored.

use crate::error::{LithologyError, Result};
use crate::progress::Progress;
use crate::types::{LithologyRule, ParameterId, RangeBound, RangeRuleSet, Schema, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Curves the two passes read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoPassCurves {
    pub gamma: String,
    pub density: String,
}

impl Default for TwoPassCurves {
    fn default() -> Self {
        Self {
            gamma: "GR".to_string(),
            density: "RHOB".to_string(),
        }
    }
}

/// The rule's bound on `parameter`, if at least one side is finite.
fn constraining_bound(rule: &LithologyRule, parameter: &str) -> Option<RangeBound> {
    rule.bound(parameter)
        .filter(|b| b.low().is_finite() || b.high().is_finite())
        .copied()
}

fn curve_id(schema: &Schema, name: &str, role: &str) -> Result<ParameterId> {
    schema.id(name).ok_or_else(|| {
        LithologyError::Configuration(format!(
            "two-pass classification needs {role} curve '{name}' which is not in the dataset (available: {})",
            schema.names().join(", ")
        ))
    })
}

pub(super) fn classify(
    dataset: &crate::types::Dataset,
    rules: &RangeRuleSet,
    curves: &TwoPassCurves,
    progress: &mut Progress<'_>,
) -> Result<Vec<String>> {
    rules.ensure_not_empty()?;
    let schema = dataset.schema();
    let density = curve_id(schema, &curves.density, "density")?;
    let gamma = curve_id(schema, &curves.gamma, "gamma")?;

    let samples = dataset.samples();
    let mut assigned: Vec<Option<usize>> = vec![None; samples.len()];
    let n = rules.len();

    for (rule_idx, rule) in rules.rules().iter().enumerate() {
        let Some(bound) = constraining_bound(rule, &curves.density) else {
            continue;
        };
        progress.report(format!("Density pass rule {}/{}: {}", rule_idx + 1, n, rule.label()));
        for (slot, sample) in assigned.iter_mut().zip(samples) {
            if slot.is_none() && sample.value(density).is_some_and(|v| bound.contains(v)) {
                *slot = Some(rule_idx);
            }
        }
    }
    let after_density = assigned.iter().filter(|s| s.is_some()).count();

    for (rule_idx, rule) in rules.rules().iter().enumerate() {
        let Some(bound) = constraining_bound(rule, &curves.gamma) else {
            continue;
        };
        progress.report(format!("Gamma pass rule {}/{}: {}", rule_idx + 1, n, rule.label()));
        for (slot, sample) in assigned.iter_mut().zip(samples) {
            if sample.value(gamma).is_some_and(|v| bound.contains(v)) {
                *slot = Some(rule_idx);
            }
        }
    }

    let labels: Vec<String> = assigned
        .into_iter()
        .map(|slot| match slot {
            Some(i) => rules.rules()[i].label().to_string(),
            None => UNKNOWN_LABEL.to_string(),
        })
        .collect();

    let unknown = labels.iter().filter(|l| *l == UNKNOWN_LABEL).count();
    info!(
        samples = labels.len(),
        density_labelled = after_density,
        unknown,
        "Two-pass classification complete"
    );
    Ok(labels)
}

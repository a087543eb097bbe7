//! First-Match Range Classifier
//!
//! Assigns each sample the label of the first rule, in rule-set order, whose
//! every parameter bound the sample satisfies. Samples no rule claims are
//! labelled [`UNKNOWN_LABEL`].
//!
//! The scan runs rule by rule over the still-unlabelled samples, which gives
//! the same result as testing each sample against the rules in order but
//! lets progress be reported once per rule.
//!
//! [`ClassificationMethod::TwoPass`] selects the density-then-gamma scan in
//! [`two_pass`] instead.

mod compile;
pub mod two_pass;

pub use compile::{CompiledRule, CompiledRuleSet};
pub use two_pass::TwoPassCurves;

use crate::error::Result;
use crate::progress::Progress;
use crate::types::{ClassifiedDataset, Dataset, RangeRuleSet, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// How rules are applied to samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Every bound of a rule must hold; the first such rule wins.
    #[default]
    FirstMatch,
    /// Density bounds first, then gamma bounds overwrite.
    TwoPass,
}

/// Rule-set classifier
pub struct Classifier;

impl Classifier {
    /// Classify every sample of `dataset`.
    ///
    /// # Arguments
    /// * `dataset` - Samples plus the schema their values are laid out against
    /// * `rules` - Ordered rule set; order decides overlaps
    /// * `progress` - Receives one message per rule
    ///
    /// # Returns
    /// One label per sample, in input order. Fails before scanning when the
    /// rule set is empty or references a parameter the dataset lacks.
    pub fn classify(
        dataset: &Dataset,
        rules: &RangeRuleSet,
        progress: &mut Progress<'_>,
    ) -> Result<Vec<String>> {
        let compiled = CompiledRuleSet::compile(rules, dataset.schema())?;
        let samples = dataset.samples();
        let mut assigned: Vec<Option<usize>> = vec![None; samples.len()];

        for (rule_idx, rule) in compiled.rules().iter().enumerate() {
            progress.report(format!(
                "Classifying rule {}/{}: {}",
                rule_idx + 1,
                compiled.len(),
                rule.label
            ));
            for (slot, sample) in assigned.iter_mut().zip(samples) {
                if slot.is_none() && rule.matches(sample) {
                    *slot = Some(rule_idx);
                }
            }
        }

        let labels: Vec<String> = assigned
            .into_iter()
            .map(|slot| match slot {
                Some(i) => compiled.rules()[i].label.clone(),
                None => UNKNOWN_LABEL.to_string(),
            })
            .collect();

        let unknown = labels.iter().filter(|l| *l == UNKNOWN_LABEL).count();
        info!(
            samples = labels.len(),
            rules = compiled.len(),
            unknown,
            "Classification complete"
        );
        Ok(labels)
    }

    /// Density pass, then gamma pass. See [`two_pass`].
    pub fn classify_two_pass(
        dataset: &Dataset,
        rules: &RangeRuleSet,
        curves: &TwoPassCurves,
        progress: &mut Progress<'_>,
    ) -> Result<Vec<String>> {
        two_pass::classify(dataset, rules, curves, progress)
    }

    /// Dispatch on `method`. `curves` is only read by the two-pass scan.
    pub fn classify_with(
        method: ClassificationMethod,
        dataset: &Dataset,
        rules: &RangeRuleSet,
        curves: &TwoPassCurves,
        progress: &mut Progress<'_>,
    ) -> Result<Vec<String>> {
        match method {
            ClassificationMethod::FirstMatch => Self::classify(dataset, rules, progress),
            ClassificationMethod::TwoPass => Self::classify_two_pass(dataset, rules, curves, progress),
        }
    }

    /// Classify and pair the labels with the dataset.
    pub fn classify_dataset<'a>(
        dataset: &'a Dataset,
        rules: &RangeRuleSet,
        progress: &mut Progress<'_>,
    ) -> Result<ClassifiedDataset<'a>> {
        let labels = Self::classify(dataset, rules, progress)?;
        ClassifiedDataset::new(dataset, labels)
    }

    /// Samples per label, sorted by label.
    pub fn label_counts(labels: &[String]) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for label in labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Classify without a progress callback.
pub fn classify(dataset: &Dataset, rules: &RangeRuleSet) -> Result<Vec<String>> {
    Classifier::classify(dataset, rules, &mut Progress::silent())
}

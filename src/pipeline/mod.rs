//! End-to-end Lithology Pipeline
//!
//! ```text
//! PHASE 1: Classify   (first-match or two-pass, one label per sample)
//! PHASE 2: Group      (depth runs → units, display attributes attached)
//! PHASE 3: Merge      (optional, thin units joined to same-lithology neighbours)
//! PHASE 4: Export     (optional, copy-then-edit into the xlsx template)
//! ```
//!
//! Every phase is synchronous and holds no state between runs; the same
//! pipeline can be run over any number of datasets.

use crate::classifier::{ClassificationMethod, Classifier, TwoPassCurves};
use crate::config::EarthwormConfig;
use crate::error::Result;
use crate::export::{ExportSummary, TemplateExporter};
use crate::grouping::{merge_thin_units, UnitGrouper};
use crate::progress::Progress;
use crate::types::{
    ClassifiedDataset, Dataset, DisplayTable, LithologyUnit, RangeRuleSet, UNKNOWN_LABEL,
};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Grouping behaviour for one pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupingSettings {
    pub sample_spacing: Option<f64>,
    /// `Some(threshold)` enables the thin-unit merge pass.
    pub merge_threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub samples: usize,
    pub unknown_samples: usize,
    pub units_grouped: usize,
    pub units: usize,
}

/// Result of phases 1-3.
#[derive(Debug, Clone)]
pub struct PipelineOutput<'a> {
    pub classified: ClassifiedDataset<'a>,
    pub units: Vec<LithologyUnit>,
    pub stats: PipelineStats,
}

/// Classify → group → merge → export
#[derive(Debug, Clone)]
pub struct LithologyPipeline {
    rules: RangeRuleSet,
    display: DisplayTable,
    grouping: GroupingSettings,
    method: ClassificationMethod,
    curves: TwoPassCurves,
    exporter: TemplateExporter,
}

impl LithologyPipeline {
    pub fn new(rules: RangeRuleSet, display: DisplayTable, grouping: GroupingSettings) -> Self {
        Self {
            rules,
            display,
            grouping,
            method: ClassificationMethod::default(),
            curves: TwoPassCurves::default(),
            exporter: TemplateExporter::default(),
        }
    }

    /// Use `method`; `curves` is read only by the two-pass scan.
    pub fn with_method(mut self, method: ClassificationMethod, curves: TwoPassCurves) -> Self {
        self.method = method;
        self.curves = curves;
        self
    }

    /// Build from a loaded config: rule set (with researched defaults when
    /// enabled), display table, and grouping settings.
    pub fn from_config(config: &EarthwormConfig) -> Result<Self> {
        let grouping = GroupingSettings {
            sample_spacing: config.grouping.sample_spacing,
            merge_threshold: config
                .grouping
                .merge_thin_units
                .then_some(config.grouping.merge_threshold),
        };
        Ok(Self::new(config.rule_set()?, config.display_table(), grouping)
            .with_method(config.classification.method, config.two_pass_curves()))
    }

    pub fn rules(&self) -> &RangeRuleSet {
        &self.rules
    }

    pub fn display(&self) -> &DisplayTable {
        &self.display
    }

    pub fn grouping(&self) -> GroupingSettings {
        self.grouping
    }

    pub fn method(&self) -> ClassificationMethod {
        self.method
    }

    /// Phases 1-3.
    pub fn run<'a>(
        &self,
        dataset: &'a Dataset,
        progress: &mut Progress<'_>,
    ) -> Result<PipelineOutput<'a>> {
        // PHASE 1
        let labels =
            Classifier::classify_with(self.method, dataset, &self.rules, &self.curves, progress)?;
        let classified = ClassifiedDataset::new(dataset, labels)?;
        let unknown_samples = classified
            .labels()
            .iter()
            .filter(|l| l.as_str() == UNKNOWN_LABEL)
            .count();

        // PHASE 2
        progress.report("Grouping samples into lithology units");
        let grouped = UnitGrouper::group(&classified, &self.display, self.grouping.sample_spacing)?;
        let units_grouped = grouped.len();

        // PHASE 3
        let units = match self.grouping.merge_threshold {
            Some(threshold) => {
                progress.report(format!("Merging units thinner than {threshold} m"));
                merge_thin_units(&grouped, threshold)?
            }
            None => grouped,
        };

        let stats = PipelineStats {
            samples: classified.len(),
            unknown_samples,
            units_grouped,
            units: units.len(),
        };
        info!(
            samples = stats.samples,
            unknown = stats.unknown_samples,
            units = stats.units,
            merged_away = stats.units_grouped - stats.units,
            "Pipeline complete"
        );
        Ok(PipelineOutput {
            classified,
            units,
            stats,
        })
    }

    /// Phases 1-4.
    pub fn run_and_export<'a>(
        &self,
        dataset: &'a Dataset,
        template: &Path,
        output: &Path,
        progress: &mut Progress<'_>,
    ) -> Result<(PipelineOutput<'a>, ExportSummary)> {
        let result = self.run(dataset, progress)?;
        // PHASE 4
        let summary = self.exporter.export(&result.units, template, output, progress)?;
        Ok((result, summary))
    }
}

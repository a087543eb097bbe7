//! Earthworm: rule-based lithology classification for well-log data
//!
//! Turns depth-indexed log samples into lithology units and writes them
//! into a spreadsheet template.
//!
//! ## Architecture
//!
//! - **Config**: TOML settings plus the `label → parameter → {low, high}`
//!   rule table, normalised once into a [`RangeRuleSet`]
//! - **Classifier**: first-match labelling of every sample, or a
//!   density-then-gamma two-pass scan
//! - **RangeGapAnalyzer**: uncovered and overlapping parameter ranges
//! - **UnitGrouper**: contiguous same-label runs as depth intervals
//! - **Summarizer / Comparator**: per-group statistics and agreement with
//!   reference labels
//! - **TemplateExporter**: units into the "Lithology" sheet of an xlsx
//!   template at fixed columns

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod gaps;
pub mod grouping;
pub mod pipeline;
pub mod progress;
pub mod summary;
pub mod types;

// Re-export configuration
pub use config::EarthwormConfig;

// Re-export error taxonomy
pub use error::{LithologyError, Result};

// Re-export commonly used types
pub use types::{
    Bound, ClassifiedDataset, Dataset, DatasetOptions, DisplayAttributes, DisplayTable, GapReport,
    GroupSummary, LithologyRule, LithologyUnit, ParameterId, RangeBound, RangeRuleSet, Sample,
    Schema, UNKNOWN_LABEL,
};

// Re-export components
pub use classifier::{classify, ClassificationMethod, Classifier, TwoPassCurves};
pub use export::{export_units, ExportSummary, TemplateExporter};
pub use gaps::{observed_ranges, RangeGapAnalyzer};
pub use grouping::{coalesce_units, merge_thin_units, UnitGrouper};
pub use pipeline::{GroupingSettings, LithologyPipeline, PipelineOutput};
pub use progress::Progress;
pub use summary::{Comparator, Comparison, LithologyReport, Summarizer};

//! Shared data structures for the lithology classification engine
//!
//! - Sample / Schema / Dataset: depth-indexed well-log records
//! - Bound / RangeBound / LithologyRule / RangeRuleSet: the rule table
//! - LithologyUnit / DisplayAttributes: grouped output for export
//! - GapReport / GroupSummary: read-only analysis outputs

mod sample;
mod rules;
mod unit;
mod report;

pub use sample::*;
pub use rules::*;
pub use unit::*;
pub use report::*;

/// Label assigned to samples no rule matches.
pub const UNKNOWN_LABEL: &str = "Unknown";

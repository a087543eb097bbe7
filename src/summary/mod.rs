//! Read-only analyses over classified data: per-group statistics,
//! reference/classified agreement, and the per-lithology report.

mod comparator;
mod report;
mod summarizer;

pub use comparator::{ChiSquareTest, Comparator, Comparison, ContingencyTable};
pub use report::{Distribution, LithologyReport, LithologyReportRow};
pub use summarizer::Summarizer;

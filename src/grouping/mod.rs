//! Unit Grouping
//!
//! Collapses a depth-ordered, classified sample sequence into lithology
//! units: maximal runs of one label, each a half-open interval
//! `[from_depth, to_depth)`.
//!
//! ## Boundaries
//!
//! - `from_depth` is the first member's depth.
//! - `to_depth` is the next unit's first depth, so units tile the logged
//!   interval with no gaps or overlaps.
//! - The deepest unit is closed by the caller's nominal sample spacing, or
//!   by the spacing between the last two samples when none is given.
//!
//! Unsorted depth input is an error, never silently re-sorted.

use crate::error::{LithologyError, Result};
use crate::types::{ClassifiedDataset, DisplayTable, LithologyUnit};
use tracing::{debug, info};

/// Depth-run grouper
pub struct UnitGrouper;

impl UnitGrouper {
    /// Group a classified dataset.
    pub fn group(
        classified: &ClassifiedDataset<'_>,
        display: &DisplayTable,
        sample_spacing: Option<f64>,
    ) -> Result<Vec<LithologyUnit>> {
        Self::group_records(
            classified.iter().map(|(s, label)| (s.depth, label)),
            display,
            sample_spacing,
        )
    }

    /// Group raw `(depth, label)` records.
    ///
    /// # Arguments
    /// * `records` - Samples in strictly increasing depth order
    /// * `display` - Attributes attached to each unit by label
    /// * `sample_spacing` - Closes the deepest unit; defaults to the last
    ///   inter-sample spacing
    pub fn group_records<'a>(
        records: impl IntoIterator<Item = (f64, &'a str)>,
        display: &DisplayTable,
        sample_spacing: Option<f64>,
    ) -> Result<Vec<LithologyUnit>> {
        if let Some(spacing) = sample_spacing {
            if !(spacing.is_finite() && spacing > 0.0) {
                return Err(LithologyError::Validation(format!(
                    "sample spacing must be a positive number, got {spacing}"
                )));
            }
        }

        // (start depth, label) for each run, plus the last two depths seen.
        let mut runs: Vec<(f64, &str)> = Vec::new();
        let mut previous: Option<f64> = None;
        let mut last_step: Option<f64> = None;

        for (row, (depth, label)) in records.into_iter().enumerate() {
            if let Some(prev) = previous {
                if depth <= prev || !depth.is_finite() {
                    return Err(LithologyError::DataOrdering {
                        row,
                        previous: prev,
                        depth,
                    });
                }
                last_step = Some(depth - prev);
            }
            previous = Some(depth);
            if runs.last().map_or(true, |(_, l)| *l != label) {
                runs.push((depth, label));
            }
        }

        let Some(last_depth) = previous else {
            return Ok(Vec::new());
        };
        let end = match sample_spacing.or(last_step) {
            Some(step) => last_depth + step,
            None => {
                return Err(LithologyError::Validation(
                    "cannot close a single-sample interval without a sample spacing".to_string(),
                ))
            }
        };

        let mut units = Vec::with_capacity(runs.len());
        for (i, &(from, label)) in runs.iter().enumerate() {
            let to = runs.get(i + 1).map_or(end, |(next, _)| *next);
            units.push(LithologyUnit::new(from, to, label, display.resolve(label))?);
        }

        info!(units = units.len(), "Grouped samples into lithology units");
        Ok(units)
    }
}

/// Join adjacent, contiguous units that share a label.
pub fn coalesce_units(units: &[LithologyUnit]) -> Result<Vec<LithologyUnit>> {
    let mut out: Vec<LithologyUnit> = Vec::with_capacity(units.len());
    for unit in units {
        match out.last_mut() {
            Some(last)
                if last.lithology() == unit.lithology() && last.to_depth() == unit.from_depth() =>
            {
                *last = last.spanning(last.from_depth(), unit.to_depth())?;
            }
            _ => out.push(unit.clone()),
        }
    }
    Ok(out)
}

/// Extend each unit thinner than `threshold` over the units that follow it
/// while they carry the same lithology and qualifier and start where it
/// ends.
///
/// A thin unit next to a different lithology is kept as is. Labels and
/// boundaries between different lithologies never change.
pub fn merge_thin_units(units: &[LithologyUnit], threshold: f64) -> Result<Vec<LithologyUnit>> {
    if units.len() <= 1 {
        return Ok(units.to_vec());
    }

    let mut out: Vec<LithologyUnit> = Vec::with_capacity(units.len());
    let mut rest = units.iter().peekable();

    while let Some(unit) = rest.next() {
        let mut current = unit.clone();
        while current.thickness() < threshold {
            let Some(next) = rest.peek() else { break };
            if !same_lithology(&current, next) || current.to_depth() != next.from_depth() {
                break;
            }
            current = current.spanning(current.from_depth(), next.to_depth())?;
            rest.next();
        }
        out.push(current);
    }

    debug!(
        threshold,
        before = units.len(),
        after = out.len(),
        "Merged thin units"
    );
    Ok(out)
}

fn same_lithology(a: &LithologyUnit, b: &LithologyUnit) -> bool {
    a.lithology() == b.lithology() && a.display().qualifier == b.display().qualifier
}

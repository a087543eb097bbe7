//! Tabular Dataset Loader
//!
//! Reads an already-tabular well-log export (CSV with one header row) into a
//! [`Dataset`]. This is input hygiene only; the classification core never
//! sees raw text.
//!
//! - The depth column is taken from config, or auto-detected from
//!   `DEPT` / `DEPTH` / `MD` (case-insensitive).
//! - Optional reference and qualifier columns become sample labels.
//! - Every other column with at least one numeric cell becomes a parameter.
//!   Columns with no numeric content (empty or categorical) are dropped.
//! - Unparseable numeric cells load as missing; rows without a parseable
//!   depth are skipped with a warning.
//!
//! ```ignore
//! use earthworm::dataset::{load_csv, LoadOptions};
//!
//! let dataset = load_csv("well.csv", &LoadOptions::default())?;
//! ```

use crate::config::defaults::DEPTH_COLUMN_CANDIDATES;
use crate::config::EarthwormConfig;
use crate::error::{LithologyError, Result};
use crate::types::{Dataset, DatasetOptions, Sample, Schema};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Options
// ============================================================================

/// Column mapping plus dataset hygiene applied while loading.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub depth_column: Option<String>,
    pub reference_column: Option<String>,
    pub qualifier_column: Option<String>,
    pub dataset: DatasetOptions,
}

impl From<&EarthwormConfig> for LoadOptions {
    fn from(config: &EarthwormConfig) -> Self {
        Self {
            depth_column: config.dataset.depth_column.clone(),
            reference_column: config.dataset.reference_column.clone(),
            qualifier_column: config.dataset.qualifier_column.clone(),
            dataset: config.dataset_options(),
        }
    }
}

// ============================================================================
// CSV Splitting
// ============================================================================

/// Split one CSV record, honouring double-quoted fields and `""` escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn resolve_column(header: &[String], name: Option<&str>, role: &str) -> Result<Option<usize>> {
    match name {
        None => Ok(None),
        Some(name) => find_column(header, name).map(Some).ok_or_else(|| {
            LithologyError::Validation(format!(
                "{role} column '{name}' not found in header ({})",
                header.join(", ")
            ))
        }),
    }
}

fn detect_depth_column(header: &[String], configured: Option<&str>) -> Result<usize> {
    if let Some(name) = configured {
        return resolve_column(header, Some(name), "depth")?.ok_or_else(|| {
            LithologyError::Validation(format!("depth column '{name}' not found"))
        });
    }
    DEPTH_COLUMN_CANDIDATES
        .iter()
        .find_map(|c| find_column(header, c))
        .ok_or_else(|| {
            LithologyError::Validation(format!(
                "no depth column found; expected one of {} or [dataset] depth_column",
                DEPTH_COLUMN_CANDIDATES.join(", ")
            ))
        })
}

// ============================================================================
// Loading
// ============================================================================

/// Load a CSV file from disk.
pub fn load_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        LithologyError::Validation(format!("cannot open dataset {}: {e}", path.display()))
    })?;
    let dataset = read_csv(BufReader::new(file), options)?;
    info!(
        file = %path.display(),
        samples = dataset.len(),
        parameters = dataset.schema().len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Parse CSV text from any buffered reader.
pub fn read_csv<R: BufRead>(reader: R, options: &LoadOptions) -> Result<Dataset> {
    let mut lines = reader.lines();

    let header = loop {
        match lines.next() {
            Some(Ok(line)) if line.trim().is_empty() => continue,
            Some(Ok(line)) => break split_record(line.trim_start_matches('\u{feff}')),
            Some(Err(e)) => {
                return Err(LithologyError::Validation(format!("cannot read header: {e}")))
            }
            None => {
                return Err(LithologyError::Validation(
                    "dataset is empty (no header row)".to_string(),
                ))
            }
        }
    };

    let depth_idx = detect_depth_column(&header, options.depth_column.as_deref())?;
    let ref_idx = resolve_column(&header, options.reference_column.as_deref(), "reference")?;
    let qual_idx = resolve_column(&header, options.qualifier_column.as_deref(), "qualifier")?;

    let candidate_cols: Vec<usize> = (0..header.len())
        .filter(|&i| i != depth_idx && Some(i) != ref_idx && Some(i) != qual_idx)
        .filter(|&i| !header[i].is_empty())
        .collect();

    // First pass: collect raw records so column types can be decided.
    let mut rows: Vec<(usize, f64, Vec<String>)> = Vec::new();
    let mut skipped = 0usize;
    for (offset, line) in lines.enumerate() {
        let line_num = offset + 2;
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(line = line_num, error = %e, "Error reading line");
                skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(&line);
        let depth = fields
            .get(depth_idx)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite());
        match depth {
            Some(depth) => rows.push((line_num, depth, fields)),
            None => {
                warn!(line = line_num, "Row has no parseable depth, skipping");
                skipped += 1;
            }
        }
    }

    // Keep columns with at least one numeric cell.
    let numeric_cols: Vec<usize> = candidate_cols
        .into_iter()
        .filter(|&col| {
            let numeric = rows
                .iter()
                .any(|(_, _, f)| f.get(col).is_some_and(|s| s.parse::<f64>().is_ok()));
            if !numeric {
                debug!(column = %header[col], "Dropping column with no numeric values");
            }
            numeric
        })
        .collect();

    let schema = Schema::new(numeric_cols.iter().map(|&i| header[i].clone()))?;

    let mut unparsed_cells = 0usize;
    let samples: Vec<Sample> = rows
        .into_iter()
        .map(|(_, depth, fields)| {
            let values = numeric_cols
                .iter()
                .map(|&col| {
                    let cell = fields.get(col).map_or("", String::as_str);
                    if cell.is_empty() {
                        return None;
                    }
                    let parsed = cell.parse::<f64>().ok();
                    if parsed.is_none() {
                        unparsed_cells += 1;
                    }
                    parsed
                })
                .collect();
            let label = |idx: Option<usize>| {
                idx.and_then(|i| fields.get(i))
                    .filter(|s| !s.is_empty())
                    .cloned()
            };
            Sample {
                depth,
                values,
                reference_label: label(ref_idx),
                qualifier: label(qual_idx),
            }
        })
        .collect();

    if skipped > 0 || unparsed_cells > 0 {
        warn!(
            skipped_rows = skipped,
            unparsed_cells, "Dataset contained unreadable values"
        );
    }

    Dataset::new(schema, samples, options.dataset)
}

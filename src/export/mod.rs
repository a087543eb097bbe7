//! Template Exporter
//!
//! Writes lithology units into the "Lithology" sheet of an xlsx template,
//! one unit per row from row 5, at fixed column letters:
//!
//! | Column | Field        |
//! |--------|--------------|
//! | A      | from depth   |
//! | B      | to depth     |
//! | D      | thickness    |
//! | L      | lithology    |
//! | M      | qualifier    |
//! | N      | shade        |
//! | O      | hue          |
//! | P      | colour       |
//! | Q      | weathering   |
//! | R      | strength     |
//!
//! Downstream reporting reads these columns by letter; they must not move.
//! Display attributes are written only when present.
//!
//! ## Copy-then-edit
//!
//! 1. A missing template fails before anything touches the filesystem.
//! 2. When the output differs from the template, the template is copied
//!    byte-for-byte first. A failed copy leaves no output file behind.
//! 3. The copy is edited through a temporary sibling renamed into place.
//!
//! Cells inside a merged range are left untouched and counted.

mod cells;
mod sheet;
mod workbook;

pub use cells::{column_index, column_letters, parse_cell_ref, CellRange};
pub use sheet::CellValue;

use crate::config::defaults::{FIRST_DATA_ROW, LITHOLOGY_SHEET};
use crate::error::{LithologyError, Result};
use crate::progress::Progress;
use crate::types::LithologyUnit;
use serde::Serialize;
use sheet::RowWrites;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use workbook::{Package, PackageEdits, CONTENT_TYPES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};

// ============================================================================
// Column assignment
// ============================================================================

pub const COL_FROM_DEPTH: u32 = 1; // A
pub const COL_TO_DEPTH: u32 = 2; // B
pub const COL_THICKNESS: u32 = 4; // D
pub const COL_LITHOLOGY: u32 = 12; // L
pub const COL_QUALIFIER: u32 = 13; // M
pub const COL_SHADE: u32 = 14; // N
pub const COL_HUE: u32 = 15; // O
pub const COL_COLOUR: u32 = 16; // P
pub const COL_WEATHERING: u32 = 17; // Q
pub const COL_STRENGTH: u32 = 18; // R

/// Cells for one unit, in column order.
pub fn unit_cells(unit: &LithologyUnit) -> Vec<(u32, CellValue)> {
    let mut cells = vec![
        (COL_FROM_DEPTH, CellValue::Number(unit.from_depth())),
        (COL_TO_DEPTH, CellValue::Number(unit.to_depth())),
        (COL_THICKNESS, CellValue::Number(unit.thickness())),
        (COL_LITHOLOGY, CellValue::Text(unit.lithology().to_string())),
    ];
    let d = unit.display();
    let optional = [
        (COL_QUALIFIER, &d.qualifier),
        (COL_SHADE, &d.shade),
        (COL_HUE, &d.hue),
        (COL_COLOUR, &d.colour),
        (COL_WEATHERING, &d.weathering),
        (COL_STRENGTH, &d.strength),
    ];
    for (col, value) in optional {
        if let Some(text) = value.as_deref().filter(|t| !t.is_empty()) {
            cells.push((col, CellValue::Text(text.to_string())));
        }
    }
    cells
}

/// What an export did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    pub sheet_created: bool,
    pub rows_written: usize,
    pub cells_written: usize,
    pub merged_cells_skipped: usize,
}

/// xlsx template writer
#[derive(Debug, Clone)]
pub struct TemplateExporter {
    sheet_name: String,
    first_row: u32,
}

impl Default for TemplateExporter {
    fn default() -> Self {
        Self {
            sheet_name: LITHOLOGY_SHEET.to_string(),
            first_row: FIRST_DATA_ROW,
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl TemplateExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    /// Export `units` into a copy of `template` at `output`.
    ///
    /// When `output` is the template itself it is edited in place.
    pub fn export(
        &self,
        units: &[LithologyUnit],
        template: &Path,
        output: &Path,
        progress: &mut Progress<'_>,
    ) -> Result<ExportSummary> {
        if !template.is_file() {
            return Err(LithologyError::MissingFile {
                path: template.to_path_buf(),
            });
        }
        progress.report(format!("Loading template file: {}", template.display()));

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LithologyError::write(output, e))?;
        }

        let copied = !same_file(template, output);
        if copied {
            progress.report(format!("Creating a copy of the template at: {}", output.display()));
            if let Err(e) = fs::copy(template, output) {
                let _ = fs::remove_file(output);
                return Err(LithologyError::write(output, e));
            }
        } else {
            progress.report(format!("Writing directly to template file: {}", output.display()));
        }

        match self.edit_workbook(units, output, progress) {
            Ok(summary) => {
                info!(
                    output = %output.display(),
                    rows = summary.rows_written,
                    cells = summary.cells_written,
                    merged_skipped = summary.merged_cells_skipped,
                    sheet_created = summary.sheet_created,
                    "Exported lithology units"
                );
                Ok(summary)
            }
            Err(e) => {
                if copied {
                    warn!(output = %output.display(), error = %e, "Export failed, removing copied template");
                    let _ = fs::remove_file(output);
                }
                Err(e)
            }
        }
    }

    fn edit_workbook(
        &self,
        units: &[LithologyUnit],
        output: &Path,
        progress: &mut Progress<'_>,
    ) -> Result<ExportSummary> {
        let malformed = |e: workbook::PackageError| LithologyError::malformed(output, e);

        let mut package = Package::open(output).map_err(malformed)?;
        let workbook_xml = package.read_part(WORKBOOK_PART).map_err(malformed)?;
        let rels_xml = package.read_part(WORKBOOK_RELS_PART).map_err(malformed)?;

        let sheets = workbook::read_sheets(&workbook_xml).map_err(malformed)?;
        let rels = workbook::read_relationships(&rels_xml).map_err(malformed)?;

        let mut edits = PackageEdits::default();
        let existing_part = sheets
            .sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(&self.sheet_name))
            .and_then(|s| rels.get(&s.rel_id).cloned());

        let (sheet_part, sheet_xml, sheet_created) = match existing_part {
            Some(part) => {
                progress.report(format!("Using '{}' sheet in template", self.sheet_name));
                let xml = package.read_part(&part).map_err(malformed)?;
                (part, xml, false)
            }
            None => {
                let content_types = package.read_part(CONTENT_TYPES_PART).map_err(malformed)?;
                let created = workbook::add_sheet(
                    &package,
                    &self.sheet_name,
                    &workbook_xml,
                    &rels_xml,
                    &content_types,
                )
                .map_err(malformed)?;
                edits.set(WORKBOOK_PART, created.workbook_xml);
                edits.set(WORKBOOK_RELS_PART, created.rels_xml);
                edits.set(CONTENT_TYPES_PART, created.content_types_xml);
                progress.report(format!("Created new '{}' sheet in template", self.sheet_name));
                (created.part, sheet::blank_sheet_xml(), true)
            }
        };
        debug!(part = %sheet_part, created = sheet_created, "Resolved target sheet");

        progress.report(format!(
            "Writing {} lithology units to {} sheet starting at row {}...",
            units.len(),
            self.sheet_name,
            self.first_row
        ));
        let mut writes = RowWrites::new();
        for (i, unit) in units.iter().enumerate() {
            let row = self.first_row + i as u32;
            progress.report(format!(
                "Unit {}/{}: {} {:.2}-{:.2}",
                i + 1,
                units.len(),
                unit.lithology(),
                unit.from_depth(),
                unit.to_depth()
            ));
            writes.insert(row, unit_cells(unit));
        }

        let outcome = sheet::patch_sheet(&sheet_xml, &writes)
            .map_err(|e| LithologyError::malformed(output, e))?;
        if outcome.merged_cells_skipped > 0 {
            debug!(skipped = outcome.merged_cells_skipped, "Skipped cells inside merged ranges");
        }
        edits.set(sheet_part, outcome.xml);
        drop(package);

        workbook::write_package(output, &edits).map_err(|e| LithologyError::write(output, e))?;
        progress.report(format!("Saved workbook: {}", output.display()));

        Ok(ExportSummary {
            output_path: output.to_path_buf(),
            sheet_created,
            rows_written: outcome.rows_written,
            cells_written: outcome.cells_written,
            merged_cells_skipped: outcome.merged_cells_skipped,
        })
    }
}

/// Export with the default sheet and start row and no progress callback.
pub fn export_units(
    units: &[LithologyUnit],
    template: &Path,
    output: &Path,
) -> Result<ExportSummary> {
    TemplateExporter::default().export(units, template, output, &mut Progress::silent())
}

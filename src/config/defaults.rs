//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Dataset
// ============================================================================

/// Value loggers write for "no reading".
pub const NULL_VALUE: f64 = -999.25;

/// Depth column names tried, in order, when none is configured.
pub const DEPTH_COLUMN_CANDIDATES: &[&str] = &["DEPT", "DEPTH", "MD"];

// ============================================================================
// Rule configuration
// ============================================================================

/// Strings accepted as "no bound" in rule files (compared case-insensitively).
pub const NO_BOUND_MARKERS: &[&str] = &["", "none", "null", "unbounded", "inf", "+inf", "-inf", "infinity", "-infinity"];

/// Researched gamma (API) / density (g/cc) ranges for common coal-measure
/// lithologies, used to fill rules that leave those curves unconstrained.
///
/// Tuple: (code, gamma_min, gamma_max, density_min, density_max).
pub const RESEARCHED_DEFAULTS: &[(&str, f64, f64, f64, f64)] = &[
    ("CO", 0.0, 20.0, 1.2, 1.8),   // Coal
    ("SS", 20.0, 60.0, 2.4, 2.7),  // Sandstone
    ("ST", 50.0, 100.0, 2.2, 2.6), // Siltstone
    ("SH", 80.0, 150.0, 2.5, 2.8), // Shale
    ("XM", 60.0, 120.0, 2.0, 2.3), // Carbonaceous mudstone
    ("ZM", 30.0, 80.0, 1.7, 2.1),  // Coaly mudstone
];

// ============================================================================
// Grouping
// ============================================================================

/// Thin-unit merge threshold (metres). 0.05 = 5 cm.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.05;

// ============================================================================
// Template export
// ============================================================================

/// Sheet the exporter writes into (created when absent).
pub const LITHOLOGY_SHEET: &str = "Lithology";

/// First writable data row (1-indexed).
pub const FIRST_DATA_ROW: u32 = 5;

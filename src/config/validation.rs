//! Config checks for earthworm.toml: misspelt keys and implausible values.
//!
//! Keys are checked against [`SCHEMA`] before serde sees the file, so a typo
//! such as `merge_treshold` is reported with the nearest valid key instead of
//! being silently ignored. Key problems are warnings only.
//!
//! Sections come in two shapes. `[dataset]`, `[classification]`, `[grouping]`
//! and `[export]` have a fixed set of fields. `[rules]` and `[display]` are
//! keyed by lithology label (and, for rules, by parameter name), so only the
//! leaves below those free-form levels are checked.

use std::fmt;

/// What went wrong with a config key or value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    /// The key is not part of the schema.
    UnknownKey,
    /// A table sits where the schema expects a value.
    TooDeep,
    /// The value parses but is unlikely to be intended.
    Suspicious(String),
}

/// A non-fatal problem found in earthworm.toml.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// Dotted path of the offending key, e.g. `rules.SS.GR.lo`.
    pub key: String,
    pub issue: ConfigIssue,
    /// Full dotted path of the closest valid key.
    pub did_you_mean: Option<String>,
}

impl ConfigWarning {
    fn unknown(key: String, did_you_mean: Option<String>) -> Self {
        Self {
            key,
            issue: ConfigIssue::UnknownKey,
            did_you_mean,
        }
    }

    fn suspicious(key: &str, note: String) -> Self {
        Self {
            key: key.to_string(),
            issue: ConfigIssue::Suspicious(note),
            did_you_mean: None,
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue {
            ConfigIssue::UnknownKey => write!(f, "Unknown config key '{}'", self.key)?,
            ConfigIssue::TooDeep => write!(f, "Unexpected table at '{}'", self.key)?,
            ConfigIssue::Suspicious(note) => write!(f, "{}: {note}", self.key)?,
        }
        if let Some(ref s) = self.did_you_mean {
            write!(f, " - did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Key Schema
// ============================================================================

/// Layout of one top-level section.
#[derive(Debug, Clone, Copy)]
pub enum SectionShape {
    /// Fixed field names, all scalar.
    Fields(&'static [&'static str]),
    /// `free_levels` user-chosen names (label, parameter) followed by one of
    /// `leaves`.
    Keyed {
        free_levels: usize,
        leaves: &'static [&'static str],
    },
}

/// Every section earthworm.toml understands, in file order.
///
/// Maintained by hand to match the structs in earthworm_config.rs.
pub const SCHEMA: &[(&str, SectionShape)] = &[
    (
        "dataset",
        SectionShape::Fields(&[
            "depth_column",
            "reference_column",
            "qualifier_column",
            "null_value",
            "casing_depth",
        ]),
    ),
    (
        "classification",
        SectionShape::Fields(&[
            "method",
            "use_researched_defaults",
            "gamma_parameter",
            "density_parameter",
        ]),
    ),
    (
        "grouping",
        SectionShape::Fields(&["sample_spacing", "merge_thin_units", "merge_threshold"]),
    ),
    ("export", SectionShape::Fields(&["template", "output"])),
    // [rules.<label>.<parameter>]
    (
        "rules",
        SectionShape::Keyed {
            free_levels: 2,
            leaves: &["low", "high"],
        },
    ),
    // [display.<label>]
    (
        "display",
        SectionShape::Keyed {
            free_levels: 1,
            leaves: &["qualifier", "shade", "hue", "colour", "weathering", "strength"],
        },
    ),
];

fn section(name: &str) -> Option<SectionShape> {
    SCHEMA.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
}

// ============================================================================
// Nearest Key
// ============================================================================

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = (above + 1).min(row[j] + 1).min(diag + usize::from(ca != *cb));
            diag = above;
        }
    }
    row[b.len()]
}

/// Largest edit distance still offered as a correction.
const MAX_TYPO_DISTANCE: usize = 3;

/// The candidate closest to `name`, if it is within a few edits.
///
/// Ties go to the earlier candidate.
pub fn closest_key(name: &str, candidates: &[&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .map(|c| (*c, edit_distance(name, c)))
        .filter(|(_, d)| *d <= MAX_TYPO_DISTANCE)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ============================================================================
// Key Checks
// ============================================================================

/// Parse `raw_toml` and warn about every key that is not in [`SCHEMA`].
///
/// Parse errors yield no warnings; serde reports them afterwards.
pub fn check_keys(raw_toml: &str) -> Vec<ConfigWarning> {
    let Ok(doc) = raw_toml.parse::<toml::Table>() else {
        return Vec::new();
    };
    let section_names: Vec<&'static str> = SCHEMA.iter().map(|(n, _)| *n).collect();

    let mut warnings = Vec::new();
    for (name, value) in &doc {
        match section(name) {
            None => warnings.push(ConfigWarning::unknown(
                name.clone(),
                closest_key(name, &section_names).map(str::to_string),
            )),
            Some(shape) => {
                if let Some(table) = value.as_table() {
                    check_section(name, shape, table, &mut warnings);
                }
            }
        }
    }
    warnings
}

fn check_section(
    path: &str,
    shape: SectionShape,
    table: &toml::Table,
    warnings: &mut Vec<ConfigWarning>,
) {
    match shape {
        SectionShape::Fields(fields) => check_leaves(path, fields, table, warnings),
        SectionShape::Keyed {
            free_levels: 0,
            leaves,
        } => check_leaves(path, leaves, table, warnings),
        SectionShape::Keyed {
            free_levels,
            leaves,
        } => {
            // Free-form names; anything that is not a table is left to serde.
            for (name, value) in table {
                if let Some(inner) = value.as_table() {
                    let shape = SectionShape::Keyed {
                        free_levels: free_levels - 1,
                        leaves,
                    };
                    check_section(&format!("{path}.{name}"), shape, inner, warnings);
                }
            }
        }
    }
}

fn check_leaves(
    path: &str,
    allowed: &[&'static str],
    table: &toml::Table,
    warnings: &mut Vec<ConfigWarning>,
) {
    for (name, value) in table {
        let key = format!("{path}.{name}");
        if !allowed.contains(&name.as_str()) {
            let fix = closest_key(name, allowed).map(|k| format!("{path}.{k}"));
            warnings.push(ConfigWarning::unknown(key, fix));
        } else if value.is_table() {
            warnings.push(ConfigWarning {
                key,
                issue: ConfigIssue::TooDeep,
                did_you_mean: None,
            });
        }
    }
}

// ============================================================================
// Value Checks
// ============================================================================

/// Check value ranges on a parsed config.
///
/// Returns (errors, warnings). Errors are values no run can use; warnings
/// are legal but unusual.
pub fn check_values(config: &super::EarthwormConfig) -> (Vec<String>, Vec<ConfigWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let g = &config.grouping;
    if !(g.merge_threshold.is_finite() && g.merge_threshold > 0.0) {
        errors.push(format!(
            "grouping.merge_threshold = {} must be a positive number",
            g.merge_threshold
        ));
    } else if g.merge_threshold > 1.0 {
        warnings.push(ConfigWarning::suspicious(
            "grouping.merge_threshold",
            format!(
                "{:.2} m is unusually thick for a thin-bed cutoff (typical 0.01-1 m)",
                g.merge_threshold
            ),
        ));
    }

    if let Some(spacing) = g.sample_spacing {
        if !(spacing.is_finite() && spacing > 0.0) {
            errors.push(format!(
                "grouping.sample_spacing = {spacing} must be a positive number"
            ));
        }
    }

    let d = &config.dataset;
    if !d.null_value.is_finite() {
        errors.push(format!("dataset.null_value = {} must be finite", d.null_value));
    }
    if let Some(casing) = d.casing_depth {
        if !casing.is_finite() {
            errors.push(format!("dataset.casing_depth = {casing} must be finite"));
        } else if casing < 0.0 {
            warnings.push(ConfigWarning::suspicious(
                "dataset.casing_depth",
                format!("{casing:.2} is negative and removes nothing"),
            ));
        }
    }

    let c = &config.classification;
    let reads_curves =
        c.use_researched_defaults || c.method == crate::classifier::ClassificationMethod::TwoPass;
    if reads_curves && c.gamma_parameter == c.density_parameter {
        errors.push(format!(
            "classification.gamma_parameter and density_parameter are both '{}'",
            c.gamma_parameter
        ));
    }

    (errors, warnings)
}

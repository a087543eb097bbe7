//! Earthworm configuration - dataset hygiene, grouping, export paths and the
//! lithology rule table as one operator-editable TOML file.
//!
//! Each section implements `Default`, so a missing file or a partial file
//! behaves exactly like the built-in settings.

use super::defaults::{DEFAULT_MERGE_THRESHOLD, NULL_VALUE};
use crate::classifier::{ClassificationMethod, TwoPassCurves};
use crate::error::LithologyError;
use crate::types::{DatasetOptions, DisplayAttributes, DisplayTable, RangeRuleSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "EARTHWORM_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "earthworm.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `EarthwormConfig::load()`, which searches:
/// 1. `$EARTHWORM_CONFIG` env var
/// 2. `./earthworm.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarthwormConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub classification: ClassificationConfig,

    #[serde(default)]
    pub grouping: GroupingConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// `label → parameter → { low, high }`, in evaluation order.
    #[serde(default)]
    pub rules: toml::Table,

    /// `label → display attributes` used when building units.
    #[serde(default)]
    pub display: BTreeMap<String, DisplayAttributes>,
}

impl EarthwormConfig {
    /// Load configuration using the standard search order:
    /// 1. `$EARTHWORM_CONFIG` environment variable
    /// 2. `./earthworm.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// Defaults are used only when no config file exists. A file that exists
    /// but fails to parse or validate is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_from_candidates(env_path.as_deref(), Path::new(LOCAL_CONFIG))
    }

    /// Search order of [`EarthwormConfig::load`] with explicit paths.
    pub fn load_from_candidates(
        env_path: Option<&Path>,
        local: &Path,
    ) -> Result<Self, ConfigError> {
        // 1. Check env var
        if let Some(p) = env_path {
            if p.exists() {
                let config = Self::load_from_file(p)?;
                info!(path = %p.display(), rules = config.rules.len(), "Loaded config from EARTHWORM_CONFIG");
                return Ok(config);
            }
            warn!(path = %p.display(), "EARTHWORM_CONFIG points to non-existent file, falling back");
        }

        // 2. Check ./earthworm.toml
        if local.exists() {
            let config = Self::load_from_file(local)?;
            info!(path = %local.display(), rules = config.rules.len(), "Loaded config from earthworm.toml");
            return Ok(config);
        }

        // 3. Defaults
        info!("No earthworm.toml found - using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Misspelt keys only warn; serde would otherwise ignore them
        for w in super::validation::check_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate value ranges and the rule table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, warnings) = super::validation::check_values(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if let Err(e) = self.rule_set() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Curves named in `[classification]`.
    pub fn two_pass_curves(&self) -> TwoPassCurves {
        TwoPassCurves {
            gamma: self.classification.gamma_parameter.clone(),
            density: self.classification.density_parameter.clone(),
        }
    }

    /// Normalised rule set, with researched defaults applied when enabled.
    ///
    /// An empty `[rules]` table yields an empty set; the classifier rejects it.
    pub fn rule_set(&self) -> Result<RangeRuleSet, LithologyError> {
        let rules = super::rules::rules_from_toml(&self.rules, self.dataset.null_value)?;
        if self.classification.use_researched_defaults {
            super::rules::apply_researched_defaults(
                &rules,
                &self.classification.gamma_parameter,
                &self.classification.density_parameter,
            )
        } else {
            Ok(rules)
        }
    }

    pub fn display_table(&self) -> DisplayTable {
        self.display
            .iter()
            .map(|(label, attrs)| (label.clone(), attrs.clone()))
            .collect()
    }

    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            casing_depth: self.dataset.casing_depth,
            null_value: Some(self.dataset.null_value),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Dataset
// ============================================================================

/// How the external loader's table maps onto samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Depth column; auto-detected (DEPT, DEPTH, MD) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_column: Option<String>,

    /// Column holding a reference lithology label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_column: Option<String>,

    /// Column holding a secondary qualifier label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier_column: Option<String>,

    /// Numeric "no reading" sentinel.
    #[serde(default = "default_null_value")]
    pub null_value: f64,

    /// Samples at or above this depth are discarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casing_depth: Option<f64>,
}

fn default_null_value() -> f64 {
    NULL_VALUE
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            depth_column: None,
            reference_column: None,
            qualifier_column: None,
            null_value: default_null_value(),
            casing_depth: None,
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// `first_match` or `two_pass`.
    #[serde(default)]
    pub method: ClassificationMethod,

    /// Fill unconstrained gamma/density bounds from the researched table.
    #[serde(default)]
    pub use_researched_defaults: bool,

    /// Gamma curve for the researched ranges and the two-pass scan.
    #[serde(default = "default_gamma_parameter")]
    pub gamma_parameter: String,

    /// Density curve for the researched ranges and the two-pass scan.
    #[serde(default = "default_density_parameter")]
    pub density_parameter: String,
}

fn default_gamma_parameter() -> String {
    "GR".to_string()
}
fn default_density_parameter() -> String {
    "RHOB".to_string()
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            method: ClassificationMethod::default(),
            use_researched_defaults: false,
            gamma_parameter: default_gamma_parameter(),
            density_parameter: default_density_parameter(),
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Nominal spacing used to close the deepest unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_spacing: Option<f64>,

    #[serde(default)]
    pub merge_thin_units: bool,

    /// Units thinner than this are absorbed into a neighbour (metres).
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,
}

fn default_merge_threshold() -> f64 {
    DEFAULT_MERGE_THRESHOLD
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            sample_spacing: None,
            merge_thin_units: false,
            merge_threshold: default_merge_threshold(),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

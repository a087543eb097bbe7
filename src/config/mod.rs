//! Earthworm Configuration Module
//!
//! Provides the rule table, display attributes and run settings loaded from
//! a TOML file, replacing hardcoded ranges with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `EARTHWORM_CONFIG` environment variable (path to TOML file)
//! 3. `earthworm.toml` in the current working directory
//! 4. Built-in defaults (no rules)
//!
//! Rule tables can also be loaded on their own from TOML or JSON via
//! [`rules::load_rules_file`].

mod earthworm_config;
pub mod defaults;
pub mod rules;
pub mod validation;

pub use earthworm_config::*;

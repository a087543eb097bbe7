//! Rule-configuration loader
//!
//! Normalises the nested mapping `label → parameter → { low, high }` into a
//! [`RangeRuleSet`] exactly once. Every accepted spelling of "no bound"
//! (absent key, JSON `null`, a marker string, the numeric null sentinel)
//! becomes [`Bound::Unbounded`] here; nothing downstream re-reads sentinels.

use super::defaults::{NO_BOUND_MARKERS, RESEARCHED_DEFAULTS};
use crate::error::{LithologyError, Result};
use crate::types::{Bound, LithologyRule, RangeBound, RangeRuleSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Format-neutral view of one `low`/`high` value.
enum RawBound<'a> {
    Missing,
    Null,
    Number(f64),
    Text(&'a str),
    Other(&'static str),
}

fn parse_bound(raw: RawBound<'_>, null_value: f64, context: &str) -> Result<Bound> {
    match raw {
        RawBound::Missing | RawBound::Null => Ok(Bound::Unbounded),
        RawBound::Number(v) if v == null_value => Ok(Bound::Unbounded),
        RawBound::Number(v) if v.is_infinite() => Ok(Bound::Unbounded),
        RawBound::Number(v) if v.is_nan() => Err(LithologyError::Configuration(format!(
            "{context}: NaN is not a valid bound"
        ))),
        RawBound::Number(v) => Ok(Bound::Finite(v)),
        RawBound::Text(s) => {
            let trimmed = s.trim();
            if NO_BOUND_MARKERS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(trimmed))
            {
                return Ok(Bound::Unbounded);
            }
            match trimmed.parse::<f64>() {
                Ok(v) => parse_bound(RawBound::Number(v), null_value, context),
                Err(_) => Err(LithologyError::Configuration(format!(
                    "{context}: '{s}' is neither a number nor a no-bound marker"
                ))),
            }
        }
        RawBound::Other(kind) => Err(LithologyError::Configuration(format!(
            "{context}: expected a number or no-bound marker, found {kind}"
        ))),
    }
}

fn build_bound(
    low: RawBound<'_>,
    high: RawBound<'_>,
    null_value: f64,
    label: &str,
    parameter: &str,
) -> Result<RangeBound> {
    let ctx_low = format!("rule '{label}', parameter '{parameter}', low");
    let ctx_high = format!("rule '{label}', parameter '{parameter}', high");
    let low = parse_bound(low, null_value, &ctx_low)?;
    let high = parse_bound(high, null_value, &ctx_high)?;
    RangeBound::new(low, high).map_err(|e| match e {
        LithologyError::Configuration(msg) => {
            LithologyError::Configuration(format!("rule '{label}', parameter '{parameter}': {msg}"))
        }
        other => other,
    })
}

// ============================================================================
// TOML
// ============================================================================

fn toml_raw(value: Option<&toml::Value>) -> RawBound<'_> {
    match value {
        None => RawBound::Missing,
        Some(toml::Value::Integer(i)) => RawBound::Number(*i as f64),
        Some(toml::Value::Float(f)) => RawBound::Number(*f),
        Some(toml::Value::String(s)) => RawBound::Text(s),
        Some(toml::Value::Boolean(_)) => RawBound::Other("a boolean"),
        Some(toml::Value::Datetime(_)) => RawBound::Other("a datetime"),
        Some(toml::Value::Array(_)) => RawBound::Other("an array"),
        Some(toml::Value::Table(_)) => RawBound::Other("a table"),
    }
}

/// Build a rule set from a `[rules]` table. Table order is rule order.
pub fn rules_from_toml(table: &toml::Table, null_value: f64) -> Result<RangeRuleSet> {
    let mut rules = Vec::with_capacity(table.len());
    for (label, params) in table {
        let params = params.as_table().ok_or_else(|| {
            LithologyError::Configuration(format!(
                "rule '{label}' must be a table of parameter bounds"
            ))
        })?;
        let mut rule = LithologyRule::new(label.as_str());
        for (parameter, spec) in params {
            let spec = spec.as_table().ok_or_else(|| {
                LithologyError::Configuration(format!(
                    "rule '{label}', parameter '{parameter}' must be a {{ low, high }} table"
                ))
            })?;
            let bound = build_bound(
                toml_raw(spec.get("low")),
                toml_raw(spec.get("high")),
                null_value,
                label,
                parameter,
            )?;
            rule.set_bound(parameter.as_str(), bound);
        }
        if rule.bounds().is_empty() {
            warn!(rule = %label, "Rule has no parameter bounds and will match nothing");
        }
        rules.push(rule);
    }
    RangeRuleSet::new(rules)
}

// ============================================================================
// JSON
// ============================================================================

fn json_raw(value: Option<&serde_json::Value>) -> RawBound<'_> {
    match value {
        None => RawBound::Missing,
        Some(serde_json::Value::Null) => RawBound::Null,
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(v) => RawBound::Number(v),
            None => RawBound::Other("an out-of-range number"),
        },
        Some(serde_json::Value::String(s)) => RawBound::Text(s),
        Some(serde_json::Value::Bool(_)) => RawBound::Other("a boolean"),
        Some(serde_json::Value::Array(_)) => RawBound::Other("an array"),
        Some(serde_json::Value::Object(_)) => RawBound::Other("an object"),
    }
}

/// Build a rule set from a JSON document of the same nested shape.
pub fn rules_from_json_str(raw: &str, null_value: f64) -> Result<RangeRuleSet> {
    let doc: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| LithologyError::Configuration(format!("rule file is not valid JSON: {e}")))?;
    let root = doc.as_object().ok_or_else(|| {
        LithologyError::Configuration("rule file must be an object keyed by label".to_string())
    })?;
    let mut rules = Vec::with_capacity(root.len());
    for (label, params) in root {
        let params = params.as_object().ok_or_else(|| {
            LithologyError::Configuration(format!(
                "rule '{label}' must be an object of parameter bounds"
            ))
        })?;
        let mut rule = LithologyRule::new(label.as_str());
        for (parameter, spec) in params {
            let bound = match spec {
                serde_json::Value::Null => RangeBound::new(Bound::Unbounded, Bound::Unbounded)?,
                serde_json::Value::Object(spec) => build_bound(
                    json_raw(spec.get("low")),
                    json_raw(spec.get("high")),
                    null_value,
                    label,
                    parameter,
                )?,
                _ => {
                    return Err(LithologyError::Configuration(format!(
                        "rule '{label}', parameter '{parameter}' must be a {{ low, high }} object"
                    )))
                }
            };
            rule.set_bound(parameter.as_str(), bound);
        }
        if rule.bounds().is_empty() {
            warn!(rule = %label, "Rule has no parameter bounds and will match nothing");
        }
        rules.push(rule);
    }
    RangeRuleSet::new(rules)
}

/// Load a standalone rule file; `.json` is read as JSON, anything else as
/// TOML with the rule table at the document root or under `[rules]`.
pub fn load_rules_file(path: &Path, null_value: f64) -> Result<RangeRuleSet> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        LithologyError::Configuration(format!("cannot read rule file {}: {e}", path.display()))
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let rules = if is_json {
        rules_from_json_str(&contents, null_value)?
    } else {
        let doc: toml::Table = toml::from_str(&contents).map_err(|e| {
            LithologyError::Configuration(format!("rule file {} is not valid TOML: {e}", path.display()))
        })?;
        match doc.get("rules").and_then(toml::Value::as_table) {
            Some(table) => rules_from_toml(table, null_value)?,
            None => rules_from_toml(&doc, null_value)?,
        }
    };
    info!(path = %path.display(), rules = rules.len(), "Loaded lithology rules");
    Ok(rules)
}

// ============================================================================
// Researched defaults
// ============================================================================

fn needs_default(bound: Option<&RangeBound>) -> bool {
    match bound {
        None => true,
        Some(b) => {
            (!b.low().is_finite() && !b.high().is_finite())
                || (b.low() == Bound::Finite(0.0) && b.high() == Bound::Finite(0.0))
        }
    }
}

/// Fill gamma/density bounds from the researched-defaults table for rules
/// that leave those curves unconstrained (or set both sides to zero).
pub fn apply_researched_defaults(
    rules: &RangeRuleSet,
    gamma_parameter: &str,
    density_parameter: &str,
) -> Result<RangeRuleSet> {
    let mut updated = Vec::with_capacity(rules.len());
    for rule in rules.rules() {
        let mut rule = rule.clone();
        if let Some(&(_, g_min, g_max, d_min, d_max)) =
            RESEARCHED_DEFAULTS.iter().find(|(code, ..)| *code == rule.label())
        {
            if needs_default(rule.bound(gamma_parameter)) {
                debug!(rule = %rule.label(), g_min, g_max, "Applying researched gamma defaults");
                rule.set_bound(gamma_parameter, RangeBound::finite(g_min, g_max)?);
            }
            if needs_default(rule.bound(density_parameter)) {
                debug!(rule = %rule.label(), d_min, d_max, "Applying researched density defaults");
                rule.set_bound(density_parameter, RangeBound::finite(d_min, d_max)?);
            }
        }
        updated.push(rule);
    }
    RangeRuleSet::new(updated)
}

//! Rule compilation against a dataset schema.
//!
//! Resolves every parameter name a rule references to a [`ParameterId`]
//! once, so an unknown parameter is reported before any row is scanned and
//! the scan itself does no string lookups.

use crate::error::{LithologyError, Result};
use crate::types::{ParameterId, RangeBound, RangeRuleSet, Sample, Schema};

/// One rule with its bounds resolved to column positions.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub label: String,
    pub checks: Vec<(ParameterId, RangeBound)>,
}

impl CompiledRule {
    /// All bounds satisfied. A rule without bounds matches nothing, and a
    /// missing value fails every bound on its parameter.
    pub fn matches(&self, sample: &Sample) -> bool {
        !self.checks.is_empty()
            && self
                .checks
                .iter()
                .all(|(id, bound)| sample.value(*id).is_some_and(|v| bound.contains(v)))
    }
}

/// Rule set in evaluation order, bound to one schema.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    /// Fails with a configuration error if the set is empty or any rule
    /// references a parameter absent from `schema`.
    pub fn compile(rules: &RangeRuleSet, schema: &Schema) -> Result<Self> {
        rules.ensure_not_empty()?;
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules.rules() {
            let mut checks = Vec::with_capacity(rule.bounds().len());
            for (parameter, bound) in rule.bounds() {
                let id = schema.id(parameter).ok_or_else(|| {
                    LithologyError::Configuration(format!(
                        "rule '{}' references parameter '{}' which is not in the dataset (available: {})",
                        rule.label(),
                        parameter,
                        schema.names().join(", ")
                    ))
                })?;
                checks.push((id, *bound));
            }
            compiled.push(CompiledRule {
                label: rule.label().to_string(),
                checks,
            });
        }
        Ok(Self { rules: compiled })
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule for one sample.
    pub fn first_match(&self, sample: &Sample) -> Option<&CompiledRule> {
        self.rules.iter().find(|r| r.matches(sample))
    }
}

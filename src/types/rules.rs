//! Lithology rule table: label → parameter → (low, high)

use crate::error::{LithologyError, Result};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// One side of a range: a finite number or explicitly open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Finite(f64),
    Unbounded,
}

impl Bound {
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Finite(v) => serializer.serialize_f64(*v),
            Self::Unbounded => serializer.serialize_none(),
        }
    }
}

/// Closed interval `[low, high]` over one parameter.
///
/// Unbounded sides compare as literal −∞/+∞ during classification. Only gap
/// analysis clips them to an observed extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeBound {
    low: Bound,
    high: Bound,
}

impl RangeBound {
    /// Normalised bound; rejects NaN and `low > high`.
    pub fn new(low: Bound, high: Bound) -> Result<Self> {
        for side in [low, high] {
            if let Bound::Finite(v) = side {
                if !v.is_finite() {
                    return Err(LithologyError::Configuration(format!(
                        "bound value {v} is not finite; use an explicit no-bound marker instead"
                    )));
                }
            }
        }
        let bound = Self { low, high };
        if bound.lower() > bound.upper() {
            return Err(LithologyError::Configuration(format!(
                "lower bound {} exceeds upper bound {}",
                bound.lower(),
                bound.upper()
            )));
        }
        Ok(bound)
    }

    pub fn finite(low: f64, high: f64) -> Result<Self> {
        Self::new(Bound::Finite(low), Bound::Finite(high))
    }

    pub fn at_least(low: f64) -> Result<Self> {
        Self::new(Bound::Finite(low), Bound::Unbounded)
    }

    pub fn at_most(high: f64) -> Result<Self> {
        Self::new(Bound::Unbounded, Bound::Finite(high))
    }

    pub fn low(&self) -> Bound {
        self.low
    }

    pub fn high(&self) -> Bound {
        self.high
    }

    pub fn lower(&self) -> f64 {
        match self.low {
            Bound::Finite(v) => v,
            Bound::Unbounded => f64::NEG_INFINITY,
        }
    }

    pub fn upper(&self) -> f64 {
        match self.high {
            Bound::Finite(v) => v,
            Bound::Unbounded => f64::INFINITY,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower() && value <= self.upper()
    }

    /// Replace open sides with an observed extent. `None` if the clipped
    /// interval falls entirely outside `[min, max]`.
    pub fn clip(&self, min: f64, max: f64) -> Option<(f64, f64)> {
        let start = if self.low.is_finite() { self.lower() } else { min };
        let end = if self.high.is_finite() { self.upper() } else { max };
        let start = start.max(min);
        let end = end.min(max);
        (start <= end).then_some((start, end))
    }
}

/// A label plus the parameter bounds a sample must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LithologyRule {
    label: String,
    bounds: Vec<(String, RangeBound)>,
}

impl LithologyRule {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bounds: Vec::new(),
        }
    }

    /// Add or replace the bound for `parameter`.
    pub fn with_bound(mut self, parameter: impl Into<String>, bound: RangeBound) -> Self {
        self.set_bound(parameter, bound);
        self
    }

    pub fn set_bound(&mut self, parameter: impl Into<String>, bound: RangeBound) {
        let parameter = parameter.into();
        if let Some(slot) = self.bounds.iter_mut().find(|(p, _)| *p == parameter) {
            slot.1 = bound;
        } else {
            self.bounds.push((parameter, bound));
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bounds(&self) -> &[(String, RangeBound)] {
        &self.bounds
    }

    pub fn bound(&self, parameter: &str) -> Option<&RangeBound> {
        self.bounds
            .iter()
            .find(|(p, _)| p == parameter)
            .map(|(_, b)| b)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.bounds.iter().map(|(p, _)| p.as_str())
    }
}

/// Ordered, immutable rule sequence indexed by label.
///
/// Order is a semantic input: the classifier assigns the first matching rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeRuleSet {
    rules: Vec<LithologyRule>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RangeRuleSet {
    /// Duplicate labels are rejected. An empty set is representable; the
    /// classifier and gap analyzer refuse to run on it.
    pub fn new(rules: Vec<LithologyRule>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if rule.label.trim().is_empty() {
                return Err(LithologyError::Configuration(format!(
                    "rule #{} has an empty label",
                    i + 1
                )));
            }
            if index.insert(rule.label.clone(), i).is_some() {
                return Err(LithologyError::Configuration(format!(
                    "duplicate rule label '{}'",
                    rule.label
                )));
            }
        }
        Ok(Self { rules, index })
    }

    pub fn rules(&self) -> &[LithologyRule] {
        &self.rules
    }

    pub fn get(&self, label: &str) -> Option<&LithologyRule> {
        self.index.get(label).map(|&i| &self.rules[i])
    }

    /// Position of a label in evaluation order.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every parameter referenced by any rule, first-seen order.
    pub fn parameters(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for p in self.rules.iter().flat_map(LithologyRule::parameters) {
            if !seen.contains(&p) {
                seen.push(p);
            }
        }
        seen
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<()> {
        if self.rules.is_empty() {
            Err(LithologyError::Configuration(
                "rule set is empty; at least one lithology rule is required".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

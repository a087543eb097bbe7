//! Lithology units: contiguous depth intervals sharing one label

use crate::error::{LithologyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Presentation attributes attached to a unit by label lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weathering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
}

/// Label → display attributes. Unmapped labels resolve to empty attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTable {
    entries: HashMap<String, DisplayAttributes>,
}

impl DisplayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, attrs: DisplayAttributes) {
        self.entries.insert(label.into(), attrs);
    }

    pub fn with(mut self, label: impl Into<String>, attrs: DisplayAttributes) -> Self {
        self.insert(label, attrs);
        self
    }

    pub fn resolve(&self, label: &str) -> DisplayAttributes {
        self.entries.get(label).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DisplayAttributes)> for DisplayTable {
    fn from_iter<T: IntoIterator<Item = (String, DisplayAttributes)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A maximal run of same-label samples, as a half-open depth interval.
///
/// Thickness is derived from the two depths on every call; it is never
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LithologyUnit {
    from_depth: f64,
    to_depth: f64,
    lithology: String,
    display: DisplayAttributes,
}

impl LithologyUnit {
    pub fn new(
        from_depth: f64,
        to_depth: f64,
        lithology: impl Into<String>,
        display: DisplayAttributes,
    ) -> Result<Self> {
        let lithology = lithology.into();
        if !from_depth.is_finite() || !to_depth.is_finite() || to_depth <= from_depth {
            return Err(LithologyError::Validation(format!(
                "unit '{lithology}' has invalid depth interval {from_depth}..{to_depth}"
            )));
        }
        Ok(Self {
            from_depth,
            to_depth,
            lithology,
            display,
        })
    }

    pub fn from_depth(&self) -> f64 {
        self.from_depth
    }

    pub fn to_depth(&self) -> f64 {
        self.to_depth
    }

    pub fn thickness(&self) -> f64 {
        self.to_depth - self.from_depth
    }

    pub fn lithology(&self) -> &str {
        &self.lithology
    }

    pub fn display(&self) -> &DisplayAttributes {
        &self.display
    }

    /// Copy of this unit over a new interval. Used by merge passes so
    /// existing units are never mutated in place.
    pub fn spanning(&self, from_depth: f64, to_depth: f64) -> Result<Self> {
        Self::new(from_depth, to_depth, self.lithology.clone(), self.display.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thickness_is_derived() {
        let unit = LithologyUnit::new(10.0, 25.0, "CO", DisplayAttributes::default())
            .expect("unit");
        assert_eq!(unit.thickness(), 15.0);
        let wider = unit.spanning(5.0, 25.0).expect("unit");
        assert_eq!(wider.thickness(), 20.0);
        assert_eq!(unit.thickness(), 15.0);
    }

    #[test]
    fn test_empty_interval_rejected() {
        assert!(LithologyUnit::new(10.0, 10.0, "CO", DisplayAttributes::default()).is_err());
        assert!(LithologyUnit::new(10.0, 9.0, "CO", DisplayAttributes::default()).is_err());
    }

    #[test]
    fn test_unmapped_label_resolves_empty() {
        let table = DisplayTable::new().with(
            "SS",
            DisplayAttributes {
                colour: Some("yellow".into()),
                ..Default::default()
            },
        );
        assert_eq!(table.resolve("SS").colour.as_deref(), Some("yellow"));
        assert_eq!(table.resolve("XX"), DisplayAttributes::default());
    }
}

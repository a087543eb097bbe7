//! Depth-indexed well-log samples and the dataset that holds them

use crate::error::{LithologyError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Index of a parameter column within a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub usize);

/// Fixed, validated set of numeric parameter names for one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    names: Vec<String>,
    index: HashMap<String, ParameterId>,
}

impl Schema {
    /// Build a schema from parameter names. Duplicate names are rejected.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for name in names {
            let name = name.into();
            if schema.index.contains_key(&name) {
                return Err(LithologyError::Validation(format!(
                    "duplicate parameter column '{name}'"
                )));
            }
            schema.index.insert(name.clone(), ParameterId(schema.names.len()));
            schema.names.push(name);
        }
        Ok(schema)
    }

    pub fn id(&self, name: &str) -> Option<ParameterId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: ParameterId) -> &str {
        &self.names[id.0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fail with a validation error naming every missing column.
    pub fn require(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.index.contains_key(*name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LithologyError::Validation(format!(
                "required columns absent from dataset: {}",
                missing.join(", ")
            )))
        }
    }
}

/// One depth-indexed record.
///
/// `values` is positional against the owning dataset's [`Schema`]; `None`
/// means the reading is unknown and satisfies no finite bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub depth: f64,
    pub values: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl Sample {
    pub fn new(depth: f64, values: Vec<Option<f64>>) -> Self {
        Self {
            depth,
            values,
            reference_label: None,
            qualifier: None,
        }
    }

    pub fn with_reference(mut self, label: impl Into<String>) -> Self {
        self.reference_label = Some(label.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Present, finite value for a parameter.
    pub fn value(&self, id: ParameterId) -> Option<f64> {
        self.values
            .get(id.0)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}

/// Options applied while assembling a [`Dataset`] from loader records.
#[derive(Debug, Clone, Copy)]
pub struct DatasetOptions {
    /// Samples at or above this depth are discarded.
    pub casing_depth: Option<f64>,
    /// Numeric value treated as "no reading".
    pub null_value: Option<f64>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            casing_depth: None,
            null_value: Some(crate::config::defaults::NULL_VALUE),
        }
    }
}

/// Ordered sample sequence plus the schema its values are laid out against.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    samples: Vec<Sample>,
}

impl Dataset {
    /// Assemble a dataset, applying null-sentinel and casing-depth hygiene.
    ///
    /// Depth order is not enforced here; the unit grouper rejects unsorted
    /// input instead of silently re-sorting it.
    pub fn new(schema: Schema, samples: Vec<Sample>, options: DatasetOptions) -> Result<Self> {
        let width = schema.len();
        let mut kept = Vec::with_capacity(samples.len());
        for (row, mut sample) in samples.into_iter().enumerate() {
            if !sample.depth.is_finite() {
                return Err(LithologyError::Validation(format!(
                    "row {row}: depth is not a finite number"
                )));
            }
            if sample.values.len() != width {
                return Err(LithologyError::Validation(format!(
                    "row {row}: expected {width} parameter values, found {}",
                    sample.values.len()
                )));
            }
            if let Some(casing) = options.casing_depth {
                if sample.depth <= casing {
                    continue;
                }
            }
            if let Some(null) = options.null_value {
                for v in &mut sample.values {
                    if matches!(v, Some(x) if *x == null || !x.is_finite()) {
                        *v = None;
                    }
                }
            }
            kept.push(sample);
        }
        Ok(Self {
            schema,
            samples: kept,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Present values of one parameter, in depth order.
    pub fn column(&self, id: ParameterId) -> impl Iterator<Item = Option<f64>> + '_ {
        self.samples.iter().map(move |s| s.value(id))
    }
}

/// A dataset paired with one classifier output label per sample.
///
/// Owned by a single pipeline call; never persisted.
#[derive(Debug, Clone)]
pub struct ClassifiedDataset<'a> {
    dataset: &'a Dataset,
    labels: Vec<String>,
}

impl<'a> ClassifiedDataset<'a> {
    pub fn new(dataset: &'a Dataset, labels: Vec<String>) -> Result<Self> {
        if labels.len() != dataset.len() {
            return Err(LithologyError::Validation(format!(
                "label count {} does not match sample count {}",
                labels.len(),
                dataset.len()
            )));
        }
        Ok(Self { dataset, labels })
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// (sample, classified label) pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&Sample, &str)> + '_ {
        self.dataset
            .samples()
            .iter()
            .zip(self.labels.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(["GR", "RHOB"]).expect("schema")
    }

    #[test]
    fn test_duplicate_column_rejected() {
        assert!(Schema::new(["GR", "GR"]).is_err());
    }

    #[test]
    fn test_require_names_missing_columns() {
        let err = schema().require(&["GR", "DT", "NPHI"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DT"));
        assert!(msg.contains("NPHI"));
        assert!(!msg.contains("GR,"));
    }

    #[test]
    fn test_casing_cutoff_and_null_sentinel() {
        let samples = vec![
            Sample::new(5.0, vec![Some(10.0), Some(2.3)]),
            Sample::new(10.0, vec![Some(11.0), Some(2.4)]),
            Sample::new(10.5, vec![Some(-999.25), Some(2.5)]),
        ];
        let ds = Dataset::new(
            schema(),
            samples,
            DatasetOptions {
                casing_depth: Some(10.0),
                null_value: Some(-999.25),
            },
        )
        .expect("dataset");

        assert_eq!(ds.len(), 1);
        assert_eq!(ds.samples()[0].depth, 10.5);
        assert_eq!(ds.samples()[0].values[0], None);
        assert_eq!(ds.samples()[0].value(ParameterId(1)), Some(2.5));
    }

    #[test]
    fn test_width_mismatch_is_validation_error() {
        let err = Dataset::new(
            schema(),
            vec![Sample::new(1.0, vec![Some(1.0)])],
            DatasetOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LithologyError::Validation(_)));
    }

    #[test]
    fn test_classified_dataset_length_checked() {
        let ds = Dataset::new(
            schema(),
            vec![Sample::new(1.0, vec![None, None])],
            DatasetOptions::default(),
        )
        .expect("dataset");
        assert!(ClassifiedDataset::new(&ds, vec![]).is_err());
        let cd = ClassifiedDataset::new(&ds, vec!["SS".into()]).expect("classified");
        assert_eq!(cd.iter().next().map(|(_, l)| l), Some("SS"));
    }
}

//! Per-group descriptive statistics.
//!
//! One pass over the samples, accumulating count / sum / sum of squares /
//! min / max for each (reference label, qualifier) group and parameter.

use crate::types::{Dataset, GroupSummary, ParameterId, ParameterStats};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.sum_sq += v * v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn finish(&self) -> Option<ParameterStats> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let std_dev = if self.count > 1 {
            ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };
        Some(ParameterStats {
            count: self.count,
            mean,
            std_dev,
            min: self.min,
            max: self.max,
        })
    }
}

type GroupKey = (String, Option<String>);

/// Reference-label statistics builder
pub struct Summarizer;

impl Summarizer {
    /// Statistics per reference label, or per (reference label, qualifier)
    /// when `by_qualifier` is set. Samples without a reference label are
    /// skipped; missing values only drop out of their own parameter.
    ///
    /// Groups come back sorted by key.
    pub fn summarize(dataset: &Dataset, by_qualifier: bool) -> Vec<GroupSummary> {
        let width = dataset.schema().len();
        let mut groups: BTreeMap<GroupKey, (usize, Vec<Accumulator>)> = BTreeMap::new();

        for sample in dataset.samples() {
            let Some(reference) = sample.reference_label.as_ref() else {
                continue;
            };
            let qualifier = if by_qualifier {
                sample.qualifier.clone()
            } else {
                None
            };
            let (count, accs) = groups
                .entry((reference.clone(), qualifier))
                .or_insert_with(|| (0, vec![Accumulator::new(); width]));
            *count += 1;
            for (i, acc) in accs.iter_mut().enumerate() {
                if let Some(v) = sample.value(ParameterId(i)) {
                    acc.push(v);
                }
            }
        }

        let names = dataset.schema().names();
        groups
            .into_iter()
            .map(|((reference_label, qualifier), (sample_count, accs))| GroupSummary {
                reference_label,
                qualifier,
                sample_count,
                parameters: names
                    .iter()
                    .zip(&accs)
                    .filter_map(|(name, acc)| acc.finish().map(|s| (name.clone(), s)))
                    .collect(),
            })
            .collect()
    }
}

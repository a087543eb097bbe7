//! Reference-vs-classified agreement.
//!
//! Builds a contingency table (reference label rows x classified label
//! columns), row-normalised so each row reads as "where did this reference
//! class end up", plus overall agreement and a chi-square test of
//! independence.

use crate::types::ClassifiedDataset;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Counts and row proportions. Labels are sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub reference_labels: Vec<String>,
    pub classified_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    /// `counts` divided by the row total; every row sums to 1.0.
    pub proportions: Vec<Vec<f64>>,
}

impl ContingencyTable {
    pub fn row_total(&self, row: usize) -> usize {
        self.counts.get(row).map_or(0, |r| r.iter().sum())
    }

    /// Proportion of `reference` samples classified as `classified`.
    pub fn proportion(&self, reference: &str, classified: &str) -> Option<f64> {
        let r = self.reference_labels.iter().position(|l| l == reference)?;
        let c = self.classified_labels.iter().position(|l| l == classified)?;
        Some(self.proportions[r][c])
    }
}

/// Pearson chi-square test of independence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub table: ContingencyTable,
    /// Samples carrying both labels.
    pub compared: usize,
    /// Samples whose two labels are equal.
    pub matched: usize,
    /// Samples left out for lacking a reference label.
    pub excluded: usize,
    /// `matched / compared`; `None` when nothing could be compared.
    pub agreement: Option<f64>,
    /// `None` for a 1xN or Nx1 table.
    pub chi_square: Option<ChiSquareTest>,
}

/// Contingency-table comparator
pub struct Comparator;

impl Comparator {
    pub fn compare(classified: &ClassifiedDataset<'_>) -> Comparison {
        let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        let mut excluded = 0usize;
        for (sample, label) in classified.iter() {
            match sample.reference_label.as_deref() {
                Some(reference) => *pairs.entry((reference, label)).or_insert(0) += 1,
                None => excluded += 1,
            }
        }

        let mut reference_labels: Vec<String> = pairs.keys().map(|(r, _)| r.to_string()).collect();
        reference_labels.dedup();
        let mut classified_labels: Vec<String> =
            pairs.keys().map(|(_, c)| c.to_string()).collect();
        classified_labels.sort();
        classified_labels.dedup();

        let mut counts = vec![vec![0usize; classified_labels.len()]; reference_labels.len()];
        for (&(reference, label), &n) in &pairs {
            let r = reference_labels.iter().position(|l| l == reference);
            let c = classified_labels.iter().position(|l| l == label);
            if let (Some(r), Some(c)) = (r, c) {
                counts[r][c] = n;
            }
        }

        let proportions = counts
            .iter()
            .map(|row| {
                let total: usize = row.iter().sum();
                row.iter()
                    .map(|&n| if total == 0 { 0.0 } else { n as f64 / total as f64 })
                    .collect()
            })
            .collect();

        let compared: usize = pairs.values().sum();
        let matched: usize = pairs
            .iter()
            .filter(|((r, c), _)| r == c)
            .map(|(_, n)| n)
            .sum();
        let agreement = (compared > 0).then(|| matched as f64 / compared as f64);

        let table = ContingencyTable {
            reference_labels,
            classified_labels,
            counts,
            proportions,
        };
        let chi_square = chi_square_test(&table.counts);

        info!(
            compared,
            matched,
            excluded,
            agreement = agreement.unwrap_or(f64::NAN),
            "Comparison complete"
        );

        Comparison {
            table,
            compared,
            matched,
            excluded,
            agreement,
            chi_square,
        }
    }
}

fn chi_square_test(counts: &[Vec<usize>]) -> Option<ChiSquareTest> {
    let rows = counts.len();
    let cols = counts.first().map_or(0, Vec::len);
    if rows < 2 || cols < 2 {
        return None;
    }
    let row_totals: Vec<f64> = counts.iter().map(|r| r.iter().sum::<usize>() as f64).collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|c| counts.iter().map(|r| r[c]).sum::<usize>() as f64)
        .collect();
    let total: f64 = row_totals.iter().sum();

    let mut statistic = 0.0;
    for (r, row) in counts.iter().enumerate() {
        for (c, &observed) in row.iter().enumerate() {
            let expected = row_totals[r] * col_totals[c] / total;
            if expected > 0.0 {
                statistic += (observed as f64 - expected).powi(2) / expected;
            }
        }
    }

    let degrees_of_freedom = (rows - 1) * (cols - 1);
    match ChiSquared::new(degrees_of_freedom as f64) {
        Ok(dist) => Some(ChiSquareTest {
            statistic,
            degrees_of_freedom,
            p_value: (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        }),
        Err(e) => {
            warn!(error = %e, "Chi-square distribution unavailable");
            None
        }
    }
}

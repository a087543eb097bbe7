//! Lithology report: per-label sample share, unit count, cumulative
//! thickness, and distribution of one chosen parameter.

use crate::error::{LithologyError, Result};
use crate::types::{ClassifiedDataset, LithologyUnit, RangeRuleSet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Distribution {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        Some(Self {
            min: values[0],
            max: values[n - 1],
            mean: values.iter().sum::<f64>() / n as f64,
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LithologyReportRow {
    pub lithology: String,
    pub sample_count: usize,
    /// Share of all samples, 0-100.
    pub percentage: f64,
    pub unit_count: usize,
    pub total_thickness: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LithologyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    pub rows: Vec<LithologyReportRow>,
}

impl LithologyReport {
    /// One row per rule label (rule order, including labels nothing was
    /// classified as), then any other assigned label such as `Unknown`.
    ///
    /// `parameter` must exist in the dataset schema.
    pub fn build(
        classified: &ClassifiedDataset<'_>,
        units: &[LithologyUnit],
        rules: &RangeRuleSet,
        parameter: Option<&str>,
    ) -> Result<Self> {
        let param_id = match parameter {
            Some(name) => Some(classified.dataset().schema().id(name).ok_or_else(|| {
                LithologyError::Configuration(format!(
                    "report parameter '{name}' is not in the dataset"
                ))
            })?),
            None => None,
        };

        let mut labels: Vec<String> = rules.rules().iter().map(|r| r.label().to_string()).collect();
        let extra: BTreeSet<&str> = classified
            .labels()
            .iter()
            .map(String::as_str)
            .filter(|l| rules.get(l).is_none())
            .collect();
        labels.extend(extra.into_iter().map(str::to_string));

        let total = classified.len();
        let rows = labels
            .into_iter()
            .map(|label| {
                let members: Vec<_> = classified.iter().filter(|(_, l)| *l == label).collect();
                let sample_count = members.len();
                let matching_units = units.iter().filter(|u| u.lithology() == label);
                let (unit_count, total_thickness) = matching_units
                    .fold((0usize, 0.0), |(n, t), u| (n + 1, t + u.thickness()));
                let distribution = param_id.and_then(|id| {
                    Distribution::from_values(members.iter().filter_map(|(s, _)| s.value(id)).collect())
                });
                LithologyReportRow {
                    percentage: if total == 0 {
                        0.0
                    } else {
                        sample_count as f64 * 100.0 / total as f64
                    },
                    lithology: label,
                    sample_count,
                    unit_count,
                    total_thickness,
                    distribution,
                }
            })
            .collect();

        Ok(Self {
            parameter: parameter.map(str::to_string),
            rows,
        })
    }

    /// Write as CSV; parameter columns are present only when a parameter
    /// was chosen.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut header = vec![
            "lithology".to_string(),
            "sample_count".to_string(),
            "percentage".to_string(),
            "unit_count".to_string(),
            "total_thickness".to_string(),
        ];
        if let Some(p) = &self.parameter {
            for stat in ["min", "max", "mean", "median"] {
                header.push(csv_field(&format!("{p}_{stat}")));
            }
        }
        writeln!(writer, "{}", header.join(","))?;

        for row in &self.rows {
            let mut fields = vec![
                csv_field(&row.lithology),
                row.sample_count.to_string(),
                format!("{:.2}", row.percentage),
                row.unit_count.to_string(),
                format!("{:.3}", row.total_thickness),
            ];
            if self.parameter.is_some() {
                match row.distribution {
                    Some(d) => fields.extend(
                        [d.min, d.max, d.mean, d.median].iter().map(|v| format!("{v:.4}")),
                    ),
                    None => fields.extend(std::iter::repeat(String::new()).take(4)),
                }
            }
            writeln!(writer, "{}", fields.join(","))?;
        }
        writer.flush()
    }

    /// Write the CSV report to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| LithologyError::write(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)
            .map_err(|e| LithologyError::write(path, e))?;
        info!(path = %path.display(), rows = self.rows.len(), "Wrote lithology report");
        Ok(())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

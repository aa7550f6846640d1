use crate::{
    config::EvalConfig,
    model::valid::{EvalReport, FoldResult},
    utils::metrics::{Average, accuracy_score, f1_score, round3},
};
use burn::config::Config;
use color_eyre::{Result, eyre::WrapErr};
use log::info;
use serde::Serialize;
use std::{fmt, fs::File, io::BufWriter, path::Path};

const COLUMNS: [&str; 3] = ["Accuracy", "F1-Score (macro)", "F1-Score (weighted)"];

/// Per-fold scores, rounded to three decimals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FoldMetrics {
    pub accuracy: f64,
    pub f1_macro: f64,
    pub f1_weighted: f64,
}

impl FoldMetrics {
    pub fn compute(labels: &[usize], predictions: &[usize]) -> Result<Self> {
        Ok(Self {
            accuracy: round3(accuracy_score(labels, predictions)?),
            f1_macro: round3(f1_score(labels, predictions, Average::Macro)?),
            f1_weighted: round3(f1_score(labels, predictions, Average::Weighted)?),
        })
    }

    fn values(&self) -> [f64; 3] {
        [self.accuracy, self.f1_macro, self.f1_weighted]
    }
}

/// One row per evaluated fold, indexed like the experiment's fold order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsTable {
    rows: Vec<(String, FoldMetrics)>,
}

impl MetricsTable {
    pub fn push(&mut self, index: impl ToString, metrics: FoldMetrics) {
        self.rows.push((index.to_string(), metrics));
    }

    pub fn rows(&self) -> &[(String, FoldMetrics)] {
        &self.rows
    }

    pub fn mean(&self) -> Option<FoldMetrics> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        let sum = |f: fn(&FoldMetrics) -> f64| self.rows.iter().map(|(_, m)| f(m)).sum::<f64>();
        Some(FoldMetrics {
            accuracy: round3(sum(|m| m.accuracy) / n),
            f1_macro: round3(sum(|m| m.f1_macro) / n),
            f1_weighted: round3(sum(|m| m.f1_weighted) / n),
        })
    }
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<(String, [String; 3])> = self
            .rows
            .iter()
            .map(|(idx, m)| (idx.clone(), m.values().map(|v| v.to_string())))
            .collect();

        let index_width = cells.iter().map(|(idx, _)| idx.len()).max().unwrap_or(0);
        let widths: Vec<usize> = COLUMNS
            .iter()
            .enumerate()
            .map(|(c, header)| {
                cells
                    .iter()
                    .map(|(_, values)| values[c].len())
                    .chain([header.len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (header, width) in COLUMNS.iter().zip(&widths) {
            write!(f, "  {header:>width$}")?;
        }
        for (idx, values) in &cells {
            write!(f, "\n{idx:<index_width$}")?;
            for (value, width) in values.iter().zip(&widths) {
                write!(f, "  {value:>width$}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct MetricsRow<'a> {
    fold: &'a str,
    accuracy: f64,
    f1_macro: f64,
    f1_weighted: f64,
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    filename: &'a str,
    group: &'a str,
    label: usize,
    prediction: usize,
    probabilities: String,
}

fn write_metrics(path: &Path, folds: &[FoldResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    for fold in folds {
        let name = fold.fold.to_string();
        writer.serialize(MetricsRow {
            fold: &name,
            accuracy: fold.metrics.accuracy,
            f1_macro: fold.metrics.f1_macro,
            f1_weighted: fold.metrics.f1_weighted,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn write_predictions(path: &Path, folds: &[FoldResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    for record in folds.iter().flat_map(|f| &f.records) {
        let probabilities = record
            .probabilities
            .iter()
            .map(|p| format!("{p:.6}"))
            .collect::<Vec<_>>()
            .join(";");
        writer.serialize(PredictionRow {
            filename: &record.filename,
            group: &record.group,
            label: record.label,
            prediction: record.prediction,
            probabilities,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `config.json`, `metrics.csv`, `predictions.csv` and `report.json` into `dir`.
pub fn save_report(dir: &Path, config: &EvalConfig, report: &EvalReport) -> Result<()> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create output directory {}", dir.display()))?;

    config
        .save(dir.join("config.json"))
        .wrap_err("Failed to save evaluation config JSON")?;
    write_metrics(&dir.join("metrics.csv"), &report.folds)?;
    write_predictions(&dir.join("predictions.csv"), &report.folds)?;

    let file = File::create(dir.join("report.json")).wrap_err("Failed to create report.json")?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .wrap_err("Failed to write report.json")?;

    info!("Results written to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(accuracy: f64, f1_macro: f64, f1_weighted: f64) -> FoldMetrics {
        FoldMetrics {
            accuracy,
            f1_macro,
            f1_weighted,
        }
    }

    #[test]
    fn compute_rounds_every_score() {
        let m = FoldMetrics::compute(&[0, 1, 2, 0, 1, 2], &[0, 2, 1, 0, 0, 1]).unwrap();
        assert_eq!(m, metrics(0.333, 0.267, 0.267));
    }

    #[test]
    fn renders_like_a_dataframe() {
        let mut table = MetricsTable::default();
        table.push(0, metrics(0.912, 0.87, 0.9));
        table.push(1, metrics(0.88, 0.851, 0.879));

        let expected = concat!(
            "   Accuracy  F1-Score (macro)  F1-Score (weighted)\n",
            "0     0.912              0.87                  0.9\n",
            "1      0.88             0.851                0.879",
        );
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn mean_over_rows() {
        let mut table = MetricsTable::default();
        assert!(table.mean().is_none());
        table.push(0, metrics(0.9, 0.8, 0.7));
        table.push(1, metrics(0.8, 0.6, 0.5));
        assert_eq!(table.mean(), Some(metrics(0.85, 0.7, 0.6)));
    }
}

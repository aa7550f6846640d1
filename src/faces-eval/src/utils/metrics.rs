use color_eyre::{Result, eyre::bail};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Unweighted mean of per-class F1.
    Macro,
    /// Per-class F1 weighted by true-label support.
    Weighted,
}

fn check_inputs(y_true: &[usize], y_pred: &[usize]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        bail!(
            "Label/prediction length mismatch: {} vs {}",
            y_true.len(),
            y_pred.len()
        );
    }
    if y_true.is_empty() {
        bail!("Cannot score an empty prediction set");
    }
    Ok(())
}

pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ClassCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl ClassCounts {
    fn support(&self) -> usize {
        self.tp + self.fn_
    }

    /// `2tp / (2tp + fp + fn)`, zero when the class never occurs.
    fn f1(&self) -> f64 {
        let denom = 2 * self.tp + self.fp + self.fn_;
        if denom == 0 {
            0.0
        } else {
            (2 * self.tp) as f64 / denom as f64
        }
    }
}

/// Counts keyed by every label present in either `y_true` or `y_pred`.
fn class_counts(y_true: &[usize], y_pred: &[usize]) -> BTreeMap<usize, ClassCounts> {
    let mut counts: BTreeMap<usize, ClassCounts> = BTreeMap::new();
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t == p {
            counts.entry(t).or_default().tp += 1;
        } else {
            counts.entry(t).or_default().fn_ += 1;
            counts.entry(p).or_default().fp += 1;
        }
    }
    counts
}

pub fn f1_score(y_true: &[usize], y_pred: &[usize], average: Average) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let counts = class_counts(y_true, y_pred);

    let score = match average {
        Average::Macro => counts.values().map(ClassCounts::f1).sum::<f64>() / counts.len() as f64,
        Average::Weighted => {
            let total: usize = counts.values().map(ClassCounts::support).sum();
            counts
                .values()
                .map(|c| c.f1() * c.support() as f64)
                .sum::<f64>()
                / total as f64
        }
    };
    Ok(score)
}

/// Rounds to three decimals from the exact binary value, ties to even, the
/// way Python's `round(x, 3)` does.
pub fn round3(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}

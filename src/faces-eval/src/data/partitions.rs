use crate::data::fold::Fold;
use color_eyre::{
    Report, Result,
    eyre::{WrapErr, bail, eyre},
};
use csv::{ReaderBuilder, StringRecord};
use std::{fmt, path::Path, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            "test" => Ok(Split::Test),
            other => bail!("Unknown split {other:?}"),
        }
    }
}

/// A row of the partition table that belongs to the requested fold/split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionEntry {
    pub filename: String,
    pub label: usize,
}

fn column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| eyre!("Column {name:?} missing from {}", path.display()))
}

/// Reads `partitions.csv` and keeps the rows whose `<fold>` column equals `split`,
/// in file order.
pub fn read_partition(path: &Path, fold: Fold, split: Split) -> Result<Vec<PartitionEntry>> {
    if !path.exists() {
        bail!("Partition file not found: {}", path.display());
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .wrap_err_with(|| format!("Failed to open partition file {}", path.display()))?;

    let headers = reader
        .headers()
        .wrap_err("Failed to read partition header")?
        .clone();
    let filename_col = column(&headers, "filename", path)?;
    let label_col = column(&headers, "label", path)?;
    let fold_col = column(&headers, &fold.to_string(), path)?;

    let mut entries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.wrap_err_with(|| format!("Malformed row {} in partition file", line + 2))?;
        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

        if field(fold_col) != split.as_str() {
            continue;
        }
        let label = field(label_col).parse::<usize>().wrap_err_with(|| {
            format!(
                "Row {}: label {:?} is not a class index",
                line + 2,
                field(label_col)
            )
        })?;
        entries.push(PartitionEntry {
            filename: field(filename_col).to_string(),
            label,
        });
    }

    Ok(entries)
}

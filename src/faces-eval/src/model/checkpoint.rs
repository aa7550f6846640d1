use crate::model::resnet::{FaceResNet, FaceResNetRecord, ResNetConfig};
use burn::{
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use color_eyre::{
    Result,
    eyre::{WrapErr, bail, eyre},
};
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

const PREFIX: &str = "epoch-";
const ACCURACY_MARKER: &str = "-test_accuracy-";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CheckpointFormat {
    /// PyTorch `state_dict` (`.pt` / `.pth`).
    PyTorch,
    /// Burn `CompactRecorder` record (`.mpk`).
    Burn,
}

impl CheckpointFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "pt" | "pth" => Some(Self::PyTorch),
            "mpk" => Some(Self::Burn),
            _ => None,
        }
    }
}

/// A per-epoch checkpoint whose file name carries its validation accuracy,
/// e.g. `epoch-12-test_accuracy-0.8731.pt`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub val_accuracy: f64,
    pub format: CheckpointFormat,
}

/// Extracts the accuracy following the last `-test_accuracy-` marker.
pub fn parse_val_accuracy(file_name: &str) -> Option<f64> {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let (_, accuracy) = stem.rsplit_once(ACCURACY_MARKER)?;
    accuracy.parse().ok()
}

/// Lists `epoch-*` checkpoints in `dir`, sorted by file name.
pub fn list_checkpoints(dir: &Path) -> Result<Vec<Checkpoint>> {
    if !dir.is_dir() {
        bail!("Checkpoint directory not found: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && CheckpointFormat::from_path(path).is_some()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(PREFIX))
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let val_accuracy = parse_val_accuracy(name).ok_or_else(|| {
                eyre!(
                    "Checkpoint {} does not encode a validation accuracy",
                    path.display()
                )
            })?;
            let format = CheckpointFormat::from_path(&path)
                .ok_or_else(|| eyre!("Unsupported checkpoint {}", path.display()))?;
            Ok(Checkpoint {
                path,
                val_accuracy,
                format,
            })
        })
        .collect()
}

/// Picks the checkpoint with the highest encoded validation accuracy. Ties go
/// to the first one in file-name order.
pub fn select_best_checkpoint(dir: &Path) -> Result<Checkpoint> {
    let checkpoints = list_checkpoints(dir)?;
    debug!("{} checkpoints in {}", checkpoints.len(), dir.display());

    checkpoints
        .into_iter()
        .fold(None, |best: Option<Checkpoint>, candidate| match best {
            Some(best) if best.val_accuracy >= candidate.val_accuracy => Some(best),
            _ => Some(candidate),
        })
        .ok_or_else(|| eyre!("No epoch-* checkpoints found in {}", dir.display()))
}

fn pytorch_load_args(path: &Path) -> LoadArgs {
    LoadArgs::new(path.to_path_buf())
        // Strip the DataParallel wrapper prefix
        .with_key_remap(r"^module\.(.+)$", "$1")
        // Map top-level batchnorm 'bn1' to 'norm1'
        .with_key_remap(r"^bn1\.(.+)$", "norm1.$1")
        // Map bottleneck convolutions
        .with_key_remap(
            r"^layer([1-4])\.(\d+)\.conv([123])\.(.+)$",
            "layer$1.blocks.$2.conv$3.$4",
        )
        // Map bottleneck batchnorms
        .with_key_remap(
            r"^layer([1-4])\.(\d+)\.bn([123])\.(.+)$",
            "layer$1.blocks.$2.norm$3.$4",
        )
        // Map projection shortcut convolution
        .with_key_remap(
            r"^layer([1-4])\.(\d+)\.downsample\.0\.(.+)$",
            "layer$1.blocks.$2.downsample.conv.$3",
        )
        // Map projection shortcut batchnorm
        .with_key_remap(
            r"^layer([1-4])\.(\d+)\.downsample\.1\.(.+)$",
            "layer$1.blocks.$2.downsample.norm.$3",
        )
}

/// Builds the network described by `config` and fills it from `checkpoint`.
pub fn load_model<B: Backend>(
    checkpoint: &Checkpoint,
    config: &ResNetConfig,
    device: &Device<B>,
) -> Result<FaceResNet<B>> {
    let path = &checkpoint.path;
    if !path.exists() {
        bail!("Missing checkpoint file: {}", path.display());
    }

    let record: FaceResNetRecord<B> = match checkpoint.format {
        CheckpointFormat::PyTorch => PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(pytorch_load_args(path), device)
            .wrap_err_with(|| {
                format!(
                    "Failed to load / map PyTorch state dict {} into a ResNet record",
                    path.display()
                )
            })?,
        CheckpointFormat::Burn => CompactRecorder::new()
            .load(path.clone(), device)
            .wrap_err_with(|| format!("Failed to load Burn record {}", path.display()))?,
    };

    Ok(config.init::<B>(device).load_record(record))
}

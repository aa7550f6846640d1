use crate::{
    common::{ARCHITECTURE, IMAGE_SIZE, NUM_CLASSES, PARTITIONS_FILE, RESULTS_DIR},
    data::fold::Fold,
    model::resnet::ResNetConfig,
};
use burn::prelude::*;
use std::path::{Path, PathBuf};

/// Everything one evaluation run needs. Saved next to the results so a table
/// can be traced back to its inputs.
#[derive(Config, Debug)]
pub struct EvalConfig {
    pub model: ResNetConfig,

    /// Experiment name; checkpoints live in `<project_root>/results/<architecture>/<fold>`.
    pub architecture: String,

    pub project_root: String,

    pub dataset_root: String,

    /// Partition table, relative to `project_root` unless absolute.
    pub metadata_file: String,

    pub folds: Vec<Fold>,

    #[config(default = 42)]
    pub seed: u64,

    #[config(default = 224)]
    pub image_size: usize,

    #[config(default = 1)]
    pub batch_size: usize,

    #[config(default = false)]
    pub flip: bool,

    pub output_dir: Option<String>,
}

impl EvalConfig {
    /// Defaults of the NIH Faces experiments for a given project and dataset root.
    pub fn nih_faces(project_root: impl Into<String>, dataset_root: impl Into<String>) -> Self {
        Self::new(
            ResNetConfig::resnet50(NUM_CLASSES),
            ARCHITECTURE.to_string(),
            project_root.into(),
            dataset_root.into(),
            PARTITIONS_FILE.to_string(),
            Fold::ALL.to_vec(),
        )
        .with_image_size(IMAGE_SIZE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        Path::new(&self.project_root).join(&self.metadata_file)
    }

    pub fn checkpoint_dir(&self, fold: Fold) -> PathBuf {
        Path::new(&self.project_root)
            .join(RESULTS_DIR)
            .join(&self.architecture)
            .join(fold.to_string())
    }
}

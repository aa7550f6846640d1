use crate::{
    common::{ARCHITECTURE, IMAGE_SIZE, NUM_CLASSES, PARTITIONS_FILE},
    config::EvalConfig,
    data::fold::Fold,
    model::resnet::ResNetConfig,
};
use clap::Parser;
use color_eyre::{Result, eyre::bail};
use log::warn;

fn parse_fold(s: &str) -> std::result::Result<Fold, String> {
    s.parse().map_err(|e: color_eyre::Report| e.to_string())
}

#[derive(Parser, Debug)]
#[command(
    name = "faces-eval",
    about = "Evaluate VGGFace2-pretrained ResNet50 checkpoints on the NIH Faces cross-validation folds"
)]
pub struct Args {
    /// Experiment name; selects results/<architecture>/<fold>.
    #[arg(long, default_value = ARCHITECTURE)]
    pub architecture: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// -1 for CPU, otherwise the CUDA device ordinal.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub device: i32,

    #[arg(long, env = "PROJECT_ROOT", default_value = "./")]
    pub project_root: String,

    /// Root data directory containing an images/ subfolder with all NIH Faces.
    #[arg(long, env = "DATASET_ROOT")]
    pub dataset_folder: String,

    #[arg(long, default_value_t = NUM_CLASSES)]
    pub num_classes: usize,

    /// Evaluate a single fold (fold-1 .. fold-5) instead of all five.
    #[arg(long, value_parser = parse_fold)]
    pub fold: Option<Fold>,

    #[arg(long, default_value = PARTITIONS_FILE)]
    pub metadata_file: String,

    #[arg(long, default_value_t = IMAGE_SIZE)]
    pub image_size: usize,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    /// Directory for metrics.csv, predictions.csv and report.json.
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<String>,
}

/// Where the evaluation runs once `--device` has been checked against the build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceChoice {
    Cpu,
    Cuda(usize),
}

/// Maps a `--device` ordinal to a device. Negative means CPU; a GPU ordinal
/// falls back to CPU when the binary was built without the `cuda` feature.
pub fn resolve_device(device: i32) -> DeviceChoice {
    match usize::try_from(device) {
        Err(_) => DeviceChoice::Cpu,
        Ok(ordinal) if cfg!(feature = "cuda") => DeviceChoice::Cuda(ordinal),
        Ok(ordinal) => {
            warn!("Built without the `cuda` feature; device {ordinal} unavailable, using CPU");
            DeviceChoice::Cpu
        }
    }
}

impl Args {
    pub fn into_config(self) -> Result<EvalConfig> {
        if self.num_classes == 0 {
            bail!("--num-classes must be positive");
        }
        if self.batch_size == 0 {
            bail!("--batch-size must be positive");
        }
        if self.image_size == 0 {
            bail!("--image-size must be positive");
        }

        let folds = match self.fold {
            Some(fold) => vec![fold],
            None => Fold::ALL.to_vec(),
        };

        Ok(EvalConfig::new(
            ResNetConfig::resnet50(self.num_classes),
            self.architecture,
            self.project_root,
            self.dataset_folder,
            self.metadata_file,
            folds,
        )
        .with_seed(self.seed)
        .with_image_size(self.image_size)
        .with_batch_size(self.batch_size)
        .with_output_dir(self.output_dir))
    }
}

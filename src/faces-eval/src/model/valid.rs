use crate::{
    config::EvalConfig,
    data::{
        batch::{FaceBatch, FaceBatcher},
        dataset::NihFacesDataset,
        fold::Fold,
        normalize::NormalizeConfig,
        partitions::Split,
    },
    model::{
        checkpoint::{Checkpoint, load_model, select_best_checkpoint},
        inference::predict,
    },
    utils::report::{FoldMetrics, MetricsTable},
};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use color_eyre::{
    Result,
    eyre::{WrapErr, bail, eyre},
};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleRecord {
    pub filename: String,
    pub label: usize,
    pub prediction: usize,
    pub probabilities: Vec<f32>,
    /// Fold the sample was evaluated in.
    pub group: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FoldResult {
    pub fold: Fold,
    pub checkpoint: Checkpoint,
    pub records: Vec<SampleRecord>,
    pub metrics: FoldMetrics,
}

impl FoldResult {
    pub fn labels(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.label).collect()
    }

    pub fn predictions(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.prediction).collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EvalReport {
    pub architecture: String,
    pub folds: Vec<FoldResult>,
}

impl EvalReport {
    pub fn table(&self) -> MetricsTable {
        let mut table = MetricsTable::default();
        for fold in &self.folds {
            table.push(fold.fold.index(), fold.metrics);
        }
        table
    }
}

/// Scores the best checkpoint of `fold` on that fold's validation split.
pub fn evaluate_fold<B: Backend>(
    config: &EvalConfig,
    fold: Fold,
    device: &Device<B>,
) -> Result<FoldResult> {
    if config.batch_size == 0 {
        bail!("Batch size must be positive");
    }

    let dataset = NihFacesDataset::new(
        &config.dataset_root,
        config.metadata_path(),
        fold,
        Split::Val,
        fold.mean_bgr(),
        config.image_size,
        config.flip,
    )?;
    let num_samples = dataset.len();
    if num_samples == 0 {
        bail!("{fold} has no {} samples", Split::Val);
    }

    let checkpoint = select_best_checkpoint(&config.checkpoint_dir(fold))
        .wrap_err_with(|| format!("No usable checkpoint for {fold}"))?;
    let model = load_model::<B>(&checkpoint, &config.model, device)?;
    info!("model_path: {}", checkpoint.path.display());
    println!("Evaluating VGGFace2-pretrained ResNet50 on NIH Faces ({fold}, N={num_samples})");

    // No shuffling: records keep the partition table order.
    let batcher = FaceBatcher::new(NormalizeConfig::new(dataset.mean_bgr()));
    let dataloader: Arc<dyn DataLoader<B, FaceBatch<B>>> = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .set_device(device.clone())
        .build(dataset);

    let group = fold.to_string();
    let mut records = Vec::with_capacity(num_samples);

    for batch in dataloader.iter() {
        let labels = batch
            .labels
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| eyre!("Failed to read batch labels: {e:?}"))?;
        let predictions = predict(&model, batch.images)?;

        for ((filename, label), prediction) in batch
            .filenames
            .into_iter()
            .zip(labels)
            .zip(predictions)
        {
            let label = label as usize;
            if label >= config.model.num_classes {
                bail!(
                    "{filename}: label {label} outside 0..{}",
                    config.model.num_classes
                );
            }
            debug!("{filename}: label {label}, predicted {}", prediction.class);
            records.push(SampleRecord {
                filename,
                label,
                prediction: prediction.class,
                probabilities: prediction.probabilities,
                group: group.clone(),
            });
        }
    }

    // Samples that fail to load never reach a batch.
    if records.len() != num_samples {
        bail!(
            "Only {} of {num_samples} {fold} samples could be loaded",
            records.len()
        );
    }

    let labels: Vec<usize> = records.iter().map(|r| r.label).collect();
    let predicted: Vec<usize> = records.iter().map(|r| r.prediction).collect();
    let metrics = FoldMetrics::compute(&labels, &predicted)?;
    info!(
        "{fold}: accuracy {:.3}, F1 macro {:.3}, F1 weighted {:.3}",
        metrics.accuracy, metrics.f1_macro, metrics.f1_weighted
    );

    Ok(FoldResult {
        fold,
        checkpoint,
        records,
        metrics,
    })
}

/// Runs every configured fold in order.
pub fn evaluate<B: Backend>(config: &EvalConfig, device: &Device<B>) -> Result<EvalReport> {
    B::seed(config.seed);

    let folds = config
        .folds
        .iter()
        .map(|&fold| {
            evaluate_fold::<B>(config, fold, device)
                .wrap_err_with(|| format!("Evaluation of {fold} failed"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EvalReport {
        architecture: config.architecture.clone(),
        folds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::checkpoint::CheckpointFormat;
    use std::path::PathBuf;

    fn result(fold: u8, accuracy: f64) -> FoldResult {
        FoldResult {
            fold: Fold::new(fold).unwrap(),
            checkpoint: Checkpoint {
                path: PathBuf::from("epoch-1-test_accuracy-0.5.mpk"),
                val_accuracy: 0.5,
                format: CheckpointFormat::Burn,
            },
            records: Vec::new(),
            metrics: FoldMetrics {
                accuracy,
                f1_macro: 0.5,
                f1_weighted: 0.5,
            },
        }
    }

    #[test]
    fn table_rows_are_indexed_by_fold_position() {
        let report = EvalReport {
            architecture: "VGGFace2_ResNet50".into(),
            folds: vec![result(3, 0.75), result(5, 0.5)],
        };
        let table = report.table();
        let indices: Vec<&str> = table.rows().iter().map(|(idx, _)| idx.as_str()).collect();
        assert_eq!(indices, vec!["2", "4"]);
        assert_eq!(table.rows()[0].1.accuracy, 0.75);
    }
}

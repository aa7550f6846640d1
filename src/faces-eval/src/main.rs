use burn::{
    backend::{NdArray, ndarray::NdArrayDevice},
    prelude::*,
};
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use faces_eval::{
    cli::{Args, DeviceChoice, resolve_device},
    config::EvalConfig,
    model::valid::evaluate,
    utils::report::save_report,
};
use log::info;
use std::path::Path;

fn run<B: Backend>(config: &EvalConfig, device: Device<B>) -> Result<()> {
    info!("Running on {device:?}");
    let report = evaluate::<B>(config, &device)?;

    let table = report.table();
    println!("{table}");
    if let Some(mean) = table.mean() {
        info!(
            "Mean over {} folds: accuracy {}, F1 macro {}, F1 weighted {}",
            table.rows().len(),
            mean.accuracy,
            mean.f1_macro,
            mean.f1_weighted
        );
    }

    if let Some(dir) = &config.output_dir {
        save_report(Path::new(dir), config, &report).wrap_err("Failed to persist results")?;
    }
    Ok(())
}

fn dispatch(config: &EvalConfig, device: DeviceChoice) -> Result<()> {
    match device {
        #[cfg(feature = "cuda")]
        DeviceChoice::Cuda(ordinal) => {
            use burn::backend::cuda::{Cuda, CudaDevice};
            run::<Cuda<f32, i32>>(config, CudaDevice::new(ordinal))
        }
        #[cfg(not(feature = "cuda"))]
        DeviceChoice::Cuda(ordinal) => {
            color_eyre::eyre::bail!("CUDA device {ordinal} requested but the `cuda` feature is disabled")
        }
        DeviceChoice::Cpu => run::<NdArray>(config, NdArrayDevice::Cpu),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let device = resolve_device(args.device);
    let config = args.into_config()?;

    dispatch(&config, device)
}

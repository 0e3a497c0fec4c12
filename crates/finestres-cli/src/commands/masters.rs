use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use finestres_core::calibration::{CalibrationConfig, CalibrationSetBuilder};
use finestres_core::stack::CombineMethod;

use crate::progress::BarReporter;
use crate::summary::{print_config_summary, print_masters_summary};

#[derive(Args)]
pub struct MastersArgs {
    /// Folder containing dark and flat frames
    pub dir: PathBuf,

    /// Calibration config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Combine method for both darks and flats, mean or median (overrides the config)
    #[arg(long)]
    pub method: Option<CombineMethod>,

    /// Folder for the generated masters (defaults to the input folder)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Keep masters already present in the folder instead of replacing them
    #[arg(long)]
    pub keep_existing: bool,

    /// Generate masters without writing them
    #[arg(long)]
    pub no_save: bool,
}

pub fn run(args: &MastersArgs) -> Result<()> {
    let mut config: CalibrationConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid calibration config")?
    } else {
        CalibrationConfig::default()
    };
    if let Some(method) = args.method {
        config.dark_method = method;
        config.flat_method = method;
    }
    if args.output_dir.is_some() {
        config.output_dir = args.output_dir.clone();
    }
    if args.keep_existing {
        config.replace_existing = false;
    }
    if args.no_save {
        config.save_masters = false;
    }

    print_config_summary(&args.dir, &config);

    let reporter = BarReporter::new();
    let mut builder = CalibrationSetBuilder::new(config);
    builder
        .scan_directory_reported(&args.dir, &reporter)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;
    let generated = builder.generate_reported(&reporter);
    reporter.finish();

    let set = generated.context("Master generation failed")?;
    print_masters_summary(builder.skipped(), &set);

    Ok(())
}

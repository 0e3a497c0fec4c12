use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use finestres_core::calibration::CalibrationSet;
use finestres_core::frame::Frame;
use tracing::info;

use crate::progress::file_bar;

#[derive(Args)]
pub struct CalibrateArgs {
    /// Light frames to calibrate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Folder containing the master darks and flats
    #[arg(long)]
    pub masters: PathBuf,

    /// Folder for the calibrated frames (default: overwrite the inputs)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Abort when a frame has no matching master dark or flat
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: &CalibrateArgs) -> Result<()> {
    let set = CalibrationSet::load_dir(&args.masters)
        .with_context(|| format!("Failed to load masters from {}", args.masters.display()))?;
    if set.is_empty() {
        bail!("No master darks or flats found in {}", args.masters.display());
    }
    if let Some(ref dir) = args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let pb = file_bar(args.files.len(), "Calibrating");
    let mut incomplete = 0;
    for path in &args.files {
        let mut frame = Frame::load(path)?;
        let applied = set
            .calibrate_light(&mut frame)
            .with_context(|| format!("Failed to calibrate {}", frame.title()))?;
        if !applied.is_complete() {
            if args.strict {
                pb.abandon();
                bail!(
                    "Missing master for {} (dark: {}, flat: {})",
                    frame.title(),
                    applied.dark.as_deref().unwrap_or("none"),
                    applied.flat.as_deref().unwrap_or("none")
                );
            }
            incomplete += 1;
        }

        if let Some(ref dir) = args.output_dir {
            let target = dir.join(frame.title());
            frame.set_path(target);
        }
        frame
            .save()
            .with_context(|| format!("Failed to save {}", frame.path().display()))?;
        info!(path = %frame.path().display(), ?applied, "Saved calibrated frame");
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("Calibrated {} frames", args.files.len());
    if incomplete > 0 {
        println!("  {incomplete} frame(s) calibrated without a matching dark or flat");
    }

    Ok(())
}

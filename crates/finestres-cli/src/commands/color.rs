use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use finestres_core::color::{compose, WeightMatrix};
use finestres_core::frame::Frame;

#[derive(Args)]
pub struct ColorArgs {
    /// Red channel frame
    pub red: PathBuf,
    /// Green channel frame
    pub green: PathBuf,
    /// Blue channel frame
    pub blue: PathBuf,

    /// Channel weights as "r,g,b;r,g,b;r,g,b", one row per output channel
    #[arg(long)]
    pub weights: Option<String>,

    /// Output file path (default: color_stack.fits next to the red frame)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ColorArgs) -> Result<()> {
    let weights: WeightMatrix = match args.weights {
        Some(ref s) => s.parse()?,
        None => WeightMatrix::identity(),
    };

    let red = Frame::load(&args.red)?;
    let green = Frame::load(&args.green)?;
    let blue = Frame::load(&args.blue)?;

    let mut color = compose(&red, &green, &blue, &weights).context("Color composition failed")?;
    if let Some(ref path) = args.output {
        color.set_path(path);
    }
    color
        .save()
        .with_context(|| format!("Failed to save {}", color.path().display()))?;

    println!("Color stack saved to {}", color.path().display());
    Ok(())
}

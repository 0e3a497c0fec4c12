use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use finestres_core::frame::Frame;
use finestres_core::stack::{stack_by_filter, CombineMethod};

use crate::progress::file_bar;

#[derive(Args)]
pub struct StackArgs {
    /// Light frames to stack
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Combine method: mean or median
    #[arg(long, default_value = "median")]
    pub method: CombineMethod,

    /// Folder for the stacks (defaults to the folder of the first frame)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: &StackArgs) -> Result<()> {
    let pb = file_bar(args.files.len(), "Loading frames");
    let mut frames = Vec::with_capacity(args.files.len());
    for path in &args.files {
        frames.push(Frame::load(path)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let method = args.method;
    println!("Stacking {} frames ({} method)", frames.len(), method);

    let stacks = stack_by_filter(&frames, method).context("Stacking failed")?;
    if let Some(ref dir) = args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    for (filter, mut stack) in stacks {
        if let Some(ref dir) = args.output_dir {
            let path = dir.join(stack.title());
            stack.set_path(path);
        }
        stack
            .save()
            .with_context(|| format!("Failed to save {}", stack.path().display()))?;
        println!("  {:<12}{}", filter, stack.path().display());
    }

    Ok(())
}

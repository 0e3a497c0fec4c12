use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use finestres_core::frame::Frame;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let frame = Frame::load(&args.file)?;

    println!("File:        {}", frame.path().display());
    println!("Kind:        {}", frame.kind);
    println!(
        "Role:        {}",
        frame.role.as_ref().map_or("-".to_string(), |r| r.to_string())
    );
    println!(
        "Exposure:    {}",
        frame.exposure.map_or("-".to_string(), |e| format!("{e} s"))
    );
    println!("Filter:      {}", frame.filter.as_deref().unwrap_or("-"));
    if let Some(shape) = frame.shape() {
        let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
        println!("Dimensions:  {}", dims.join("x"));
    }

    let history: Vec<&str> = frame.header.history().collect();
    if !history.is_empty() {
        println!("History:");
        for entry in history {
            println!("  {entry}");
        }
    }

    Ok(())
}

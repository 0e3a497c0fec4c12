mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finestres", about = "Calibration frame processing for astrophotography")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS frame metadata
    Info(commands::info::InfoArgs),
    /// Build master darks and flats from a calibration folder
    Masters(commands::masters::MastersArgs),
    /// Calibrate light frames with master darks and flats
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Combine light frames into one stack per filter
    Stack(commands::stack::StackArgs),
    /// Compose a color image from red, green and blue frames
    Color(commands::color::ColorArgs),
    /// Print or save the default calibration config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Masters(args) => commands::masters::run(args),
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Stack(args) => commands::stack::run(args),
        Commands::Color(args) => commands::color::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use scanner::DetectionMode;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "scanner")]
#[command(about = "Barcode scanning session driver")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay image files through a scanning session and print detections as JSON lines
    Scan {
        /// Image files or directories of images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Session config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Detection mode, overrides the config file
        #[arg(short, long)]
        mode: Option<ModeArg>,

        /// Also decode colour-inverted frames
        #[arg(long)]
        invert: bool,

        /// Write an upright PNG of every detection into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Interval between replayed frames in milliseconds
        #[arg(long, default_value = "250")]
        interval_ms: u64,

        /// Print pipeline counters to stderr when done
        #[arg(long)]
        stats: bool,
    },

    /// Print the default session config as JSON
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    NoDuplicates,
    Normal,
    Unrestricted,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::NoDuplicates => DetectionMode::NoDuplicates,
            ModeArg::Normal => DetectionMode::Normal,
            ModeArg::Unrestricted => DetectionMode::Unrestricted,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=scanner=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            inputs,
            config,
            mode,
            invert,
            output_dir,
            interval_ms,
            stats,
        } => cli::scan(cli::ScanArgs {
            inputs,
            config,
            mode: mode.map(DetectionMode::from),
            invert,
            output_dir,
            interval_ms,
            stats,
        }),
        Commands::Config => cli::print_default_config(),
    }
}

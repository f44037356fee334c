use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use cv2612::{QueueConfig, SpeedPreset};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod input;
mod report;
mod sync;

/// cv2612 command line tools
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Speed {
    Slow,
    Normal,
    Fast,
    Turbo,
}

impl From<Speed> for SpeedPreset {
    fn from(speed: Speed) -> Self {
        match speed {
            Speed::Slow => SpeedPreset::Slow,
            Speed::Normal => SpeedPreset::Normal,
            Speed::Fast => SpeedPreset::Fast,
            Speed::Turbo => SpeedPreset::Turbo,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the MIDI address and binding index of every parameter
    Map {
        /// Use the POLY operator addressing
        #[arg(long)]
        poly: bool,
        /// Patch index (0-3)
        #[arg(long, default_value_t = 0)]
        patch: u8,
        /// Channel index (0-5)
        #[arg(long, default_value_t = 0)]
        channel: u8,
    },
    /// Print the serialized layout CRC32 of a saved state (.json or .json.gz; use '-' for stdin)
    Crc {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Validate a saved state document
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Decode DefleMask FM instruments (.dmp)
    Dmp {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
        /// Print each instrument as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a legacy parameter key such as "tl-0-1-2"
    Key {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Stream a full resynchronization of a saved state
    Sync {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Raw MIDI device to write to (hex dump on stdout when omitted)
        #[arg(long)]
        device: Option<PathBuf>,
        /// Transmission speed preset
        #[arg(long, value_enum, default_value_t = Speed::Normal)]
        speed: Speed,
        /// Send the CRC32 chunks after the state
        #[arg(long)]
        checksum: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("CV2612_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Map {
            poly,
            patch,
            channel,
        } => report::map(poly, patch, channel)?,
        Commands::Crc { file } => report::crc(&file)?,
        Commands::Check { file } => report::check(&file)?,
        Commands::Dmp { files, json } => report::dmp(&files, json)?,
        Commands::Key { key } => report::key(&key)?,
        Commands::Sync {
            file,
            device,
            speed,
            checksum,
        } => {
            let config = QueueConfig {
                speed: speed.into(),
                ..QueueConfig::default()
            };
            sync::sync(&file, device.as_ref(), config, checksum)?;
        }
    }

    Ok(())
}

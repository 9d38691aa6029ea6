use clap::Parser;
use std::path::PathBuf;

use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "marinescore",
    about = "Score audio clips for marine-mammal activity versus vessel noise"
)]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Analysis server URL; the local heuristic is used when it fails
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Remote request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Ignore any configured analysis server
    #[arg(long)]
    pub local_only: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Worker threads for batch analysis (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Config file (defaults to marinescore.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

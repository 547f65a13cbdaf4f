use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "poolftp", about = "A multi-client FTP server with a fixed worker pool.")]
pub struct Cli {
    /// Control port to listen on (overrides the configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

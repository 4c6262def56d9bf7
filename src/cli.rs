use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "episodex")]
#[command(author, version, about = "Match anime files to AniList and normalize episode numbers")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match and hydrate local files read from a JSON array
    Scan {
        /// JSON file with the local files to scan
        #[arg(short, long, required = true)]
        files: PathBuf,

        /// AniList user whose list seeds the candidates (overrides config)
        #[arg(short, long)]
        user: Option<String>,

        /// Also search AniList for titles not on the user's list
        #[arg(long)]
        enhanced: bool,

        /// Write hydrated files here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

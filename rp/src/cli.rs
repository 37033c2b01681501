//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rp - throttled outbound GET dispatcher
#[derive(Parser)]
#[command(
    name = "rp",
    about = "Fetch URLs through a throttled, identity-rotating dispatcher",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Fetch one or more URLs through the pacer
    Get {
        /// URLs to fetch
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Write raw response bytes instead of decoded text
        #[arg(long)]
        raw: bool,
    },
}

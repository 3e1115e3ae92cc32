//! Command-line surface (spec.md §6). Only the interface is specified
//! there; daemonization and process-management details are explicitly out
//! of scope, so this stays a thin flag parser.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sehttpd", version, about = "A small, high-concurrency static file server")]
pub struct Cli {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8081)]
    pub port: u16,

    /// Document root to serve files from.
    #[arg(short, long, default_value = "./www")]
    pub root: PathBuf,

    /// Number of worker threads (defaults to the number of logical CPUs).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Idle connection timeout, in seconds.
    #[arg(short, long, default_value_t = 60)]
    pub timeout: u64,

    /// Raise log verbosity; repeatable (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! Runtime configuration, built from CLI flags (spec.md §6) plus a couple
//! of internal defaults (§9's ring buffer capacity open question).

use std::path::PathBuf;
use std::time::Duration;

use crate::ring_buffer::DEFAULT_RING_CAPACITY;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub document_root: PathBuf,
    pub workers: usize,
    pub idle_timeout: Duration,
    pub ring_capacity: usize,
}

impl ServerConfig {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        ServerConfig {
            port: cli.port,
            document_root: cli.root.clone(),
            workers: cli.workers.unwrap_or_else(num_cpus::get),
            idle_timeout: Duration::from_secs(cli.timeout),
            ring_capacity: DEFAULT_RING_CAPACITY,
        }
    }
}

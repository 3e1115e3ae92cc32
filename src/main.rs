//! Binary entry point: parse CLI flags, initialize logging, install signal
//! handlers, fan out workers, and idle until shutdown is requested
//! (spec.md §6). Mirrors `examples/original_source/src/mainloop.c`'s
//! `main` (sigaction for `SIGPIPE`, argument parsing, worker fan-out,
//! `pause()`-then-reap), with `fork()`-per-CPU replaced by thread-per-core
//! per spec.md §9.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use sehttpd::cli::Cli;
use sehttpd::config::ServerConfig;
use sehttpd::{logging, signals, worker};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    let config = ServerConfig::from_cli(&cli);

    signals::ignore_sigpipe().context("failed to install SIGPIPE handler")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signals::install_shutdown_handler(Arc::clone(&shutdown))
        .context("failed to install SIGINT/SIGTERM handler")?;

    log::info!(
        "sehttpd-rs starting: port={} root={} workers={}",
        config.port,
        config.document_root.display(),
        config.workers
    );

    let handles = worker::spawn(&config, Arc::clone(&shutdown))
        .context("failed to start listening; bind/listen error")?;

    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }

    signals::log_shutdown_requested();
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

//! Multi-worker fan-out (spec.md §5, §9): N independent reactors sharing
//! one listening port via `SO_REUSEPORT`, each a plain OS thread instead
//! of the original's forked process (`examples/original_source/src/mainloop.c`'s
//! `create_worker`/`MAXWORKER` loop). No state is shared between workers
//! beyond the listening socket's address and the shutdown flag — every
//! worker owns its own `mio::Poll`, connection table, and timer wheel
//! (spec.md §5 "Shared mutable state between workers: none").

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::config::ServerConfig;
use crate::error::ReactorError;
use crate::reactor::{self, ReactorConfig};

/// Spawn `config.workers` reactor threads, each bound to `addr` via
/// `SO_REUSEPORT`. Returns their join handles so `main` can wait for a
/// clean shutdown.
pub fn spawn(config: &ServerConfig, shutdown: Arc<AtomicBool>) -> Result<Vec<JoinHandle<()>>, ReactorError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Bind once up front so a startup failure (port in use, permission
    // denied on a privileged port) is reported before any thread is
    // spawned, matching spec.md §6's "non-zero exit on early startup
    // failure" for the common case of an immediately-bad port.
    let probe = reactor::bind_reuseport(addr)?;
    drop(probe);

    let mut handles = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        let reactor_config = ReactorConfig {
            document_root: config.document_root.clone(),
            ring_capacity: config.ring_capacity,
            idle_timeout: config.idle_timeout,
        };
        let shutdown = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name(format!("sehttpd-worker-{}", worker_id))
            .spawn(move || {
                let listener = match reactor::bind_reuseport(addr) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("worker {} failed to bind: {}", worker_id, e);
                        return;
                    }
                };
                info!("worker {} listening on {}", worker_id, addr);
                if let Err(e) = reactor::run(listener, reactor_config, shutdown) {
                    error!("worker {} exited with error: {}", worker_id, e);
                }
            })
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }

    Ok(handles)
}

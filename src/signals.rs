//! Signal handling (spec.md §6): `SIGPIPE` is ignored outright (writing to
//! a peer that has reset its connection must surface as an `EPIPE` I/O
//! error, not kill the process, exactly as the original's `sigaction`
//! call in `examples/original_source/src/mainloop.c`'s `main` does);
//! `SIGINT`/`SIGTERM` request a clean shutdown.
//!
//! The original drives shutdown by having a supervisor process send
//! `SIGTERM` to each forked worker. With thread-per-core workers sharing
//! one address space (spec.md §9's fan-out note), that collapses to a
//! single process-wide flag every worker's reactor loop checks after each
//! `poll.poll()` return — there is nothing left to signal across, just a
//! flag to flip.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

/// Ignore `SIGPIPE` so a write to a peer that has reset the connection
/// yields `EPIPE` from the syscall instead of terminating the process.
pub fn ignore_sigpipe() -> io::Result<()> {
    unsafe {
        let rc = libc::signal(libc::SIGPIPE, libc::SIG_IGN);
        if rc == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Install `SIGINT`/`SIGTERM` handlers that flip `shutdown` and return.
/// Uses `libc::signal` rather than a crate like `signal-hook` since the
/// handler body is a single atomic store — anything more than
/// `signal-safe` work in a handler risks the classic async-signal-safety
/// pitfalls the original's own handler (`sighandler`, a bare `printf`)
/// already cuts corners on; a plain `AtomicBool::store` is one of the few
/// operations POSIX actually guarantees is signal-safe.
pub fn install_shutdown_handler(shutdown: Arc<AtomicBool>) -> io::Result<()> {
    unsafe {
        SHUTDOWN_FLAG = Some(shutdown);
        for sig in [libc::SIGINT, libc::SIGTERM] {
            let rc = libc::signal(sig, handle_shutdown_signal as usize);
            if rc == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

static mut SHUTDOWN_FLAG: Option<Arc<AtomicBool>> = None;

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    unsafe {
        if let Some(flag) = SHUTDOWN_FLAG.as_ref() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

pub fn log_shutdown_requested() {
    info!("shutdown requested, terminating workers");
}

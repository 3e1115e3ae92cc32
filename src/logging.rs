//! Ambient logging setup (spec.md's Non-goals exclude "logging facilities"
//! as a feature to design, but not the act of logging itself — the reactor
//! and connection layers still emit structured `log` records the way the
//! reference stack does).

use log::LevelFilter;

/// `verbosity` is the `-v` repeat count (spec.md §A.1/clap's
/// `ArgAction::Count`): 0 = info, 1 = debug, 2+ = trace. `RUST_LOG` still
/// takes precedence when set, matching `env_logger`'s usual precedence.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}

//! Tracing subscriber setup: one place that turns a `--log-level` flag
//! into an initialized global subscriber.
//!
//! Grounded on `logging::BatchLogger` in spirit (a small struct that turns
//! ambient trace events into a recorded stream) but built on
//! `tracing-subscriber` rather than the teacher's own ad hoc event channel,
//! since nothing in this crate needs the timely-dataflow-specific notion
//! of logging back into a dataflow.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber at the given level, writing
/// formatted events to stderr so they never interleave with the
/// command-protocol output on stdout.
///
/// `level` is anything `tracing_subscriber::filter::LevelFilter` parses
/// ("error", "warn", "info", "debug", "trace"); an unparsable value falls
/// back to "info" rather than panicking the program over a bad flag.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("global subscriber already set, ignoring second init() call");
    }
}

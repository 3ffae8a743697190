//! Logging init: human-readable events on stderr.
//!
//! stdout is reserved for the prompt and progress messages, so log events go
//! to stderr where they interleave with pacman and curl output.

use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is unset
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "archcuda=debug,info" } else { "archcuda=info,warn" }
}

/// Initialize the global subscriber. RUST_LOG overrides the default filter.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

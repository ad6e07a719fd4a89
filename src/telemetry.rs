//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. Output goes to stderr so that
/// command output on stdout stays machine-readable.
///
/// `RUST_LOG` wins when set. Calling this more than once is harmless.
pub fn init(verbose: bool) {
    let default = if verbose {
        "warn,bank_ledger=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! Diagnostics on stderr via `tracing`.

use miette::{IntoDiagnostic, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or debug
/// output for prchurn's own crates with `verbose`.
pub fn init(verbose: bool, ansi: bool) -> Result<()> {
    let default_directive = if verbose {
        "warn,prchurn=debug,prchurn_review=debug,prchurn_gitpulse=debug,prchurn_difflens=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .into_diagnostic()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_target(verbose),
        )
        .try_init()
        .into_diagnostic()
}

//! Process-wide log routing.

use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use crate::CliError;

/// Level selected by the verbosity flags; `--debug` wins over `--verbose`.
pub(crate) const fn level(verbose: bool, debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Bridge `log` records into `tracing` and install a formatting subscriber.
pub(crate) fn init(verbose: bool, debug: bool) -> Result<(), CliError> {
    LogTracer::init()?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level(verbose, debug))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

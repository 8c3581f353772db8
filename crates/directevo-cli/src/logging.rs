use crate::error::{CliError, Result};
use directevo::engine::search::SUMMARY_TARGET;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

/// Prefix shared by the library's and the binary's tracing targets.
const DIRECTEVO_TARGET: &str = "directevo";

/// Builds the event filter for the given `-v` count.
///
/// Verbosity raises DirectEvo's own targets only; dependencies stay at WARN until `-vvvv`.
/// `--quiet` silences everything below ERROR except the search summary line.
fn event_filter(verbosity: u8, quiet: bool) -> Targets {
    let (own, dependencies) = if quiet {
        (LevelFilter::ERROR, LevelFilter::ERROR)
    } else {
        match verbosity {
            0 => (LevelFilter::WARN, LevelFilter::WARN),
            1 => (LevelFilter::INFO, LevelFilter::WARN),
            2 => (LevelFilter::DEBUG, LevelFilter::WARN),
            3 => (LevelFilter::TRACE, LevelFilter::WARN),
            _ => (LevelFilter::TRACE, LevelFilter::DEBUG),
        }
    };

    Targets::new()
        .with_default(dependencies)
        .with_target(DIRECTEVO_TARGET, own)
        .with_target(SUMMARY_TARGET, LevelFilter::INFO)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(event_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

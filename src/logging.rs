//! Logging and tracing initialization.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::RunArgs;
use crate::error::{LoadbenchError, Result};

/// Initialize structured logging based on the CLI args.
pub fn init_logging(args: &RunArgs) -> Result<()> {
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        args.log_level.to_tracing_level()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("loadbench={log_level}")))
        .map_err(|e| LoadbenchError::Config(format!("failed to build log filter: {e}")))?;

    if let Some(output) = &args.output {
        init_file_logging(output, env_filter)?;
    } else {
        init_stdout_logging(env_filter);
    }

    Ok(())
}

fn init_stdout_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_file_logging(output: &std::path::Path, env_filter: EnvFilter) -> Result<()> {
    let log_path = output.with_extension("log");
    let file = std::fs::File::create(&log_path)?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loadbench=debug"));
        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use clap::Parser;

    #[test]
    fn test_verbose_overrides_log_level() {
        let mut args = RunArgs::parse_from(["loadbench", "--model", "m"]);
        args.verbose = true;
        args.log_level = LogLevel::Error;
        assert!(args.verbose);
    }

    #[test]
    fn test_log_level_conversion_matches_tracing_levels() {
        assert_eq!(LogLevel::Error.to_tracing_level(), Level::ERROR);
        assert_eq!(LogLevel::Debug.to_tracing_level(), Level::DEBUG);
    }
}

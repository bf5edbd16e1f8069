//! Diagnostic output for the interpreter, written to stderr through `tracing`.

use anyhow::{Result, anyhow};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives when `--log-level` is absent.
pub const LOG_ENV: &str = "PIPESH_LOG";

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(value: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(value.trim()).map_err(|_| anyhow!("invalid log level {:?}", value))
}

/// Build the event filter.
///
/// An explicit `level` wins. Otherwise `PIPESH_LOG` is read as a full
/// directive string, and an absent or malformed variable falls back to `warn`.
pub fn filter(level: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = level {
        let level = parse_level(level)?;
        return Ok(EnvFilter::default().add_directive(level.into()));
    }
    Ok(EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::WARN.into())))
}

/// Install the stderr subscriber once for the whole process.
pub fn init(filter: EnvFilter) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

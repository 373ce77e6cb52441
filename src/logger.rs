//! Tracing setup for the gateway and `gatectl`.
//!
//! A plain level such as `debug` applies to this crate only; HTTP and TLS
//! dependencies stay at `warn` so request-level logs are readable. A full
//! `EnvFilter` directive is used as written.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Ceiling for third-party targets when only a plain level is configured.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::WARN;

/// Install the global subscriber.
///
/// `prefer_level`: the configured `level` wins over `RUST_LOG` (the server
/// passes `true` so `-v` works). Otherwise `RUST_LOG` wins when set.
pub fn init(level: &str, prefer_level: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = build_filter(level, prefer_level)?;
    let writer = make_writer(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

fn build_filter(level: &str, prefer_level: bool) -> Result<EnvFilter, AppError> {
    let configured = EnvFilter::try_new(directive(level));
    let from_env = EnvFilter::try_from_default_env;

    if prefer_level {
        configured.or_else(|level_err| {
            from_env().map_err(|env_err| {
                AppError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                ))
            })
        })
    } else {
        from_env()
            .or(configured)
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
    }
}

fn make_writer(log_file: Option<&Path>) -> Result<BoxMakeWriter, AppError> {
    let Some(path) = log_file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Logger(format!("failed to open log file '{}': {e}", path.display())))?;
    Ok(BoxMakeWriter::new(file))
}

/// Expand a plain level into a crate-scoped directive.
///
/// `debug` becomes `warn,mainpage_gateway=debug`; `error` stays `error` for
/// everything. Strings with `=` or `,`, and unknown levels, pass through.
pub fn directive(level: &str) -> String {
    if level.contains(['=', ',']) {
        return level.to_string();
    }
    match level.parse::<LevelFilter>() {
        Ok(own) => {
            let deps = own.min(DEPENDENCY_LEVEL);
            format!("{deps},{}={own}", env!("CARGO_CRATE_NAME"))
        }
        Err(_) => level.to_string(),
    }
}

/// Validate a configured `log_level`.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

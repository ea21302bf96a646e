//! Subscriber installation for the workspace's `tracing` events.
//!
//! Events are formatted by `tracing-subscriber`'s fmt layer and written to
//! stderr, so they never mix with file data or summaries on stdout. The filter
//! comes from the [`VerbosityConfig`] unless [`LOG_ENV_VAR`] holds a directive
//! string, which then wins.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2))?;
//! tracing::debug!(target: "streampress::cli", "ready");
//! ```

use std::fmt;
use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::{LOG_ENV_VAR, VerbosityConfig};

/// The global subscriber could not be installed.
#[derive(Debug)]
pub struct TracingInitError {
    reason: String,
}

impl fmt::Display for TracingInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to install tracing subscriber: {}", self.reason)
    }
}

impl std::error::Error for TracingInitError {}

/// Builds the event filter for `config`.
///
/// A non-empty, parseable [`LOG_ENV_VAR`] overrides the verbosity flags; an
/// unparseable value falls back to the flags.
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    if let Ok(value) = std::env::var(LOG_ENV_VAR) {
        if let Some(filter) = parse_override(&value) {
            return filter;
        }
    }
    EnvFilter::new(config.directive())
}

fn parse_override(value: &str) -> Option<EnvFilter> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    EnvFilter::try_new(value).ok()
}

/// Installs the global subscriber writing to stderr.
///
/// Installing twice is reported as an error instead of panicking, so tests and
/// embedders that already set a subscriber keep theirs.
pub fn init_tracing(config: VerbosityConfig) -> Result<(), TracingInitError> {
    init_tracing_with_writer(config, io::stderr)
}

/// Installs the global subscriber writing to `writer`.
pub fn init_tracing_with_writer<M>(config: VerbosityConfig, writer: M) -> Result<(), TracingInitError>
where
    M: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = build_filter(&config);
    let rendered = filter.to_string();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .map_err(|error| TracingInitError {
            reason: error.to_string(),
        })?;
    tracing::debug!(
        target: "streampress::logging",
        level = config.level.as_str(),
        filter = %rendered,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_override_is_ignored() {
        assert!(parse_override("   ").is_none());
    }

    #[test]
    fn valid_override_parses() {
        assert!(parse_override("streampress::transform=trace").is_some());
    }

    #[test]
    fn filter_renders_the_verbosity_directive() {
        let filter = EnvFilter::new(VerbosityConfig::from_verbose_level(2).directive());
        let rendered = filter.to_string();
        assert!(rendered.contains("streampress=debug"), "{rendered}");
    }
}

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Map the configured `Verbosity` onto a level filter
//!
//! # Design Decisions
//! - Verbosity is passed in explicitly (config or CLI), never read from
//!   ad-hoc environment toggles
//! - `RUST_LOG`, when set, still overrides the computed filter
//! - JSON format for machine ingestion, pretty format otherwise

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{ObservabilityConfig, Verbosity};

/// Level filter for a verbosity setting.
pub fn level_filter(verbosity: Verbosity) -> LevelFilter {
    match verbosity {
        Verbosity::Error => LevelFilter::WARN,
        Verbosity::Info => LevelFilter::INFO,
        Verbosity::Trace => LevelFilter::TRACE,
    }
}

/// Default directive string for a verbosity setting.
pub fn default_directives(verbosity: Verbosity) -> String {
    let level = level_filter(verbosity).to_string().to_lowercase();
    format!("cloud_ha={}", level)
}

/// Install the global subscriber.
///
/// `verbosity` overrides the configured level when given. Returns an error
/// if a subscriber was already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
    verbosity: Option<Verbosity>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let verbosity = verbosity.unwrap_or(config.verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_filter(Verbosity::Error), LevelFilter::WARN);
        assert_eq!(level_filter(Verbosity::Info), LevelFilter::INFO);
        assert_eq!(level_filter(Verbosity::Trace), LevelFilter::TRACE);
        assert_eq!(default_directives(Verbosity::Info), "cloud_ha=info");
    }
}

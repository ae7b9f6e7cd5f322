//! Tracing subscriber setup driven by [`LoggingConfig`]

use crate::core::config::LoggingConfig;
use crate::core::error::PublishingError;
use tracing_subscriber::EnvFilter;

/// Build the filter for a logging configuration
///
/// The level applies globally; each directive refines it for a target.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, PublishingError> {
    let level = config.level.to_ascii_lowercase();
    let mut filter = EnvFilter::try_new(&level).map_err(|e| {
        PublishingError::ConfigError(format!("Invalid log level {}: {}", config.level, e))
    })?;

    for directive in &config.directives {
        let directive = directive.parse().map_err(|e| {
            PublishingError::ConfigError(format!("Invalid log directive {}: {}", directive, e))
        })?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Install a global fmt subscriber
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, PublishingError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    Ok(installed)
}

//! Configuration structures for content publishing
//!
//! This module provides type-safe configuration management with serde support.

use crate::core::retry::RetryOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Current configuration schema version
pub const CONFIG_VERSION: &str = "1.0";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishingConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Rules applied by the default publishing strategy
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Unit-of-work commit retry settings
    #[serde(default)]
    pub commit: CommitConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Entries stamped onto the metadata of every event payload
    #[serde(
        default,
        rename = "eventMetadata",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub event_metadata: HashMap<String, String>,

    /// Environment variable expansion rules (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            extends: None,
            strategy: StrategyConfig::default(),
            commit: CommitConfig::default(),
            logging: LoggingConfig::default(),
            event_metadata: HashMap::new(),
            security: None,
        }
    }
}

impl PublishingConfig {
    /// Event metadata as JSON values, ready to merge into a payload
    pub fn event_metadata_values(&self) -> HashMap<String, serde_json::Value> {
        self.event_metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect()
    }
}

/// Default strategy rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    /// Refuse to publish expired or not-yet-released items (default: true)
    #[serde(default = "default_true", rename = "enforceSchedule")]
    pub enforce_schedule: bool,

    /// Refuse to publish items in the recycle bin (default: true)
    #[serde(default = "default_true", rename = "skipTrashed")]
    pub skip_trashed: bool,

    /// Skip descendants of an item that failed to publish in the same batch (default: true)
    #[serde(default = "default_true", rename = "cascadeDescendantFailures")]
    pub cascade_descendant_failures: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enforce_schedule: true,
            skip_trashed: true,
            cascade_descendant_failures: true,
        }
    }
}

/// Commit retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitConfig {
    #[serde(default = "default_max_attempts", rename = "maxAttempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms", rename = "initialDelayMs")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms", rename = "maxDelayMs")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier", rename = "backoffMultiplier")]
    pub backoff_multiplier: f64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl CommitConfig {
    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default level: trace | debug | info | warn | error | off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Extra filter directives, e.g. "content_publishing::notifications=trace"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<String>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directives: Vec::new(),
            json: false,
        }
    }
}

/// Security settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SecurityConfig {
    #[serde(default, rename = "envVarExpansion", skip_serializing_if = "Option::is_none")]
    pub env_var_expansion: Option<EnvVarExpansionConfig>,
}

/// Environment variable expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EnvVarExpansionConfig {
    /// Enable expansion (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Only variables starting with one of these prefixes are expanded
    #[serde(default, rename = "allowedPrefixes", skip_serializing_if = "Option::is_none")]
    pub allowed_prefixes: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}

//! Configuration file loader for content publishing
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishingError;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file names, in lookup order
const CONFIG_FILENAMES: [&str; 2] = [".publishing.yaml", ".publishing.toml"];

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Explicit overrides (highest priority), as a partial config tree
    pub overrides: Option<Value>,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// Skip ~/.publishing.yaml
    pub skip_global: bool,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "commit.maxAttempts")
    pub field: String,

    /// Error message
    pub message: String,

    /// Expected type/value
    pub expected: Option<String>,

    /// Actual type/value
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. Explicit overrides
    /// 2. Environment variables
    /// 3. Project config (./.publishing.yaml or ./.publishing.toml)
    /// 4. Global config (~/.publishing.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishingConfig, PublishingError> {
        let mut layers: Vec<Value> = Vec::new();

        // 5. Default values (lowest priority)
        layers.push(serde_json::to_value(PublishingConfig::default()).map_err(|e| {
            PublishingError::ConfigError(format!("Failed to encode defaults: {}", e))
        })?);

        // 4. Global config
        if !options.skip_global
            && let Some(global_config) = Self::load_global_config(&options.env).await?
        {
            layers.push(global_config);
        }

        // 3. Project config
        if let Some(project_config) = Self::load_project_config(&options.project_path).await? {
            layers.push(project_config);
        }

        // 2. Environment variables
        if let Some(env_config) = Self::load_env_config(&options.env) {
            layers.push(env_config);
        }

        // 1. Explicit overrides (highest priority)
        if let Some(overrides) = options.overrides {
            layers.push(overrides);
        }

        let merged = Self::merge_layers(layers);
        let config: PublishingConfig = serde_json::from_value(merged).map_err(|e| {
            PublishingError::ConfigError(format!("Invalid configuration: {}", e))
        })?;

        Ok(Self::expand_env_vars(config, &options.env))
    }

    /// Load configuration with the process environment
    pub async fn load_from_env(project_path: &Path) -> Result<PublishingConfig, PublishingError> {
        Self::load(ConfigLoadOptions {
            project_path: project_path.to_path_buf(),
            overrides: None,
            env: env::vars().collect(),
            skip_global: false,
        })
        .await
    }

    /// Load global configuration from ~/.publishing.yaml
    async fn load_global_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<Value>, PublishingError> {
        let Some(home_dir) = env.get("HOME").cloned().or_else(|| env::var("HOME").ok()) else {
            debug!("HOME not set, skipping global configuration");
            return Ok(None);
        };

        let global_config_path = PathBuf::from(home_dir).join(CONFIG_FILENAMES[0]);
        Self::load_config_file(&global_config_path).await
    }

    /// Load project configuration, preferring YAML over TOML
    async fn load_project_config(project_path: &Path) -> Result<Option<Value>, PublishingError> {
        for filename in CONFIG_FILENAMES {
            if let Some(config) = Self::load_config_file(&project_path.join(filename)).await? {
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// Load a configuration file as a partial config tree, following `extends`
    fn load_config_file(
        file_path: &Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<Value>, PublishingError>> + Send + '_>,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishingError::ConfigError(format!(
                    "Failed to read config file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config = Self::parse_config(file_path, &content)?;
            debug!(path = %file_path.display(), "loaded configuration file");

            if let Some(extends_path) = config.get("extends").and_then(Value::as_str) {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| {
                        PublishingError::ConfigError("Invalid config file path".to_string())
                    })?
                    .join(extends_path);

                if base_path == file_path {
                    return Err(PublishingError::ConfigError(format!(
                        "{} extends itself",
                        file_path.display()
                    )));
                }

                if let Some(base_config) = Self::load_config_file(&base_path).await? {
                    return Ok(Some(Self::merge_layers(vec![base_config, config])));
                }
            }

            Ok(Some(config))
        })
    }

    /// Parse YAML or TOML by file extension
    fn parse_config(file_path: &Path, content: &str) -> Result<Value, PublishingError> {
        let is_toml = file_path.extension().and_then(|e| e.to_str()) == Some("toml");

        let value: Value = if is_toml {
            toml::from_str(content).map_err(|e| {
                PublishingError::ConfigError(format!("Failed to parse TOML config: {}", e))
            })?
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                PublishingError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        if value.is_object() {
            Ok(value)
        } else if value.is_null() {
            Ok(Value::Object(Map::new()))
        } else {
            Err(PublishingError::ConfigError(format!(
                "Config root must be a mapping, found {}",
                value
            )))
        }
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<Value> {
        let mut config = Map::new();

        // PUBLISHING_LOG_LEVEL -> logging.level
        if let Some(level) = env.get("PUBLISHING_LOG_LEVEL") {
            config.insert(
                "logging".to_string(),
                serde_json::json!({ "level": level.to_lowercase() }),
            );
        }

        // PUBLISHING_ENFORCE_SCHEDULE -> strategy.enforceSchedule
        if let Some(enforce) = env.get("PUBLISHING_ENFORCE_SCHEDULE") {
            match enforce.as_str() {
                "true" | "1" => {
                    config.insert(
                        "strategy".to_string(),
                        serde_json::json!({ "enforceSchedule": true }),
                    );
                }
                "false" | "0" => {
                    config.insert(
                        "strategy".to_string(),
                        serde_json::json!({ "enforceSchedule": false }),
                    );
                }
                other => warn!(value = other, "ignoring PUBLISHING_ENFORCE_SCHEDULE"),
            }
        }

        // PUBLISHING_COMMIT_MAX_ATTEMPTS -> commit.maxAttempts
        if let Some(attempts) = env.get("PUBLISHING_COMMIT_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(attempts) => {
                    config.insert(
                        "commit".to_string(),
                        serde_json::json!({ "maxAttempts": attempts }),
                    );
                }
                Err(_) => warn!(value = %attempts, "ignoring PUBLISHING_COMMIT_MAX_ATTEMPTS"),
            }
        }

        if config.is_empty() {
            None
        } else {
            Some(Value::Object(config))
        }
    }

    /// Merge config trees, later layers winning key by key
    fn merge_layers(layers: Vec<Value>) -> Value {
        let mut result = Value::Object(Map::new());

        for layer in layers {
            Self::merge_into(&mut result, layer);
        }

        result
    }

    /// Merge source tree into target
    fn merge_into(target: &mut Value, source: Value) {
        match (target, source) {
            (Value::Object(target_map), Value::Object(source_map)) => {
                for (key, value) in source_map {
                    match target_map.get_mut(&key) {
                        Some(existing) if existing.is_object() && value.is_object() => {
                            Self::merge_into(existing, value);
                        }
                        _ => {
                            target_map.insert(key, value);
                        }
                    }
                }
            }
            (target, source) => *target = source,
        }
    }

    /// Expand ${VAR} references in event metadata values
    fn expand_env_vars(
        mut config: PublishingConfig,
        env: &HashMap<String, String>,
    ) -> PublishingConfig {
        let expansion = config
            .security
            .as_ref()
            .and_then(|s| s.env_var_expansion.as_ref());

        if !expansion.and_then(|e| e.enabled).unwrap_or(true) {
            return config;
        }

        let allowed_prefixes = expansion.and_then(|e| e.allowed_prefixes.clone());

        for value in config.event_metadata.values_mut() {
            *value = Self::expand_string(value, env, &allowed_prefixes);
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(
        input: &str,
        env: &HashMap<String, String>,
        allowed_prefixes: &Option<Vec<String>>,
    ) -> String {
        let mut result = input.to_string();

        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(prefixes) = allowed_prefixes
                && !prefixes.iter().any(|prefix| var_name.starts_with(prefix))
            {
                warn!(var = var_name, "environment variable not allowed by prefix list, skipping");
                continue;
            }

            match env.get(var_name) {
                Some(value) => result = result.replace(&format!("${{{}}}", var_name), value),
                None => warn!(var = var_name, "environment variable not found"),
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublishingConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Check version (required)
        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some("string (e.g., \"1.0\")".to_string()),
                actual: Some("empty".to_string()),
            });
        } else if config.version != CONFIG_VERSION {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some(format!(
                    "Currently supported version is \"{}\" only",
                    CONFIG_VERSION
                )),
            });
        }

        // 2. Commit retry settings
        Self::validate_commit(&config.commit, &mut errors, &mut warnings);

        // 3. Logging
        Self::validate_logging(&config.logging, &mut errors);

        // 4. Event metadata left unexpanded
        for (key, value) in &config.event_metadata {
            if ENV_VAR_REGEX.is_match(value) {
                warnings.push(ConfigValidationWarning {
                    field: format!("eventMetadata.{}", key),
                    message: format!("Unresolved environment variable in \"{}\"", value),
                    suggestion: Some("Set the variable or allow its prefix".to_string()),
                });
            }
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate commit retry settings
    fn validate_commit(
        commit: &CommitConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if commit.max_attempts == 0 {
            errors.push(ConfigValidationError {
                field: "commit.maxAttempts".to_string(),
                message: "At least one commit attempt is required".to_string(),
                expected: Some(">= 1".to_string()),
                actual: Some("0".to_string()),
            });
        }

        if commit.backoff_multiplier < 1.0 {
            errors.push(ConfigValidationError {
                field: "commit.backoffMultiplier".to_string(),
                message: "Backoff multiplier must not shrink the delay".to_string(),
                expected: Some(">= 1.0".to_string()),
                actual: Some(commit.backoff_multiplier.to_string()),
            });
        }

        if commit.initial_delay_ms > commit.max_delay_ms {
            warnings.push(ConfigValidationWarning {
                field: "commit.initialDelayMs".to_string(),
                message: "Initial delay exceeds max delay".to_string(),
                suggestion: Some("Every retry will wait maxDelayMs".to_string()),
            });
        }
    }

    /// Validate logging settings
    fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<ConfigValidationError>) {
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

        if !LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
            errors.push(ConfigValidationError {
                field: "logging.level".to_string(),
                message: "Unknown log level".to_string(),
                expected: Some(LEVELS.join(" | ")),
                actual: Some(logging.level.clone()),
            });
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    lines.push(format!("    Expected: {}", expected));
                    lines.push(format!("    Actual: {}", actual));
                }
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dir: &TempDir, env: HashMap<String, String>) -> ConfigLoadOptions {
        ConfigLoadOptions {
            project_path: dir.path().to_path_buf(),
            overrides: None,
            env,
            skip_global: true,
        }
    }

    #[tokio::test]
    async fn test_load_defaults_without_files() {
        let dir = TempDir::new().unwrap();

        let config = ConfigLoader::load(options(&dir, HashMap::new()))
            .await
            .unwrap();

        assert_eq!(config, PublishingConfig::default());
    }

    #[tokio::test]
    async fn test_load_project_yaml_keeps_unspecified_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".publishing.yaml"),
            "version: \"1.0\"\nstrategy:\n  skipTrashed: false\n",
        )
        .unwrap();

        let config = ConfigLoader::load(options(&dir, HashMap::new()))
            .await
            .unwrap();

        assert!(!config.strategy.skip_trashed);
        assert!(config.strategy.enforce_schedule);
        assert_eq!(config.commit.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_load_project_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".publishing.toml"),
            "[commit]\nmaxAttempts = 7\n",
        )
        .unwrap();

        let config = ConfigLoader::load(options(&dir, HashMap::new()))
            .await
            .unwrap();

        assert_eq!(config.commit.max_attempts, 7);
    }

    #[tokio::test]
    async fn test_extends_base_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "logging:\n  level: debug\ncommit:\n  maxAttempts: 9\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(".publishing.yaml"),
            "extends: base.yaml\ncommit:\n  maxAttempts: 2\n",
        )
        .unwrap();

        let config = ConfigLoader::load(options(&dir, HashMap::new()))
            .await
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.commit.max_attempts, 2);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".publishing.yaml"), "- just\n- a list\n").unwrap();

        let err = ConfigLoader::load(options(&dir, HashMap::new()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_env_overrides_file_and_overrides_win() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".publishing.yaml"),
            "logging:\n  level: warn\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("PUBLISHING_LOG_LEVEL".to_string(), "DEBUG".to_string());
        env.insert("PUBLISHING_ENFORCE_SCHEDULE".to_string(), "false".to_string());
        env.insert("PUBLISHING_COMMIT_MAX_ATTEMPTS".to_string(), "4".to_string());

        let mut load_options = options(&dir, env);
        load_options.overrides = Some(serde_json::json!({ "commit": { "maxAttempts": 1 } }));

        let config = ConfigLoader::load(load_options).await.unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(!config.strategy.enforce_schedule);
        assert_eq!(config.commit.max_attempts, 1);
    }

    #[test]
    fn test_load_env_config_ignores_garbage() {
        let mut env = HashMap::new();
        env.insert("PUBLISHING_ENFORCE_SCHEDULE".to_string(), "maybe".to_string());
        env.insert("PUBLISHING_COMMIT_MAX_ATTEMPTS".to_string(), "many".to_string());

        assert!(ConfigLoader::load_env_config(&env).is_none());
    }

    #[tokio::test]
    async fn test_event_metadata_expansion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".publishing.yaml"),
            concat!(
                "eventMetadata:\n",
                "  site: \"${SITE_NAME}\"\n",
                "  secret: \"${DB_PASSWORD}\"\n",
                "security:\n",
                "  envVarExpansion:\n",
                "    allowedPrefixes: [\"SITE_\"]\n",
            ),
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("SITE_NAME".to_string(), "intranet".to_string());
        env.insert("DB_PASSWORD".to_string(), "hunter2".to_string());

        let config = ConfigLoader::load(options(&dir, env)).await.unwrap();

        assert_eq!(config.event_metadata["site"], "intranet");
        assert_eq!(config.event_metadata["secret"], "${DB_PASSWORD}");

        let result = ConfigLoader::validate(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "eventMetadata.secret");
    }

    #[test]
    fn test_expand_string() {
        let mut env = HashMap::new();
        env.insert("SITE_NAME".to_string(), "main".to_string());

        let result = ConfigLoader::expand_string("site-${SITE_NAME}", &env, &None);

        assert_eq!(result, "site-main");
    }

    #[test]
    fn test_validate_version_required() {
        let config = PublishingConfig {
            version: String::new(),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "version");
    }

    #[test]
    fn test_validate_unknown_version_warning() {
        let config = PublishingConfig {
            version: "2.0".to_string(),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "version");
    }

    #[test]
    fn test_validate_commit_and_logging() {
        let mut config = PublishingConfig::default();
        config.commit.max_attempts = 0;
        config.commit.backoff_multiplier = 0.5;
        config.logging.level = "loud".to_string();

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"commit.maxAttempts"));
        assert!(fields.contains(&"commit.backoffMultiplier"));
        assert!(fields.contains(&"logging.level"));
    }

    #[test]
    fn test_merge_layers_is_deep() {
        let merged = ConfigLoader::merge_layers(vec![
            serde_json::json!({ "strategy": { "enforceSchedule": true, "skipTrashed": true } }),
            serde_json::json!({ "strategy": { "skipTrashed": false } }),
        ]);

        assert_eq!(merged["strategy"]["enforceSchedule"], serde_json::json!(true));
        assert_eq!(merged["strategy"]["skipTrashed"], serde_json::json!(false));
    }

    #[test]
    fn test_format_validation_result() {
        let result = ConfigValidationResult {
            valid: false,
            errors: vec![ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some("string".to_string()),
                actual: Some("empty".to_string()),
            }],
            warnings: vec![ConfigValidationWarning {
                field: "commit.initialDelayMs".to_string(),
                message: "Initial delay exceeds max delay".to_string(),
                suggestion: Some("Lower initialDelayMs".to_string()),
            }],
        };

        let formatted = ConfigLoader::format_validation_result(&result);

        assert!(formatted.contains("❌ Configuration has errors"));
        assert!(formatted.contains("🔴 Errors:"));
        assert!(formatted.contains("[version]"));
        assert!(formatted.contains("🟡 Warnings:"));
        assert!(formatted.contains("[commit.initialDelayMs]"));
    }
}

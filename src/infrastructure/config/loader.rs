use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, PersistenceBackend};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid batch_concurrency: {batch}. Must be between 1 and concurrency ({concurrency})")]
    InvalidBatchConcurrency { batch: usize, concurrency: usize },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid sandbox timeout: must be at least 1 second")]
    InvalidSandboxTimeout,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Project-local config directory.
pub const CONFIG_DIR: &str = ".taskloom";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .taskloom/config.yaml (project config)
    /// 3. .taskloom/local.yaml (project local overrides, optional)
    /// 4. Environment variables (TASKLOOM_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")))
            .merge(Env::prefixed("TASKLOOM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TASKLOOM_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let orchestration = &config.orchestration;
        if orchestration.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(orchestration.concurrency));
        }
        if orchestration.batch_concurrency == 0
            || orchestration.batch_concurrency > orchestration.concurrency
        {
            return Err(ConfigError::InvalidBatchConcurrency {
                batch: orchestration.batch_concurrency,
                concurrency: orchestration.concurrency,
            });
        }

        if config.persistence.backend == PersistenceBackend::Sqlite {
            if config.persistence.path.trim().is_empty() {
                return Err(ConfigError::EmptyDatabasePath);
            }
            if config.persistence.max_connections == 0 {
                return Err(ConfigError::InvalidMaxConnections(
                    config.persistence.max_connections,
                ));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.llm.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(config.llm.requests_per_second));
        }

        if config.llm.initial_backoff_ms >= config.llm.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.llm.initial_backoff_ms,
                config.llm.max_backoff_ms,
            ));
        }

        if config.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "llm.model cannot be empty".to_string(),
            ));
        }

        if config.sandbox.timeout_secs == 0 {
            return Err(ConfigError::InvalidSandboxTimeout);
        }

        if config.sandbox.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "sandbox.interpreter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.orchestration.concurrency, 5);
        assert_eq!(config.orchestration.batch_concurrency, 3);
        assert_eq!(config.persistence.path, ".taskloom/taskloom.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
orchestration:
  concurrency: 8
  batch_concurrency: 2
persistence:
  backend: memory
logging:
  level: debug
  format: json
sandbox:
  interpreter: python3.12
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.orchestration.concurrency, 8);
        assert_eq!(config.orchestration.batch_concurrency, 2);
        assert_eq!(config.orchestration.estimated_subtask_secs, 30);
        assert_eq!(config.persistence.backend, PersistenceBackend::Memory);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.sandbox.interpreter, "python3.12");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.orchestration.concurrency = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_validate_batch_above_concurrency() {
        let mut config = Config::default();
        config.orchestration.batch_concurrency = 9;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBatchConcurrency { batch: 9, concurrency: 5 })
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_empty_database_path_only_for_sqlite() {
        let mut config = Config::default();
        config.persistence.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));

        config.persistence.backend = PersistenceBackend::Memory;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.llm.requests_per_second = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimit(0))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.llm.initial_backoff_ms = 30_000;
        config.llm.max_backoff_ms = 10_000;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        ));
    }

    #[test]
    fn test_validate_zero_sandbox_timeout() {
        let mut config = Config::default();
        config.sandbox.timeout_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidSandboxTimeout)
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "orchestration:\n  concurrency: 4\n  batch_concurrency: 2\nlogging:\n  level: warn"
        )
        .unwrap();
        file.flush().unwrap();

        let config = temp_env::with_vars(
            [
                ("TASKLOOM_ORCHESTRATION__CONCURRENCY", Some("6")),
                ("TASKLOOM_LOGGING__FORMAT", Some("json")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.orchestration.concurrency, 6, "Env should win");
        assert_eq!(config.orchestration.batch_concurrency, 2, "File value persists");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ConfigLoader::load_from_file("/nonexistent/taskloom.yaml");
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_env_override_rejected_by_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: info").unwrap();
        file.flush().unwrap();
        let result = temp_env::with_var("TASKLOOM_ORCHESTRATION__CONCURRENCY", Some("0"), || {
            ConfigLoader::load_from_file(file.path())
        });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "orchestration:\n  concurrency: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "orchestration:\n  concurrency: 9\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.orchestration.concurrency, 9, "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}

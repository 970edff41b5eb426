//! Configuration management for the formgate server.
//!
//! Configuration is loaded from three layered sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values, which
//! take precedence over defaults. Variables are prefixed with `FORMGATE_`
//! and use `__` as the nested key separator; for example
//! `FORMGATE_SERVER__PORT=9090` overrides `server.port`.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Network settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Audit trail settings
    #[serde(default)]
    pub audit: AuditSettings,

    /// Authentication settings
    #[serde(default)]
    pub auth: AuthSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    // Image fields may carry data URIs.
    20 * 1024 * 1024
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type; only "memory" ships in-tree, the document
    /// store itself is an external collaborator.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Audit trail settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuditSettings {
    /// Collection receiving audit entries
    #[serde(default = "default_audit_collection")]
    pub collection: String,

    /// Default number of entries returned by the log listing
    #[serde(default = "default_audit_limit")]
    pub list_limit_default: usize,

    /// Upper bound on the log listing's `limit` query parameter
    #[serde(default = "default_audit_limit_max")]
    pub list_limit_max: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            collection: default_audit_collection(),
            list_limit_default: default_audit_limit(),
            list_limit_max: default_audit_limit_max(),
        }
    }
}

fn default_audit_collection() -> String {
    "auditLogs".to_string()
}

fn default_audit_limit() -> usize {
    100
}

fn default_audit_limit_max() -> usize {
    500
}

/// Authentication settings.
///
/// Deployments resolve bearer tokens through their identity provider; the
/// static table here backs development and test environments.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AuthSettings {
    /// Static token table: token -> claims.
    #[serde(default)]
    pub static_tokens: HashMap<String, StaticClaims>,
}

/// Claims attached to a static token.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StaticClaims {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub org: Vec<String>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable
    /// overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix("FORMGATE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix("FORMGATE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "storage.backend must be one of: {:?}, got: {}",
                    valid_backends, self.storage.backend
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        if self.audit.list_limit_default > self.audit.list_limit_max {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "audit.list_limit_default ({}) exceeds audit.list_limit_max ({})",
                    self.audit.list_limit_default, self.audit.list_limit_max
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090
  body_limit_bytes: 1048576

storage:
  backend: memory

logging:
  level: debug
  json: true

audit:
  collection: trail
  list_limit_default: 50
  list_limit_max: 200
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.body_limit_bytes, 1_048_576);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.audit.collection, "trail");
        assert_eq!(config.audit.list_limit_default, 50);
        assert_eq!(config.audit.list_limit_max, 200);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 8080
"#
        )
        .unwrap();

        std::env::set_var("FORMGATE_SERVER__PORT", "9999");
        std::env::set_var("FORMGATE_LOGGING__LEVEL", "warn");

        let config = ServerConfig::load(file.path()).unwrap();

        std::env::remove_var("FORMGATE_SERVER__PORT");
        std::env::remove_var("FORMGATE_LOGGING__LEVEL");

        assert_eq!(config.server.port, 9999); // overridden by env
        assert_eq!(config.server.host, "127.0.0.1"); // from file
        assert_eq!(config.logging.level, "warn"); // overridden by env
    }

    /// Test: Static token table loads from file
    #[test]
    #[serial]
    fn test_static_tokens_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
auth:
  static_tokens:
    dev-admin:
      uid: admin-1
      email: admin@example.com
      role: Admin
      org: []
    dev-manager:
      uid: mgr-1
      role: Manager
      org: ["acme"]
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        let admin = &config.auth.static_tokens["dev-admin"];
        assert_eq!(admin.role.as_deref(), Some("Admin"));
        assert_eq!(
            config.auth.static_tokens["dev-manager"].org,
            vec!["acme".to_string()]
        );
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.storage.backend = "postgres".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.backend"));

        let mut config = ServerConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let mut config = ServerConfig::default();
        config.audit.list_limit_default = 1000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("list_limit_default"));
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/config.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let result = ServerConfig::load(file.path());
        assert!(matches!(result, Err(ConfigLoadError::Load(_))));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.audit.collection, "auditLogs");
        assert!(config.auth.static_tokens.is_empty());
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("FORMGATE_SERVER__HOST", "192.168.1.1");

        let config = ServerConfig::from_env().unwrap();

        std::env::remove_var("FORMGATE_SERVER__HOST");

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 3000); // default
    }
}

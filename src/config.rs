//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dispatch::DispatcherConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

impl ServerConfig {
    /// Bind address in `host:port` form
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wsframe").join("config.toml")),
            Some(PathBuf::from("/etc/wsframe/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("WSFRAME_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WSFRAME_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Dispatcher overrides
        if let Ok(max) = std::env::var("WSFRAME_MAX_SESSIONS") {
            if let Ok(m) = max.parse() {
                self.dispatcher.max_sessions = m;
            }
        }
        if let Ok(capacity) = std::env::var("WSFRAME_QUEUE_CAPACITY") {
            if let Ok(c) = capacity.parse() {
                self.dispatcher.outbound_queue_capacity = c;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("WSFRAME_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WSFRAME_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# wsframe Configuration
#
# Environment variables override these settings:
# - WSFRAME_HOST
# - WSFRAME_PORT
# - WSFRAME_MAX_SESSIONS
# - WSFRAME_QUEUE_CAPACITY
# - WSFRAME_LOG_LEVEL
# - WSFRAME_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8082

[dispatcher]
# Maximum number of live sessions
max_sessions = 1000

# Per-session outbound queue capacity (frames)
outbound_queue_capacity = 256

# Queue overflow policy: drop_oldest or backpressure
overflow_policy = "drop_oldest"

# Grace period for draining queued frames on close (ms)
close_grace_ms = 5000

# Close the session on authorization failure instead of replying
close_on_forbidden = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::OverflowPolicy;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8082");
        assert_eq!(config.dispatcher.max_sessions, 1000);
        assert_eq!(config.dispatcher.outbound_queue_capacity, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[dispatcher]
max_sessions = 50
overflow_policy = "backpressure"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        // Unspecified fields keep their defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.dispatcher.max_sessions, 50);
        assert_eq!(config.dispatcher.overflow_policy, OverflowPolicy::Backpressure);
        assert_eq!(config.dispatcher.close_grace_ms, 5000);
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[dispatcher]
max_sessions = 50
"#
        )
        .unwrap();

        std::env::set_var("WSFRAME_PORT", "7777");
        std::env::set_var("WSFRAME_MAX_SESSIONS", "5");
        let config = Config::load_with_env(file.path()).unwrap();
        std::env::remove_var("WSFRAME_PORT");
        std::env::remove_var("WSFRAME_MAX_SESSIONS");

        assert_eq!(config.server.port, 7777);
        assert_eq!(config.dispatcher.max_sessions, 5);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not valid toml [[").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/no/such/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_generated_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.dispatcher.overflow_policy, OverflowPolicy::DropOldest);
    }
}

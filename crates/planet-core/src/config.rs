//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `planet.toml` configuration file
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the configuration file expands to the value of the
//! environment variable. Missing required settings abort startup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::{DEFAULT_MAX_TODO_LENGTH, Limits};
use crate::{Error, Result};

/// Public and internal listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public HTTP port (`PORT`)
    pub port: u16,
    /// Internal RPC port (`USER_GRPC_PORT`)
    pub internal_port: u16,
    /// Deadline applied to every inbound request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Database location and pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Logical database name (`DB_NAME`)
    pub name: String,
    /// Explicit SQLite file path (`DB_PATH`)
    pub path: Option<String>,
    #[serde(default = "default_max_open")]
    pub max_open: u32,
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Config for a database file at `path` with default pool sizing
    pub fn at_path(path: impl Into<String>) -> Self {
        Self {
            name: "planet".to_string(),
            path: Some(path.into()),
            max_open: default_max_open(),
            max_idle: default_max_idle(),
            max_lifetime_secs: default_max_lifetime_secs(),
        }
    }

    /// SQLite file backing the database
    pub fn db_path(&self) -> String {
        match &self.path {
            Some(path) => path.clone(),
            None => format!("data/{}.db", self.name),
        }
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

/// Bearer token verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret (`JWT_SECRET_KEY`)
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Auth service address (`AUTH_GRPC_SERVER_ADDR`)
    pub service_addr: Option<String>,
}

/// Analytics sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Base URL of the analytics service; `None` disables analytics
    pub addr: Option<String>,
    #[serde(default = "default_analytics_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            addr: None,
            timeout_ms: default_analytics_timeout_ms(),
        }
    }
}

impl AnalyticsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Main configuration for the planet user server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Raw `LOG_LEVEL` value
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub limits: Limits,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_open() -> u32 {
    50
}

fn default_max_idle() -> u32 {
    10
}

fn default_max_lifetime_secs() -> u64 {
    3600
}

fn default_analytics_timeout_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Expand `${VAR_NAME}` references; unknown variables expand to nothing
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let expanded = Self::expand_env_vars(&toml_content);
        let file: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Self::resolve(file, env_lookup)
    }

    /// Load configuration from `./planet.toml` if present, else from the environment
    pub fn load() -> Result<Self> {
        if Path::new("planet.toml").exists() {
            return Self::from_toml_file("planet.toml");
        }
        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::resolve(TomlConfig::default(), env_lookup)
    }

    /// Overlay `lookup` on top of file settings and check required values
    fn resolve<F>(file: TomlConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = file.server.unwrap_or_default();
        let database = file.database.unwrap_or_default();
        let auth = file.auth.unwrap_or_default();
        let analytics = file.analytics.unwrap_or_default();
        let limits = file.limits.unwrap_or_default();

        let port = parse_opt::<u16, _>(&lookup, "PORT")?.or(server.port);
        let internal_port = parse_opt::<u16, _>(&lookup, "USER_GRPC_PORT")?.or(server.internal_port);
        let request_timeout_secs = parse_opt::<u64, _>(&lookup, "REQUEST_TIMEOUT_SECS")?
            .or(server.request_timeout_secs)
            .unwrap_or_else(default_request_timeout_secs);

        let db_name = lookup("DB_NAME").or(database.name);
        let db_path = lookup("DB_PATH").or(database.path);
        let max_open = parse_opt::<u32, _>(&lookup, "DB_MAX_OPEN")?
            .or(database.max_open)
            .unwrap_or_else(default_max_open);
        let max_idle = parse_opt::<u32, _>(&lookup, "DB_MAX_IDLE")?
            .or(database.max_idle)
            .unwrap_or_else(default_max_idle);
        let max_lifetime_secs = parse_opt::<u64, _>(&lookup, "DB_MAX_LIFETIME_SECS")?
            .or(database.max_lifetime_secs)
            .unwrap_or_else(default_max_lifetime_secs);

        let jwt_secret = lookup("JWT_SECRET_KEY").or(auth.jwt_secret);
        let auth_addr = lookup("AUTH_GRPC_SERVER_ADDR").or(auth.service_addr);
        let analytics_addr = lookup("ANALYTICS_GRPC_SERVER_ADDR").or(analytics.addr);
        let analytics_timeout_ms = analytics.timeout_ms.unwrap_or_else(default_analytics_timeout_ms);

        let log_level = lookup("LOG_LEVEL").or(file.log_level).unwrap_or_else(default_log_level);
        let max_todo_length = parse_opt::<usize, _>(&lookup, "MaxTodoLength")?
            .or(limits.max_todo_length)
            .unwrap_or(DEFAULT_MAX_TODO_LENGTH);

        let config = Config {
            server: ServerConfig {
                port: required(port, "PORT")?,
                internal_port: required(internal_port, "USER_GRPC_PORT")?,
                request_timeout_secs,
            },
            database: DatabaseConfig {
                name: required(db_name, "DB_NAME")?,
                path: db_path,
                max_open,
                max_idle,
                max_lifetime_secs,
            },
            auth: AuthConfig {
                jwt_secret: required(jwt_secret, "JWT_SECRET_KEY")?,
                service_addr: auth_addr,
            },
            analytics: AnalyticsConfig {
                addr: analytics_addr,
                timeout_ms: analytics_timeout_ms,
            },
            log_level,
            limits: Limits::default().with_max_todo_length(max_todo_length),
        };

        if config.database.max_idle > config.database.max_open {
            return Err(Error::Config(format!(
                "DB_MAX_IDLE ({}) exceeds DB_MAX_OPEN ({})",
                config.database.max_idle, config.database.max_open
            )));
        }

        Ok(config)
    }

    /// Tracing filter directive derived from `LOG_LEVEL`
    ///
    /// Accepts a level name or a number (0 = trace ... 4 and above = error).
    pub fn log_directive(&self) -> &str {
        let level = self.log_level.trim();
        match level.parse::<i32>() {
            Ok(n) if n <= 0 => "trace",
            Ok(1) => "debug",
            Ok(2) => "info",
            Ok(3) => "warn",
            Ok(_) => "error",
            Err(_) => match level.to_ascii_lowercase().as_str() {
                "trace" => "trace",
                "debug" => "debug",
                "warn" | "warning" => "warn",
                "error" => "error",
                _ => "info",
            },
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::Config(format!("{} not set", name)))
}

fn parse_opt<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a number, got {}", name, raw))),
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    log_level: Option<String>,
    server: Option<TomlServerConfig>,
    database: Option<TomlDatabaseConfig>,
    auth: Option<TomlAuthConfig>,
    analytics: Option<TomlAnalyticsConfig>,
    limits: Option<TomlLimitsConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    port: Option<u16>,
    internal_port: Option<u16>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDatabaseConfig {
    name: Option<String>,
    path: Option<String>,
    max_open: Option<u32>,
    max_idle: Option<u32>,
    max_lifetime_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAuthConfig {
    jwt_secret: Option<String>,
    service_addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAnalyticsConfig {
    addr: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLimitsConfig {
    max_todo_length: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PORT", "8080"),
            ("USER_GRPC_PORT", "50051"),
            ("JWT_SECRET_KEY", "secret"),
            ("DB_NAME", "planet"),
        ]
    }

    #[test]
    fn test_resolve_from_env_with_defaults() {
        let config = Config::resolve(TomlConfig::default(), lookup_from(&required_env())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.internal_port, 50051);
        assert_eq!(config.database.db_path(), "data/planet.db");
        assert_eq!(config.database.max_open, 50);
        assert_eq!(config.database.max_idle, 10);
        assert_eq!(config.database.max_lifetime(), Duration::from_secs(3600));
        assert!(config.analytics.addr.is_none());
        assert_eq!(config.analytics.timeout(), Duration::from_millis(500));
        assert_eq!(config.limits.max_todo_length, 255);
    }

    #[test]
    fn test_missing_required_value_fails() {
        let env: Vec<_> = required_env().into_iter().filter(|(k, _)| *k != "JWT_SECRET_KEY").collect();
        let err = Config::resolve(TomlConfig::default(), lookup_from(&env)).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET_KEY"));
    }

    #[test]
    fn test_bad_number_fails() {
        let mut env = required_env();
        env.push(("MaxTodoLength", "lots"));
        assert!(Config::resolve(TomlConfig::default(), lookup_from(&env)).is_err());
    }

    #[test]
    fn test_max_todo_length_override() {
        let mut env = required_env();
        env.push(("MaxTodoLength", "100"));
        env.push(("ANALYTICS_GRPC_SERVER_ADDR", "http://analytics:9000"));
        let config = Config::resolve(TomlConfig::default(), lookup_from(&env)).unwrap();
        assert_eq!(config.limits.max_todo_length, 100);
        assert_eq!(config.analytics.addr.as_deref(), Some("http://analytics:9000"));
    }

    #[test]
    fn test_env_overrides_toml() {
        let toml_content = r#"
log_level = "debug"

[server]
port = 3000
internal_port = 4000

[database]
name = "from_file"
path = "/var/lib/planet/planet.db"
max_open = 20
max_idle = 5

[auth]
jwt_secret = "file-secret"

[analytics]
addr = "http://analytics.local"
timeout_ms = 250

[limits]
max_todo_length = 120
"#;
        let file: TomlConfig = toml::from_str(toml_content).unwrap();
        let config = Config::resolve(file, lookup_from(&[("PORT", "9999")])).unwrap();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.internal_port, 4000);
        assert_eq!(config.database.name, "from_file");
        assert_eq!(config.database.db_path(), "/var/lib/planet/planet.db");
        assert_eq!(config.database.max_open, 20);
        assert_eq!(config.auth.jwt_secret, "file-secret");
        assert_eq!(config.analytics.timeout_ms, 250);
        assert_eq!(config.limits.max_todo_length, 120);
        assert_eq!(config.log_directive(), "debug");
    }

    #[test]
    fn test_idle_above_open_rejected() {
        let mut env = required_env();
        env.push(("DB_MAX_OPEN", "5"));
        env.push(("DB_MAX_IDLE", "10"));
        assert!(Config::resolve(TomlConfig::default(), lookup_from(&env)).is_err());
    }

    #[test]
    fn test_log_directive() {
        let mut config = Config::resolve(TomlConfig::default(), lookup_from(&required_env())).unwrap();
        for (raw, expected) in [("0", "trace"), ("1", "debug"), ("3", "warn"), ("7", "error"), ("WARN", "warn"), ("bogus", "info")] {
            config.log_level = raw.to_string();
            assert_eq!(config.log_directive(), expected);
        }
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("PLANET_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${PLANET_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${PLANET_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("PLANET_TEST_VAR");
        }
    }
}

//! Configuration management for herakles-plugin-agent.
//!
//! This module handles loading and validating configuration files. TOML is
//! the primary format; YAML and JSON are accepted by file extension.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 2112;
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_COLLECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "app.log";

/// Locations searched when no config path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/herakles/plugin-agent.toml",
    "./config/config.toml",
    "./herakles-plugin-agent.toml",
    "./herakles-plugin-agent.yaml",
    "./herakles-plugin-agent.yml",
    "./herakles-plugin-agent.json",
];

const LOG_LEVELS: &[&str] = &["off", "trace", "debug", "info", "warn", "error"];
const LOG_OUTPUTS: &[&str] = &["console", "file"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// One `[[write]]` entry: a sink descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteConfig {
    /// "http" or "mq"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl WriteConfig {
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            kind: "http".into(),
            url: Some(url.into()),
            broker: None,
            topic: None,
        }
    }

    pub fn mq(broker: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            kind: "mq".into(),
            url: None,
            broker: Some(broker.into()),
            topic: Some(topic.into()),
        }
    }
}

/// One `[[plugin]]` entry: per-plugin overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    /// Seconds between collections; non-positive falls back to the default.
    #[serde(default)]
    pub report_interval: i64,
    /// Set to false to keep a built-in plugin from being registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// console or file
    #[serde(default = "default_log_output")]
    pub output: String,
    /// Log file path when output = "file"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_output() -> String {
    "console".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: default_log_output(),
            file: None,
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind: Option<String>,
    pub port: Option<u16>,

    /// Serve /plugins from the snapshot cache instead of collecting live
    #[serde(default)]
    pub query_from_memory: bool,

    // Timeouts (seconds)
    pub collect_timeout_secs: Option<u64>,
    pub report_timeout_secs: Option<u64>,

    // TLS/SSL Configuration
    pub enable_tls: Option<bool>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    #[serde(default)]
    pub log: LogConfig,

    // Sinks and plugin overrides; kept last so TOML output stays valid
    #[serde(default)]
    pub write: Vec<WriteConfig>,
    #[serde(default)]
    pub plugin: Vec<PluginConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            query_from_memory: false,
            collect_timeout_secs: Some(DEFAULT_COLLECT_TIMEOUT_SECS),
            report_timeout_secs: Some(DEFAULT_REPORT_TIMEOUT_SECS),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            log: LogConfig::default(),
            write: Vec::new(),
            plugin: Vec::new(),
        }
    }
}

impl Config {
    /// Resolves the report interval for a plugin: the first matching entry
    /// with a positive value, otherwise `DEFAULT_REPORT_INTERVAL_SECS`.
    pub fn report_interval(&self, plugin_name: &str) -> Duration {
        let secs = self
            .plugin
            .iter()
            .filter(|p| p.name == plugin_name)
            .find(|p| p.report_interval > 0)
            .map(|p| p.report_interval as u64)
            .unwrap_or(DEFAULT_REPORT_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Plugins are enabled unless an entry explicitly disables them.
    pub fn plugin_enabled(&self, plugin_name: &str) -> bool {
        !self
            .plugin
            .iter()
            .any(|p| p.name == plugin_name && p.enabled == Some(false))
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.collect_timeout_secs
                .unwrap_or(DEFAULT_COLLECT_TIMEOUT_SECS),
        )
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs.unwrap_or(DEFAULT_REPORT_TIMEOUT_SECS))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    // Sink descriptors
    for (index, write) in cfg.write.iter().enumerate() {
        match write.kind.as_str() {
            "http" => {
                if write.url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Invalid(format!(
                        "write[{}]: http sink requires a url",
                        index
                    )));
                }
            }
            "mq" => {
                let has_broker = write.broker.as_deref().is_some_and(|b| !b.is_empty());
                let has_topic = write.topic.as_deref().is_some_and(|t| !t.is_empty());
                if !(has_broker && has_topic) {
                    return Err(ConfigError::Invalid(format!(
                        "write[{}]: mq sink requires both broker and topic",
                        index
                    )));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "write[{}]: invalid sink type '{}', expected 'http' or 'mq'",
                    index, other
                )));
            }
        }
    }

    // Plugin overrides
    let mut seen = HashSet::new();
    for plugin in &cfg.plugin {
        if plugin.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "plugin entry with empty name".to_string(),
            ));
        }
        if !seen.insert(plugin.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate plugin entry '{}'",
                plugin.name
            )));
        }
    }

    // Timeouts
    if cfg.collect_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "collect_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if cfg.report_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "report_timeout_secs must be greater than 0".to_string(),
        ));
    }

    // Logging
    if !LOG_LEVELS.contains(&cfg.log.level.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "Invalid log level '{}', expected one of {}",
            cfg.log.level,
            LOG_LEVELS.join(", ")
        )));
    }
    if !LOG_OUTPUTS.contains(&cfg.log.output.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "Invalid log output '{}', expected 'console' or 'file'",
            cfg.log.output
        )));
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                ));
            }
            (Some(_), None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_key_path is not set".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_cert_path is not set".into(),
                ));
            }
            (Some(cert), Some(key)) => {
                check_tls_file(cert, "certificate")?;
                check_tls_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and not empty.
fn check_tls_file(path: &str, what: &str) -> Result<(), ConfigError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(ConfigError::Invalid(format!(
            "TLS {} file is empty: {}",
            what, path
        ))),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::Invalid(
            format!("TLS {} file not found: {}", what, path),
        )),
        Err(e) => Err(ConfigError::Invalid(format!(
            "TLS {} file is not readable: {} ({})",
            what, path, e
        ))),
    }
}

/// Loads configuration with multiple format support.
///
/// An explicit path must exist. Without one, the default locations are
/// searched and the built-in defaults are used when none exists.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, &path)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses configuration content, choosing the format by file extension.
pub fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(content)?,
        // Default to TOML
        _ => toml::from_str(content)?,
    };
    Ok(config)
}

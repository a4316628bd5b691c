//! CLI arguments and subcommands for herakles-plugin-agent.
//!
//! Defines the command-line interface with clap and merges CLI overrides
//! into the loaded configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use herakles_plugin_agent::config::{load_config, Config};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-plugin-agent",
    about = "Plugin-based metrics collection agent with multi-sink reporting",
    long_about = "Plugin-based metrics collection agent with multi-sink reporting.\n\n\
                  Polls data-source plugins on their own schedules and fans every sample \
                  out to HTTP and message-queue sinks concurrently. The latest sample of \
                  each plugin can be queried over HTTP.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-plugin-agent - More info: https://www.herakles.now - Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log.level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (TOML/YAML/JSON)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "toml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Serve /plugins from the snapshot cache instead of collecting live
    #[arg(long)]
    pub query_from_memory: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Run the built-in plugins once and print their records
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print every field of every record
        #[arg(long)]
        verbose: bool,
    },

    /// List built-in plugins with their resolved report intervals
    Plugins,
}

/// Loads the configuration file (unless disabled) and applies CLI overrides.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(level) = args.log_level {
        config.log.level = format!("{:?}", level).to_lowercase();
    }

    if args.query_from_memory {
        config.query_from_memory = true;
    }

    // TLS overrides
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert) = &args.tls_cert {
        config.tls_cert_path = Some(cert.display().to_string());
    }
    if let Some(key) = &args.tls_key {
        config.tls_key_path = Some(key.display().to_string());
    }

    Ok(config)
}

/// Serializes a configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Prints the effective configuration.
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let args = Args::parse_from([
            "herakles-plugin-agent",
            "--no-config",
            "--port",
            "9100",
            "--bind",
            "127.0.0.1",
            "--log-level",
            "debug",
            "--query-from-memory",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.port, Some(9100));
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.log.level, "debug");
        assert!(config.query_from_memory);
    }

    #[test]
    fn test_tls_flags_are_applied() {
        let args = Args::parse_from([
            "herakles-plugin-agent",
            "--no-config",
            "--enable-tls",
            "--tls-cert",
            "/tmp/cert.pem",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.enable_tls, Some(true));
        assert_eq!(config.tls_cert_path.as_deref(), Some("/tmp/cert.pem"));
        assert!(config.tls_key_path.is_none());
    }

    #[test]
    fn test_render_config_formats() {
        let config = Config::default();
        let toml_out = render_config(&config, ConfigFormat::Toml).unwrap();
        assert!(toml_out.contains("port = 2112"));

        let json_out = render_config(&config, ConfigFormat::Json).unwrap();
        assert!(json_out.contains("\"port\": 2112"));

        let yaml_out = render_config(&config, ConfigFormat::Yaml).unwrap();
        assert!(yaml_out.contains("port: 2112"));
    }

    #[test]
    fn test_subcommand_parsing() {
        let args = Args::parse_from(["herakles-plugin-agent", "test", "-n", "3"]);
        assert!(matches!(
            args.command,
            Some(Commands::Test {
                iterations: 3,
                verbose: false
            })
        ));
    }
}

//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use herakles_plugin_agent::config::{Config, PluginConfig, DEFAULT_REPORT_INTERVAL_SECS};
use herakles_plugin_agent::plugins::builtin_plugin_names;

use crate::cli::{render_config, ConfigFormat};

/// Default configuration listing every built-in plugin with the default interval.
pub fn sample_config() -> Config {
    Config {
        plugin: builtin_plugin_names()
            .into_iter()
            .map(|name| PluginConfig {
                name: name.to_string(),
                report_interval: DEFAULT_REPORT_INTERVAL_SECS as i64,
                enabled: None,
            })
            .collect(),
        ..Config::default()
    }
}

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = sample_config();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from(match format {
            ConfigFormat::Toml => "herakles-plugin-agent.toml",
            ConfigFormat::Yaml => "herakles-plugin-agent.yaml",
            ConfigFormat::Json => "herakles-plugin-agent.json",
        }),
    };

    let mut content = render_config(&config, format)?;
    if matches!(format, ConfigFormat::Toml) {
        content = add_sink_examples(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Appends commented sink examples to TOML configuration.
fn add_sink_examples(toml: String) -> String {
    let examples = r#"
# Sinks
# -----
# Every collected record is delivered to all sinks concurrently.
#
# [[write]]
# type = "http"                       # POST record as JSON, 200 = success
# url = "http://127.0.0.1:8080/ingest"
#
# [[write]]
# type = "mq"                         # publish record as JSON to a topic
# broker = "redis://127.0.0.1:6379"
# topic = "herakles.metrics"
"#;
    format!("{}{}", toml, examples)
}

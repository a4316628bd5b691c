//! Plugins command implementation.
//!
//! Lists the built-in plugins with their effective schedule.

use herakles_plugin_agent::config::Config;
use herakles_plugin_agent::plugins::builtin_plugin_names;

/// Lists built-in plugins.
pub fn command_plugins(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔌 Built-in Plugins");
    println!("===================\n");

    for name in builtin_plugin_names() {
        let interval = config.report_interval(name);
        let status = if config.plugin_enabled(name) {
            "enabled"
        } else {
            "disabled"
        };
        println!(
            "   {:<20} every {:>4}s   {}",
            name,
            interval.as_secs(),
            status
        );
    }

    println!("\n📤 Sinks: {}", config.write.len());
    for write in &config.write {
        let target = match write.kind.as_str() {
            "http" => write.url.clone().unwrap_or_default(),
            _ => format!(
                "{} / {}",
                write.broker.as_deref().unwrap_or("-"),
                write.topic.as_deref().unwrap_or("-")
            ),
        };
        println!("   ├─ {:<5} {}", write.kind, target);
    }

    Ok(())
}

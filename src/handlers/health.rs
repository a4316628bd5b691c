//! Health check endpoint handler.
//!
//! Reports the lifecycle state of every registered plugin. The agent counts
//! as healthy while at least one plugin loop is running.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use herakles_plugin_agent::{PluginState, PluginStatus};

use crate::handlers::format_uptime;
use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/cansp-dev/herakles-plugin-agent - More info: https://www.herakles.now - Support: exporter@herakles.now";

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let plugins = state.manager.plugin_states();
    let running = plugins
        .iter()
        .filter(|p| p.state == PluginState::Running)
        .count();

    let (status, message) = if running > 0 {
        (StatusCode::OK, "OK")
    } else if plugins.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "No plugins registered")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "No plugin running")
    };

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());
    let rows: Vec<(PluginStatus, u64)> = plugins
        .iter()
        .map(|p| (p.clone(), state.metrics.plugin_runs(&p.name)))
        .collect();
    let table = render_plugin_table(&rows);
    let sinks = state
        .manager
        .reporter()
        .kinds()
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nUptime: {uptime_str}\nRunning plugins: {running}/{}\nSinks: {}\n\n{table}\n{FOOTER_TEXT}",
            plugins.len(),
            if sinks.is_empty() { "none" } else { sinks.as_str() },
        ),
    )
}

/// Renders the plugin lifecycle overview as a plain-text table.
/// Each row carries the number of completed collect cycles.
pub fn render_plugin_table(plugins: &[(PluginStatus, u64)]) -> String {
    let mut out = String::new();
    writeln!(out, "PLUGINS").ok();
    writeln!(out, "=======").ok();
    writeln!(out).ok();
    writeln!(
        out,
        "{:<24} {:<12} {:>10} {:>10} {:>10}",
        "name", "state", "interval", "runs", "snapshot"
    )
    .ok();
    writeln!(out, "{}", "-".repeat(70)).ok();

    for (plugin, runs) in plugins {
        writeln!(
            out,
            "{:<24} {:<12} {:>9}s {:>10} {:>10}",
            plugin.name,
            plugin.state,
            plugin.interval_secs,
            runs,
            if plugin.has_snapshot { "yes" } else { "no" }
        )
        .ok();
    }
    out
}

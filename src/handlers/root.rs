//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::format_uptime;
use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let built = env!("VERGEN_BUILD_TIMESTAMP");

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());

    let mode = if state.manager.query_from_memory() {
        "snapshot cache"
    } else {
        "live collection"
    };

    let mut plugin_items = String::new();
    for plugin in state.manager.plugin_states() {
        writeln!(
            plugin_items,
            "        <li><code>{}</code> - {} (every {}s)</li>",
            plugin.name, plugin.state, plugin.interval_secs
        )
        .ok();
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Herakles Plugin Agent</title>
    <style>
        body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 20px; background: #f4f6f8; }}
        .container {{ max-width: 860px; margin: 0 auto; background: white; padding: 32px; border-radius: 8px; }}
        h1 {{ color: #333; border-bottom: 3px solid #2e7d32; padding-bottom: 12px; }}
        .subtitle {{ color: #666; margin-bottom: 24px; }}
        .info {{ display: flex; gap: 32px; background: #e8f5e9; padding: 12px 20px; border-radius: 4px; }}
        .info-label {{ display: block; font-size: 0.85em; color: #555; }}
        .info-value {{ font-size: 1.1em; color: #2e7d32; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{ margin: 12px 0; padding: 12px; background: #f8f9fa; border-left: 4px solid #2e7d32; }}
        .endpoint-list a {{ color: #2e7d32; font-weight: 600; text-decoration: none; }}
        .endpoint-desc {{ color: #666; margin-top: 4px; }}
        code {{ background: #eceff1; padding: 2px 6px; border-radius: 3px; }}
        .footer {{ margin-top: 32px; padding-top: 16px; border-top: 1px solid #ddd; color: #666; font-size: 0.9em; text-align: center; }}
    </style>
</head>
<body>
<div class="container">
    <h1>Herakles Plugin Agent</h1>
    <p class="subtitle">Scheduled plugin collection with concurrent multi-sink reporting</p>

    <div class="info">
        <div class="info-item">
            <span class="info-label">Version</span>
            <span class="info-value">{version}</span>
        </div>
        <div class="info-item">
            <span class="info-label">Built</span>
            <span class="info-value">{built}</span>
        </div>
        <div class="info-item">
            <span class="info-label">Uptime</span>
            <span class="info-value">{uptime}</span>
        </div>
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
        <li>
            <a href="/metrics">/metrics</a>
            <div class="endpoint-desc">Prometheus counters for plugin runs and sink reports</div>
        </li>
        <li>
            <a href="/plugins">/plugins</a>
            <div class="endpoint-desc">Latest data of every plugin as JSON ({mode})</div>
        </li>
        <li>
            <a href="/health">/health</a>
            <div class="endpoint-desc">Plugin lifecycle overview (text)</div>
        </li>
        <li>
            <a href="/config">/config</a>
            <div class="endpoint-desc">Active runtime configuration (read-only)</div>
        </li>
    </ul>

    <h2>Plugins</h2>
    <ul>
{plugins}    </ul>

    <div class="footer">
        <p>{footer}</p>
    </div>
</div>
</body>
</html>"#,
        version = version,
        built = built,
        uptime = uptime_str,
        mode = mode,
        plugins = plugin_items,
        footer = FOOTER_TEXT
    );

    Html(html)
}

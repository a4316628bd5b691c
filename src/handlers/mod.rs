//! HTTP endpoint handlers for the agent.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Landing page
//! - `/metrics`: Prometheus metrics endpoint
//! - `/plugins`: Latest per-plugin data as JSON
//! - `/health`: Plugin lifecycle overview
//! - `/config`: Effective configuration display

pub mod config;
pub mod health;
pub mod metrics;
pub mod plugins;
pub mod root;

use axum::{routing::get, Router};

use crate::state::SharedState;

// Re-export handlers
pub use config::config_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use plugins::plugins_handler;
pub use root::root_handler;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Builds the HTTP router. Only GET is routed, other methods get 405.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/plugins", get(plugins_handler))
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .with_state(state)
}

/// Human-readable uptime for the text and HTML pages.
pub fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herakles_plugin_agent::plugins::ExamplePlugin;
    use herakles_plugin_agent::{
        AgentMetrics, Config, Plugin, PluginError, PluginManager, PluginState, Record,
    };
    use prometheus::Registry;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;

    use crate::state::AppState;

    struct BrokenStartPlugin;

    #[async_trait]
    impl Plugin for BrokenStartPlugin {
        fn name(&self) -> &str {
            "broken_start"
        }

        async fn start(&self) -> Result<(), PluginError> {
            Err(PluginError::Failed("device missing".into()))
        }

        async fn stop(&self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn collect(&self) -> Result<Record, PluginError> {
            Err(PluginError::NotRunning)
        }
    }

    /// Starts the given plugins, waits until every loop has left its initial
    /// states and serves the router on an ephemeral port.
    async fn serve(plugins: Vec<Arc<dyn Plugin>>) -> (String, Arc<PluginManager>) {
        let config = Arc::new(Config {
            query_from_memory: true,
            ..Config::default()
        });
        let registry = Registry::new();
        let metrics = AgentMetrics::new(&registry).unwrap();

        let mut manager = PluginManager::new(Arc::clone(&config), metrics.clone());
        for plugin in plugins {
            manager.register_plugin(plugin).unwrap();
        }
        let manager = Arc::new(manager);
        manager.start_plugins();

        // Settled once every loop failed or has its first snapshot
        let settled = |m: &PluginManager| {
            m.plugin_states().iter().all(|p| {
                p.state == PluginState::Failed || (p.state == PluginState::Running && p.has_snapshot)
            })
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while !settled(manager.as_ref()) {
            assert!(Instant::now() < deadline, "plugins did not settle");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let state = Arc::new(AppState {
            registry,
            metrics,
            manager: Arc::clone(&manager),
            config,
            start_time: Instant::now(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), manager)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    async fn http_get(url: String) -> reqwest::Response {
        client().get(url).send().await.unwrap()
    }

    #[tokio::test]
    async fn test_get_plugins_returns_json_array() {
        let (base, manager) = serve(vec![Arc::new(ExamplePlugin::new())]).await;

        let response = http_get(format!("{}/plugins", base)).await;
        assert_eq!(response.status().as_u16(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["value"], 42);

        manager.stop_plugins().await;
    }

    #[tokio::test]
    async fn test_non_get_on_plugins_is_rejected() {
        let (base, manager) = serve(vec![Arc::new(ExamplePlugin::new())]).await;

        let response = client()
            .post(format!("{}/plugins", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 405);

        manager.stop_plugins().await;
    }

    #[tokio::test]
    async fn test_health_is_ok_while_a_plugin_runs() {
        let (base, manager) = serve(vec![
            Arc::new(ExamplePlugin::new()),
            Arc::new(BrokenStartPlugin),
        ])
        .await;

        let response = http_get(format!("{}/health", base)).await;
        assert_eq!(response.status().as_u16(), 200);
        let text = response.text().await.unwrap();
        assert!(text.starts_with("OK"));
        assert!(text.contains("Running plugins: 1/2"));

        manager.stop_plugins().await;
    }

    #[tokio::test]
    async fn test_health_is_unavailable_when_no_plugin_runs() {
        let (base, manager) = serve(vec![Arc::new(BrokenStartPlugin)]).await;

        let response = http_get(format!("{}/health", base)).await;
        assert_eq!(response.status().as_u16(), 503);
        let text = response.text().await.unwrap();
        assert!(text.contains("broken_start"));
        assert!(text.contains("failed"));

        manager.stop_plugins().await;

        let response = http_get(format!("{}/health", base)).await;
        assert_eq!(response.status().as_u16(), 503);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(7200), "2.0 hours");
        assert_eq!(format_uptime(172_800), "2.0 days");
    }
}

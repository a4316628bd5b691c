//! Application state shared by the HTTP handlers.

use herakles_plugin_agent::{AgentMetrics, Config, PluginManager};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: AgentMetrics,
    pub manager: Arc<PluginManager>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

//! Herakles Plugin Agent Library
//!
//! A periodic metrics-collection agent. Data-source plugins are polled on
//! their own schedules; every sample is fanned out concurrently to all
//! configured sinks and the latest sample of each plugin is kept in a
//! snapshot cache for on-demand queries.
//!
//! # Features
//!
//! - **Plugin Scheduling**: One independent loop per plugin with its own interval
//! - **Multi-Sink Reporting**: HTTP and message-queue sinks, delivered in parallel
//! - **Error Aggregation**: Every failed sink is surfaced in a single error value
//! - **Snapshot Cache**: Latest record per plugin, served without collecting
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use herakles_plugin_agent::{AgentMetrics, Config, PluginManager};
//! use prometheus::Registry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//! let metrics = AgentMetrics::new(&registry)?;
//!
//! let mut manager = PluginManager::new(Arc::new(Config::default()), metrics);
//! manager.register_plugins()?;
//! manager.start_plugins();
//!
//! for record in manager.get_plugins_data().await {
//!     println!("{}", serde_json::to_string(&record)?);
//! }
//!
//! manager.stop_plugins().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod metrics;
pub mod plugin;
pub mod plugins;
pub mod record;
pub mod reporter;

pub use config::{Config, ConfigError, LogConfig, PluginConfig, WriteConfig};
pub use manager::{ManagerError, PluginManager, PluginState, PluginStatus};
pub use metrics::{AgentMetrics, ReporterObserver};
pub use plugin::{Plugin, PluginError};
pub use record::{Record, Value};
pub use reporter::{
    build_reporter, MultiReporter, Report, ReportError, ReportObserver, Sink, SinkError, SinkKind,
    TaggedSink,
};

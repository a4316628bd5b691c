//! Plugin capability contract.
//!
//! A plugin is an independently scheduled data source. The manager guarantees
//! at most one `start` and one `stop` per instance; plugins track their own
//! running state and refuse to collect outside of it.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::Record;

/// Errors a plugin can return from its lifecycle or collection calls.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin not running")]
    NotRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Failed(String),
}

/// Data source polled by the manager on its own interval.
///
/// All methods take `&self` so one instance can be shared between its
/// scheduling loop and the live query path. `collect` is only ever called
/// from one scheduling task at a time, but a live query may overlap it.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identity, unique across the registered set.
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), PluginError>;

    async fn stop(&self) -> Result<(), PluginError>;

    /// Collect one record. Fails with `PluginError::NotRunning` before
    /// `start` and after `stop`.
    async fn collect(&self) -> Result<Record, PluginError>;
}

//! Example plugin emitting a fixed sample value.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::plugin::{Plugin, PluginError};
use crate::record::Record;

pub const NAME: &str = "example_plugin";

/// Simulated sample value.
const SAMPLE_VALUE: i64 = 42;

#[derive(Debug, Default)]
pub struct ExamplePlugin {
    running: AtomicBool,
}

impl ExamplePlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Plugin for ExamplePlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> Result<(), PluginError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn collect(&self) -> Result<Record, PluginError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(PluginError::NotRunning);
        }
        Ok(Record::new()
            .with("timestamp", Utc::now())
            .with("value", SAMPLE_VALUE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_requires_running() {
        let plugin = ExamplePlugin::new();
        assert!(matches!(
            plugin.collect().await,
            Err(PluginError::NotRunning)
        ));

        plugin.start().await.unwrap();
        let record = plugin.collect().await.unwrap();
        assert!(record.contains_key("timestamp"));
        assert_eq!(record.get("value").and_then(|v| v.as_i64()), Some(42));

        plugin.stop().await.unwrap();
        assert!(plugin.collect().await.is_err());
    }
}

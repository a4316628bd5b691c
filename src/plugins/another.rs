//! Second sample plugin with a larger fixed value.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::plugin::{Plugin, PluginError};
use crate::record::Record;

pub const NAME: &str = "another_plugin";

const SAMPLE_VALUE: i64 = 10_000;

#[derive(Debug, Default)]
pub struct AnotherPlugin {
    running: AtomicBool,
}

impl AnotherPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Plugin for AnotherPlugin {
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
        let record = Record::new()
            .with("timestamp", Utc::now())
            .with("value", SAMPLE_VALUE);
        debug!(plugin = NAME, fields = record.len(), "Collected sample");
        Ok(record)
    }
}

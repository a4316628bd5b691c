//! Message-queue sink publishing each record to a topic.
//!
//! The broker is addressed by a Redis URL and the topic maps to a pub/sub
//! channel. One multiplexed connection is opened lazily and shared by all
//! concurrent reports; it is dropped on error and re-established on the next
//! call.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Sink, SinkError};
use crate::record::Record;

pub struct MqSink {
    client: redis::Client,
    broker: String,
    topic: String,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl MqSink {
    /// Validates the broker URL. No connection is made until the first report.
    pub fn new(broker: impl Into<String>, topic: impl Into<String>) -> Result<Self, SinkError> {
        let broker = broker.into();
        let client = redis::Client::open(broker.as_str())?;
        Ok(Self {
            client,
            broker,
            topic: topic.into(),
            connection: Mutex::new(None),
        })
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn connection(&self) -> Result<MultiplexedConnection, SinkError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!(broker = %self.broker, "Connected to message broker");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        self.connection.lock().await.take();
    }
}

#[async_trait]
impl Sink for MqSink {
    async fn report(&self, record: &Record) -> Result<(), SinkError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;

        match conn.publish::<_, _, i64>(&self.topic, payload).await {
            Ok(receivers) => {
                debug!(topic = %self.topic, receivers, "Record published");
                Ok(())
            }
            Err(e) => {
                warn!(broker = %self.broker, error = %e, "Publish failed, dropping connection");
                self.reset().await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_broker_url_is_rejected() {
        assert!(MqSink::new("not a url", "metrics").is_err());
    }

    #[test]
    fn test_valid_broker_url() {
        let sink = MqSink::new("redis://127.0.0.1:6379", "metrics").unwrap();
        assert_eq!(sink.topic(), "metrics");
        assert_eq!(sink.broker(), "redis://127.0.0.1:6379");
    }
}

//! HTTP sink: POSTs each record as a JSON body.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::{Sink, SinkError};
use crate::record::Record;

pub struct HttpSink {
    client: Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Sink for HttpSink {
    #[instrument(skip(self, record), fields(url = %self.url))]
    async fn report(&self, record: &Record) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(record).send().await?;
        let status = response.status();

        // Only 200 counts as accepted
        if status != StatusCode::OK {
            return Err(SinkError::Status(status.as_u16()));
        }

        debug!(status = status.as_u16(), "Record delivered");
        Ok(())
    }
}

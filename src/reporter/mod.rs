//! Sink contract and the concurrent multi-sink reporter.
//!
//! `MultiReporter::report` dispatches one record to every configured sink at
//! once, waits for all of them, notifies the observer with one `Report` per
//! sink and folds any failures into a single `ReportError`.

pub mod http;
pub mod mq;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WriteConfig;
use crate::record::Record;

pub use http::HttpSink;
pub use mq::MqSink;

/// Deadline applied to each sink call when none is configured.
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by a single sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("message queue error: {0}")]
    Mq(#[from] redis::RedisError),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink did not respond within {0:?}")]
    Timeout(Duration),

    #[error("sink task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

/// Aggregate failure of one fan-out.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("errors occurred during reporting: [{}]", join_errors(.0))]
    Sinks(Vec<SinkError>),
}

impl ReportError {
    /// Every underlying sink failure.
    pub fn failures(&self) -> &[SinkError] {
        match self {
            ReportError::Sinks(errors) => errors,
        }
    }
}

fn join_errors(errors: &[SinkError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Transport accepting one record per call.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn report(&self, record: &Record) -> Result<(), SinkError>;
}

/// Kind label attached to a sink when it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Http,
    Mq,
    Unknown,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Http => "http",
            SinkKind::Mq => "mq",
            SinkKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink together with its kind label.
#[derive(Clone)]
pub struct TaggedSink {
    pub kind: SinkKind,
    pub sink: Arc<dyn Sink>,
}

impl TaggedSink {
    pub fn new(kind: SinkKind, sink: Arc<dyn Sink>) -> Self {
        Self { kind, sink }
    }
}

impl fmt::Debug for TaggedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedSink")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Which sink received which payload in one fan-out.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: SinkKind,
    pub data: Arc<Record>,
    pub succeeded: bool,
}

/// Receives the per-sink outcomes of every fan-out, for accounting.
pub trait ReportObserver: Send + Sync {
    fn observe_reports(&self, reports: &[Report]);
}

/// Fans one record out to a fixed set of sinks.
pub struct MultiReporter {
    sinks: Vec<TaggedSink>,
    observer: Option<Arc<dyn ReportObserver>>,
    timeout: Duration,
}

impl MultiReporter {
    pub fn new(sinks: Vec<TaggedSink>) -> Self {
        Self {
            sinks,
            observer: None,
            timeout: DEFAULT_REPORT_TIMEOUT,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReportObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_observer(&mut self, observer: Arc<dyn ReportObserver>) {
        self.observer = Some(observer);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|s| s.kind).collect()
    }

    /// Sends `record` to every sink concurrently and waits for all of them.
    ///
    /// The observer (if any) is called exactly once with one entry per sink,
    /// in construction order, whether the sink succeeded or not.
    pub async fn report(&self, record: &Record) -> Result<(), ReportError> {
        let data = Arc::new(record.clone());
        let deadline = self.timeout;

        let handles: Vec<_> = self
            .sinks
            .iter()
            .map(|tagged| {
                let sink = Arc::clone(&tagged.sink);
                let data = Arc::clone(&data);
                tokio::spawn(async move {
                    match tokio::time::timeout(deadline, sink.report(data.as_ref())).await {
                        Ok(result) => result,
                        Err(_) => Err(SinkError::Timeout(deadline)),
                    }
                })
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();

        for (tagged, handle) in self.sinks.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SinkError::Panicked(e.to_string())),
            };

            let succeeded = outcome.is_ok();
            if let Err(e) = outcome {
                debug!(reporter_type = %tagged.kind, error = %e, "Sink report failed");
                failures.push(e);
            }

            reports.push(Report {
                kind: tagged.kind,
                data: Arc::clone(&data),
                succeeded,
            });
        }

        if let Some(observer) = &self.observer {
            observer.observe_reports(&reports);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReportError::Sinks(failures))
        }
    }
}

impl fmt::Debug for MultiReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiReporter")
            .field("sinks", &self.sinks)
            .field("has_observer", &self.observer.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builds the reporter from the `[[write]]` configuration entries.
///
/// Entries with an unknown type or missing connection parameters are skipped.
pub fn build_reporter(writes: &[WriteConfig], timeout: Duration) -> MultiReporter {
    let mut sinks = Vec::new();

    for write in writes {
        match write.kind.as_str() {
            "http" => match write.url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => {
                    debug!(url, "Configured HTTP sink");
                    sinks.push(TaggedSink::new(SinkKind::Http, Arc::new(HttpSink::new(url))));
                }
                None => warn!("Skipping http sink without url"),
            },
            "mq" => {
                let broker = write.broker.as_deref().filter(|b| !b.is_empty());
                let topic = write.topic.as_deref().filter(|t| !t.is_empty());
                match (broker, topic) {
                    (Some(broker), Some(topic)) => match MqSink::new(broker, topic) {
                        Ok(sink) => {
                            debug!(broker, topic, "Configured MQ sink");
                            sinks.push(TaggedSink::new(SinkKind::Mq, Arc::new(sink)));
                        }
                        Err(e) => warn!(broker, error = %e, "Skipping MQ sink"),
                    },
                    _ => warn!("Skipping mq sink without broker or topic"),
                }
            }
            other => warn!(sink_type = other, "Skipping sink of unknown type"),
        }
    }

    MultiReporter::new(sinks).with_timeout(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        received: Mutex<Vec<Record>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn report(&self, record: &Record) -> Result<(), SinkError> {
            self.received.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        async fn report(&self, _record: &Record) -> Result<(), SinkError> {
            Err(SinkError::Failed("broker unavailable".into()))
        }
    }

    struct HangingSink;

    #[async_trait]
    impl Sink for HangingSink {
        async fn report(&self, _record: &Record) -> Result<(), SinkError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingObserver {
        calls: Mutex<Vec<Vec<Report>>>,
    }

    impl ReportObserver for CapturingObserver {
        fn observe_reports(&self, reports: &[Report]) {
            self.calls.lock().unwrap().push(reports.to_vec());
        }
    }

    fn sample() -> Record {
        Record::new().with("value", 42)
    }

    #[tokio::test]
    async fn test_all_sinks_succeed() {
        let a = RecordingSink::new();
        let b = RecordingSink::new();
        let observer = Arc::new(CapturingObserver::default());
        let reporter = MultiReporter::new(vec![
            TaggedSink::new(SinkKind::Http, a.clone()),
            TaggedSink::new(SinkKind::Mq, b.clone()),
        ])
        .with_observer(observer.clone());

        reporter.report(&sample()).await.unwrap();

        assert_eq!(a.count(), 1);
        assert_eq!(b.count(), 1);
        let calls = observer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let kinds: Vec<_> = calls[0].iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![SinkKind::Http, SinkKind::Mq]);
        assert!(calls[0].iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn test_partial_failure_is_aggregated() {
        let ok = RecordingSink::new();
        let observer = Arc::new(CapturingObserver::default());
        let reporter = MultiReporter::new(vec![
            TaggedSink::new(SinkKind::Mq, Arc::new(FailingSink)),
            TaggedSink::new(SinkKind::Http, ok.clone()),
            TaggedSink::new(SinkKind::Unknown, Arc::new(FailingSink)),
        ])
        .with_observer(observer.clone());

        let err = reporter.report(&sample()).await.unwrap_err();

        assert_eq!(err.failures().len(), 2);
        assert!(err.to_string().contains("broker unavailable"));
        assert_eq!(ok.count(), 1);

        let calls = observer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);
        assert_eq!(calls[0].iter().filter(|r| !r.succeeded).count(), 2);
    }

    #[tokio::test]
    async fn test_zero_sinks_succeeds_with_empty_notification() {
        let observer = Arc::new(CapturingObserver::default());
        let reporter = MultiReporter::new(Vec::new()).with_observer(observer.clone());

        assert!(reporter.is_empty());
        reporter.report(&sample()).await.unwrap();

        let calls = observer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_empty());
    }

    #[tokio::test]
    async fn test_hanging_sink_times_out() {
        let ok = RecordingSink::new();
        let reporter = MultiReporter::new(vec![
            TaggedSink::new(SinkKind::Http, Arc::new(HangingSink)),
            TaggedSink::new(SinkKind::Mq, ok.clone()),
        ])
        .with_timeout(Duration::from_millis(50));

        let err = reporter.report(&sample()).await.unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert!(matches!(err.failures()[0], SinkError::Timeout(_)));
        assert_eq!(ok.count(), 1);
    }

    #[test]
    fn test_build_reporter_skips_incomplete_entries() {
        let writes = vec![
            WriteConfig::http("http://127.0.0.1:9/ingest"),
            WriteConfig {
                kind: "http".into(),
                url: None,
                broker: None,
                topic: None,
            },
            WriteConfig::mq("redis://127.0.0.1:6379", "metrics"),
            WriteConfig {
                kind: "mq".into(),
                url: None,
                broker: Some("redis://127.0.0.1:6379".into()),
                topic: None,
            },
            WriteConfig {
                kind: "kafka".into(),
                url: None,
                broker: None,
                topic: None,
            },
        ];

        let reporter = build_reporter(&writes, DEFAULT_REPORT_TIMEOUT);
        assert_eq!(reporter.kinds(), vec![SinkKind::Http, SinkKind::Mq]);
    }
}

//! Prometheus metrics definitions for herakles-plugin-agent.
//!
//! Plugin-run counters are incremented by the manager after every successful
//! collection; reporter counters are fed by `ReporterObserver`, once per sink
//! per fan-out.

use prometheus::{IntCounterVec, Opts, Registry};

use crate::reporter::{Report, ReportObserver};

/// Collection of agent counters.
#[derive(Clone)]
pub struct AgentMetrics {
    pub plugin_runs_total: IntCounterVec,             // labels: plugin
    pub plugin_collect_failures_total: IntCounterVec, // labels: plugin
    pub reporter_reports_total: IntCounterVec,        // labels: reporter_type
    pub reporter_failures_total: IntCounterVec,       // labels: reporter_type
}

impl AgentMetrics {
    /// Creates and registers all counters with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let plugin_runs_total = IntCounterVec::new(
            Opts::new(
                "herakles_plugin_runs_total",
                "Total number of successful plugin collections",
            ),
            &["plugin"],
        )?;
        let plugin_collect_failures_total = IntCounterVec::new(
            Opts::new(
                "herakles_plugin_collect_failures_total",
                "Total number of failed or timed-out plugin collections",
            ),
            &["plugin"],
        )?;
        let reporter_reports_total = IntCounterVec::new(
            Opts::new(
                "herakles_reporter_reports_total",
                "Total number of reports by reporter type",
            ),
            &["reporter_type"],
        )?;
        let reporter_failures_total = IntCounterVec::new(
            Opts::new(
                "herakles_reporter_failures_total",
                "Total number of failed reports by reporter type",
            ),
            &["reporter_type"],
        )?;

        registry.register(Box::new(plugin_runs_total.clone()))?;
        registry.register(Box::new(plugin_collect_failures_total.clone()))?;
        registry.register(Box::new(reporter_reports_total.clone()))?;
        registry.register(Box::new(reporter_failures_total.clone()))?;

        Ok(Self {
            plugin_runs_total,
            plugin_collect_failures_total,
            reporter_reports_total,
            reporter_failures_total,
        })
    }

    pub fn increment_plugin_runs(&self, plugin: &str) {
        self.plugin_runs_total.with_label_values(&[plugin]).inc();
    }

    pub fn increment_collect_failures(&self, plugin: &str) {
        self.plugin_collect_failures_total
            .with_label_values(&[plugin])
            .inc();
    }

    pub fn increment_reports(&self, reporter_type: &str) {
        self.reporter_reports_total
            .with_label_values(&[reporter_type])
            .inc();
    }

    pub fn increment_report_failures(&self, reporter_type: &str) {
        self.reporter_failures_total
            .with_label_values(&[reporter_type])
            .inc();
    }

    pub fn plugin_runs(&self, plugin: &str) -> u64 {
        self.plugin_runs_total.with_label_values(&[plugin]).get()
    }

    pub fn collect_failures(&self, plugin: &str) -> u64 {
        self.plugin_collect_failures_total
            .with_label_values(&[plugin])
            .get()
    }

    pub fn reports(&self, reporter_type: &str) -> u64 {
        self.reporter_reports_total
            .with_label_values(&[reporter_type])
            .get()
    }

    pub fn report_failures(&self, reporter_type: &str) -> u64 {
        self.reporter_failures_total
            .with_label_values(&[reporter_type])
            .get()
    }
}

/// Observes fan-out outcomes and updates the reporter counters.
pub struct ReporterObserver {
    metrics: AgentMetrics,
}

impl ReporterObserver {
    pub fn new(metrics: AgentMetrics) -> Self {
        Self { metrics }
    }
}

impl ReportObserver for ReporterObserver {
    fn observe_reports(&self, reports: &[Report]) {
        for report in reports {
            let kind = report.kind.as_str();
            self.metrics.increment_reports(kind);
            if !report.succeeded {
                self.metrics.increment_report_failures(kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::reporter::SinkKind;
    use prometheus::{Encoder, TextEncoder};
    use std::sync::Arc;

    #[test]
    fn test_observer_counts_every_report() {
        let metrics = AgentMetrics::new(&Registry::new()).unwrap();
        let observer = ReporterObserver::new(metrics.clone());
        let data = Arc::new(Record::new().with("value", 1));

        observer.observe_reports(&[
            Report {
                kind: SinkKind::Http,
                data: data.clone(),
                succeeded: true,
            },
            Report {
                kind: SinkKind::Http,
                data: data.clone(),
                succeeded: false,
            },
            Report {
                kind: SinkKind::Mq,
                data,
                succeeded: true,
            },
        ]);

        assert_eq!(metrics.reports("http"), 2);
        assert_eq!(metrics.reports("mq"), 1);
        assert_eq!(metrics.report_failures("http"), 1);
        assert_eq!(metrics.report_failures("mq"), 0);
    }

    #[test]
    fn test_metrics_are_exposed_in_registry() {
        let registry = Registry::new();
        let metrics = AgentMetrics::new(&registry).unwrap();
        metrics.increment_plugin_runs("example_plugin");

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("herakles_plugin_runs_total{plugin=\"example_plugin\"} 1"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        AgentMetrics::new(&registry).unwrap();
        assert!(AgentMetrics::new(&registry).is_err());
    }
}
